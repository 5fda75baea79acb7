use std::{cmp, mem};

use ntex_codec::Decoder as _;

use crate::connection::{Connection, Deferred, Flags, Role};
use crate::control::{Control, Observer};
use crate::error::{ConnectionError, OperationError, StreamError};
use crate::frame::{self, Continuation, ContinuationError, Data, Frame, FrameError, GoAway};
use crate::frame::{Headers, Ping, Priority, PushPromise, Reason, Setting, Settings};
use crate::frame::{StreamId, WindowSize, WindowUpdate};
use crate::message::Message;
use crate::partial::{BlockKind, Partial};
use crate::stream::{RecvData, Stream, StreamState};
use crate::{consts, hpack, hpack::Header, request::PromiseKey};

impl<O: Observer> Connection<O> {
    /// Process bytes received from the transport.
    ///
    /// Every complete frame is dispatched, deferred work runs after each
    /// of them. On error GOAWAY is queued and the connection is closed.
    pub fn feed(&mut self, data: &[u8]) -> Result<(), ConnectionError> {
        if self.is_closed() {
            log::trace!("connection is closed, drop {}B", data.len());
            return Ok(());
        }
        self.read_buf.extend_from_slice(data);

        if self.flags.contains(Flags::PREFACE) {
            let len = cmp::min(self.read_buf.len(), consts::PREFACE.len());
            if self.read_buf[..len] != consts::PREFACE[..len] {
                proto_err!(conn: "invalid connection preface");
                let err = ConnectionError::from(FrameError::InvalidPreface);
                self.connection_error(err.clone());
                return Err(err);
            }
            if len < consts::PREFACE.len() {
                return Ok(());
            }
            let _ = self.read_buf.split_to(len);
            self.flags.remove(Flags::PREFACE);
            log::trace!("connection preface is received");
        }

        while !self.is_closed() {
            match self.out.codec.decode(&mut self.read_buf) {
                Ok(Some(frame)) => {
                    self.dispatch(frame)?;
                    self.run_deferred();
                }
                Ok(None) => break,
                Err(e) => {
                    let err = ConnectionError::from(e);
                    self.connection_error(err.clone());
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Process one inbound frame.
    ///
    /// WINDOW_UPDATE frames and upload resumption triggered by the frame
    /// are queued, [`run_deferred()`](Connection::run_deferred) executes them.
    pub fn dispatch(&mut self, frame: Frame) -> Result<(), ConnectionError> {
        if self.is_closed() {
            log::trace!("connection is closed, drop {:?}", frame);
            return Ok(());
        }
        log::trace!("processing frame {:?}", frame);

        match self.dispatch_frame(frame) {
            Ok(()) => {
                self.maybe_close();
                Ok(())
            }
            Err(err) => {
                self.connection_error(err.clone());
                Err(err)
            }
        }
    }

    /// Send queued WINDOW_UPDATE frames and resume uploads
    pub fn run_deferred(&mut self) {
        while let Some(item) = self.deferred.pop_front() {
            if self.is_closed() {
                self.deferred.clear();
                return;
            }

            match item {
                Deferred::WindowUpdate(id) if id.is_zero() => {
                    if let Some(inc) = self.recv_flow.take_update() {
                        self.encode_frame(WindowUpdate::new(id, inc).into());
                    }
                }
                Deferred::WindowUpdate(id) => {
                    let inc = self
                        .streams
                        .get_mut(&id)
                        .and_then(|stream| stream.take_window_update());
                    if let Some(inc) = inc {
                        self.encode_frame(WindowUpdate::new(id, inc).into());
                    }
                }
                Deferred::ResumeUpload(id) => self.pump(id),
            }
        }
        self.maybe_close();
    }

    fn dispatch_frame(&mut self, frame: Frame) -> Result<(), ConnectionError> {
        if let Some(ref partial) = self.partial {
            if !matches!(frame, Frame::Continuation(_)) {
                proto_err!(conn: "expected CONTINUATION for {:?}, got {:?}", partial.stream_id(), frame);
                return Err(ContinuationError::Expected.into());
            }
        }

        match frame {
            Frame::Data(frm) => self.recv_data(frm),
            Frame::Headers(frm) => self.recv_headers(frm),
            Frame::Priority(frm) => self.recv_priority(frm),
            Frame::Reset(frm) => self.recv_rst_stream(frm),
            Frame::Settings(frm) => self.recv_settings(frm),
            Frame::PushPromise(frm) => self.recv_push_promise(frm),
            Frame::Ping(frm) => self.recv_ping(frm),
            Frame::GoAway(frm) => self.recv_go_away(frm),
            Frame::WindowUpdate(frm) => self.recv_window_update(frm),
            Frame::Continuation(frm) => self.recv_continuation(frm),
            Frame::Unknown { kind, stream_id } => {
                log::trace!("ignore unknown frame {:#x} on {:?}", kind, stream_id);
                Ok(())
            }
        }
    }

    fn recv_data(&mut self, frm: Data) -> Result<(), ConnectionError> {
        let id = frm.stream_id();
        if id.is_zero() {
            proto_err!(conn: "DATA on connection stream");
            return Err(ConnectionError::ZeroStreamId("DATA"));
        }
        if !self.is_known(id) || self.is_unannounced(id) {
            log::debug!("DATA for unknown stream {:?}", id);
            return Err(ConnectionError::UnknownStream("DATA", id));
        }
        if self.recv_flow.consume(frm.flow_len()).is_err() {
            log::debug!(
                "connection flow control violation; sz={} window={}",
                frm.flow_len(),
                self.recv_flow.window()
            );
            return Err(ConnectionError::FlowControlViolation);
        }
        if self.recv_flow.is_update_needed() {
            self.defer(Deferred::WindowUpdate(StreamId::zero()));
        }

        let stream = match self.streams.get_mut(&id) {
            Some(stream) => stream,
            None => {
                log::trace!("DATA for reset stream {:?}", id);
                return Ok(());
            }
        };

        let prev = stream.state();
        match stream.handle_data(&frm) {
            Ok(RecvData::Ignored) => (),
            Ok(RecvData::Accepted { update }) => {
                if update {
                    self.defer(Deferred::WindowUpdate(id));
                }
                let eof = frm.is_end_stream();
                self.observer
                    .message(Message::data(id, frm.into_payload(), eof));
                self.notify_state(id, prev);
            }
            Err(err) => self.stream_error(id, err),
        }
        Ok(())
    }

    fn recv_headers(&mut self, frm: Headers) -> Result<(), ConnectionError> {
        let id = frm.stream_id();
        if id.is_zero() {
            proto_err!(conn: "HEADERS on connection stream");
            return Err(ConnectionError::ZeroStreamId("HEADERS"));
        }
        if let Some(dep) = frm.stream_dep() {
            log::trace!("ignore priority of {:?}: {:?}", id, dep);
        }
        if self.is_unannounced(id) {
            proto_err!(conn: "HEADERS on idle local stream {:?}", id);
            return Err(ConnectionError::InvalidRemoteStreamId(id));
        }

        if let Some(stream) = self.streams.get(&id) {
            if !stream.can_recv_headers() && stream.reset_code().is_none() {
                log::debug!("HEADERS for {:?} in {:?} state", id, stream.state());
                self.stream_error(id, StreamError::UnexpectedHeadersFrame);
            }
        } else if !self.reset_ids.contains(&id) {
            if self.is_local_id(id) {
                proto_err!(conn: "HEADERS on unopened local stream {:?}", id);
                return Err(ConnectionError::InvalidRemoteStreamId(id));
            } else if id > self.last_incoming_id {
                self.last_incoming_id = id;
                self.open_remote_stream(id);
            } else {
                self.stream_error(id, StreamError::UnexpectedHeadersFrame);
            }
        }

        let kind = BlockKind::Headers {
            eof: frm.is_end_stream(),
        };
        let partial = Partial::new(id, kind, frm.fragment());
        if frm.is_end_headers() {
            self.assemble(partial)
        } else {
            self.partial = Some(partial);
            Ok(())
        }
    }

    fn open_remote_stream(&mut self, id: StreamId) {
        let active = self
            .streams
            .values()
            .filter(|s| s.is_remote() && s.is_active())
            .count();

        if self.is_going_away() || active >= self.config.remote_max_concurrent_streams as usize {
            log::debug!("refuse stream {:?}; active={}", id, active);
            self.stream_error(id, StreamError::Refused);
        } else {
            let stream =
                Stream::new(id, self.config.window_sz, self.remote.initial_window_size).remote();
            self.streams.insert(id, stream);
            self.observer.control(Control::NewStream(id));
        }
    }

    fn recv_continuation(&mut self, frm: Continuation) -> Result<(), ConnectionError> {
        let mut partial = match self.partial.take() {
            Some(partial) => partial,
            None => {
                proto_err!(conn: "CONTINUATION without HEADERS on {:?}", frm.stream_id());
                return Err(ContinuationError::Unexpected.into());
            }
        };

        if partial.extend(&frm, self.config.max_header_continuations)? {
            self.assemble(partial)
        } else {
            self.partial = Some(partial);
            Ok(())
        }
    }

    /// Decode a complete header block and deliver it.
    ///
    /// The block is decoded even if its stream is gone, HPACK state is
    /// shared by the whole connection.
    fn assemble(&mut self, partial: Partial) -> Result<(), ConnectionError> {
        let (id, kind, block) = partial.into_block();
        let headers = self.decoder.decode(&block)?;
        log::trace!("decoded header block for {:?}: {:?}", id, headers);

        match kind {
            BlockKind::Headers { eof } => {
                self.deliver_headers(id, headers, eof);
                Ok(())
            }
            BlockKind::PushPromise { promised_id } => {
                self.deliver_push_promise(id, promised_id, headers, block.is_empty())
            }
        }
    }

    fn deliver_headers(&mut self, id: StreamId, headers: Vec<Header>, eof: bool) {
        match self.streams.get(&id) {
            Some(stream) if stream.can_recv_headers() => (),
            _ => {
                log::trace!("discard header block for {:?}", id);
                return;
            }
        }

        let size = hpack::header_list_size(&headers);
        if size > self.config.max_header_list_size() {
            log::debug!("header list for {:?} is too large; size={}", id, size);
            self.stream_error(id, StreamError::HeaderListTooLarge);
            return;
        }

        if let Some(stream) = self.streams.get_mut(&id) {
            let prev = stream.state();
            stream.handle_headers(headers.clone(), eof);
            self.observer.message(Message::headers(id, headers, eof));
            self.notify_state(id, prev);
        }
    }

    fn recv_push_promise(&mut self, frm: PushPromise) -> Result<(), ConnectionError> {
        let id = frm.stream_id();
        let promised_id = frm.promised_id();
        if id.is_zero() {
            proto_err!(conn: "PUSH_PROMISE on connection stream");
            return Err(ConnectionError::ZeroStreamId("PUSH_PROMISE"));
        }

        let push_enabled = self.config.is_push_enabled();
        if self.role == Role::Server || (!push_enabled && !self.is_waiting_ack()) {
            proto_err!(conn: "unexpected PUSH_PROMISE on {:?}", id);
            return Err(ConnectionError::UnexpectedPushPromise);
        }

        match self.streams.get(&id) {
            Some(stream)
                if !stream.is_remote()
                    && matches!(
                        stream.state(),
                        StreamState::Open | StreamState::HalfClosedLocal
                    ) => {}
            _ => {
                proto_err!(conn: "PUSH_PROMISE on {:?} in invalid state", id);
                return Err(ConnectionError::InvalidPushStream(id));
            }
        }

        if promised_id.is_zero()
            || self.is_local_id(promised_id)
            || promised_id <= self.last_incoming_id
        {
            proto_err!(conn: "invalid promised stream id {:?}", promised_id);
            return Err(ConnectionError::InvalidPromisedId(promised_id));
        }

        self.last_incoming_id = promised_id;
        let stream = Stream::new(
            promised_id,
            self.config.window_sz,
            self.remote.initial_window_size,
        )
        .promised();
        self.streams.insert(promised_id, stream);

        if !push_enabled {
            self.stream_error(promised_id, StreamError::Refused);
        }

        let partial = Partial::new(id, BlockKind::PushPromise { promised_id }, frm.fragment());
        if frm.is_end_headers() {
            self.assemble(partial)
        } else {
            self.partial = Some(partial);
            Ok(())
        }
    }

    fn deliver_push_promise(
        &mut self,
        id: StreamId,
        promised_id: StreamId,
        headers: Vec<Header>,
        empty_block: bool,
    ) -> Result<(), ConnectionError> {
        if headers.is_empty() {
            if !empty_block {
                return Err(ConnectionError::EmptyPushPromise);
            }
            self.stream_error(promised_id, StreamError::MalformedPushPromise);
            return Ok(());
        }

        match self.streams.get(&promised_id) {
            Some(stream) if stream.state() == StreamState::ReservedRemote => (),
            _ => {
                log::trace!("discard promised headers for {:?}", promised_id);
                return Ok(());
            }
        }

        let key = match PromiseKey::from_headers(&headers) {
            Some(key) => key,
            None => {
                proto_err!(stream: "malformed promised request on {:?}", promised_id);
                self.stream_error(promised_id, StreamError::MalformedPushPromise);
                return Ok(());
            }
        };
        if self.promised.contains_key(&key) {
            log::debug!("duplicate promise {:?} on {:?}", key, promised_id);
            self.stream_error(promised_id, StreamError::Refused);
            return Ok(());
        }

        self.promised.insert(key, promised_id);
        self.observer.control(Control::PushPromise {
            stream_id: id,
            promised_id,
            headers,
        });
        Ok(())
    }

    fn recv_priority(&mut self, frm: Priority) -> Result<(), ConnectionError> {
        let id = frm.stream_id();
        if id.is_zero() {
            proto_err!(conn: "PRIORITY on connection stream");
            return Err(ConnectionError::ZeroStreamId("PRIORITY"));
        }
        if !self.is_known(id) {
            log::debug!("PRIORITY for unknown stream {:?}", id);
            return Err(ConnectionError::UnknownStream("PRIORITY", id));
        }
        log::trace!("PRIORITY frame is not supported: {:?}", frm);
        Ok(())
    }

    fn recv_rst_stream(&mut self, frm: Reset) -> Result<(), ConnectionError> {
        let id = frm.stream_id();
        if id.is_zero() {
            proto_err!(conn: "RST_STREAM on connection stream");
            return Err(ConnectionError::ZeroStreamId("RST_STREAM"));
        }
        if self.is_unannounced(id) {
            proto_err!(conn: "RST_STREAM on idle local stream {:?}", id);
            return Err(ConnectionError::ResetOnIdleStream(id));
        }

        if let Some(stream) = self.streams.get_mut(&id) {
            let prev = stream.state();
            if stream.handle_rst_stream(frm.reason()) {
                log::trace!("{:?} is reset by peer: {:?}", id, frm.reason());
                self.reset_ids.insert(id);
                self.observer.message(Message::error(
                    id,
                    OperationError::RemoteReset(frm.reason()),
                ));
                self.notify_state(id, prev);
            }
        } else if self.is_idle_id(id) {
            proto_err!(conn: "RST_STREAM on idle stream {:?}", id);
            return Err(ConnectionError::ResetOnIdleStream(id));
        } else {
            log::trace!("ignore RST_STREAM for untracked stream {:?}", id);
        }
        Ok(())
    }

    fn recv_settings(&mut self, frm: Settings) -> Result<(), ConnectionError> {
        if frm.is_ack() {
            if !self.is_waiting_ack() {
                // We haven't sent any SETTINGS frames to be ACKed, so
                // this is very bizarre! Remote is either buggy or malicious.
                proto_err!(conn: "received unexpected settings ack");
                return Err(ConnectionError::UnexpectedSettingsAck);
            }
            self.flags.remove(Flags::WAITING_ACK);
            self.observer.control(Control::SettingsAck);
            return Ok(());
        }

        log::trace!("processing incoming SETTINGS: {:#?}", frm);
        for setting in frm.iter() {
            self.accept_setting(*setting)?;
        }
        self.out.encode(Settings::ack().into())?;
        self.observer.control(Control::Settings(frm));
        Ok(())
    }

    fn accept_setting(&mut self, setting: Setting) -> Result<(), ConnectionError> {
        match setting {
            Setting::HeaderTableSize(val) => {
                if val > consts::MAX_HEADER_TABLE_SIZE {
                    proto_err!(conn: "header table size is too large: {}", val);
                    return Err(ConnectionError::InvalidSetting(setting));
                }
                self.encoder.update_max_size(val as usize);
            }
            Setting::InitialWindowSize(val) => {
                if val > consts::MAX_WINDOW_SIZE {
                    log::debug!("initial window size is too large: {}", val);
                    return Err(ConnectionError::InvalidInitialWindowSize);
                }
                let old = mem::replace(&mut self.remote.initial_window_size, val);
                if old != val {
                    self.update_initial_window(old, val);
                }
            }
            Setting::MaxConcurrentStreams(val) => {
                self.remote.max_concurrent_streams = val;
            }
            Setting::MaxFrameSize(val) => {
                if !(frame::DEFAULT_MAX_FRAME_SIZE..=frame::MAX_MAX_FRAME_SIZE).contains(&val) {
                    proto_err!(conn: "invalid max frame size: {}", val);
                    return Err(ConnectionError::InvalidSetting(setting));
                }
                self.remote.max_frame_size = val;
                self.out.codec.set_send_frame_size(val as usize);
            }
            Setting::MaxHeaderListSize(val) => {
                self.remote.max_header_list_size = Some(val);
            }
            Setting::EnablePush(val) => {
                if val > 1 || (val == 1 && self.role == Role::Client) {
                    proto_err!(conn: "invalid enable push value: {}", val);
                    return Err(ConnectionError::InvalidSetting(setting));
                }
                self.remote.push_enabled = val == 1;
            }
            Setting::Unknown(id, val) => {
                log::trace!("ignore unknown setting {:#x}={}", id, val);
            }
        }
        Ok(())
    }

    /// Move send windows of open streams by the `INITIAL_WINDOW_SIZE` delta
    fn update_initial_window(&mut self, old: WindowSize, new: WindowSize) {
        let mut ids: Vec<_> = self
            .streams
            .values()
            .filter(|s| s.state() != StreamState::Closed)
            .map(|s| s.id())
            .collect();
        ids.sort();

        for id in ids {
            let result = match self.streams.get_mut(&id) {
                Some(stream) => stream.apply_initial_window(old, new),
                None => continue,
            };
            match result {
                Ok(true) => self.defer(Deferred::ResumeUpload(id)),
                Ok(false) => (),
                Err(err) => self.stream_error(id, err),
            }
        }
    }

    fn recv_ping(&mut self, frm: Ping) -> Result<(), ConnectionError> {
        if frm.is_ack() {
            match self.pings.iter().position(|p| p == frm.payload()) {
                Some(idx) => {
                    self.pings.remove(idx);
                    self.observer.control(Control::Pong(frm.into_payload()));
                    Ok(())
                }
                None => {
                    proto_err!(conn: "unexpected PING ack");
                    Err(ConnectionError::UnexpectedPingAck)
                }
            }
        } else {
            self.out.encode(Ping::pong(frm.into_payload()).into())?;
            Ok(())
        }
    }

    fn recv_go_away(&mut self, frm: GoAway) -> Result<(), ConnectionError> {
        let last = frm.last_stream_id();
        let reason = frm.reason();

        if !last.is_zero() && !self.is_local_id(last) {
            proto_err!(conn: "GOAWAY with last stream id {:?}", last);
            return Err(ConnectionError::InvalidGoAwayStreamId(last));
        }
        if last == StreamId::MAX && reason == Reason::NO_ERROR {
            log::debug!("peer starts graceful shutdown");
        } else if self.next_local_id.map(|next| last >= next).unwrap_or(true) {
            log::debug!("GOAWAY last stream id {:?} is beyond opened streams", last);
        }
        log::trace!("processing GOAWAY: {:?}", frm);

        self.flags.insert(Flags::GOING_AWAY);
        self.fail_streams(
            |s| !s.is_remote() && s.id() > last,
            OperationError::GoAway(reason),
        );
        self.observer.control(Control::GoAway(frm));
        Ok(())
    }

    fn recv_window_update(&mut self, frm: WindowUpdate) -> Result<(), ConnectionError> {
        let id = frm.stream_id();
        let inc = frm.size_increment();

        if id.is_zero() {
            if inc == 0 {
                proto_err!(conn: "zero WINDOW_UPDATE for connection");
                return Err(ConnectionError::ZeroWindowUpdate);
            }
            self.send_window = self.send_window.inc(inc).map_err(|_| {
                proto_err!(conn: "connection window overflow; inc={}", inc);
                ConnectionError::WindowOverflow
            })?;

            let mut ids: Vec<_> = self
                .streams
                .values()
                .filter(|s| s.is_upload_blocked())
                .map(|s| s.id())
                .collect();
            ids.sort();
            for id in ids {
                self.defer(Deferred::ResumeUpload(id));
            }
        } else if let Some(stream) = self.streams.get_mut(&id) {
            if !stream.is_active() {
                log::trace!("ignore WINDOW_UPDATE for inactive {:?}", id);
                return Ok(());
            }
            match stream.handle_window_update(inc) {
                Ok(true) => self.defer(Deferred::ResumeUpload(id)),
                Ok(false) => (),
                Err(err) => self.stream_error(id, err),
            }
        } else {
            log::trace!("ignore WINDOW_UPDATE for unknown {:?}", id);
        }
        Ok(())
    }
}
