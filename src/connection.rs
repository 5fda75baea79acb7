use std::{collections::VecDeque, io};

use fxhash::{FxHashMap, FxHashSet};
use ntex_bytes::BytesMut;
use ntex_codec::Encoder as _;

use crate::codec::{Codec, EncoderError};
use crate::control::{Control, Observer};
use crate::error::{ConnectionError, OperationError, StreamError};
use crate::frame::{self, Frame, GoAway, Ping, Reason, Reset, StreamDependency, StreamId};
use crate::frame::{WindowSize, WindowUpdate};
use crate::hpack::{self, Header};
use crate::message::{Message, MessageKind};
use crate::stream::{Pump, Stream, StreamState};
use crate::{config::Config, consts, default::DefaultObserver, flow::FlowControl};
use crate::{partial::Partial, request::PromiseKey, source::DataSource, window::Window};

/// Which side of the connection this endpoint is
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub(crate) struct Flags: u8 {
        const WAITING_ACK = 0b0000_0001;
        const GOING_AWAY  = 0b0000_0010;
        const CLOSED      = 0b0000_0100;
        /// Server waits for the client preface
        const PREFACE     = 0b0000_1000;
    }
}

/// Encoded frames waiting for the transport
#[derive(Debug, Default)]
pub(crate) struct Output {
    pub(crate) codec: Codec,
    pub(crate) buf: BytesMut,
}

impl Output {
    pub(crate) fn encode(&mut self, frm: Frame) -> Result<(), EncoderError> {
        log::trace!("send frame {:?}", frm);
        self.codec.encode(frm, &mut self.buf)
    }
}

/// Peer's view of the connection, as announced in its SETTINGS
#[derive(Debug)]
pub(crate) struct RemoteSettings {
    pub(crate) initial_window_size: WindowSize,
    pub(crate) max_frame_size: u32,
    pub(crate) max_concurrent_streams: u32,
    pub(crate) max_header_list_size: Option<u32>,
    pub(crate) push_enabled: bool,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            initial_window_size: frame::DEFAULT_INITIAL_WINDOW_SIZE,
            max_frame_size: frame::DEFAULT_MAX_FRAME_SIZE,
            max_concurrent_streams: consts::DEFAULT_REMOTE_MAX_CONCURRENT_STREAMS,
            max_header_list_size: None,
            push_enabled: true,
        }
    }
}

/// Work that must not run while a frame is being dispatched
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Deferred {
    /// WINDOW_UPDATE for a stream, or for the connection if id is zero
    WindowUpdate(StreamId),
    ResumeUpload(StreamId),
}

/// HTTP/2 connection state machine.
///
/// The connection does no I/O. Received bytes are passed to
/// [`feed()`](Connection::feed), frames to send are collected in an
/// internal buffer that is drained with [`take_output()`](Connection::take_output)
/// or [`flush()`](Connection::flush). Events are reported to the observer.
pub struct Connection<O: Observer = DefaultObserver> {
    pub(crate) role: Role,
    pub(crate) config: Config,
    pub(crate) flags: Flags,
    pub(crate) read_buf: BytesMut,
    pub(crate) out: Output,
    pub(crate) encoder: hpack::Encoder,
    pub(crate) decoder: hpack::Decoder,
    pub(crate) streams: FxHashMap<StreamId, Stream>,
    /// Streams that were reset or evicted
    pub(crate) reset_ids: FxHashSet<StreamId>,
    pub(crate) next_local_id: Option<StreamId>,
    pub(crate) last_incoming_id: StreamId,
    pub(crate) recv_flow: FlowControl,
    pub(crate) send_window: Window,
    pub(crate) remote: RemoteSettings,
    pub(crate) partial: Option<Partial>,
    pub(crate) promised: FxHashMap<PromiseKey, StreamId>,
    pub(crate) pings: VecDeque<[u8; 8]>,
    pub(crate) deferred: VecDeque<Deferred>,
    pub(crate) observer: O,
}

impl<O: Observer> Connection<O> {
    /// Client connection with prior knowledge, the preface is sent immediately
    pub fn client(config: Config, observer: O) -> Self {
        let mut con = Connection::new(Role::Client, config, observer);
        con.handshake();
        con
    }

    /// Client connection upgraded from HTTP/1.1.
    ///
    /// The upgrade request is stream 1, it is half closed (local) already.
    pub fn client_upgraded(config: Config, observer: O) -> Self {
        let mut con = Connection::new(Role::Client, config, observer);

        let id = StreamId::from(1);
        let mut stream = Stream::new(id, con.config.window_sz, con.remote.initial_window_size);
        stream.transition(crate::stream::Transition::CloseLocal);
        con.streams.insert(id, stream);
        con.next_local_id = id.next_id().ok();

        con.handshake();
        con
    }

    /// Server connection, waits for the client preface
    pub fn server(config: Config, observer: O) -> Self {
        let mut con = Connection::new(Role::Server, config, observer);
        con.flags.insert(Flags::PREFACE);
        con.handshake();
        con
    }

    fn new(role: Role, config: Config, observer: O) -> Self {
        let out = Output::default();
        out.codec.set_recv_frame_size(config.max_frame_size() as usize);

        Connection {
            role,
            out,
            observer,
            flags: Flags::empty(),
            read_buf: BytesMut::new(),
            encoder: hpack::Encoder::new(config.huffman),
            decoder: hpack::Decoder::new(),
            streams: FxHashMap::default(),
            reset_ids: FxHashSet::default(),
            next_local_id: Some(match role {
                Role::Client => StreamId::from(1),
                Role::Server => StreamId::from(2),
            }),
            last_incoming_id: StreamId::zero(),
            recv_flow: FlowControl::new(config.connection_window_sz),
            send_window: Window::new(frame::DEFAULT_INITIAL_WINDOW_SIZE as i32),
            remote: RemoteSettings::default(),
            partial: None,
            promised: FxHashMap::default(),
            pings: VecDeque::new(),
            deferred: VecDeque::new(),
            config,
        }
    }

    fn handshake(&mut self) {
        if self.role == Role::Client {
            self.out.buf.extend_from_slice(&consts::PREFACE);
        }

        let settings = self.config.settings();
        log::trace!("send local SETTINGS: {:?}", settings);
        self.flags.insert(Flags::WAITING_ACK);
        self.encode_frame(settings.into());

        // connection window starts at the protocol default
        let inc = self.config.connection_window_sz - frame::DEFAULT_INITIAL_WINDOW_SIZE;
        if inc > 0 {
            self.encode_frame(WindowUpdate::new(StreamId::zero(), inc).into());
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// No more frames are processed
    pub fn is_closed(&self) -> bool {
        self.flags.contains(Flags::CLOSED)
    }

    /// GOAWAY was sent or received
    pub fn is_going_away(&self) -> bool {
        self.flags.contains(Flags::GOING_AWAY)
    }

    /// Local SETTINGS are not acknowledged yet
    pub fn is_waiting_ack(&self) -> bool {
        self.flags.contains(Flags::WAITING_ACK)
    }

    /// Look up a stream, closed streams stay until evicted
    pub fn stream(&self, id: StreamId) -> Option<&Stream> {
        self.streams.get(&id)
    }

    /// Number of active streams
    pub fn active_streams(&self) -> usize {
        self.streams.values().filter(|s| s.is_active()).count()
    }

    /// Highest stream id opened by the peer
    pub fn last_incoming_stream_id(&self) -> StreamId {
        self.last_incoming_id
    }

    /// Peer's credit for our DATA on the connection
    pub fn session_send_window(&self) -> i32 {
        self.send_window.get()
    }

    /// Our credit for the peer's DATA on the connection
    pub fn session_recv_window(&self) -> i32 {
        self.recv_flow.window().get()
    }

    /// Max DATA payload the peer accepts
    pub fn remote_max_frame_size(&self) -> u32 {
        self.remote.max_frame_size
    }

    /// Peer's limit of streams opened by us
    pub fn remote_max_concurrent_streams(&self) -> u32 {
        self.remote.max_concurrent_streams
    }

    /// Peer accepts PUSH_PROMISE
    pub fn is_remote_push_enabled(&self) -> bool {
        self.remote.push_enabled
    }

    /// Open a new locally initiated stream in idle state
    pub fn open_stream(&mut self) -> Result<StreamId, OperationError> {
        self.check_closed()?;

        let id = self.next_local_id.ok_or(OperationError::StreamIdsExhausted)?;
        self.check_concurrency()?;
        if self.is_going_away() {
            return Err(OperationError::GoingAway);
        }

        self.next_local_id = id.next_id().ok();
        let stream = Stream::new(id, self.config.window_sz, self.remote.initial_window_size);
        self.streams.insert(id, stream);
        log::trace!("open stream {:?}", id);
        Ok(id)
    }

    /// Send a header block.
    ///
    /// Nothing is sent if the header list exceeds the peer's
    /// `MAX_HEADER_LIST_SIZE`.
    pub fn send_headers(
        &mut self,
        id: StreamId,
        headers: &[Header],
        end_stream: bool,
        priority: Option<StreamDependency>,
    ) -> Result<(), OperationError> {
        self.check_closed()?;

        let stream = self.streams.get(&id).ok_or(OperationError::UnknownStream)?;
        stream.check_send_headers()?;
        if stream.state() == StreamState::Idle {
            self.check_concurrency()?;
        }

        if let Some(max) = self.remote.max_header_list_size {
            let size = hpack::header_list_size(headers);
            if size > max as usize {
                log::debug!("header list for {:?} is too large; size={} max={}", id, size, max);
                return Err(OperationError::HeaderListTooLarge);
            }
        }

        let mut block = BytesMut::new();
        self.encoder.encode(headers, &mut block)?;

        let stream = self
            .streams
            .get_mut(&id)
            .ok_or(OperationError::UnknownStream)?;
        let prev = stream.state();
        stream.send_headers(block.freeze(), end_stream, priority, &mut self.out)?;
        self.notify_state(id, prev);
        self.maybe_close();
        Ok(())
    }

    /// Start an upload.
    ///
    /// DATA frames are sent as flow control windows allow, the rest
    /// follows on window updates or [`resume_upload()`](Connection::resume_upload).
    pub fn send_data<S>(
        &mut self,
        id: StreamId,
        source: S,
        end_stream: bool,
    ) -> Result<(), OperationError>
    where
        S: DataSource + 'static,
    {
        self.check_closed()?;
        self.streams
            .get_mut(&id)
            .ok_or(OperationError::UnknownStream)?
            .send_data(Box::new(source), end_stream)?;

        self.pump(id);
        self.maybe_close();
        Ok(())
    }

    /// Source of the stream's upload has new data
    pub fn resume_upload(&mut self, id: StreamId) -> Result<(), OperationError> {
        self.check_closed()?;
        let stream = self.streams.get(&id).ok_or(OperationError::UnknownStream)?;
        if stream.is_upload_pending() {
            self.pump(id);
            self.maybe_close();
        }
        Ok(())
    }

    /// Reset the stream, returns false if it is idle or closed already
    pub fn send_rst_stream(&mut self, id: StreamId, reason: Reason) -> Result<bool, OperationError> {
        self.check_closed()?;
        let stream = self
            .streams
            .get_mut(&id)
            .ok_or(OperationError::UnknownStream)?;

        let prev = stream.state();
        let sent = stream.send_rst_stream(reason, &mut self.out);
        if sent {
            self.reset_ids.insert(id);
            self.notify_state(id, prev);
            self.maybe_close();
        }
        Ok(sent)
    }

    /// Send PING, the matching ack is reported as `Control::Pong`
    pub fn ping(&mut self, payload: [u8; 8]) -> Result<(), OperationError> {
        self.check_closed()?;
        self.out.encode(Ping::new(payload).into())?;
        self.pings.push_back(payload);
        Ok(())
    }

    /// Start graceful shutdown.
    ///
    /// Streams already opened by the peer are served, the connection
    /// closes once none of them is active.
    pub fn go_away(&mut self, reason: Reason) {
        if self.is_closed() {
            return;
        }
        log::trace!("send GOAWAY; last={:?} reason={:?}", self.last_incoming_id, reason);

        self.flags.insert(Flags::GOING_AWAY);
        self.encode_frame(
            GoAway::new(reason)
                .set_last_stream_id(self.last_incoming_id)
                .into(),
        );
        self.maybe_close();
    }

    /// Transport is gone, every active stream fails
    pub fn disconnect(&mut self) {
        if !self.is_closed() {
            log::trace!("connection is disconnected");
            self.fail_streams(|_| true, OperationError::Disconnected);
            self.close();
        }
    }

    /// Remove a closed stream.
    ///
    /// Frames for the evicted id are treated as frames for a reset stream.
    pub fn evict_stream(&mut self, id: StreamId) -> Result<(), OperationError> {
        let stream = self.streams.get(&id).ok_or(OperationError::UnknownStream)?;
        if stream.is_active() {
            return Err(OperationError::UnexpectedState(stream.state()));
        }
        self.streams.remove(&id);
        self.reset_ids.insert(id);
        self.forget_promise(id);
        Ok(())
    }

    /// There are frames waiting for the transport
    pub fn has_output(&self) -> bool {
        !self.out.buf.is_empty()
    }

    /// Take encoded frames
    pub fn take_output(&mut self) -> BytesMut {
        self.out.buf.split()
    }

    /// Write encoded frames to the transport.
    ///
    /// Returns `Ok(false)` if the transport would block, unwritten bytes
    /// are kept for the next call. A zero length write counts as would block.
    pub fn flush<W: io::Write>(&mut self, io: &mut W) -> io::Result<bool> {
        while !self.out.buf.is_empty() {
            match io.write(&self.out.buf) {
                Ok(0) => {
                    log::trace!("transport accepted no data, retry later");
                    return Ok(false);
                }
                Ok(n) => {
                    let _ = self.out.buf.split_to(n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        io.flush()?;
        Ok(true)
    }

    fn check_closed(&self) -> Result<(), OperationError> {
        if self.is_closed() {
            Err(OperationError::Closed)
        } else {
            Ok(())
        }
    }

    /// Id parity matches streams opened by this endpoint
    pub(crate) fn is_local_id(&self, id: StreamId) -> bool {
        match self.role {
            Role::Client => id.is_client_initiated(),
            Role::Server => id.is_server_initiated(),
        }
    }

    /// Stream is in the table or was reset
    pub(crate) fn is_known(&self, id: StreamId) -> bool {
        self.streams.contains_key(&id) || self.reset_ids.contains(&id)
    }

    /// Local stream without HEADERS sent, the peer cannot know it
    pub(crate) fn is_unannounced(&self, id: StreamId) -> bool {
        self.streams
            .get(&id)
            .map(|s| !s.is_remote() && s.state() == StreamState::Idle)
            .unwrap_or(false)
    }

    /// No stream with this id has been opened yet
    pub(crate) fn is_idle_id(&self, id: StreamId) -> bool {
        if self.is_local_id(id) {
            self.next_local_id.map(|next| id >= next).unwrap_or(false)
        } else {
            id > self.last_incoming_id
        }
    }

    pub(crate) fn defer(&mut self, item: Deferred) {
        if !self.deferred.contains(&item) {
            self.deferred.push_back(item);
        }
    }

    pub(crate) fn encode_frame(&mut self, frm: Frame) {
        if let Err(e) = self.out.encode(frm) {
            log::error!("cannot encode frame: {}", e);
        }
    }

    /// Run the upload pump of a stream
    pub(crate) fn pump(&mut self, id: StreamId) {
        let max_frame_size = self.remote.max_frame_size as usize;
        let stream = match self.streams.get_mut(&id) {
            Some(stream) => stream,
            None => return,
        };

        let prev = stream.state();
        match stream.pump(&mut self.send_window, max_frame_size, &mut self.out) {
            Ok(Pump::Blocked) => {
                self.observer
                    .message(Message::new(id, MessageKind::UploadBlocked));
            }
            Ok(Pump::Done) | Ok(Pump::Pending) => self.notify_state(id, prev),
            Err(err) => self.stream_error(id, err),
        }
    }

    /// Reset the stream and notify its observer
    pub(crate) fn stream_error(&mut self, id: StreamId, err: StreamError) {
        log::debug!("stream error on {:?}: {}", id, err);

        if let Some(stream) = self.streams.get_mut(&id) {
            if stream.reset_code().is_some() {
                log::trace!("{:?} is reset already", id);
                return;
            }

            let prev = stream.state();
            if !stream.send_rst_stream(err.reason(), &mut self.out)
                && prev == StreamState::Closed
            {
                self.encode_frame(Reset::new(id, err.reason()).into());
            }
            self.reset_ids.insert(id);
            if prev.is_active() {
                self.observer.message(Message::error(id, err.into()));
            }
            self.notify_state(id, prev);
        } else {
            self.encode_frame(Reset::new(id, err.reason()).into());
            self.reset_ids.insert(id);
        }
    }

    /// Send GOAWAY, fail every stream and close
    pub(crate) fn connection_error(&mut self, err: ConnectionError) {
        if self.is_closed() {
            return;
        }
        log::warn!("connection error: {}; reason={:?}", err, err.reason());

        self.encode_frame(
            err.to_goaway()
                .set_last_stream_id(self.last_incoming_id)
                .into(),
        );
        self.fail_streams(|_| true, OperationError::Connection(err.clone()));
        self.observer.control(Control::ConnectionError(err));
        self.close();
    }

    /// Close matching streams that are not closed yet
    pub(crate) fn fail_streams<F>(&mut self, f: F, err: OperationError)
    where
        F: Fn(&Stream) -> bool,
    {
        let mut ids: Vec<_> = self
            .streams
            .values()
            .filter(|s| s.state() != StreamState::Closed && f(s))
            .map(|s| s.id())
            .collect();
        ids.sort();

        for id in ids {
            if let Some(stream) = self.streams.get_mut(&id) {
                let prev = stream.state();
                stream.close();
                self.observer.message(Message::error(id, err.clone()));
                self.notify_state(id, prev);
            }
        }
    }

    pub(crate) fn close(&mut self) {
        if !self.is_closed() {
            log::trace!("connection is closed");
            self.flags.insert(Flags::CLOSED);
            self.partial = None;
            self.deferred.clear();
            self.observer.control(Control::Closed);
        }
    }

    /// Close a going away connection once nothing is active
    pub(crate) fn maybe_close(&mut self) {
        if self.is_going_away() && !self.is_closed() && self.active_streams() == 0 {
            self.close();
        }
    }

    pub(crate) fn notify_state(&mut self, id: StreamId, prev: StreamState) {
        if let Some(state) = self.streams.get(&id).map(|s| s.state()) {
            if state != prev {
                if state == StreamState::Closed {
                    self.forget_promise(id);
                }
                self.observer
                    .message(Message::new(id, MessageKind::State(state)));
            }
        }
    }

    /// Pushed resource may be promised again once its stream is done
    fn forget_promise(&mut self, id: StreamId) {
        if id.is_server_initiated() {
            self.promised.retain(|_, promised| *promised != id);
        }
    }

    /// Peer's `MAX_CONCURRENT_STREAMS` allows one more local stream
    fn check_concurrency(&self) -> Result<(), OperationError> {
        let active = self
            .streams
            .values()
            .filter(|s| !s.is_remote() && s.is_active())
            .count();
        if active >= self.remote.max_concurrent_streams as usize {
            log::debug!("too many active streams; active={}", active);
            Err(OperationError::MaxConcurrentStreamsReached)
        } else {
            Ok(())
        }
    }
}

impl<O: Observer> Drop for Connection<O> {
    fn drop(&mut self) {
        if !self.is_closed() {
            self.fail_streams(|_| true, OperationError::Disconnected);
            self.close();
        }
    }
}
