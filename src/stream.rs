use std::fmt;

use ntex_bytes::Bytes;

use crate::connection::Output;
use crate::error::{OperationError, StreamError};
use crate::flow::FlowControl;
use crate::frame::{Data, Headers, Reason, Reset, StreamDependency, StreamId, WindowSize};
use crate::{hpack::Header, source::DataSource, window::Window};

/// Stream lifecycle state, RFC 7540 section 5.1
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StreamState {
    Idle,
    ReservedRemote,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

/// Events that move a stream between states
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Transition {
    /// HEADERS sent or received
    Open,
    /// END_STREAM sent
    CloseLocal,
    /// END_STREAM received
    CloseRemote,
    /// RST_STREAM sent or received
    Reset,
}

impl StreamState {
    /// Stream is neither idle nor closed
    pub fn is_active(&self) -> bool {
        !matches!(self, StreamState::Idle | StreamState::Closed)
    }

    /// Resulting state, `None` if the event is not valid in this state.
    pub(crate) fn next(self, ev: Transition) -> Option<StreamState> {
        use StreamState::*;

        match (self, ev) {
            (_, Transition::Reset) => Some(Closed),
            (Idle, Transition::Open) | (Open, Transition::Open) => Some(Open),
            (Idle, Transition::CloseLocal)
            | (ReservedRemote, Transition::CloseLocal)
            | (Open, Transition::CloseLocal) => Some(HalfClosedLocal),
            (Open, Transition::CloseRemote) => Some(HalfClosedRemote),
            (HalfClosedLocal, Transition::CloseRemote)
            | (HalfClosedRemote, Transition::CloseLocal) => Some(Closed),
            _ => None,
        }
    }
}

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    struct Flags: u8 {
        /// Initiated by the peer
        const REMOTE   = 0b0000_0001;
        /// Reserved by PUSH_PROMISE
        const PROMISED = 0b0000_0010;
        /// Upload waits for window
        const BLOCKED  = 0b0000_0100;
    }
}

/// Outcome of an upload pump run
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Pump {
    /// No upload, or upload is complete
    Done,
    /// Source has no data ready
    Pending,
    /// Flow control window is exhausted
    Blocked,
}

/// Outcome of received DATA
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum RecvData {
    /// Stream was reset, payload is dropped
    Ignored,
    Accepted { update: bool },
}

struct Upload {
    source: Box<dyn DataSource>,
    end_stream: bool,
}

/// One request/response exchange
pub struct Stream {
    id: StreamId,
    state: StreamState,
    flags: Flags,
    recv_flow: FlowControl,
    send_window: Window,
    reset_code: Option<Reason>,
    headers: Vec<Header>,
    download: Vec<Bytes>,
    upload: Option<Upload>,
}

impl Stream {
    pub(crate) fn new(id: StreamId, recv_window: WindowSize, send_window: WindowSize) -> Self {
        Stream {
            id,
            state: StreamState::Idle,
            flags: Flags::empty(),
            recv_flow: FlowControl::new(recv_window),
            send_window: Window::new(send_window as i32),
            reset_code: None,
            headers: Vec::new(),
            download: Vec::new(),
            upload: None,
        }
    }

    /// Stream opened by the peer's HEADERS
    pub(crate) fn remote(mut self) -> Self {
        self.flags.insert(Flags::REMOTE);
        self.transition(Transition::Open);
        self
    }

    /// Stream reserved by the peer's PUSH_PROMISE
    pub(crate) fn promised(mut self) -> Self {
        self.flags.insert(Flags::REMOTE | Flags::PROMISED);
        self.state = StreamState::ReservedRemote;
        self
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Stream is initiated by the peer
    pub fn is_remote(&self) -> bool {
        self.flags.contains(Flags::REMOTE)
    }

    pub fn is_promised(&self) -> bool {
        self.flags.contains(Flags::PROMISED)
    }

    /// Peer's credit for our DATA
    pub fn send_window(&self) -> i32 {
        self.send_window.get()
    }

    /// Our credit for the peer's DATA
    pub fn recv_window(&self) -> i32 {
        self.recv_flow.window().get()
    }

    /// Error code of RST_STREAM, sent or received
    pub fn reset_code(&self) -> Option<Reason> {
        self.reset_code
    }

    /// Every received header, trailers included
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Received payload chunks
    pub fn downloaded(&self) -> &[Bytes] {
        &self.download
    }

    pub fn is_upload_pending(&self) -> bool {
        self.upload.is_some()
    }

    /// Upload waits for a window update
    pub fn is_upload_blocked(&self) -> bool {
        self.flags.contains(Flags::BLOCKED)
    }

    pub(crate) fn transition(&mut self, ev: Transition) -> bool {
        match self.state.next(ev) {
            Some(state) => {
                log::trace!("{:?} transition {:?} -> {:?}", self.id, self.state, state);
                self.state = state;
                true
            }
            None => {
                log::trace!("{:?} ignore {:?} in {:?} state", self.id, ev, self.state);
                false
            }
        }
    }

    /// Check that HEADERS can be sent before the block gets encoded
    pub(crate) fn check_send_headers(&self) -> Result<(), OperationError> {
        match self.state {
            StreamState::Idle | StreamState::Open | StreamState::HalfClosedRemote => Ok(()),
            state => Err(OperationError::UnexpectedState(state)),
        }
    }

    pub(crate) fn send_headers(
        &mut self,
        block: Bytes,
        end_stream: bool,
        priority: Option<StreamDependency>,
        out: &mut Output,
    ) -> Result<(), OperationError> {
        self.check_send_headers()?;

        let mut hdrs = Headers::new(self.id, block, end_stream);
        if let Some(dep) = priority {
            hdrs.set_stream_dep(dep);
        }
        if self.state == StreamState::Idle {
            self.transition(Transition::Open);
        }
        out.encode(hdrs.into())?;

        if end_stream {
            self.transition(Transition::CloseLocal);
        }
        Ok(())
    }

    /// Reset the stream, returns false if it is idle or already closed.
    pub(crate) fn send_rst_stream(&mut self, reason: Reason, out: &mut Output) -> bool {
        if matches!(self.state, StreamState::Idle | StreamState::Closed) {
            return false;
        }

        self.transition(Transition::Reset);
        self.reset_code.get_or_insert(reason);
        self.abandon_upload();

        if let Err(e) = out.encode(Reset::new(self.id, reason).into()) {
            log::error!("failed to encode RST_STREAM for {:?}: {}", self.id, e);
        }
        true
    }

    /// Close the stream without RST_STREAM
    pub(crate) fn close(&mut self) {
        self.transition(Transition::Reset);
        self.abandon_upload();
    }

    pub(crate) fn send_data(
        &mut self,
        source: Box<dyn DataSource>,
        end_stream: bool,
    ) -> Result<(), OperationError> {
        if !matches!(self.state, StreamState::Open | StreamState::HalfClosedRemote) {
            return Err(OperationError::UnexpectedState(self.state));
        }
        if self.upload.is_some() {
            return Err(OperationError::UploadInProgress);
        }
        self.upload = Some(Upload { source, end_stream });
        Ok(())
    }

    fn abandon_upload(&mut self) {
        if self.upload.take().is_some() {
            log::trace!("{:?} upload is abandoned", self.id);
        }
        self.flags.remove(Flags::BLOCKED);
    }

    /// Send as much upload data as both windows allow.
    pub(crate) fn pump(
        &mut self,
        session: &mut Window,
        max_frame_size: usize,
        out: &mut Output,
    ) -> Result<Pump, StreamError> {
        self.flags.remove(Flags::BLOCKED);

        loop {
            let upload = match self.upload.as_mut() {
                Some(upload) => upload,
                None => return Ok(Pump::Done),
            };

            let available = upload.source.available();
            if available == 0 {
                if !upload.source.is_finished() {
                    return Ok(Pump::Pending);
                }
                // source got exhausted after the last frame went out
                let end_stream = upload.end_stream;
                self.upload = None;
                if end_stream {
                    let mut data = Data::new(self.id, Bytes::new());
                    data.set_end_stream();
                    out.encode(data.into())
                        .map_err(|_| StreamError::InternalError("cannot encode DATA frame"))?;
                    self.transition(Transition::CloseLocal);
                }
                return Ok(Pump::Done);
            }

            let budget = session.get().min(self.send_window.get());
            if budget <= 0 {
                log::trace!(
                    "{:?} upload is blocked; session={} stream={}",
                    self.id,
                    session,
                    self.send_window
                );
                self.flags.insert(Flags::BLOCKED);
                return Ok(Pump::Blocked);
            }

            let size = available.min(budget as usize).min(max_frame_size);
            let chunk = upload.source.read(size);
            let len = chunk.len() as WindowSize;
            let eof = upload.end_stream
                && upload.source.available() == 0
                && upload.source.is_finished();

            let mut data = Data::new(self.id, chunk);
            if eof {
                data.set_end_stream();
            }
            out.encode(data.into())
                .map_err(|_| StreamError::InternalError("cannot encode DATA frame"))?;

            *session = session.send_data(len);
            self.send_window = self.send_window.send_data(len);

            if eof {
                self.upload = None;
                self.transition(Transition::CloseLocal);
                return Ok(Pump::Done);
            }
        }
    }

    pub(crate) fn handle_data(&mut self, frm: &Data) -> Result<RecvData, StreamError> {
        match self.state {
            StreamState::Open | StreamState::HalfClosedLocal => (),
            StreamState::Closed if self.reset_code.is_some() => {
                log::trace!("{:?} is reset, ignore DATA", self.id);
                return Ok(RecvData::Ignored);
            }
            StreamState::HalfClosedRemote | StreamState::Closed => {
                return Err(StreamError::StreamClosed)
            }
            StreamState::Idle | StreamState::ReservedRemote => {
                proto_err!(stream: "DATA on {:?} in {:?} state", self.id, self.state);
                return Err(StreamError::UnexpectedDataFrame);
            }
        }

        if self.recv_flow.consume(frm.flow_len()).is_err() {
            return Err(StreamError::FlowControlViolation);
        }

        if !frm.payload().is_empty() {
            self.download.push(frm.payload().clone());
        }

        let eof = frm.is_end_stream();
        if eof {
            self.transition(Transition::CloseRemote);
        }
        Ok(RecvData::Accepted {
            update: !eof && self.recv_flow.is_update_needed(),
        })
    }

    /// Stream accepts a header block from the peer
    pub(crate) fn can_recv_headers(&self) -> bool {
        matches!(
            self.state,
            StreamState::Open | StreamState::HalfClosedLocal | StreamState::ReservedRemote
        )
    }

    pub(crate) fn handle_headers(&mut self, headers: Vec<Header>, eof: bool) {
        match self.state {
            StreamState::Idle => {
                self.transition(Transition::Open);
            }
            StreamState::ReservedRemote => {
                self.transition(Transition::CloseLocal);
            }
            _ => (),
        }
        self.headers.extend(headers);

        if eof {
            self.transition(Transition::CloseRemote);
        }
    }

    /// Returns true if the stream was active.
    pub(crate) fn handle_rst_stream(&mut self, reason: Reason) -> bool {
        let active = self.is_active();
        self.transition(Transition::Reset);
        self.reset_code.get_or_insert(reason);
        self.abandon_upload();
        active
    }

    /// Returns true if a pending upload can make progress.
    pub(crate) fn handle_window_update(&mut self, inc: WindowSize) -> Result<bool, StreamError> {
        if inc == 0 {
            proto_err!(stream: "zero WINDOW_UPDATE for {:?}", self.id);
            return Err(StreamError::ZeroWindowUpdate);
        }
        self.send_window = self
            .send_window
            .inc(inc)
            .map_err(|_| StreamError::WindowOverflow)?;
        Ok(self.upload.is_some())
    }

    /// Apply a changed `INITIAL_WINDOW_SIZE`.
    ///
    /// Returns true if a pending upload can make progress.
    pub(crate) fn apply_initial_window(
        &mut self,
        old: WindowSize,
        new: WindowSize,
    ) -> Result<bool, StreamError> {
        self.send_window = self
            .send_window
            .apply_delta(old, new)
            .map_err(|_| StreamError::InitialWindowOverflow)?;
        Ok(new > old && self.upload.is_some())
    }

    /// Increment for a stream WINDOW_UPDATE, if the window needs one
    pub(crate) fn take_window_update(&mut self) -> Option<WindowSize> {
        if matches!(self.state, StreamState::Open | StreamState::HalfClosedLocal)
            && self.recv_flow.is_update_needed()
        {
            self.recv_flow.take_update()
        } else {
            None
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("stream_id", &self.id)
            .field("state", &self.state)
            .field("flags", &self.flags)
            .field("send_window", &self.send_window)
            .field("recv_window", &self.recv_flow.window())
            .field("reset_code", &self.reset_code)
            .field("upload", &self.upload.is_some())
            .finish()
    }
}
