use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use ntex_bytes::Bytes;

/// Pull based source of upload data.
///
/// The upload pump reads from the source only as far as flow control
/// allows. A source that has nothing ready yet returns `0` from
/// `available()` and the pump is resumed with
/// [`Connection::resume_upload`](crate::Connection::resume_upload).
pub trait DataSource {
    /// Number of bytes that can be read right now
    fn available(&self) -> usize;

    /// Read up to `max` bytes
    fn read(&mut self, max: usize) -> Bytes;

    /// Returns true once no more data is going to become available
    fn is_finished(&self) -> bool;
}

impl DataSource for Bytes {
    fn available(&self) -> usize {
        self.len()
    }

    fn read(&mut self, max: usize) -> Bytes {
        let len = self.len().min(max);
        self.split_to(len)
    }

    fn is_finished(&self) -> bool {
        true
    }
}

/// Shared upload buffer.
///
/// One clone is handed to the connection, the other one is kept by the
/// producer which pushes chunks as they become available.
#[derive(Clone, Debug, Default)]
pub struct UploadBuffer(Rc<RefCell<UploadInner>>);

#[derive(Debug, Default)]
struct UploadInner {
    chunks: VecDeque<Bytes>,
    len: usize,
    finished: bool,
}

impl UploadBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of data
    pub fn push(&self, chunk: Bytes) {
        let mut inner = self.0.borrow_mut();
        debug_assert!(!inner.finished, "push after finish");
        if !chunk.is_empty() {
            inner.len += chunk.len();
            inner.chunks.push_back(chunk);
        }
    }

    /// Mark the end of data
    pub fn finish(&self) {
        self.0.borrow_mut().finished = true;
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.0.borrow().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataSource for UploadBuffer {
    fn available(&self) -> usize {
        self.len()
    }

    fn read(&mut self, max: usize) -> Bytes {
        let mut inner = self.0.borrow_mut();
        let chunk = match inner.chunks.front_mut() {
            Some(chunk) if chunk.len() > max => chunk.split_to(max),
            Some(_) => inner.chunks.pop_front().unwrap_or_default(),
            None => return Bytes::new(),
        };
        inner.len -= chunk.len();
        chunk
    }

    fn is_finished(&self) -> bool {
        self.0.borrow().finished
    }
}
