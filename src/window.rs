use std::fmt;

use crate::consts::MAX_WINDOW_SIZE;
use crate::frame::WindowSize;

/// Signed flow-control window.
///
/// This can go negative if a `SETTINGS_INITIAL_WINDOW_SIZE` is received.
///
/// For example, say the peer sends a request and uses 32kb of the window.
/// We send a `SETTINGS_INITIAL_WINDOW_SIZE` of 16kb. The peer has to adjust
/// its understanding of the capacity of the window, and that would be:
///
/// ```notrust
/// default (64kb) - used (32kb) - settings_diff (64kb - 16kb): -16kb
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Window(i32);

/// Window would leave the `[-2^31, 2^31 - 1]` range
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct WindowOverflow;

impl Window {
    pub(crate) const fn new(sz: i32) -> Window {
        Window(sz)
    }

    /// Raw signed value.
    pub(crate) const fn get(self) -> i32 {
        self.0
    }

    /// Returns the window size as known by the peer
    pub(crate) const fn window_size(self) -> WindowSize {
        if self.0 < 0 {
            0
        } else {
            self.0 as WindowSize
        }
    }

    /// Increase the window size.
    ///
    /// This is called after receiving a `WINDOW_UPDATE` frame or a larger
    /// `INITIAL_WINDOW_SIZE`. The result must stay at or below 2^31-1.
    pub(crate) fn inc(self, sz: WindowSize) -> Result<Self, WindowOverflow> {
        if sz > MAX_WINDOW_SIZE {
            return Err(WindowOverflow);
        }
        let (val, overflow) = self.0.overflowing_add(sz as i32);

        if overflow {
            return Err(WindowOverflow);
        }

        log::trace!("inc_window; sz={}; old={}; new={}", sz, self.0, val);

        Ok(Window(val))
    }

    /// Decrement the window size.
    ///
    /// This is called after sending or receiving DATA, or after a `SETTINGS`
    /// frame with a lower `INITIAL_WINDOW_SIZE` value.
    pub(crate) fn dec(self, sz: WindowSize) -> Result<Self, WindowOverflow> {
        if sz > MAX_WINDOW_SIZE {
            return Err(WindowOverflow);
        }
        let (val, overflow) = self.0.overflowing_sub(sz as i32);

        if overflow {
            return Err(WindowOverflow);
        }

        log::trace!("dec_window; sz={}; old={}; new={}", sz, self.0, val);

        Ok(Window(val))
    }

    /// Account for sent DATA, callers never send more than the window allows.
    pub(crate) fn send_data(self, sz: WindowSize) -> Window {
        assert!(
            i64::from(sz) <= i64::from(self.0),
            "window exhausted; sz={} window={}",
            sz,
            self.0
        );
        Window(self.0 - sz as i32)
    }

    /// Apply the difference between two `INITIAL_WINDOW_SIZE` values.
    pub(crate) fn apply_delta(self, old: WindowSize, new: WindowSize) -> Result<Self, WindowOverflow> {
        if new >= old {
            self.inc(new - old)
        } else {
            self.dec(old - new)
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
