use crate::frame::WindowSize;
use crate::window::Window;

/// Receive side flow control.
///
/// Tracks how much the peer may still send and decides when to hand
/// credit back with a `WINDOW_UPDATE`.
#[derive(Copy, Clone, Debug)]
pub(crate) struct FlowControl {
    /// Window the peer knows about.
    window: Window,

    /// Size the window is restored to
    max: WindowSize,
}

impl FlowControl {
    pub(crate) fn new(max: WindowSize) -> FlowControl {
        FlowControl {
            window: Window::new(max as i32),
            max,
        }
    }

    /// Returns the window size as known by the peer
    pub(crate) fn window(&self) -> Window {
        self.window
    }

    pub(crate) fn max(&self) -> WindowSize {
        self.max
    }

    /// Account for received DATA.
    ///
    /// Fails without touching the window if `sz` exceeds it.
    pub(crate) fn consume(&mut self, sz: WindowSize) -> Result<(), ()> {
        if i64::from(sz) > i64::from(self.window.get()) {
            log::trace!(
                "flow control violation; sz={}; window={}",
                sz,
                self.window
            );
            return Err(());
        }
        // cannot fail, sz is within the window
        self.window = self.window.dec(sz).map_err(|_| ())?;
        Ok(())
    }

    /// Returns true once less than half of the window is left.
    pub(crate) fn is_update_needed(&self) -> bool {
        i64::from(self.window.get()) < i64::from(self.max / 2)
    }

    /// If a `WINDOW_UPDATE` frame should be sent, returns the increment
    /// that restores the window to its maximum and applies it.
    ///
    /// This represents pending outbound `WINDOW_UPDATE` frames.
    pub(crate) fn take_update(&mut self) -> Option<WindowSize> {
        let unclaimed = i64::from(self.max) - i64::from(self.window.get());
        if unclaimed <= 0 {
            return None;
        }

        let inc = unclaimed as WindowSize;
        match self.window.inc(inc) {
            Ok(window) => {
                self.window = window;
                Some(inc)
            }
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_after_half_consumed() {
        let mut flow = FlowControl::new(100);
        flow.consume(40).unwrap();
        assert!(!flow.is_update_needed());

        flow.consume(20).unwrap();
        assert!(flow.is_update_needed());
        assert_eq!(flow.take_update(), Some(60));
        assert_eq!(flow.window().get(), 100);
        assert_eq!(flow.take_update(), None);
    }

    #[test]
    fn consume_over_window() {
        let mut flow = FlowControl::new(100);
        assert!(flow.consume(101).is_err());
        assert_eq!(flow.window().get(), 100);
        flow.consume(100).unwrap();
        assert!(flow.consume(1).is_err());
    }
}
