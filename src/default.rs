use crate::control::{Control, Observer};
use crate::message::Message;

/// Default observer, logs events and drops them
#[derive(Debug, Default, Copy, Clone)]
pub struct DefaultObserver;

impl Observer for DefaultObserver {
    fn control(&mut self, msg: Control) {
        log::trace!("Default observer is used: {:?}", msg);
    }

    fn message(&mut self, msg: Message) {
        log::trace!("Default observer is used: {:?}", msg);
    }
}
