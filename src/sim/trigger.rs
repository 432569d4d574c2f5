//! Awaitable simulation triggers.
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::kernel::{SimHandle, Wait, WaitId};

/// A future resolving once its wait condition has been met on the simulated timeline.
///
/// The wait is registered with the scheduler on the first poll, so a trigger only observes events
/// happening after the task awaiting it suspended.
#[derive(Debug)]
#[must_use = "triggers do nothing unless awaited"]
pub struct Trigger {
    handle: SimHandle,
    wait: Wait,
    token: Option<WaitId>,
}

impl Trigger {
    pub(crate) fn new(handle: SimHandle, wait: Wait) -> Self {
        Trigger { handle, wait, token: None }
    }
}

impl Future for Trigger {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        match self.token {
            None => {
                let token = self.handle.register(self.wait);
                self.token = Some(token);
                Poll::Pending
            }
            Some(token) => {
                if self.handle.take_fired(token) {
                    Poll::Ready(())
                } else {
                    Poll::Pending
                }
            }
        }
    }
}
