use super::Shared;
use log::{debug, warn};
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Periodic recomputation of the time left before clock-out opens.
///
/// The task only holds a weak reference to the controller state and is
/// aborted when the handle is dropped.
pub(crate) struct Countdown {
    handle: JoinHandle<()>,
}

impl Countdown {
    /// Start ticking every `period`. Returns `None` outside a Tokio runtime.
    pub(crate) fn start(shared: Weak<Shared>, period: Duration) -> Option<Self> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No async runtime available, countdown not started");
                return None;
            }
        };

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match shared.upgrade() {
                    Some(shared) => {
                        shared.tick();
                    }
                    None => break,
                }
            }
            debug!("Countdown task finished");
        });

        Some(Self { handle })
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
