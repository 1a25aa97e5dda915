//! The recurring timer owned by the time-since mode's activation.  Exactly
//! one exists while the mode is active; the mode's exit hook must cancel it.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};

/// Event emitted on every period so visible elapsed-time text can be
/// recomputed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TickEvent;

pub struct Ticker {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

impl Ticker {
    pub const PERIOD: Duration = Duration::from_secs(1);

    pub fn start(period: Duration, events: Sender<TickEvent>) -> Self {
        let (stop_send, stop_recv) = bounded(1);
        let thread = thread::spawn(move || {
            let ticks = tick(period);
            loop {
                select! {
                    recv(ticks) -> _ => {
                        if events.send(TickEvent).is_err() {
                            break;
                        }
                    }
                    recv(stop_recv) -> _ => break,
                }
            }
        });
        Self {
            stop: stop_send,
            thread,
        }
    }

    /// Stops the timer and waits for its thread to exit.  No ticks are
    /// emitted after this returns.
    pub fn cancel(self) {
        let _ = self.stop.send(());
        let _ = self.thread.join();
    }
}
