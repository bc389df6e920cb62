use std::{
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{VisitGateError, controller::state::ControllerState};

/// Handle to the background expire/compact thread.
///
/// The thread only holds a weak reference to the controller state, so it winds
/// down by itself once the controller is dropped.
pub(crate) struct Sweeper {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    pub fn spawn(state: Weak<ControllerState>, interval: Duration) -> Result<Self, VisitGateError> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("visitgate-sweeper".to_string())
            .spawn(move || run_loop(state, interval, thread_stop))?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    } // end method spawn

    /// Ask the thread to exit at its next wakeup. Idempotent.
    pub fn stop(&self) {
        if self.stop.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(handle) = &self.handle {
            handle.thread().unpark();
        }
    } // end method stop

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
} // end impl Sweeper

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
        // Detach; the thread observes the flag or the dead weak reference.
        self.handle.take();
    }
}

fn run_loop(state: Weak<ControllerState>, interval: Duration, stop: Arc<AtomicBool>) {
    let Some(mut next_tick) = Instant::now().checked_add(interval) else {
        tracing::warn!(interval = ?interval, "sweep interval out of range, sweeper not started");
        return;
    };

    loop {
        loop {
            if stop.load(Ordering::Acquire) {
                return;
            }

            let now = Instant::now();
            if now >= next_tick {
                break;
            }

            thread::park_timeout(next_tick - now);
        }

        let Some(state) = state.upgrade() else {
            return;
        };

        state.sweep();
        drop(state);

        // Ticks missed while sweeping are dropped, not replayed.
        let now = Instant::now();
        next_tick = match next_tick.checked_add(interval) {
            Some(tick) if tick > now => tick,
            tick => {
                if let Some(tick) = tick {
                    let skipped =
                        now.duration_since(tick).as_nanos() / interval.as_nanos().max(1) + 1;
                    tracing::trace!(
                        skipped = skipped as u64,
                        "sweep overran its interval, skipping ticks"
                    );
                }

                let Some(tick) = now.checked_add(interval) else {
                    tracing::warn!(
                        interval = ?interval,
                        "sweep interval out of range, sweeper stopped"
                    );
                    return;
                };
                tick
            }
        };
    }
} // end fn run_loop
