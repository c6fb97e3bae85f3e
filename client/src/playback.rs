use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;

use crate::coordinator::{LoadRequest, LoadSink};
use crate::timeline::YearCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
}

/// Autoplay: advances the cursor one year per interval and asks the sink to
/// load each new year.
///
/// Ticks are timer driven and never wait for the load they triggered; the
/// sink is responsible for serializing loads. Emitting the upper bound ends
/// the session.
pub struct PlaybackScheduler {
    interval: Duration,
    task: Rc<RefCell<Option<JoinHandle<()>>>>,
    state: Rc<watch::Sender<PlaybackState>>,
}

impl PlaybackScheduler {
    pub fn new(interval: Duration) -> Self {
        let (state, _) = watch::channel(PlaybackState::Idle);
        Self {
            interval,
            task: Rc::new(RefCell::new(None)),
            state: Rc::new(state),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    /// Begin a session. Returns false (and changes nothing) when already
    /// playing or when the cursor is at its upper bound.
    pub fn start(&self, cursor: YearCursor, sink: impl LoadSink + 'static) -> bool {
        if self.is_playing() {
            return false;
        }
        if cursor.current() >= cursor.max() {
            info!(year = cursor.current(), "playback not started, already at last year");
            return false;
        }

        let period = self.interval;
        let slot = Rc::clone(&self.task);
        let state = Rc::clone(&self.state);
        info!(
            from = cursor.current(),
            to = cursor.max(),
            interval_ms = period.as_millis() as u64,
            "playback started"
        );

        let handle = tokio::task::spawn_local(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(year) = cursor.step_forward() else {
                    break;
                };
                sink.request_load(LoadRequest {
                    year,
                    do_fit: false,
                });
                if year >= cursor.max() {
                    break;
                }
            }

            slot.borrow_mut().take();
            state.send_replace(PlaybackState::Idle);
            info!(year = cursor.current(), "playback reached the last year");
        });

        *self.task.borrow_mut() = Some(handle);
        self.state.send_replace(PlaybackState::Playing);
        true
    }

    /// End the session now. Future ticks are cancelled; loads already handed
    /// to the sink are not. Returns whether a session was running.
    pub fn stop(&self) -> bool {
        let task = self.task.borrow_mut().take();
        let Some(handle) = task else {
            return false;
        };
        handle.abort();
        self.state.send_replace(PlaybackState::Idle);
        info!("playback stopped");
        true
    }

    pub fn toggle(&self, cursor: YearCursor, sink: impl LoadSink + 'static) -> PlaybackState {
        if self.is_playing() {
            self.stop();
        } else {
            self.start(cursor, sink);
        }
        self.state()
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.task.borrow_mut().take() {
            handle.abort();
        }
    }
}
