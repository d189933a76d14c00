//! Display mode state machine.
//!
//! `Default` is the steady state. A button press switches to
//! `DetailOverlay`, which reverts to `Default` on its own after
//! [`OVERLAY_DWELL`]. At most one revert timer exists at a time: every mode
//! change aborts the pending one before (maybe) arming a new one, and a
//! generation counter turns a revert that was already running when it got
//! aborted into a no-op.
//!
//! Changes are published on a `tokio::sync::watch` channel so the controller
//! can redraw on every transition.

use log::{debug, info};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How long the detail overlay stays up.
pub const OVERLAY_DWELL: Duration = Duration::from_secs(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Clock face and weather summary
    #[default]
    Default,
    /// Full-panel weather detail
    DetailOverlay,
}

#[derive(Default)]
struct RevertTimer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

struct Inner {
    mode: watch::Sender<DisplayMode>,
    timer: Mutex<RevertTimer>,
    dwell: Duration,
}

impl Inner {
    fn timer(&self) -> MutexGuard<'_, RevertTimer> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn revert(&self, generation: u64) {
        let mut timer = self.timer();
        if timer.generation != generation {
            debug!("Stale revert timer ignored");
            return;
        }
        timer.handle = None;
        timer.generation += 1;
        info!("Overlay timed out, back to {:?}", DisplayMode::Default);
        self.mode.send_replace(DisplayMode::Default);
    }
}

/// Owns the current [`DisplayMode`] and its revert timer. Cheap to clone;
/// clones share state.
#[derive(Clone)]
pub struct ModeController {
    inner: Arc<Inner>,
}

impl ModeController {
    pub fn new() -> Self {
        Self::with_dwell(OVERLAY_DWELL)
    }

    pub fn with_dwell(dwell: Duration) -> Self {
        let (mode, _) = watch::channel(DisplayMode::Default);
        Self {
            inner: Arc::new(Inner {
                mode,
                timer: Mutex::new(RevertTimer::default()),
                dwell,
            }),
        }
    }

    pub fn current(&self) -> DisplayMode {
        *self.inner.mode.borrow()
    }

    /// Receiver that sees every mode change.
    pub fn subscribe(&self) -> watch::Receiver<DisplayMode> {
        self.inner.mode.subscribe()
    }

    pub fn has_pending_revert(&self) -> bool {
        self.inner.timer().handle.is_some()
    }

    /// Switch to `mode`. Returns `false` (and leaves any timer alone) when
    /// already in that mode. Must be called within a tokio runtime.
    pub fn set_state(&self, mode: DisplayMode) -> bool {
        let mut timer = self.inner.timer();
        let current = self.current();
        if current == mode {
            debug!("Already in {:?}", mode);
            return false;
        }

        if let Some(handle) = timer.handle.take() {
            handle.abort();
        }
        timer.generation += 1;
        info!("Display mode {:?} -> {:?}", current, mode);
        self.inner.mode.send_replace(mode);

        if mode != DisplayMode::Default {
            let generation = timer.generation;
            let inner: Weak<Inner> = Arc::downgrade(&self.inner);
            let dwell = self.inner.dwell;
            timer.handle = Some(tokio::spawn(async move {
                tokio::time::sleep(dwell).await;
                if let Some(inner) = inner.upgrade() {
                    inner.revert(generation);
                }
            }));
        }
        true
    }
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new()
    }
}
