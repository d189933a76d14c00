//! # Display
//!
//! Owns the panel and enforces the refresh cooldown. A full e-paper refresh
//! takes around 15 s and must not be interrupted, so [`Display::show`]
//! drops any request that arrives within [`REFRESH_COOLDOWN`] of the last
//! refresh it issued. The cooldown check and the hardware write happen under
//! one lock: two callers (periodic redraw and a button) can never both write.
//!
//! Each refresh is a scoped driver sequence: `init` → `display` → `sleep`.
//! `sleep` always runs, even when an earlier step failed, so the panel is
//! never left powered.

use crate::surface::Surfaces;
use log::{debug, info, warn};
use std::error::Error as StdError;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Minimum time between two refreshes.
pub const REFRESH_COOLDOWN: Duration = Duration::from_secs(25);

/// Physical e-paper panel.
pub trait Panel: Send {
    type Error: StdError + Send + Sync + 'static;

    /// Wake up and configure the controller.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Upload both planes and refresh. Buffers are physical rows, cleared
    /// bit = ink.
    fn display(&mut self, black: &[u8], red: &[u8]) -> Result<(), Self::Error>;

    /// Deep sleep until the next `init`.
    fn sleep(&mut self) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("panel error: {0}")]
    Panel(#[source] Box<dyn StdError + Send + Sync>),

    /// The blocking render/refresh task panicked or was cancelled
    #[error("refresh task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl DisplayError {
    fn panel<E: StdError + Send + Sync + 'static>(e: E) -> Self {
        DisplayError::Panel(Box::new(e))
    }
}

/// What happened to a [`Display::show`] request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Shown,
    /// Inside the cooldown window; nothing was written.
    Skipped,
}

struct DisplayState<P> {
    panel: P,
    last_refresh: Option<Instant>,
}

pub struct Display<P: Panel> {
    state: Mutex<DisplayState<P>>,
    cooldown: Duration,
}

impl<P: Panel> Display<P> {
    pub fn new(panel: P) -> Self {
        Self::with_cooldown(panel, REFRESH_COOLDOWN)
    }

    pub fn with_cooldown(panel: P, cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(DisplayState {
                panel,
                last_refresh: None,
            }),
            cooldown,
        }
    }

    /// Push a frame to the panel unless a refresh was issued less than the
    /// cooldown ago. Blocks for the duration of the refresh.
    pub fn show(&self, surfaces: &Surfaces) -> Result<RefreshOutcome, DisplayError> {
        self.show_at(surfaces, Instant::now())
    }

    /// [`Display::show`] with an explicit "now".
    pub fn show_at(
        &self,
        surfaces: &Surfaces,
        now: Instant,
    ) -> Result<RefreshOutcome, DisplayError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(last) = state.last_refresh {
            if now.saturating_duration_since(last) < self.cooldown {
                info!("refresh in progress, skipped");
                return Ok(RefreshOutcome::Skipped);
            }
        }
        state.last_refresh = Some(now);

        let frame = surfaces.panel_frame();
        debug!("Refreshing panel ({}x{})", frame.width, frame.height);

        let panel = &mut state.panel;
        let written = panel
            .init()
            .and_then(|()| panel.display(&frame.black, &frame.red));
        let slept = panel.sleep();

        written.map_err(DisplayError::panel)?;
        if let Err(e) = slept {
            warn!("Panel did not go to sleep: {}", e);
            return Err(DisplayError::panel(e));
        }
        Ok(RefreshOutcome::Shown)
    }
}
