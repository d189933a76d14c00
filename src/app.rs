//! # Controller
//!
//! Wires everything together: the weather snapshot cell, the mode state
//! machine, the periodic tasks and the button actions.
//!
//! ## Tasks
//! - **display refresh**: aligned to the next full minute (digital face) or
//!   the next five minutes (analog face). Between analog refreshes the panel
//!   keeps the last frame, so the `HH:MM` label under the dial can lag the
//!   wall clock by up to four minutes; it is exact at each refresh.
//! - **weather poll**: every 15 minutes, only when an API key is configured
//!
//! ## Snapshot cell
//! The poll task is the single writer of a `watch` channel holding
//! `Option<Arc<WeatherSnapshot>>`. A render pass clones the `Arc` once and
//! reads it for the whole frame, so a poll finishing mid-render never tears
//! a frame.
//!
//! ## Redraw triggers
//! Besides the periodic refresh, the run loop redraws on every mode change,
//! every new snapshot and the "refresh" button. The display's cooldown
//! decides which of these actually reach the panel.

use crate::config::{ClockFace, Position, Settings, Units};
use crate::display::{Display, DisplayError, Panel, RefreshOutcome};
use crate::layout::Layout;
use crate::mode::{DisplayMode, ModeController};
use crate::resources::Resources;
use crate::scheduler::{Cadence, Scheduler};
use crate::surface::Surfaces;
use crate::weather_data::{OpenWeatherMap, WeatherError, WeatherSnapshot};
use crate::widgets::WidgetContext;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Weather poll period.
pub const WEATHER_POLL: Duration = Duration::from_secs(15 * 60);

pub const REFRESH_TASK: &str = "display refresh";
pub const WEATHER_TASK: &str = "weather poll";

/// Shared snapshot cell type.
pub type SnapshotCell = watch::Sender<Option<Arc<WeatherSnapshot>>>;

/// What a HAT key asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    ShowDetail,
    ShowDefault,
    Refresh,
}

impl ButtonAction {
    /// Action bound to key `index` (0 = top key). The fourth key is unbound.
    pub fn for_key(index: usize) -> Option<Self> {
        match index {
            0 => Some(ButtonAction::ShowDetail),
            1 => Some(ButtonAction::ShowDefault),
            2 => Some(ButtonAction::Refresh),
            _ => None,
        }
    }
}

/// Redraw period for a clock face.
pub fn refresh_cadence(face: ClockFace) -> Cadence {
    match face {
        ClockFace::Digital => Cadence::Aligned(Duration::from_secs(60)),
        ClockFace::Analog => Cadence::Aligned(Duration::from_secs(300)),
    }
}

/// One weather poll. A successful fetch replaces the snapshot; a failed one
/// is logged and the previous snapshot stays in place until the next cycle.
pub async fn poll_once(
    client: &OpenWeatherMap,
    snapshots: &SnapshotCell,
    position: Position,
    units: Units,
) {
    match client.fetch(position, units).await {
        Ok(snapshot) => {
            info!(
                "Weather updated: {:.1}°, {} hourly points",
                snapshot.current.temperature,
                snapshot.hourly.len()
            );
            snapshots.send_replace(Some(Arc::new(snapshot)));
        }
        Err(e) => error!("Weather poll failed: {}", e),
    }
}

/// Everything a render pass needs. Cheap to clone into tasks.
pub struct Renderer<P: Panel> {
    settings: Arc<Settings>,
    resources: Arc<Resources>,
    layout: Arc<Layout>,
    display: Arc<Display<P>>,
    modes: ModeController,
    weather: watch::Receiver<Option<Arc<WeatherSnapshot>>>,
}

impl<P: Panel> Clone for Renderer<P> {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            resources: Arc::clone(&self.resources),
            layout: Arc::clone(&self.layout),
            display: Arc::clone(&self.display),
            modes: self.modes.clone(),
            weather: self.weather.clone(),
        }
    }
}

impl<P: Panel + 'static> Renderer<P> {
    /// Latest snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<WeatherSnapshot>> {
        self.weather.borrow().clone()
    }

    /// Draw a complete frame for `mode`.
    pub fn render(&self, mode: DisplayMode) -> Surfaces {
        let snapshot = self.snapshot();
        let ctx = WidgetContext {
            settings: &self.settings,
            resources: &self.resources,
            weather: snapshot.as_deref(),
        };
        self.layout.compose(mode, &ctx)
    }

    /// Render the current mode and push it to the panel off the async
    /// threads.
    pub async fn refresh(&self) -> Result<RefreshOutcome, DisplayError> {
        let renderer = self.clone();
        let mode = self.modes.current();
        tokio::task::spawn_blocking(move || {
            let surfaces = renderer.render(mode);
            renderer.display.show(&surfaces)
        })
        .await?
    }

    /// [`Renderer::refresh`], logging instead of returning the result.
    pub async fn refresh_logged(&self) {
        match self.refresh().await {
            Ok(RefreshOutcome::Shown) => info!("Display refreshed"),
            Ok(RefreshOutcome::Skipped) => debug!("Display refresh skipped"),
            Err(e) => error!("Display refresh failed: {}", e),
        }
    }
}

pub struct App<P: Panel> {
    renderer: Renderer<P>,
    snapshots: Arc<SnapshotCell>,
    weather_client: Option<Arc<OpenWeatherMap>>,
    scheduler: Scheduler,
}

impl<P: Panel + 'static> App<P> {
    pub fn new(settings: Settings, panel: P) -> Result<Self, WeatherError> {
        let weather_client = if settings.weather_enabled() {
            Some(Arc::new(OpenWeatherMap::new(settings.api_key.clone())?))
        } else {
            info!("No OpenWeatherMap API key, weather disabled");
            None
        };
        let (snapshots, weather) = watch::channel(None);

        Ok(Self {
            renderer: Renderer {
                resources: Arc::new(Resources::new(settings.data_dir.clone())),
                layout: Arc::new(Layout::new(settings.clock_face)),
                settings: Arc::new(settings),
                display: Arc::new(Display::new(panel)),
                modes: ModeController::new(),
                weather,
            },
            snapshots: Arc::new(snapshots),
            weather_client,
            scheduler: Scheduler::new(),
        })
    }

    pub fn renderer(&self) -> &Renderer<P> {
        &self.renderer
    }

    pub fn modes(&self) -> &ModeController {
        &self.renderer.modes
    }

    pub fn settings(&self) -> &Settings {
        &self.renderer.settings
    }

    /// Replace the current snapshot, as a successful poll does.
    pub fn publish(&self, snapshot: WeatherSnapshot) {
        self.snapshots.send_replace(Some(Arc::new(snapshot)));
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.scheduler.task_names()
    }

    /// Start the periodic refresh and, when enabled, the weather poll.
    pub fn start(&mut self) {
        let renderer = self.renderer.clone();
        self.scheduler.spawn(
            REFRESH_TASK,
            refresh_cadence(self.renderer.settings.clock_face),
            move || {
                let renderer = renderer.clone();
                async move { renderer.refresh_logged().await }
            },
        );

        if let Some(client) = &self.weather_client {
            let client = Arc::clone(client);
            let snapshots = Arc::clone(&self.snapshots);
            let position = self.renderer.settings.position;
            let units = self.renderer.settings.units;
            self.scheduler
                .spawn(WEATHER_TASK, Cadence::Every(WEATHER_POLL), move || {
                    let client = Arc::clone(&client);
                    let snapshots = Arc::clone(&snapshots);
                    async move { poll_once(&client, &snapshots, position, units).await }
                });
        }
    }

    /// React to one key press.
    pub async fn apply(&self, action: ButtonAction) {
        info!("Button: {:?}", action);
        match action {
            ButtonAction::ShowDetail => {
                self.renderer.modes.set_state(DisplayMode::DetailOverlay);
            }
            ButtonAction::ShowDefault => {
                self.renderer.modes.set_state(DisplayMode::Default);
            }
            ButtonAction::Refresh => self.renderer.refresh_logged().await,
        }
    }

    /// Run until Ctrl-C. Redraws on mode changes and new snapshots, applies
    /// button actions, then stops all tasks.
    pub async fn run(mut self, mut buttons: mpsc::UnboundedReceiver<ButtonAction>) {
        self.start();
        let mut modes = self.renderer.modes.subscribe();
        let mut weather = self.renderer.weather.clone();
        let mut buttons_open = true;

        loop {
            tokio::select! {
                changed = modes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let mode = *modes.borrow_and_update();
                    debug!("Mode changed to {:?}, redrawing", mode);
                    self.renderer.refresh_logged().await;
                }
                changed = weather.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    weather.borrow_and_update();
                    self.renderer.refresh_logged().await;
                }
                action = buttons.recv(), if buttons_open => match action {
                    Some(action) => self.apply(action).await,
                    None => {
                        warn!("Button channel closed");
                        buttons_open = false;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, shutting down");
                    break;
                }
            }
        }

        self.scheduler.shutdown().await;
    }

    /// Stop every periodic task.
    pub async fn shutdown(&mut self) {
        self.scheduler.shutdown().await;
    }
}
