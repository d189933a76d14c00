//! # Widgets
//!
//! Every visual element on the panel implements [`Widget`]: given the two
//! planes, a read-only [`WidgetContext`] and the [`Region`] it owns, it draws
//! itself. Widgets never allocate surfaces, never talk to the panel and never
//! fail; missing data means drawing less.
//!
//! - Clock faces ([`clock`]) read the wall clock, and expose `draw_at` for a
//!   fixed instant.
//! - Weather widgets ([`weather`], [`precipitation`], [`wind`]) draw nothing
//!   when no snapshot has arrived yet.

pub mod clock;
pub mod precipitation;
pub mod sun;
pub mod weather;
pub mod wind;

pub use clock::{AnalogClock, CurrentDate, DigitalClock, SecondaryTimezoneClock};
pub use precipitation::{HourlyPrecipitationChart, PrecipitationScale};
pub use sun::SunTimes;
pub use weather::{CurrentWeatherDetail, CurrentWeatherSummary};
pub use wind::WindIndicator;

use crate::config::Settings;
use crate::resources::{Icon, Resources};
use crate::surface::{Region, Surfaces};
use crate::weather_data::WeatherSnapshot;
use log::warn;
use std::sync::Arc;

/// Identifies a widget in a layout without drawing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    AnalogClock,
    DigitalClock,
    CurrentDate,
    SecondaryTimezone,
    SunTimes,
    WeatherSummary,
    WeatherDetail,
    PrecipitationChart,
    Wind,
}

/// Read-only inputs shared by all widgets during one render pass.
#[derive(Clone, Copy)]
pub struct WidgetContext<'a> {
    pub settings: &'a Settings,
    pub resources: &'a Resources,
    /// Latest forecast, if any poll has succeeded yet
    pub weather: Option<&'a WeatherSnapshot>,
}

pub trait Widget: Send + Sync {
    fn kind(&self) -> WidgetKind;

    fn draw(&self, surfaces: &mut Surfaces, ctx: &WidgetContext<'_>, region: Region);
}

/// Fetch an icon, logging and returning `None` when the asset is missing so
/// the caller can carry on without it.
pub(crate) fn icon_or_warn(resources: &Resources, name: &str) -> Option<Arc<Icon>> {
    match resources.icon(name) {
        Ok(icon) => Some(icon),
        Err(e) => {
            warn!("Skipping icon: {}", e);
            None
        }
    }
}

/// Icon for an OpenWeatherMap condition code such as `10d`.
pub(crate) fn weather_icon(resources: &Resources, code: &str) -> Option<Arc<Icon>> {
    icon_or_warn(resources, &format!("weather/{code}"))
}

/// Temperature with a degree sign, one decimal.
pub(crate) fn format_temperature(value: f32) -> String {
    format!("{value:.1}°")
}
