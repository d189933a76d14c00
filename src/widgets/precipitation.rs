//! Bar chart of the probability of precipitation for the next hours.

use super::{Widget, WidgetContext, WidgetKind};
use crate::surface::{Plane, Region, Surfaces};
use embedded_graphics::prelude::Point;

/// Number of hourly slots in the chart.
pub const HOURS: usize = 8;

/// Gap between neighbouring bars.
const BAR_GAP: u32 = 5;

/// What a full-height bar stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrecipitationScale {
    /// Fixed 100 %
    #[default]
    Percent,
    /// Tallest of the plotted values
    ObservedMax,
}

impl PrecipitationScale {
    fn maximum(self, values: &[f32]) -> f32 {
        match self {
            PrecipitationScale::Percent => 100.0,
            PrecipitationScale::ObservedMax => values.iter().copied().fold(0.0, f32::max),
        }
    }
}

/// Bar heights in pixels for `values` (percent) in a chart `height` tall.
pub fn bar_heights(values: &[f32], scale: PrecipitationScale, height: u32) -> Vec<u32> {
    let max = scale.maximum(values);
    values
        .iter()
        .map(|&value| {
            if max <= 0.0 || value <= 0.0 {
                return 0;
            }
            let pixels = (value / max * height as f32).round() as u32;
            pixels.min(height)
        })
        .collect()
}

pub struct HourlyPrecipitationChart {
    pub scale: PrecipitationScale,
}

impl HourlyPrecipitationChart {
    pub fn new(scale: PrecipitationScale) -> Self {
        Self { scale }
    }

    /// Draw bars for `values` (percent). At most [`HOURS`] values are used.
    pub fn draw_values(&self, surfaces: &mut Surfaces, region: Region, values: &[f32]) {
        let values = &values[..values.len().min(HOURS)];
        let slot = region.width / HOURS as u32;
        let bottom = region.bottom();

        let heights = bar_heights(values, self.scale, region.height);
        for (index, height) in heights.into_iter().enumerate() {
            if height == 0 {
                continue;
            }
            let left = region.x + (index as u32 * slot) as i32;
            let right = left + slot.saturating_sub(BAR_GAP) as i32 - 1;
            surfaces.rect(
                Point::new(left, bottom - height as i32),
                Point::new(right, bottom - 1),
                Plane::Black,
                true,
            );
        }

        let end = region.x + (HOURS as u32 * slot) as i32 - 1;
        surfaces.line(region.top_left(), Point::new(end, region.y), Plane::Red, 1);
    }
}

impl Default for HourlyPrecipitationChart {
    fn default() -> Self {
        Self::new(PrecipitationScale::Percent)
    }
}

impl Widget for HourlyPrecipitationChart {
    fn kind(&self) -> WidgetKind {
        WidgetKind::PrecipitationChart
    }

    fn draw(&self, surfaces: &mut Surfaces, ctx: &WidgetContext<'_>, region: Region) {
        let Some(weather) = ctx.weather else {
            return;
        };
        self.draw_values(surfaces, region, &weather.hourly_pop_percent(HOURS));
    }
}
