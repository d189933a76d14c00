//! Wind arrow, compass point and speed.

use super::{icon_or_warn, Widget, WidgetContext, WidgetKind};
use crate::config::Units;
use crate::resources::TINY_FONT;
use crate::surface::{Plane, Region, Surfaces};
use crate::weather_data::wind_direction_to_compass;
use embedded_graphics::prelude::Point;

/// Speed as shown under the arrow. Metric readings arrive in m/s and are
/// shown in km/h; imperial readings are already mph.
pub fn wind_speed_label(speed: f32, units: Units) -> String {
    match units {
        Units::Metric => format!("{:.1}", speed * 3.6),
        Units::Imperial => format!("{:.1}", speed),
    }
}

pub struct WindIndicator;

impl Widget for WindIndicator {
    fn kind(&self) -> WidgetKind {
        WidgetKind::Wind
    }

    fn draw(&self, surfaces: &mut Surfaces, ctx: &WidgetContext<'_>, region: Region) {
        let Some(weather) = ctx.weather else {
            return;
        };
        let current = &weather.current;

        if let Some(icon) = icon_or_warn(ctx.resources, "weather/wind") {
            let arrow = icon.rotated(current.wind_direction);
            surfaces.image_centered(region.top_left(), region.width, &arrow, Plane::Red);
        }

        let compass = wind_direction_to_compass(current.wind_direction);
        surfaces.text_centered(
            Point::new(region.x, region.y + 30),
            region.width,
            compass,
            TINY_FONT,
            Plane::Black,
        );
        surfaces.text_centered(
            Point::new(region.x, region.y + 50),
            region.width,
            &wind_speed_label(current.wind_speed, ctx.settings.units),
            TINY_FONT,
            Plane::Black,
        );
    }
}
