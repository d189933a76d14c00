//! Current conditions: the compact summary under the clock and the
//! full-panel detail view shown as an overlay.

use super::{
    format_temperature, weather_icon, HourlyPrecipitationChart, Widget, WidgetContext, WidgetKind,
    WindIndicator,
};
use crate::resources::{LARGER_FONT, MED_FONT, TINY_FONT};
use crate::surface::{Plane, Region, Surfaces};
use embedded_graphics::prelude::Point;

/// Width of the wind column on the right of the summary.
const WIND_WIDTH: u32 = 65;
/// Height of the precipitation strip along the bottom of the summary.
const CHART_HEIGHT: u32 = 15;

/// Icon, temperature and description, with the precipitation chart along
/// the bottom and the wind indicator on the right.
pub struct CurrentWeatherSummary;

impl CurrentWeatherSummary {
    pub fn chart_region(region: Region) -> Region {
        Region::new(
            region.x,
            region.bottom() - CHART_HEIGHT as i32,
            region.width.saturating_sub(WIND_WIDTH),
            CHART_HEIGHT,
        )
    }

    pub fn wind_region(region: Region) -> Region {
        Region::new(
            region.right() - WIND_WIDTH as i32,
            region.y,
            WIND_WIDTH,
            region.height,
        )
    }
}

impl Widget for CurrentWeatherSummary {
    fn kind(&self) -> WidgetKind {
        WidgetKind::WeatherSummary
    }

    fn draw(&self, surfaces: &mut Surfaces, ctx: &WidgetContext<'_>, region: Region) {
        let Some(weather) = ctx.weather else {
            return;
        };
        let current = &weather.current;
        let pos = Point::new(region.x + 5, region.y);

        if let Some(condition) = current.condition() {
            if let Some(icon) = weather_icon(ctx.resources, &condition.icon) {
                surfaces.image(pos, &icon, Plane::Red);
            }
            surfaces.text(
                pos + Point::new(70, 22),
                &condition.description,
                TINY_FONT,
                Plane::Black,
            );
        }
        surfaces.text(
            pos + Point::new(70, -5),
            &format_temperature(current.temperature),
            LARGER_FONT,
            Plane::Black,
        );

        HourlyPrecipitationChart::default().draw(surfaces, ctx, Self::chart_region(region));
        WindIndicator.draw(surfaces, ctx, Self::wind_region(region));
    }
}

/// Full-panel view of the current conditions.
pub struct CurrentWeatherDetail;

impl Widget for CurrentWeatherDetail {
    fn kind(&self) -> WidgetKind {
        WidgetKind::WeatherDetail
    }

    fn draw(&self, surfaces: &mut Surfaces, ctx: &WidgetContext<'_>, region: Region) {
        let Some(weather) = ctx.weather else {
            return;
        };
        let current = &weather.current;
        let half = region.width / 2;
        let at = |x: i32, y: i32| Point::new(region.x + x, region.y + y);

        if let Some(condition) = current.condition() {
            if let Some(icon) = weather_icon(ctx.resources, &condition.icon) {
                surfaces.image_centered(region.top_left(), half, &icon, Plane::Red);
            }
            surfaces.text(at(3, 50), &condition.description, MED_FONT, Plane::Black);
        }

        surfaces.text(
            at(half as i32, 0),
            &format_temperature(current.temperature),
            LARGER_FONT,
            Plane::Black,
        );
        if let Some(feels_like) = current.feels_like {
            surfaces.text(
                at(half as i32, 25),
                &format_temperature(feels_like),
                LARGER_FONT,
                Plane::Red,
            );
        }

        let mut lines = vec![
            format!("Humidity: {}%", current.humidity),
            format!("Pressure: {}hPa", current.pressure),
        ];
        if let Some(uvi) = current.uvi {
            lines.push(format!("UV Index: {}", uvi));
        }
        if let Some(today) = weather.today() {
            if let (Some(min), Some(max)) = (today.temperatures.min, today.temperatures.max) {
                lines.push(format!(
                    "Min {} Max {}",
                    format_temperature(min),
                    format_temperature(max)
                ));
            }
        }
        for (row, line) in lines.iter().enumerate() {
            surfaces.text(at(3, 80 + 20 * row as i32), line, MED_FONT, Plane::Black);
        }

        if let Some(alert) = weather
            .alerts
            .iter()
            .find(|alert| alert.is_active(current.time))
        {
            surfaces.text(at(3, 160), &alert.event, TINY_FONT, Plane::Red);
        }
    }
}
