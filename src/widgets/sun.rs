//! Sunrise and sunset times, each an icon + time pair in half the region.

use super::{icon_or_warn, Widget, WidgetContext, WidgetKind};
use crate::resources::TINY_FONT;
use crate::solar::sun_times;
use crate::surface::{Plane, Region, Surfaces};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use embedded_graphics::prelude::Point;
use std::fmt::Display;

/// Shown when the sun does not rise or set that day.
pub const NO_EVENT: &str = "--:--";

/// Event time in `tz`, or [`NO_EVENT`].
pub fn format_event<Tz>(event: Option<DateTime<Utc>>, tz: &Tz, pattern: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match event {
        Some(instant) => instant.with_timezone(tz).format(pattern).to_string(),
        None => NO_EVENT.to_string(),
    }
}

pub struct SunTimes;

impl SunTimes {
    /// Draw the events of `date` as seen in `tz`.
    pub fn draw_at<Tz>(
        &self,
        surfaces: &mut Surfaces,
        ctx: &WidgetContext<'_>,
        region: Region,
        date: NaiveDate,
        tz: &Tz,
    ) where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let position = ctx.settings.position;
        let times = sun_times(position.lat, position.lon, date);
        let pattern = ctx.settings.time_format.pattern();
        let half = region.width / 2;

        let pairs = [
            ("sunrise", times.sunrise, region.x),
            ("sunset", times.sunset, region.x + half as i32),
        ];
        for (icon_name, event, x) in pairs {
            let icon = icon_or_warn(ctx.resources, icon_name);
            surfaces.icon_text_centered(
                Point::new(x, region.y),
                half,
                icon.as_deref(),
                &format_event(event, tz, pattern),
                TINY_FONT,
                Plane::Red,
                Plane::Black,
            );
        }
    }
}

impl Widget for SunTimes {
    fn kind(&self) -> WidgetKind {
        WidgetKind::SunTimes
    }

    fn draw(&self, surfaces: &mut Surfaces, ctx: &WidgetContext<'_>, region: Region) {
        self.draw_at(surfaces, ctx, region, Local::now().date_naive(), &Local);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Position, Settings};
    use crate::resources::Resources;
    use crate::widgets::tests::test_resources;
    use chrono_tz::America::Toronto;

    fn toronto_settings() -> Settings {
        Settings {
            position: Position {
                lat: 43.6532,
                lon: -79.3832,
            },
            ..Settings::default()
        }
    }

    #[test]
    fn test_format_event() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let times = sun_times(43.6532, -79.3832, date);
        let rise = format_event(times.sunrise, &Toronto, "%H:%M");
        assert!(
            rise.starts_with("05:3") || rise.starts_with("05:4"),
            "sunrise {}",
            rise
        );
        let set = format_event(times.sunset, &Toronto, "%I:%M");
        assert!(
            set.starts_with("09:0") || set.starts_with("08:5"),
            "sunset {}",
            set
        );
        assert_eq!(format_event(None, &Toronto, "%H:%M"), "--:--");
    }

    #[test]
    fn test_draws_icons_red_and_times_black() {
        let settings = toronto_settings();
        let resources = test_resources();
        let ctx = WidgetContext {
            settings: &settings,
            resources: &resources,
            weather: None,
        };
        let region = Region::new(95, 30, 169, 20);
        let mut surfaces = Surfaces::for_panel();
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        SunTimes.draw_at(&mut surfaces, &ctx, region, date, &Toronto);

        let red = surfaces.plane(Plane::Red);
        let left = Region::new(95, 30, 84, 20);
        let right = Region::new(179, 30, 85, 20);
        assert!(red.ink_in(left) > 0);
        assert!(red.ink_in(right) > 0);
        assert!(surfaces.plane(Plane::Black).ink_in(left) > 0);
        assert!(surfaces.plane(Plane::Black).ink_in(right) > 0);
    }

    #[test]
    fn test_polar_night_and_missing_icons() {
        let settings = Settings {
            position: Position {
                lat: 78.22,
                lon: 15.65,
            },
            ..Settings::default()
        };
        let resources = Resources::new("/nonexistent");
        let ctx = WidgetContext {
            settings: &settings,
            resources: &resources,
            weather: None,
        };
        let region = Region::new(0, 72, 264, 25);
        let date = NaiveDate::from_ymd_opt(2024, 12, 21).unwrap();

        let mut surfaces = Surfaces::for_panel();
        SunTimes.draw_at(&mut surfaces, &ctx, region, date, &Utc);

        // no icons on disk: text only, each "--:--" centred in its half
        assert_eq!(surfaces.plane(Plane::Red).ink_count(), 0);
        let mut expected = Surfaces::for_panel();
        for left in [0, 132] {
            expected.icon_text_centered(
                Point::new(left, 72),
                132,
                None,
                NO_EVENT,
                TINY_FONT,
                Plane::Red,
                Plane::Black,
            );
        }
        assert_eq!(surfaces.plane(Plane::Black), expected.plane(Plane::Black));
    }
}
