//! Clock faces: analog, digital, the date line and the second-timezone clock.

use super::{Widget, WidgetContext, WidgetKind};
use crate::resources::{Font, BIG_FONT, MED_FONT, SMALL_FONT, TINY_FONT};
use crate::surface::{Plane, Region, Surfaces};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use embedded_graphics::prelude::Point;

/// Date line format, e.g. `Jun 21, 2024`
pub const DATE_FORMAT: &str = "%b %d, %Y";

/// Hand angles (degrees, 0 = 3 o'clock, clockwise on screen) and tips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hands {
    pub hour_angle: f64,
    pub minute_angle: f64,
    pub hour_end: Point,
    pub minute_end: Point,
}

/// Hour hand is 0.6 of the radius, minute hand 0.9.
pub fn hand_geometry(center: (f64, f64), radius: f64, hour: u32, minute: u32) -> Hands {
    let hour_angle = ((hour % 12) as f64 + minute as f64 / 60.0) * 30.0 - 90.0;
    let minute_angle = minute as f64 * 6.0 - 90.0;
    let tip = |length: f64, angle: f64| {
        let (sin, cos) = angle.to_radians().sin_cos();
        Point::new(
            (center.0 + length * cos).round() as i32,
            (center.1 + length * sin).round() as i32,
        )
    };
    Hands {
        hour_angle,
        minute_angle,
        hour_end: tip(radius * 0.6, hour_angle),
        minute_end: tip(radius * 0.9, minute_angle),
    }
}

/// Round face in a square of `region.width`.
pub struct AnalogClock;

impl AnalogClock {
    pub fn draw_at(
        &self,
        surfaces: &mut Surfaces,
        ctx: &WidgetContext<'_>,
        region: Region,
        time: NaiveTime,
    ) {
        let size = region.width as i32;
        let radius = region.width as f64 / 2.0;
        let center = (region.x as f64 + radius, region.y as f64 + radius);
        let hands = hand_geometry(center, radius, time.hour(), time.minute());
        let hub = Point::new(center.0.round() as i32, center.1.round() as i32);

        surfaces.ellipse(
            region.top_left(),
            Point::new(region.x + size - 1, region.y + size - 1),
            Plane::Black,
            2,
        );
        surfaces.line(hub, hands.hour_end, Plane::Black, 3);
        surfaces.line(hub, hands.minute_end, Plane::Red, 2);

        let label = time.format(ctx.settings.time_format.pattern()).to_string();
        surfaces.text_centered(
            Point::new(region.x, region.y + size - 25),
            region.width,
            &label,
            TINY_FONT,
            Plane::Red,
        );
    }
}

impl Widget for AnalogClock {
    fn kind(&self) -> WidgetKind {
        WidgetKind::AnalogClock
    }

    fn draw(&self, surfaces: &mut Surfaces, ctx: &WidgetContext<'_>, region: Region) {
        self.draw_at(surfaces, ctx, region, Local::now().time());
    }
}

/// Large digits with the date underneath.
pub struct DigitalClock;

impl DigitalClock {
    pub fn draw_at(
        &self,
        surfaces: &mut Surfaces,
        ctx: &WidgetContext<'_>,
        region: Region,
        now: NaiveDateTime,
    ) {
        let time = now.format(ctx.settings.time_format.pattern()).to_string();
        let top = region.y + 5;
        surfaces.text_centered(
            Point::new(region.x, top),
            region.width,
            &time,
            BIG_FONT,
            Plane::Black,
        );

        let date_top = top + BIG_FONT.character_size.height as i32 + 6;
        let date = now.format(DATE_FORMAT).to_string();
        surfaces.text_centered(
            Point::new(region.x, date_top),
            region.width,
            &date,
            MED_FONT,
            Plane::Black,
        );
    }
}

impl Widget for DigitalClock {
    fn kind(&self) -> WidgetKind {
        WidgetKind::DigitalClock
    }

    fn draw(&self, surfaces: &mut Surfaces, ctx: &WidgetContext<'_>, region: Region) {
        self.draw_at(surfaces, ctx, region, Local::now().naive_local());
    }
}

/// Today's date centred in the region.
pub struct CurrentDate;

impl CurrentDate {
    pub fn draw_at(&self, surfaces: &mut Surfaces, region: Region, date: NaiveDate) {
        let text = date.format(DATE_FORMAT).to_string();
        surfaces.text_centered(
            region.top_left(),
            region.width,
            &text,
            MED_FONT,
            Plane::Black,
        );
    }
}

impl Widget for CurrentDate {
    fn kind(&self) -> WidgetKind {
        WidgetKind::CurrentDate
    }

    fn draw(&self, surfaces: &mut Surfaces, _ctx: &WidgetContext<'_>, region: Region) {
        self.draw_at(surfaces, region, Local::now().date_naive());
    }
}

/// Time and date in the configured second timezone. Draws nothing when no
/// second timezone is configured.
pub struct SecondaryTimezoneClock {
    vertical: bool,
    font: &'static Font,
}

impl SecondaryTimezoneClock {
    /// Three centred lines: `- TZ -`, time, date.
    pub fn vertical() -> Self {
        Self {
            vertical: true,
            font: SMALL_FONT,
        }
    }

    /// Two centred lines: `TZ - time`, date.
    pub fn horizontal() -> Self {
        Self {
            vertical: false,
            font: TINY_FONT,
        }
    }

    pub fn draw_at(
        &self,
        surfaces: &mut Surfaces,
        ctx: &WidgetContext<'_>,
        region: Region,
        instant: DateTime<Utc>,
    ) {
        let Some(tz) = ctx.settings.second_tz else {
            return;
        };
        let now = instant.with_timezone(&tz);
        let pattern = ctx.settings.time_format.pattern();
        let line_height = self.font.character_size.height as i32;

        let lines = if self.vertical {
            vec![
                now.format("- %Z -").to_string(),
                now.format(pattern).to_string(),
                now.format(DATE_FORMAT).to_string(),
            ]
        } else {
            vec![
                now.format(&format!("%Z - {pattern}")).to_string(),
                now.format(DATE_FORMAT).to_string(),
            ]
        };

        for (row, line) in lines.iter().enumerate() {
            let top = region.y + row as i32 * line_height;
            surfaces.text_centered(
                Point::new(region.x, top),
                region.width,
                line,
                self.font,
                Plane::Black,
            );
        }
    }
}

impl Widget for SecondaryTimezoneClock {
    fn kind(&self) -> WidgetKind {
        WidgetKind::SecondaryTimezone
    }

    fn draw(&self, surfaces: &mut Surfaces, ctx: &WidgetContext<'_>, region: Region) {
        self.draw_at(surfaces, ctx, region, Utc::now());
    }
}
