//! # Layout
//!
//! Decides which widgets appear where for the configured clock face and the
//! current [`DisplayMode`], draws the separators, and produces a finished
//! [`Surfaces`] for the display.
//!
//! ```text
//! analog                                 digital
//! +--------+-------------------------+   +------------------+-----------+
//! | (face) |        date             |   |     12:34        |  - TZ -   |
//! |        |   sunrise   sunset      |   |  Jun 21, 2024    |   time    |
//! |        |   TZ - time / date      |   |                  |   date    |
//! |        |                         |   |   sunrise       sunset      |
//! +--------+-------------------------+   +------------------------------+
//! | icon  temp            |  wind    |   | icon  temp            | wind |
//! | description           |  arrow   |   | description           |      |
//! | ▂▅█  precipitation    |  speed   |   | ▂▅█  precipitation    |      |
//! +-------------------------------------------------------------------+
//! ```
//!
//! In [`DisplayMode::DetailOverlay`] the clock is hidden and the detail view
//! takes the whole panel.

use crate::config::ClockFace;
use crate::mode::DisplayMode;
use crate::surface::{Plane, Region, Surfaces, HEIGHT, WIDTH};
use crate::widgets::{
    AnalogClock, CurrentDate, CurrentWeatherDetail, CurrentWeatherSummary, DigitalClock,
    SecondaryTimezoneClock, SunTimes, Widget, WidgetContext, WidgetKind,
};
use embedded_graphics::prelude::Point;
use log::debug;

/// Size of the analog face and its margin from the panel edge.
const CLOCK_FACE: u32 = 90;
const OFFSET: i32 = 5;

/// Horizontal separator between the clock and the weather.
const SEPARATOR_Y: i32 = 97;
/// Top of the weather summary.
const WEATHER_TOP: i32 = 99;

/// Digital face: width of the big clock column.
const DIGITAL_CLOCK_WIDTH: u32 = 170;

/// One widget and the region it owns.
pub struct Placement {
    pub widget: Box<dyn Widget>,
    pub region: Region,
}

impl Placement {
    fn new(widget: impl Widget + 'static, region: Region) -> Self {
        Self {
            widget: Box::new(widget),
            region,
        }
    }

    pub fn kind(&self) -> WidgetKind {
        self.widget.kind()
    }
}

/// Black separator line, endpoints inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separator {
    pub from: Point,
    pub to: Point,
}

pub struct Layout {
    clock_face: ClockFace,
}

impl Layout {
    pub fn new(clock_face: ClockFace) -> Self {
        Self { clock_face }
    }

    /// Widgets for `mode`, in drawing order.
    pub fn placements(&self, mode: DisplayMode) -> Vec<Placement> {
        if mode == DisplayMode::DetailOverlay {
            return vec![Placement::new(
                CurrentWeatherDetail,
                Region::new(0, 0, WIDTH, HEIGHT),
            )];
        }

        let mut placements = match self.clock_face {
            ClockFace::Analog => {
                let left = OFFSET + CLOCK_FACE as i32;
                let rest = WIDTH - left as u32;
                vec![
                    Placement::new(
                        AnalogClock,
                        Region::new(OFFSET, OFFSET, CLOCK_FACE, CLOCK_FACE),
                    ),
                    Placement::new(CurrentDate, Region::new(left, 0, rest, 30)),
                    Placement::new(SunTimes, Region::new(left, 30, rest, 20)),
                    Placement::new(
                        SecondaryTimezoneClock::horizontal(),
                        Region::new(left, 50, rest, 45),
                    ),
                ]
            }
            ClockFace::Digital => vec![
                Placement::new(DigitalClock, Region::new(0, 0, DIGITAL_CLOCK_WIDTH, 70)),
                Placement::new(
                    SecondaryTimezoneClock::vertical(),
                    Region::new(
                        DIGITAL_CLOCK_WIDTH as i32,
                        0,
                        WIDTH - DIGITAL_CLOCK_WIDTH,
                        70,
                    ),
                ),
                Placement::new(SunTimes, Region::new(0, 72, WIDTH, 25)),
            ],
        };

        placements.push(Placement::new(
            CurrentWeatherSummary,
            Region::new(0, WEATHER_TOP, WIDTH, HEIGHT - WEATHER_TOP as u32),
        ));
        placements
    }

    /// Frame lines for `mode`. The overlay has none.
    pub fn separators(&self, mode: DisplayMode) -> Vec<Separator> {
        if mode == DisplayMode::DetailOverlay {
            return Vec::new();
        }
        let mut lines = Vec::new();
        if self.clock_face == ClockFace::Digital {
            lines.push(Separator {
                from: Point::new(168, 5),
                to: Point::new(168, 62),
            });
        }
        lines.push(Separator {
            from: Point::new(10, SEPARATOR_Y),
            to: Point::new(WIDTH as i32 - 10, SEPARATOR_Y),
        });
        lines
    }

    /// Render one complete frame on fresh surfaces.
    pub fn compose(&self, mode: DisplayMode, ctx: &WidgetContext<'_>) -> Surfaces {
        let mut surfaces = Surfaces::for_panel();
        for separator in self.separators(mode) {
            surfaces.line(separator.from, separator.to, Plane::Black, 1);
        }
        for placement in self.placements(mode) {
            debug!("Drawing {:?} at {:?}", placement.kind(), placement.region);
            placement.widget.draw(&mut surfaces, ctx, placement.region);
        }
        surfaces
    }
}
