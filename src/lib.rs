//! # Paper Clock Core Library
//!
//! Everything the e-paper clock does, minus the process bootstrap and the
//! Raspberry Pi wiring: configuration, weather polling, rendering, the
//! display throttle and the mode state machine. All of it runs (and is
//! tested) without hardware.
//!
//! ## Panel
//! The Waveshare 2.7" B panel is 176x264 pixels with black and red ink. It
//! is mounted sideways, so widgets lay out on a 264x176 landscape canvas and
//! [`surface::Surfaces::panel_frame`] rotates the finished frame into the
//! panel's native orientation.
//!
//! ## Data Flow
//! 1. **Poll**: every 15 minutes [`weather_data::OpenWeatherMap`] fetches a
//!    forecast and publishes it as an immutable `Arc<WeatherSnapshot>`
//! 2. **Render**: [`layout::Layout`] draws the widgets for the current
//!    [`mode::DisplayMode`] onto fresh [`surface::Surfaces`]
//! 3. **Show**: [`display::Display`] drops the frame if the panel refreshed
//!    less than 25 s ago, otherwise runs init → display → sleep
//!
//! ## Example
//! ```
//! use paper_clock_lib::config::Settings;
//! use paper_clock_lib::layout::Layout;
//! use paper_clock_lib::mode::DisplayMode;
//! use paper_clock_lib::resources::Resources;
//! use paper_clock_lib::surface::Plane;
//! use paper_clock_lib::widgets::WidgetContext;
//!
//! let settings = Settings::default();
//! let resources = Resources::new(&settings.data_dir);
//! let ctx = WidgetContext { settings: &settings, resources: &resources, weather: None };
//!
//! let frame = Layout::new(settings.clock_face).compose(DisplayMode::Default, &ctx);
//! assert_eq!((frame.width(), frame.height()), (264, 176));
//! assert!(frame.plane(Plane::Black).ink_count() > 0);
//! ```

pub mod app;
pub mod config;
pub mod display;
pub mod epd2in7b;
pub mod layout;
pub mod mode;
pub mod preview;
pub mod resources;
pub mod scheduler;
pub mod solar;
pub mod surface;
pub mod weather_data;
pub mod widgets;
