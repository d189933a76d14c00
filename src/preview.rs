//! # Terminal preview
//!
//! Development mode for machines without the panel. A frame is printed as
//! text, one character per 2x4 pixel cell:
//!
//! - `█` any black ink in the cell
//! - `░` red ink only
//! - space for blank paper
//!
//! [`ConsolePanel`] stands in for the e-paper driver when the crate is built
//! without the `hardware` feature: it accepts frames and logs what it would
//! have shown.

use crate::display::Panel;
use crate::surface::{Plane, Region, Surfaces};
use log::info;
use std::convert::Infallible;

const CELL_WIDTH: u32 = 2;
const CELL_HEIGHT: u32 = 4;

/// Render both planes as text, framed.
pub fn to_ascii(surfaces: &Surfaces) -> String {
    let columns = surfaces.width().div_ceil(CELL_WIDTH);
    let rows = surfaces.height().div_ceil(CELL_HEIGHT);
    let black = surfaces.plane(Plane::Black);
    let red = surfaces.plane(Plane::Red);

    let border = format!("+{}+\n", "-".repeat(columns as usize));
    let mut out = String::with_capacity(border.len() * (rows as usize + 2) * 3);
    out.push_str(&border);
    for row in 0..rows {
        out.push('|');
        for column in 0..columns {
            let cell = Region::new(
                (column * CELL_WIDTH) as i32,
                (row * CELL_HEIGHT) as i32,
                CELL_WIDTH,
                CELL_HEIGHT,
            );
            let ch = if black.ink_in(cell) > 0 {
                '█'
            } else if red.ink_in(cell) > 0 {
                '░'
            } else {
                ' '
            };
            out.push(ch);
        }
        out.push_str("|\n");
    }
    out.push_str(&border);
    out
}

/// Print a frame to stdout.
pub fn draw_ascii(surfaces: &Surfaces) {
    print!("{}", to_ascii(surfaces));
}

/// Panel that only logs. Used when no hardware is available.
#[derive(Debug, Default)]
pub struct ConsolePanel {
    frames: usize,
}

impl ConsolePanel {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cleared bits are ink.
fn ink_pixels(buffer: &[u8]) -> u32 {
    buffer.iter().map(|b| b.count_zeros()).sum()
}

impl Panel for ConsolePanel {
    type Error = Infallible;

    fn init(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn display(&mut self, black: &[u8], red: &[u8]) -> Result<(), Infallible> {
        self.frames += 1;
        info!(
            "Frame {}: {} black pixels, {} red pixels",
            self.frames,
            ink_pixels(black),
            ink_pixels(red)
        );
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}
