//! Two-plane render surfaces.
//!
//! A frame is drawn into two same-size monochrome [`Bitmap`]s, one per ink
//! ([`Plane::Black`] and [`Plane::Red`]). Coordinates are logical: the panel
//! is mounted sideways, so the logical width is the physical height.
//!
//! Drawing outside a plane is clipped silently by the `DrawTarget`
//! implementation; nothing wraps.

use crate::resources::{Font, Icon};
use embedded_graphics::{
    image::Image,
    mono_font::MonoTextStyle,
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Ellipse, Line, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, StrokeAlignment},
    text::{renderer::TextRenderer, Baseline, Text},
};
use std::convert::Infallible;

/// Physical panel size (Waveshare 2.7" B), portrait.
pub const PANEL_WIDTH: u32 = 176;
pub const PANEL_HEIGHT: u32 = 264;

/// Logical (landscape) size every widget lays out against.
pub const WIDTH: u32 = PANEL_HEIGHT;
pub const HEIGHT: u32 = PANEL_WIDTH;

/// Which ink a primitive goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plane {
    Black,
    Red,
}

/// Rectangle a widget is asked to draw into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }
}

/// One monochrome plane. Packed rows, MSB first, set bit = ink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// Blank (all background) plane.
    pub fn new(width: u32, height: u32) -> Self {
        let stride = width.div_ceil(8) as usize;
        Self {
            width,
            height,
            data: vec![0; stride * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn stride(&self) -> usize {
        self.width.div_ceil(8) as usize
    }

    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data[y as usize * self.stride() + x as usize / 8] & (0x80 >> (x % 8)) != 0
    }

    fn set(&mut self, x: u32, y: u32, ink: bool) {
        let index = y as usize * self.stride() + x as usize / 8;
        let mask = 0x80 >> (x % 8);
        if ink {
            self.data[index] |= mask;
        } else {
            self.data[index] &= !mask;
        }
    }

    /// Number of inked pixels.
    pub fn ink_count(&self) -> u32 {
        self.data.iter().map(|b| b.count_ones()).sum()
    }

    /// Number of inked pixels inside `region` (clipped to the plane).
    pub fn ink_in(&self, region: Region) -> u32 {
        let x0 = region.x.max(0) as u32;
        let y0 = region.y.max(0) as u32;
        let x1 = (region.right().max(0) as u32).min(self.width);
        let y1 = (region.bottom().max(0) as u32).min(self.height);
        (y0..y1)
            .flat_map(|y| (x0..x1).map(move |x| (x, y)))
            .filter(|&(x, y)| self.is_ink(x, y))
            .count() as u32
    }
}

impl OriginDimensions for Bitmap {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Bitmap {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let (x, y) = (point.x as u32, point.y as u32);
            if x < self.width && y < self.height {
                self.set(x, y, color.is_on());
            }
        }
        Ok(())
    }
}

/// Physical frame ready for the driver: one buffer per ink, rows of
/// `ceil(PANEL_WIDTH / 8)` bytes, MSB = leftmost pixel, cleared bit = ink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanelFrame {
    pub width: u32,
    pub height: u32,
    pub black: Vec<u8>,
    pub red: Vec<u8>,
}

/// Black and red planes of one frame.
#[derive(Clone, Debug)]
pub struct Surfaces {
    black: Bitmap,
    red: Bitmap,
}

impl Surfaces {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            black: Bitmap::new(width, height),
            red: Bitmap::new(width, height),
        }
    }

    /// Fresh landscape surfaces for the 2.7" panel.
    pub fn for_panel() -> Self {
        Self::new(WIDTH, HEIGHT)
    }

    pub fn width(&self) -> u32 {
        self.black.width
    }

    pub fn height(&self) -> u32 {
        self.black.height
    }

    pub fn plane(&self, plane: Plane) -> &Bitmap {
        match plane {
            Plane::Black => &self.black,
            Plane::Red => &self.red,
        }
    }

    pub fn plane_mut(&mut self, plane: Plane) -> &mut Bitmap {
        match plane {
            Plane::Black => &mut self.black,
            Plane::Red => &mut self.red,
        }
    }

    /// Pixel width of `text` set in `font`.
    pub fn text_width(text: &str, font: &Font) -> u32 {
        MonoTextStyle::new(font, BinaryColor::On)
            .measure_string(text, Point::zero(), Baseline::Top)
            .bounding_box
            .size
            .width
    }

    /// Left edge that centres something `content_width` wide in a box.
    pub fn centered_x(box_x: i32, box_width: u32, content_width: u32) -> i32 {
        box_x + (box_width as i32 - content_width as i32) / 2
    }

    /// Text with its top-left corner at `pos`.
    pub fn text(&mut self, pos: Point, text: &str, font: &Font, plane: Plane) {
        let style = MonoTextStyle::new(font, BinaryColor::On);
        let _ = Text::with_baseline(text, pos, style, Baseline::Top).draw(self.plane_mut(plane));
    }

    /// Text horizontally centred in the box starting at `pos`, `box_width` wide.
    /// The vertical position is used as is.
    pub fn text_centered(
        &mut self,
        pos: Point,
        box_width: u32,
        text: &str,
        font: &Font,
        plane: Plane,
    ) {
        let x = Self::centered_x(pos.x, box_width, Self::text_width(text, font));
        self.text(Point::new(x, pos.y), text, font, plane);
    }

    /// Blit an icon at `pos`, background pixels included.
    pub fn image(&mut self, pos: Point, icon: &Icon, plane: Plane) {
        let raw = icon.raw();
        let _ = Image::new(&raw, pos).draw(self.plane_mut(plane));
    }

    pub fn image_centered(&mut self, pos: Point, box_width: u32, icon: &Icon, plane: Plane) {
        let x = Self::centered_x(pos.x, box_width, icon.width());
        self.image(Point::new(x, pos.y), icon, plane);
    }

    /// Icon, 2px gap, text; the pair centred in the box. The text sits 2px
    /// higher than the icon so it lines up with the glyph body.
    #[allow(clippy::too_many_arguments)]
    pub fn icon_text_centered(
        &mut self,
        pos: Point,
        box_width: u32,
        icon: Option<&Icon>,
        text: &str,
        font: &Font,
        icon_plane: Plane,
        text_plane: Plane,
    ) {
        const GAP: u32 = 2;
        let icon_width = icon.map_or(0, |icon| icon.width() + GAP);
        let total = icon_width + Self::text_width(text, font);
        let left = Self::centered_x(pos.x, box_width, total);
        if let Some(icon) = icon {
            self.image(Point::new(left, pos.y), icon, icon_plane);
        }
        self.text(
            Point::new(left + icon_width as i32, pos.y - 2),
            text,
            font,
            text_plane,
        );
    }

    pub fn line(&mut self, from: Point, to: Point, plane: Plane, width: u32) {
        let _ = Line::new(from, to)
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, width))
            .draw(self.plane_mut(plane));
    }

    /// Rectangle with both corners inclusive; outlined 1px or filled.
    pub fn rect(&mut self, top_left: Point, bottom_right: Point, plane: Plane, filled: bool) {
        let style = if filled {
            PrimitiveStyle::with_fill(BinaryColor::On)
        } else {
            inside_stroke(1)
        };
        let _ = Rectangle::with_corners(top_left, bottom_right)
            .into_styled(style)
            .draw(self.plane_mut(plane));
    }

    /// Ellipse outline inscribed in the box, corners inclusive. The stroke
    /// grows inwards so it never leaves the box.
    pub fn ellipse(&mut self, top_left: Point, bottom_right: Point, plane: Plane, width: u32) {
        let bounds = Rectangle::with_corners(top_left, bottom_right);
        let _ = Ellipse::new(bounds.top_left, bounds.size)
            .into_styled(inside_stroke(width))
            .draw(self.plane_mut(plane));
    }

    /// Rotate into the panel's native portrait orientation and pack for the
    /// driver. Logical `(x, y)` lands on physical `(y, WIDTH - 1 - x)`.
    pub fn panel_frame(&self) -> PanelFrame {
        let width = self.height();
        let height = self.width();
        PanelFrame {
            width,
            height,
            black: Self::pack_rotated(&self.black),
            red: Self::pack_rotated(&self.red),
        }
    }

    fn pack_rotated(plane: &Bitmap) -> Vec<u8> {
        let phys_width = plane.height;
        let phys_height = plane.width;
        let stride = phys_width.div_ceil(8) as usize;
        let mut buffer = vec![0xFF; stride * phys_height as usize];
        for y in 0..plane.height {
            for x in 0..plane.width {
                if plane.is_ink(x, y) {
                    let (px, py) = (y, phys_height - 1 - x);
                    buffer[py as usize * stride + px as usize / 8] &= !(0x80 >> (px % 8));
                }
            }
        }
        buffer
    }
}

fn inside_stroke(width: u32) -> PrimitiveStyle<BinaryColor> {
    PrimitiveStyleBuilder::new()
        .stroke_color(BinaryColor::On)
        .stroke_width(width)
        .stroke_alignment(StrokeAlignment::Inside)
        .build()
}
