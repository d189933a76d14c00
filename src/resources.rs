//! Fonts and icon bitmaps.
//!
//! Fonts are compiled in (embedded-graphics mono fonts, ISO 8859-1 so the
//! degree sign renders, and ProFont for the big clock digits). Icons are
//! 1-bit PNGs under the data directory, loaded on first use and memoized.

use embedded_graphics::{image::ImageRaw, mono_font::MonoFont, pixelcolor::BinaryColor};
use image::GenericImageView;
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

pub type Font = MonoFont<'static>;

/// Clock digits
pub const BIG_FONT: &Font = &profont::PROFONT_24_POINT;
/// Temperatures
pub const LARGER_FONT: &Font = &embedded_graphics::mono_font::iso_8859_1::FONT_10X20;
pub const MED_FONT: &Font = &embedded_graphics::mono_font::iso_8859_1::FONT_9X18_BOLD;
pub const SMALL_FONT: &Font = &embedded_graphics::mono_font::iso_8859_1::FONT_9X15;
pub const TINY_FONT: &Font = &embedded_graphics::mono_font::iso_8859_1::FONT_7X13;

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("icon '{name}': {source}")]
    Icon {
        name: String,
        #[source]
        source: image::ImageError,
    },
}

/// 1-bit bitmap. Rows are packed MSB first and padded to whole bytes; a set
/// bit is ink. Background pixels are part of the image (no transparency).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Icon {
    /// Build an icon from a per-pixel predicate (`true` = ink).
    pub fn from_fn(width: u32, height: u32, ink: impl Fn(u32, u32) -> bool) -> Self {
        let stride = width.div_ceil(8) as usize;
        let mut data = vec![0u8; stride * height as usize];
        for y in 0..height {
            for x in 0..width {
                if ink(x, y) {
                    data[y as usize * stride + x as usize / 8] |= 0x80 >> (x % 8);
                }
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Build an icon from text rows, `#` marks ink.
    pub fn from_rows(rows: &[&str]) -> Self {
        let width = rows.iter().map(|row| row.len()).max().unwrap_or(0) as u32;
        Self::from_fn(width, rows.len() as u32, |x, y| {
            rows[y as usize].as_bytes().get(x as usize) == Some(&b'#')
        })
    }

    /// Decode a PNG (or any format `image` reads). Dark, opaque pixels are ink.
    pub fn load(path: &Path) -> Result<Self, image::ImageError> {
        let img = image::open(path)?;
        let (width, height) = img.dimensions();
        let luma = img.to_luma_alpha8();
        Ok(Self::from_fn(width, height, |x, y| {
            let [value, alpha] = luma.get_pixel(x, y).0;
            alpha >= 128 && value < 128
        }))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let stride = self.width.div_ceil(8) as usize;
        self.data[y as usize * stride + x as usize / 8] & (0x80 >> (x % 8)) != 0
    }

    pub fn raw(&self) -> ImageRaw<'_, BinaryColor> {
        ImageRaw::new(&self.data, self.width)
    }

    /// Rotate clockwise by `degrees` about the centre, keeping the size.
    /// Corners that rotate in from outside are background.
    pub fn rotated(&self, degrees: f32) -> Icon {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let cx = (self.width as f32 - 1.0) / 2.0;
        let cy = (self.height as f32 - 1.0) / 2.0;
        Icon::from_fn(self.width, self.height, |x, y| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            // inverse mapping: rotate the destination counter-clockwise
            let sx = (cx + dx * cos + dy * sin).round();
            let sy = (cy - dx * sin + dy * cos).round();
            sx >= 0.0 && sy >= 0.0 && self.is_ink(sx as u32, sy as u32)
        })
    }
}

/// Asset store shared by every render pass.
pub struct Resources {
    data_dir: PathBuf,
    icons: Mutex<HashMap<String, Arc<Icon>>>,
}

impl Resources {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            icons: Mutex::new(HashMap::new()),
        }
    }

    /// Icon `name` from `<data_dir>/<name>.png`, e.g. `weather/10d`.
    /// Successful loads are cached; failures are retried next time.
    pub fn icon(&self, name: &str) -> Result<Arc<Icon>, ResourceError> {
        if let Some(icon) = self.cache().get(name) {
            return Ok(Arc::clone(icon));
        }

        let path = self.data_dir.join(format!("{name}.png"));
        debug!("Loading icon {}", path.display());
        let icon = Arc::new(Icon::load(&path).map_err(|source| ResourceError::Icon {
            name: name.to_string(),
            source,
        })?);

        self.cache()
            .insert(name.to_string(), Arc::clone(&icon));
        Ok(icon)
    }

    /// Register an icon under `name`, bypassing the filesystem.
    pub fn insert_icon(&self, name: &str, icon: Icon) {
        self.cache().insert(name.to_string(), Arc::new(icon));
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Icon>>> {
        self.icons.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use tempfile::TempDir;

    #[test]
    fn test_from_rows() {
        let icon = Icon::from_rows(&["#.", ".#", "##"]);
        assert_eq!((icon.width(), icon.height()), (2, 3));
        assert!(icon.is_ink(0, 0));
        assert!(!icon.is_ink(1, 0));
        assert!(icon.is_ink(1, 1));
        assert!(icon.is_ink(0, 2) && icon.is_ink(1, 2));
        assert!(!icon.is_ink(5, 5));
    }

    #[test]
    fn test_rotate_quarter_turn_clockwise() {
        // single ink pixel at the top centre
        let icon = Icon::from_fn(5, 5, |x, y| (x, y) == (2, 0));
        let east = icon.rotated(90.0);
        assert!(east.is_ink(4, 2));
        assert!(!east.is_ink(2, 0));

        let south = icon.rotated(180.0);
        assert!(south.is_ink(2, 4));

        let same = icon.rotated(0.0);
        assert_eq!(same, icon);
    }

    #[test]
    fn test_icon_loading_is_memoized() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("weather")).unwrap();
        let path = dir.path().join("weather/01d.png");
        let mut img = GrayImage::from_pixel(4, 2, Luma([255]));
        img.put_pixel(1, 1, Luma([0]));
        img.save(&path).unwrap();

        let resources = Resources::new(dir.path());
        let first = resources.icon("weather/01d").unwrap();
        assert_eq!((first.width(), first.height()), (4, 2));
        assert!(first.is_ink(1, 1));
        assert!(!first.is_ink(0, 0));

        // served from cache even after the file is gone
        std::fs::remove_file(&path).unwrap();
        let second = resources.icon("weather/01d").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_missing_icon_is_an_error() {
        let resources = Resources::new("/nonexistent");
        assert!(matches!(
            resources.icon("weather/wind"),
            Err(ResourceError::Icon { .. })
        ));
    }

    #[test]
    fn test_inserted_icon() {
        let resources = Resources::new("/nonexistent");
        resources.insert_icon("sunrise", Icon::from_rows(&["##"]));
        assert_eq!(resources.icon("sunrise").unwrap().width(), 2);
        assert!(resources.icon("sunset").is_err());
    }
}
