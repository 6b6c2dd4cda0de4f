//! Logical and device coordinate spaces
//!
//! Logical coordinates come straight from the record parameters. Device
//! coordinates are what the scan box and the backend see. The window
//! (origin, extent, mapping mode, pixel size) belongs to the device context;
//! the viewport is shared by every context of a pass.

use log::debug;

use crate::error::{WmfError, WmfResult};
use crate::records::*;

/// Point in device space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DPoint {
    pub x: f64,
    pub y: f64,
}

impl DPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rectangle in device space, `tl` holding the smaller coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DRect {
    pub tl: DPoint,
    pub br: DPoint,
}

impl DRect {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            tl: DPoint::new(x1, y1),
            br: DPoint::new(x2, y2),
        }
    }

    /// Rectangle spanning two corners in any order
    pub fn from_corners(a: DPoint, b: DPoint) -> Self {
        Self {
            tl: DPoint::new(a.x.min(b.x), a.y.min(b.y)),
            br: DPoint::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn width(&self) -> f64 {
        self.br.x - self.tl.x
    }

    pub fn height(&self) -> f64 {
        self.br.y - self.tl.y
    }

    /// True when the two rectangles share interior area
    pub fn overlaps(&self, other: &DRect) -> bool {
        self.br.x > other.tl.x
            && self.tl.x < other.br.x
            && self.br.y > other.tl.y
            && self.tl.y < other.br.y
    }
}

/// Point in logical (metafile) space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LPoint {
    pub x: f64,
    pub y: f64,
}

impl LPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point from two raw record words, each read as a signed 16-bit value
    pub fn from_words(x: u16, y: u16) -> Self {
        Self {
            x: x as i16 as f64,
            y: y as i16 as f64,
        }
    }
}

/// Named rule for converting logical units to device units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// One logical unit is one point
    Text,
    /// 0.1 mm
    LoMetric,
    /// 0.01 mm
    HiMetric,
    /// 0.01 inch
    LoEnglish,
    /// 0.001 inch
    HiEnglish,
    /// 1/1440 inch
    Twips,
    Isotropic,
    Anisotropic,
    /// Placeable file, scale taken from the header's units per inch
    Dpi,
}

impl MapMode {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            MM_TEXT => Some(MapMode::Text),
            MM_LOMETRIC => Some(MapMode::LoMetric),
            MM_HIMETRIC => Some(MapMode::HiMetric),
            MM_LOENGLISH => Some(MapMode::LoEnglish),
            MM_HIENGLISH => Some(MapMode::HiEnglish),
            MM_TWIPS => Some(MapMode::Twips),
            MM_ISOTROPIC => Some(MapMode::Isotropic),
            MM_ANISOTROPIC => Some(MapMode::Anisotropic),
            MM_DPI => Some(MapMode::Dpi),
            _ => None,
        }
    }

    pub fn is_scalable(&self) -> bool {
        matches!(self, MapMode::Isotropic | MapMode::Anisotropic)
    }

    /// Device units (points) per logical unit for the fixed modes
    fn fixed_scale(&self) -> Option<f64> {
        match self {
            MapMode::Text => Some(1.0),
            MapMode::LoMetric => Some(72.0 * 0.1 / 25.4),
            MapMode::HiMetric => Some(72.0 * 0.01 / 25.4),
            MapMode::LoEnglish => Some(72.0 * 0.01),
            MapMode::HiEnglish => Some(72.0 * 0.001),
            MapMode::Twips => Some(0.05),
            _ => None,
        }
    }
}

/// Logical window of a device context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub ox: i32,
    pub oy: i32,
    pub width: i32,
    pub height: i32,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            ox: 0,
            oy: 0,
            width: 1024,
            height: 1024,
        }
    }
}

/// Device viewport, shared across saved contexts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Origin, already in device units
    pub origin: DPoint,
    pub width: i32,
    pub height: i32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            origin: DPoint::default(),
            width: 1024,
            height: 1024,
        }
    }
}

/// Per-context mapping state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mapping {
    pub mode: MapMode,
    pub window: Window,
    pixel_width: f64,
    pixel_height: f64,
}

impl Default for Mapping {
    fn default() -> Self {
        Self {
            mode: MapMode::Text,
            window: Window::default(),
            pixel_width: 1.0,
            pixel_height: 1.0,
        }
    }
}

impl Mapping {
    /// Switch mapping mode.
    ///
    /// An unknown mode is `BadFormat` unless the file is placeable, in which
    /// case the header's units per inch decide the scale.
    pub fn set_mode(&mut self, raw: u16, placeable_dpi: Option<u16>, viewport: &Viewport) -> WmfResult<()> {
        let mode = match MapMode::from_u16(raw) {
            Some(MapMode::Dpi) | None => match placeable_dpi {
                Some(dpi) => {
                    if dpi == 0 {
                        return Err(WmfError::bad_format("placeable header declares 0 units per inch"));
                    }
                    debug!("map mode: DPI ({} units per inch)", dpi);
                    let scale = 72.0 / dpi as f64;
                    self.pixel_width = scale;
                    self.pixel_height = scale;
                    self.mode = MapMode::Dpi;
                    return Ok(());
                }
                None => {
                    return Err(WmfError::bad_format(format!("unexpected mapping mode {}", raw)));
                }
            },
            Some(mode) => mode,
        };

        debug!("map mode: {:?}", mode);
        self.mode = mode;
        match mode.fixed_scale() {
            Some(scale) => {
                self.pixel_width = scale;
                self.pixel_height = scale;
                Ok(())
            }
            None => self.recompute(viewport),
        }
    }

    /// Recompute the pixel size after a window or viewport extent change
    pub fn recompute(&mut self, viewport: &Viewport) -> WmfResult<()> {
        if !self.mode.is_scalable() {
            return Ok(());
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(WmfError::bad_format(format!(
                "window has bad size {}x{}",
                self.window.width, self.window.height
            )));
        }
        if viewport.width == 0 || viewport.height == 0 {
            return Err(WmfError::bad_format(format!(
                "viewport has bad size {}x{}",
                viewport.width, viewport.height
            )));
        }

        let mut pw = viewport.width as f64 / self.window.width as f64;
        let mut ph = viewport.height as f64 / self.window.height as f64;

        if self.mode == MapMode::Isotropic {
            let m = pw.abs().min(ph.abs());
            pw = m.copysign(pw);
            ph = m.copysign(ph);
        }

        self.pixel_width = pw;
        self.pixel_height = ph;
        Ok(())
    }

    /// Signed device units per logical unit along x
    pub fn pixel_width(&self) -> f64 {
        if !self.mode.is_scalable() && self.window.width < 0 {
            -self.pixel_width
        } else {
            self.pixel_width
        }
    }

    /// Signed device units per logical unit along y
    pub fn pixel_height(&self) -> f64 {
        if !self.mode.is_scalable() && self.window.height < 0 {
            -self.pixel_height
        } else {
            self.pixel_height
        }
    }

    /// Pixel size as stored, before the window extent sign is applied
    pub fn raw_pixel_size(&self) -> (f64, f64) {
        (self.pixel_width, self.pixel_height)
    }

    pub fn to_device(&self, l: LPoint, viewport: &Viewport) -> DPoint {
        DPoint {
            x: (l.x - self.window.ox as f64) * self.pixel_width() - viewport.origin.x,
            y: (l.y - self.window.oy as f64) * self.pixel_height() - viewport.origin.y,
        }
    }

    pub fn to_logical(&self, d: DPoint, viewport: &Viewport) -> LPoint {
        LPoint {
            x: (d.x + viewport.origin.x) / self.pixel_width() + self.window.ox as f64,
            y: (d.y + viewport.origin.y) / self.pixel_height() + self.window.oy as f64,
        }
    }

    /// Device rectangle spanned by two logical corners
    pub fn to_device_rect(&self, a: LPoint, b: LPoint, viewport: &Viewport) -> DRect {
        DRect::from_corners(self.to_device(a, viewport), self.to_device(b, viewport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_mode_is_identity() {
        let mapping = Mapping::default();
        let vp = Viewport::default();
        let d = mapping.to_device(LPoint::new(100.0, 50.0), &vp);
        assert_eq!(d, DPoint::new(100.0, 50.0));
    }

    #[test]
    fn test_anisotropic_axes_independent() {
        let mut mapping = Mapping::default();
        let mut vp = Viewport::default();
        mapping.set_mode(MM_ANISOTROPIC, None, &vp).unwrap();
        mapping.window.width = 1000;
        mapping.window.height = 1000;
        mapping.recompute(&vp).unwrap();
        vp.width = 500;
        vp.height = 250;
        mapping.recompute(&vp).unwrap();
        assert_eq!(mapping.pixel_width(), 0.5);
        assert_eq!(mapping.pixel_height(), 0.25);
    }

    #[test]
    fn test_isotropic_takes_smaller_magnitude() {
        let mut mapping = Mapping::default();
        let vp = Viewport {
            width: 500,
            height: -250,
            ..Viewport::default()
        };
        mapping.window.width = 1000;
        mapping.window.height = 1000;
        mapping.set_mode(MM_ISOTROPIC, None, &vp).unwrap();
        assert_eq!(mapping.pixel_width(), 0.25);
        assert_eq!(mapping.pixel_height(), -0.25);
    }

    #[test]
    fn test_zero_extent_is_bad_format() {
        let mut mapping = Mapping::default();
        let vp = Viewport::default();
        mapping.set_mode(MM_ANISOTROPIC, None, &vp).unwrap();
        mapping.window.width = 0;
        assert!(matches!(mapping.recompute(&vp), Err(WmfError::BadFormat(_))));
    }

    #[test]
    fn test_fixed_mode_mirrors_negative_window() {
        let mut mapping = Mapping::default();
        let vp = Viewport::default();
        mapping.set_mode(MM_TWIPS, None, &vp).unwrap();
        mapping.window.height = -1000;
        assert_eq!(mapping.pixel_width(), 0.05);
        assert_eq!(mapping.pixel_height(), -0.05);
        assert_eq!(mapping.raw_pixel_size(), (0.05, 0.05));
    }

    #[test]
    fn test_unknown_mode() {
        let mut mapping = Mapping::default();
        let vp = Viewport::default();
        assert!(mapping.set_mode(42, None, &vp).is_err());

        mapping.set_mode(42, Some(1440), &vp).unwrap();
        assert_eq!(mapping.mode, MapMode::Dpi);
        assert_eq!(mapping.pixel_width(), 0.05);
    }

    #[test]
    fn test_round_trip() {
        let mut mapping = Mapping::default();
        let vp = Viewport {
            origin: DPoint::new(3.0, -7.0),
            width: 300,
            height: -600,
        };
        mapping.window = Window {
            ox: 10,
            oy: 20,
            width: 1200,
            height: 1200,
        };
        mapping.set_mode(MM_ANISOTROPIC, None, &vp).unwrap();

        let l = LPoint::new(250.0, -125.0);
        let back = mapping.to_logical(mapping.to_device(l, &vp), &vp);
        assert!((back.x - l.x).abs() < 1e-9);
        assert!((back.y - l.y).abs() < 1e-9);
    }

    #[test]
    fn test_device_rect_normalizes() {
        let mapping = Mapping::default();
        let vp = Viewport::default();
        let r = mapping.to_device_rect(LPoint::new(10.0, 40.0), LPoint::new(-5.0, 2.0), &vp);
        assert_eq!(r, DRect::new(-5.0, 2.0, 10.0, 40.0));
    }

    #[test]
    fn test_from_words_sign_extends() {
        let p = LPoint::from_words(0xFFFF, 0x8000);
        assert_eq!(p, LPoint::new(-1.0, -32768.0));
    }
}
