//! Backend interface driven by the player during play
//!
//! A backend implements [`Device`]; every method has an empty default so a
//! backend only overrides what it can render. All coordinates handed over
//! here are device coordinates; the active [`DeviceContext`] accompanies each
//! drawing call so the backend can read pen, brush, font and clip state.

use crate::color::Rgb;
use crate::coord::{DPoint, DRect};
use crate::dc::DeviceContext;
use crate::error::WmfResult;
use crate::object::Font;

/// Bitmap decoded and owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// Backend-chosen identifier
    pub id: u32,
}

/// Opaque per-context token a backend may attach to each device context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserData(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct FloodFill {
    pub pt: DPoint,
    pub color: Rgb,
    /// FLOODFILLBORDER or FLOODFILLSURFACE
    pub kind: u16,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawPixel {
    pub pt: DPoint,
    pub color: Rgb,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

/// Elliptic arc; `start` and `end` are relative to the ellipse centre
#[derive(Debug, Clone, PartialEq)]
pub struct DrawArc {
    pub tl: DPoint,
    pub br: DPoint,
    pub start: DPoint,
    pub end: DPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawLine {
    pub from: DPoint,
    pub to: DPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolyLine {
    pub points: Vec<DPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolyPolygon {
    pub polygons: Vec<Vec<DPoint>>,
}

/// Rectangle with optional rounded corners (`width`/`height` of the corner
/// ellipse, zero for square corners)
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRectangle {
    pub tl: DPoint,
    pub br: DPoint,
    pub width: f64,
    pub height: f64,
}

/// Rectangle list of a region; `width`/`height` is the frame thickness
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolyRectangle {
    pub rects: Vec<DRect>,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RopDraw {
    pub tl: DPoint,
    pub br: DPoint,
    pub rop: u32,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

/// Device-independent bitmap embedded in a record
#[derive(Debug, Clone, PartialEq)]
pub struct BitmapRead {
    /// BITMAPINFO header, color table and pixels
    pub data: Vec<u8>,
    /// Declared size from the record, 0 when unknown
    pub width: u16,
    pub height: u16,
}

/// Source crop of a bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Crop {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BitmapDraw {
    pub pt: DPoint,
    pub bitmap: Bitmap,
    pub crop: Crop,
    pub rop: u32,
    /// Device size of one source pixel
    pub pixel_width: f64,
    pub pixel_height: f64,
}

/// Text run
#[derive(Debug, Clone, PartialEq)]
pub struct DrawText {
    /// Raw 8-bit text
    pub text: Vec<u8>,
    /// Baseline start
    pub pt: DPoint,
    /// Opaque/clip rectangle (zero when absent)
    pub tl: DPoint,
    pub br: DPoint,
    /// Rotated text box corners: top-left, top-right, bottom-left, bottom-right
    pub bbox: [DPoint; 4],
    /// ETO_* options
    pub flags: u16,
    /// Font height in device units
    pub font_height: f64,
    /// Font width / height
    pub font_ratio: f64,
}

impl DrawText {
    /// Text decoded as Latin-1
    pub fn text_lossy(&self) -> String {
        self.text.iter().map(|&b| b as char).collect()
    }
}

/// Rendering backend
#[allow(unused_variables)]
pub trait Device {
    /// Called once, before the first play
    fn device_open(&mut self) -> WmfResult<()> {
        Ok(())
    }

    fn device_close(&mut self) -> WmfResult<()> {
        Ok(())
    }

    /// Start of a play pass; `bbox` is the scanned device bounding box
    fn device_begin(&mut self, bbox: &DRect) -> WmfResult<()> {
        Ok(())
    }

    fn device_end(&mut self) -> WmfResult<()> {
        Ok(())
    }

    fn flood_interior(&mut self, dc: &DeviceContext, flood: &FloodFill) -> WmfResult<()> {
        Ok(())
    }

    fn flood_exterior(&mut self, dc: &DeviceContext, flood: &FloodFill) -> WmfResult<()> {
        Ok(())
    }

    fn draw_pixel(&mut self, dc: &DeviceContext, pixel: &DrawPixel) -> WmfResult<()> {
        Ok(())
    }

    fn draw_pie(&mut self, dc: &DeviceContext, arc: &DrawArc) -> WmfResult<()> {
        Ok(())
    }

    fn draw_chord(&mut self, dc: &DeviceContext, arc: &DrawArc) -> WmfResult<()> {
        Ok(())
    }

    fn draw_arc(&mut self, dc: &DeviceContext, arc: &DrawArc) -> WmfResult<()> {
        Ok(())
    }

    fn draw_ellipse(&mut self, dc: &DeviceContext, ellipse: &DrawArc) -> WmfResult<()> {
        Ok(())
    }

    fn draw_line(&mut self, dc: &DeviceContext, line: &DrawLine) -> WmfResult<()> {
        Ok(())
    }

    fn poly_line(&mut self, dc: &DeviceContext, line: &PolyLine) -> WmfResult<()> {
        Ok(())
    }

    fn draw_polygon(&mut self, dc: &DeviceContext, polygon: &PolyLine) -> WmfResult<()> {
        Ok(())
    }

    fn draw_polypolygon(&mut self, dc: &DeviceContext, polygons: &PolyPolygon) -> WmfResult<()> {
        Ok(())
    }

    fn draw_rectangle(&mut self, dc: &DeviceContext, rect: &DrawRectangle) -> WmfResult<()> {
        Ok(())
    }

    fn rop_draw(&mut self, dc: &DeviceContext, rop: &RopDraw) -> WmfResult<()> {
        Ok(())
    }

    fn bmp_draw(&mut self, dc: &DeviceContext, draw: &BitmapDraw) -> WmfResult<()> {
        Ok(())
    }

    /// Decode a bitmap; `None` when the backend does not keep bitmaps
    fn bmp_read(&mut self, read: &BitmapRead) -> WmfResult<Option<Bitmap>> {
        Ok(None)
    }

    fn bmp_free(&mut self, bitmap: &Bitmap) -> WmfResult<()> {
        Ok(())
    }

    fn draw_text(&mut self, dc: &DeviceContext, text: &DrawText) -> WmfResult<()> {
        Ok(())
    }

    fn udata_init(&mut self, dc: &DeviceContext) -> WmfResult<Option<UserData>> {
        Ok(None)
    }

    fn udata_copy(&mut self, dc: &DeviceContext, data: Option<UserData>) -> WmfResult<Option<UserData>> {
        Ok(data)
    }

    /// The context owning `dc.user_data` became active again
    fn udata_set(&mut self, dc: &DeviceContext) -> WmfResult<()> {
        Ok(())
    }

    fn udata_free(&mut self, dc: &DeviceContext) -> WmfResult<()> {
        Ok(())
    }

    fn region_frame(&mut self, dc: &DeviceContext, rects: &PolyRectangle) -> WmfResult<()> {
        Ok(())
    }

    fn region_paint(&mut self, dc: &DeviceContext, rects: &PolyRectangle) -> WmfResult<()> {
        Ok(())
    }

    /// The clip changed; an empty list means no clipping
    fn region_clip(&mut self, dc: &DeviceContext, rects: &PolyRectangle) -> WmfResult<()> {
        Ok(())
    }
}

/// Backend that draws nothing
#[derive(Debug, Default)]
pub struct NullDevice;

impl Device for NullDevice {}

/// Source of text advance widths
pub trait FontMetrics {
    /// Width of `text` in units of the font height
    fn string_width(&self, font: &Font, text: &[u8]) -> f32;
}

/// Every glyph advances by the same fraction of the font height
#[derive(Debug, Clone, Copy)]
pub struct FixedMetrics {
    pub advance: f32,
}

impl Default for FixedMetrics {
    fn default() -> Self {
        Self { advance: 0.5 }
    }
}

impl FontMetrics for FixedMetrics {
    fn string_width(&self, _font: &Font, text: &[u8]) -> f32 {
        self.advance * text.len() as f32
    }
}
