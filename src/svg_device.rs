//! SVG rendering backend
//!
//! Device coordinates are mapped linearly from the scanned bounding box onto
//! the output canvas. Embedded bitmaps are decoded with the `image` crate and
//! inlined as base64 PNG.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use log::debug;

use crate::coord::{DPoint, DRect};
use crate::dc::DeviceContext;
use crate::device::{
    Bitmap, BitmapDraw, BitmapRead, Device, DrawArc, DrawLine, DrawPixel, DrawRectangle, DrawText, FloodFill,
    PolyLine, PolyPolygon, PolyRectangle,
};
use crate::error::{WmfError, WmfResult};
use crate::records::*;
use crate::svg_writer::SvgWriter;

/// Size of a BITMAPFILEHEADER
const BMP_FILE_HEADER: usize = 14;
const BI_BITFIELDS: u32 = 3;

#[derive(Debug, Clone)]
pub struct SvgOptions {
    /// Canvas size; 0 takes the size of the bounding box
    pub width: u32,
    pub height: u32,
    /// Text for the `<desc>` element
    pub description: Option<String>,
    /// Embed bitmaps as base64 PNG; when unset bitmaps are skipped
    pub inline_images: bool,
    /// Log unsupported operations instead of failing
    pub ignore_nonfatal: bool,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            description: None,
            inline_images: true,
            ignore_nonfatal: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ArcKind {
    Open,
    Chord,
    Pie,
}

/// Backend writing an SVG document per play
pub struct SvgDevice {
    options: SvgOptions,
    bbox: DRect,
    writer: Option<SvgWriter>,
    output: Option<String>,
    bitmaps: HashMap<u32, DynamicImage>,
    next_bitmap: u32,
}

impl SvgDevice {
    pub fn new(options: SvgOptions) -> Self {
        Self {
            options,
            bbox: DRect::default(),
            writer: None,
            output: None,
            bitmaps: HashMap::new(),
            next_bitmap: 1,
        }
    }

    /// Document produced by the last completed play
    pub fn take_svg(&mut self) -> Option<String> {
        self.output.take()
    }

    fn canvas(&self) -> (f64, f64) {
        match &self.writer {
            Some(writer) => (writer.width() as f64, writer.height() as f64),
            None => (0.0, 0.0),
        }
    }

    fn translate(&self, pt: DPoint) -> (f64, f64) {
        let (w, h) = self.canvas();
        (
            (pt.x - self.bbox.tl.x) / self.bbox.width() * w,
            (pt.y - self.bbox.tl.y) / self.bbox.height() * h,
        )
    }

    fn scale_width(&self, width: f64) -> f64 {
        width * self.canvas().0 / self.bbox.width()
    }

    fn scale_height(&self, height: f64) -> f64 {
        height * self.canvas().1 / self.bbox.height()
    }

    fn unsupported(&self, what: &str) -> WmfResult<()> {
        if self.options.ignore_nonfatal {
            debug!("{} unsupported", what);
            Ok(())
        } else {
            Err(WmfError::glitch(format!("{} unsupported", what)))
        }
    }

    fn fill_style(&self, dc: &DeviceContext) -> WmfResult<String> {
        let brush = &dc.brush;
        if brush.is_null() {
            return Ok("fill:none".to_string());
        }

        match brush.style {
            BS_SOLID => {}
            BS_DIBPATTERN if brush.bitmap.get().is_none() => self.unsupported("fill with missing pattern")?,
            _ => self.unsupported("brush style")?,
        }

        let opacity = if dc.is_opaque() { "1.0" } else { "0.5" };
        let rule = if dc.polyfill_mode == WINDING { "nonzero" } else { "evenodd" };
        Ok(format!(
            "fill-opacity:{}; fill-rule:{}; fill:{}",
            opacity,
            rule,
            brush.color.to_hex()
        ))
    }

    fn stroke_style(&self, dc: &DeviceContext) -> String {
        let pen = &dc.pen;
        if pen.is_null() {
            return "stroke:none".to_string();
        }

        let width = ((self.scale_width(pen.width) + self.scale_height(pen.height)) / 2.0).max(0.0);
        let cap = match pen.endcap {
            PS_ENDCAP_SQUARE => "square",
            PS_ENDCAP_ROUND => "round",
            _ => "butt",
        };
        let join = match pen.join {
            PS_JOIN_BEVEL => "bevel",
            PS_JOIN_ROUND => "round",
            _ => "miter",
        };
        let dash = match pen.style {
            PS_DASH => format!("{:.3} {:.3}", width * 10.0, width * 10.0),
            PS_DOT => format!("{:.3} {:.3}", width, width * 2.0),
            PS_DASHDOT => format!("{:.3} {:.3} {:.3} {:.3}", width * 10.0, width * 2.0, width, width * 2.0),
            PS_DASHDOTDOT => format!(
                "{:.3} {:.3} {:.3} {:.3} {:.3} {:.3}",
                width * 10.0,
                width * 2.0,
                width,
                width * 2.0,
                width,
                width * 2.0
            ),
            _ => "none".to_string(),
        };

        format!(
            "stroke-width:{:.3}; stroke-linecap:{}; stroke-linejoin:{}; stroke-dasharray:{}; stroke:{}",
            width,
            cap,
            join,
            dash,
            pen.color.to_hex()
        )
    }

    fn shape_style(&self, dc: &DeviceContext) -> WmfResult<String> {
        Ok(format!("{}; {}", self.fill_style(dc)?, self.stroke_style(dc)))
    }

    fn visible(dc: &DeviceContext) -> bool {
        !dc.brush.is_null() || !dc.pen.is_null()
    }

    fn draw_arc_path(&mut self, dc: &DeviceContext, arc: &DrawArc, kind: ArcKind) -> WmfResult<()> {
        if arc.start.x == arc.end.x || arc.start.y == arc.end.y {
            return self.draw_ellipse(dc, arc);
        }
        if !Self::visible(dc) {
            return Ok(());
        }

        let centre = DPoint::new((arc.tl.x + arc.br.x) / 2.0, (arc.tl.y + arc.br.y) / 2.0);
        let (sx, sy) = self.translate(DPoint::new(centre.x + arc.start.x, centre.y + arc.start.y));
        let (ex, ey) = self.translate(DPoint::new(centre.x + arc.end.x, centre.y + arc.end.y));
        let (tlx, tly) = self.translate(arc.tl);
        let (brx, bry) = self.translate(arc.br);
        let (cx, cy) = ((tlx + brx) / 2.0, (tly + bry) / 2.0);

        // Counter-clockwise on the page runs towards smaller angles with y down
        let a0 = (sy - cy).atan2(sx - cx);
        let a1 = (ey - cy).atan2(ex - cx);
        let sweep = (a0 - a1).rem_euclid(2.0 * PI);
        let large = if sweep > PI { 1 } else { 0 };

        let mut d = format!(
            "M{:.3},{:.3} A{:.3},{:.3} 0 {},0 {:.3},{:.3}",
            sx,
            sy,
            ((brx - tlx) / 2.0).abs(),
            ((bry - tly) / 2.0).abs(),
            large,
            ex,
            ey
        );
        if let ArcKind::Pie = kind {
            d.push_str(&format!(" L{:.3},{:.3}", cx, cy));
        }
        if !matches!(kind, ArcKind::Open) {
            d.push_str(" Z");
        }

        let style = match kind {
            ArcKind::Open => format!("fill:none; {}", self.stroke_style(dc)),
            _ => self.shape_style(dc)?,
        };
        if let Some(writer) = self.writer.as_mut() {
            writer.add_path(&d, &style);
        }
        Ok(())
    }

    fn points(&self, points: &[DPoint]) -> Vec<(f64, f64)> {
        points.iter().map(|&pt| self.translate(pt)).collect()
    }

    /// Decode a DIB by giving it the file header the BMP decoder expects
    fn decode_dib(data: &[u8]) -> WmfResult<DynamicImage> {
        let word = |at: usize| -> WmfResult<u32> {
            data.get(at..at + 4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .ok_or_else(|| WmfError::bad_format("bitmap header truncated"))
        };
        let half = |at: usize| -> WmfResult<u32> {
            data.get(at..at + 2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]) as u32)
                .ok_or_else(|| WmfError::bad_format("bitmap header truncated"))
        };

        let header_size = word(0)? as usize;
        let palette_size = if header_size == 12 {
            let bits = half(10)?;
            if bits <= 8 {
                3usize << bits
            } else {
                0
            }
        } else {
            let bits = half(14)?;
            let compression = word(16)?;
            let used = word(32)? as usize;
            let entries = if used != 0 {
                used
            } else if bits <= 8 {
                1usize << bits
            } else {
                0
            };
            let masks = if compression == BI_BITFIELDS && header_size == 40 { 12 } else { 0 };
            entries * 4 + masks
        };

        let offset = (BMP_FILE_HEADER + header_size + palette_size) as u32;
        let file_size = (BMP_FILE_HEADER + data.len()) as u32;
        let mut bmp = Vec::with_capacity(file_size as usize);
        bmp.extend_from_slice(b"BM");
        bmp.extend_from_slice(&file_size.to_le_bytes());
        bmp.extend_from_slice(&0u32.to_le_bytes());
        bmp.extend_from_slice(&offset.to_le_bytes());
        bmp.extend_from_slice(data);

        image::load_from_memory_with_format(&bmp, ImageFormat::Bmp)
            .map_err(|e| WmfError::bad_format(format!("bitmap decode failed: {}", e)))
    }
}

impl Device for SvgDevice {
    fn device_begin(&mut self, bbox: &DRect) -> WmfResult<()> {
        if bbox.br.x <= bbox.tl.x || bbox.br.y <= bbox.tl.y {
            return Err(WmfError::glitch("bounding box has null or negative size"));
        }
        self.bbox = *bbox;

        let width = if self.options.width == 0 {
            bbox.width().ceil() as u32
        } else {
            self.options.width
        };
        let height = if self.options.height == 0 {
            bbox.height().ceil() as u32
        } else {
            self.options.height
        };
        debug!("SVG canvas {}x{}", width, height);

        let mut writer = SvgWriter::new(width, height);
        if let Some(description) = &self.options.description {
            writer.set_description(description);
        }
        self.writer = Some(writer);
        Ok(())
    }

    fn device_end(&mut self) -> WmfResult<()> {
        if let Some(writer) = self.writer.take() {
            debug!("SVG document with {} elements", writer.len());
            self.output = Some(writer.finish());
        }
        Ok(())
    }

    fn flood_interior(&mut self, _dc: &DeviceContext, _flood: &FloodFill) -> WmfResult<()> {
        self.unsupported("flood_interior")
    }

    fn flood_exterior(&mut self, _dc: &DeviceContext, _flood: &FloodFill) -> WmfResult<()> {
        self.unsupported("flood_exterior")
    }

    fn draw_pixel(&mut self, _dc: &DeviceContext, pixel: &DrawPixel) -> WmfResult<()> {
        let (x, y) = self.translate(pixel.pt);
        let width = self.scale_width(pixel.pixel_width);
        let height = self.scale_height(pixel.pixel_height);
        let style = format!("fill:{}; stroke:none", pixel.color.to_hex());
        if let Some(writer) = self.writer.as_mut() {
            writer.add_rect(x, y, width, height, None, &style);
        }
        Ok(())
    }

    fn draw_pie(&mut self, dc: &DeviceContext, arc: &DrawArc) -> WmfResult<()> {
        self.draw_arc_path(dc, arc, ArcKind::Pie)
    }

    fn draw_chord(&mut self, dc: &DeviceContext, arc: &DrawArc) -> WmfResult<()> {
        self.draw_arc_path(dc, arc, ArcKind::Chord)
    }

    fn draw_arc(&mut self, dc: &DeviceContext, arc: &DrawArc) -> WmfResult<()> {
        self.draw_arc_path(dc, arc, ArcKind::Open)
    }

    fn draw_ellipse(&mut self, dc: &DeviceContext, ellipse: &DrawArc) -> WmfResult<()> {
        if !Self::visible(dc) {
            return Ok(());
        }
        let (tlx, tly) = self.translate(ellipse.tl);
        let (brx, bry) = self.translate(ellipse.br);
        let style = self.shape_style(dc)?;
        if let Some(writer) = self.writer.as_mut() {
            writer.add_ellipse(
                (brx + tlx) / 2.0,
                (bry + tly) / 2.0,
                ((brx - tlx) / 2.0).abs(),
                ((bry - tly) / 2.0).abs(),
                &style,
            );
        }
        Ok(())
    }

    fn draw_line(&mut self, dc: &DeviceContext, line: &DrawLine) -> WmfResult<()> {
        if dc.pen.is_null() {
            return Ok(());
        }
        let (x1, y1) = self.translate(line.from);
        let (x2, y2) = self.translate(line.to);
        let style = self.stroke_style(dc);
        if let Some(writer) = self.writer.as_mut() {
            writer.add_line(x1, y1, x2, y2, &style);
        }
        Ok(())
    }

    fn poly_line(&mut self, dc: &DeviceContext, line: &PolyLine) -> WmfResult<()> {
        if line.points.len() <= 1 || dc.pen.is_null() {
            return Ok(());
        }
        let points = self.points(&line.points);
        let style = format!("fill:none; {}", self.stroke_style(dc));
        if let Some(writer) = self.writer.as_mut() {
            writer.add_polyline(&points, &style);
        }
        Ok(())
    }

    fn draw_polygon(&mut self, dc: &DeviceContext, polygon: &PolyLine) -> WmfResult<()> {
        if polygon.points.len() <= 2 || !Self::visible(dc) {
            return Ok(());
        }
        let points = self.points(&polygon.points);
        let style = self.shape_style(dc)?;
        if let Some(writer) = self.writer.as_mut() {
            writer.add_polygon(&points, &style);
        }
        Ok(())
    }

    fn draw_polypolygon(&mut self, dc: &DeviceContext, polygons: &PolyPolygon) -> WmfResult<()> {
        if !Self::visible(dc) {
            return Ok(());
        }

        let mut d = String::new();
        for polygon in polygons.polygons.iter().filter(|p| p.len() > 2) {
            let points = self.points(polygon);
            d.push_str(&format!("M{:.3},{:.3} L", points[0].0, points[0].1));
            for (x, y) in &points[1..] {
                d.push_str(&format!("{:.3},{:.3} ", x, y));
            }
            d.push('Z');
        }
        if d.is_empty() {
            return Ok(());
        }

        let style = self.shape_style(dc)?;
        if let Some(writer) = self.writer.as_mut() {
            writer.add_path(&d, &style);
        }
        Ok(())
    }

    fn draw_rectangle(&mut self, dc: &DeviceContext, rect: &DrawRectangle) -> WmfResult<()> {
        if !Self::visible(dc) {
            return Ok(());
        }
        let (tlx, tly) = self.translate(rect.tl);
        let (brx, bry) = self.translate(rect.br);
        let corner = if rect.width > 0.0 || rect.height > 0.0 {
            Some((self.scale_width(rect.width) / 2.0, self.scale_height(rect.height) / 2.0))
        } else {
            None
        };
        let style = self.shape_style(dc)?;
        if let Some(writer) = self.writer.as_mut() {
            writer.add_rect(tlx, tly, brx - tlx, bry - tly, corner, &style);
        }
        Ok(())
    }

    fn bmp_read(&mut self, read: &BitmapRead) -> WmfResult<Option<Bitmap>> {
        let image = match Self::decode_dib(&read.data) {
            Ok(image) => image,
            Err(err) if self.options.ignore_nonfatal => {
                debug!("{}; bitmap dropped", err);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let id = self.next_bitmap;
        self.next_bitmap += 1;
        let bitmap = Bitmap {
            width: image.width(),
            height: image.height(),
            id,
        };
        self.bitmaps.insert(id, image);
        Ok(Some(bitmap))
    }

    fn bmp_free(&mut self, bitmap: &Bitmap) -> WmfResult<()> {
        self.bitmaps.remove(&bitmap.id);
        Ok(())
    }

    fn bmp_draw(&mut self, _dc: &DeviceContext, draw: &BitmapDraw) -> WmfResult<()> {
        if !self.options.inline_images {
            debug!("bitmap {} skipped; inline images disabled", draw.bitmap.id);
            return Ok(());
        }
        let image = match self.bitmaps.get(&draw.bitmap.id) {
            Some(image) => image,
            None => return Err(WmfError::glitch(format!("bitmap {} was not read", draw.bitmap.id))),
        };

        // Source rows count from the bottom of the bitmap
        let crop = draw.crop;
        let top = image.height().saturating_sub(crop.y as u32 + crop.h as u32);
        let cropped = image.crop_imm(crop.x as u32, top, crop.w as u32, crop.h as u32);

        let mut png = Vec::new();
        cropped
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| WmfError::DeviceError(format!("PNG encode failed: {}", e)))?;

        let (x, y) = self.translate(draw.pt);
        let width = self.scale_width(draw.pixel_width * crop.w as f64).abs();
        let height = self.scale_height(draw.pixel_height * crop.h as f64).abs();
        if let Some(writer) = self.writer.as_mut() {
            writer.add_image(x, y, width, height, &png, "image/png");
        }
        Ok(())
    }

    fn draw_text(&mut self, dc: &DeviceContext, text: &DrawText) -> WmfResult<()> {
        let (x, y) = self.translate(text.pt);
        let font_height = self.scale_height(text.font_height);
        let theta = -(dc.font.escapement as f64 / 10.0).to_radians();
        let (sin, cos) = theta.sin_cos();

        let font = &dc.font;
        let family: String = font.name.chars().filter(|c| !matches!(c, '\'' | ';' | '"')).collect();
        let style = format!(
            "font-family:'{}'; font-style:{}; font-weight:{}; font-size:{:.3}; fill:{}",
            family,
            if font.italic { "italic" } else { "normal" },
            if font.weight >= 700 { "bold" } else { "normal" },
            font_height,
            dc.text_color.to_hex()
        );
        let transform = format!(
            "matrix({:.6} {:.6} {:.6} {:.6} {:.3} {:.3})",
            cos, sin, -sin, cos, x, y
        );

        let content = text.text_lossy();
        if let Some(writer) = self.writer.as_mut() {
            writer.add_text_styled(&content, &style, &transform);
        }
        Ok(())
    }

    fn region_frame(&mut self, dc: &DeviceContext, rects: &PolyRectangle) -> WmfResult<()> {
        let fill = self.fill_style(dc)?;
        let frame_w = self.scale_width(rects.width);
        let frame_h = self.scale_height(rects.height);
        for rect in &rects.rects {
            let (tlx, tly) = self.translate(rect.tl);
            let (brx, bry) = self.translate(rect.br);
            let bands = [
                (tlx, tly, brx - tlx, frame_h),
                (tlx, bry - frame_h, brx - tlx, frame_h),
                (tlx, tly, frame_w, bry - tly),
                (brx - frame_w, tly, frame_w, bry - tly),
            ];
            if let Some(writer) = self.writer.as_mut() {
                for (x, y, w, h) in bands {
                    writer.add_rect(x, y, w, h, None, &format!("{}; stroke:none", fill));
                }
            }
        }
        Ok(())
    }

    fn region_paint(&mut self, dc: &DeviceContext, rects: &PolyRectangle) -> WmfResult<()> {
        if dc.brush.is_null() {
            return Ok(());
        }
        let style = format!("{}; stroke:none", self.fill_style(dc)?);
        for rect in &rects.rects {
            let (tlx, tly) = self.translate(rect.tl);
            let (brx, bry) = self.translate(rect.br);
            if let Some(writer) = self.writer.as_mut() {
                writer.add_rect(tlx, tly, brx - tlx, bry - tly, None, &style);
            }
        }
        Ok(())
    }

    fn region_clip(&mut self, _dc: &DeviceContext, rects: &PolyRectangle) -> WmfResult<()> {
        debug!("clip with {} rectangles not applied to SVG output", rects.rects.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::object::{Brush, Pen};
    use std::rc::Rc;

    fn begun(options: SvgOptions) -> SvgDevice {
        let mut device = SvgDevice::new(options);
        device.device_begin(&DRect::new(0.0, 0.0, 100.0, 50.0)).unwrap();
        device
    }

    fn solid_dc() -> DeviceContext {
        let mut dc = DeviceContext::default();
        dc.brush = Rc::new(Brush {
            style: BS_SOLID,
            color: Rgb::new(0xff, 0, 0),
            ..Brush::default()
        });
        dc
    }

    #[test]
    fn test_degenerate_bbox_is_glitch() {
        let mut device = SvgDevice::new(SvgOptions::default());
        let result = device.device_begin(&DRect::default());
        assert!(matches!(result, Err(WmfError::Glitch(_))));
    }

    #[test]
    fn test_canvas_scaling() {
        let device = begun(SvgOptions {
            width: 200,
            height: 100,
            ..SvgOptions::default()
        });
        assert_eq!(device.translate(DPoint::new(50.0, 25.0)), (100.0, 50.0));
        assert_eq!(device.scale_width(10.0), 20.0);
    }

    #[test]
    fn test_rectangle_output() {
        let mut device = begun(SvgOptions::default());
        let dc = solid_dc();
        device
            .draw_rectangle(
                &dc,
                &DrawRectangle {
                    tl: DPoint::new(0.0, 0.0),
                    br: DPoint::new(100.0, 50.0),
                    width: 0.0,
                    height: 0.0,
                },
            )
            .unwrap();
        device.device_end().unwrap();
        let svg = device.take_svg().unwrap();
        assert!(svg.contains("<rect"));
        assert!(svg.contains("fill:#ff0000"));
        assert!(svg.contains("width=\"100\""));
    }

    #[test]
    fn test_null_pen_and_brush_draw_nothing() {
        let mut device = begun(SvgOptions::default());
        let mut dc = DeviceContext::default();
        dc.pen = Rc::new(Pen {
            style: PS_NULL,
            ..Pen::default()
        });
        device
            .draw_polygon(
                &dc,
                &PolyLine {
                    points: vec![DPoint::new(0.0, 0.0), DPoint::new(10.0, 0.0), DPoint::new(10.0, 10.0)],
                },
            )
            .unwrap();
        assert!(device.writer.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_dash_style() {
        let device = begun(SvgOptions::default());
        let mut dc = DeviceContext::default();
        dc.pen = Rc::new(Pen {
            style: PS_DASH,
            width: 2.0,
            height: 2.0,
            ..Pen::default()
        });
        let style = device.stroke_style(&dc);
        assert!(style.contains("stroke-dasharray:20.000 20.000"));
        assert!(style.contains("stroke-linecap:round"));
    }

    #[test]
    fn test_hatched_brush_strict_and_lenient() {
        let device = begun(SvgOptions::default());
        let mut dc = DeviceContext::default();
        dc.brush = Rc::new(Brush {
            style: BS_HATCHED,
            ..Brush::default()
        });
        assert!(matches!(device.fill_style(&dc), Err(WmfError::Glitch(_))));

        let lenient = begun(SvgOptions {
            ignore_nonfatal: true,
            ..SvgOptions::default()
        });
        assert!(lenient.fill_style(&dc).is_ok());
    }

    #[test]
    fn test_flood_unsupported() {
        let mut device = begun(SvgOptions::default());
        let flood = FloodFill {
            pt: DPoint::default(),
            color: Rgb::BLACK,
            kind: FLOODFILLBORDER,
            pixel_width: 1.0,
            pixel_height: 1.0,
        };
        let dc = DeviceContext::default();
        assert!(matches!(device.flood_interior(&dc, &flood), Err(WmfError::Glitch(_))));
    }

    #[test]
    fn test_decode_dib_one_pixel() {
        // 1x1 24-bit BITMAPINFOHEADER DIB, blue pixel padded to 4 bytes
        let mut dib = Vec::new();
        dib.extend_from_slice(&40u32.to_le_bytes());
        dib.extend_from_slice(&1i32.to_le_bytes());
        dib.extend_from_slice(&1i32.to_le_bytes());
        dib.extend_from_slice(&1u16.to_le_bytes());
        dib.extend_from_slice(&24u16.to_le_bytes());
        dib.extend_from_slice(&0u32.to_le_bytes());
        dib.extend_from_slice(&4u32.to_le_bytes());
        dib.extend_from_slice(&0i32.to_le_bytes());
        dib.extend_from_slice(&0i32.to_le_bytes());
        dib.extend_from_slice(&0u32.to_le_bytes());
        dib.extend_from_slice(&0u32.to_le_bytes());
        dib.extend_from_slice(&[0xff, 0x00, 0x00, 0x00]);

        let mut device = begun(SvgOptions::default());
        let bitmap = device
            .bmp_read(&BitmapRead {
                data: dib,
                width: 1,
                height: 1,
            })
            .unwrap()
            .unwrap();
        assert_eq!((bitmap.width, bitmap.height), (1, 1));

        let draw = BitmapDraw {
            pt: DPoint::new(10.0, 10.0),
            bitmap,
            crop: crate::device::Crop { x: 0, y: 0, w: 1, h: 1 },
            rop: 0x00CC_0020,
            pixel_width: 5.0,
            pixel_height: 5.0,
        };
        device.bmp_draw(&DeviceContext::default(), &draw).unwrap();
        device.bmp_free(&bitmap).unwrap();
        device.device_end().unwrap();
        assert!(device.take_svg().unwrap().contains("data:image/png;base64,"));
    }

    #[test]
    fn test_truncated_dib() {
        let mut device = begun(SvgOptions::default());
        let read = BitmapRead {
            data: vec![40, 0],
            width: 0,
            height: 0,
        };
        assert!(matches!(device.bmp_read(&read), Err(WmfError::BadFormat(_))));
    }
}
