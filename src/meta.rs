//! Record handlers
//!
//! Every handler decodes one record, updates the pass state and describes
//! what the record means for the bounding box, the color table and the
//! backend as an [`Effect`]. Handlers behave the same in both passes; the
//! player decides which parts of the effect apply.

use std::rc::Rc;

use log::{debug, trace, warn};

use crate::color::Rgb;
use crate::coord::{DPoint, DRect, LPoint};
use crate::dc::DeviceContext;
use crate::device::{
    Bitmap, BitmapDraw, BitmapRead, Crop, DrawArc, DrawLine, DrawPixel, DrawRectangle, DrawText, FloodFill,
    PolyLine, PolyPolygon, PolyRectangle, RopDraw,
};
use crate::error::{WmfError, WmfResult};
use crate::object::{Brush, Font, GraphicsObject, Pen};
use crate::player::PassState;
use crate::records::*;
use crate::region::{combine_clip, ClipOp, Region};
use crate::stream::{Params, Record};

const SRCCOPY: u32 = 0x00CC_0020;

/// Fraction of the font height above the baseline
const ASCENT: f64 = 0.77;
/// Fraction of the font height below the baseline
const DESCENT: f64 = 0.23;

/// Backend work requested by a record, carried out only during play
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DeviceCall {
    FloodInterior(FloodFill),
    FloodExterior(FloodFill),
    Pixel(DrawPixel),
    Arc(DrawArc),
    Chord(DrawArc),
    Pie(DrawArc),
    Ellipse(DrawArc),
    Line(DrawLine),
    PolyLine(PolyLine),
    Polygon(PolyLine),
    PolyPolygon(PolyPolygon),
    Rectangle(DrawRectangle),
    Rop(RopDraw),
    /// Decode, draw and release an embedded bitmap
    Dib(DibDraw),
    /// Decode the pattern of a freshly created brush
    PatternBrush { brush: Rc<Brush>, read: BitmapRead },
    FreeBitmap(Bitmap),
    Text(DrawText),
    RegionClip(PolyRectangle),
    /// Paint with the active DC, optionally overriding brush or raster op
    RegionPaint {
        rects: PolyRectangle,
        brush: Option<Rc<Brush>>,
        rop: Option<u16>,
    },
    RegionFrame { rects: PolyRectangle, brush: Rc<Brush> },
    /// The active DC is a fresh copy of the saved one
    CopyUserData,
    /// A DC was discarded by a restore
    FreeUserData(Box<DeviceContext>),
    /// The active DC changed back to a saved one
    SetUserData,
}

/// Bitmap record as decoded, before the bitmap size is known
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DibDraw {
    pub read: BitmapRead,
    pub pt: DPoint,
    pub crop: Crop,
    pub rop: u32,
    /// Destination size in logical units
    pub width: u16,
    pub height: u16,
    /// Absolute device size of one logical unit
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl DibDraw {
    /// Clamp the crop to the decoded bitmap and derive the per-pixel size.
    ///
    /// `None` when nothing of the bitmap is left to draw.
    pub fn fit(&self, bitmap: Bitmap) -> Option<BitmapDraw> {
        let bw = bitmap.width;
        let bh = bitmap.height;
        let mut crop = self.crop;

        if crop.x as u32 >= bw {
            crop.x = 0;
        }
        if crop.y as u32 >= bh {
            crop.y = 0;
        }
        if crop.x as u32 + crop.w as u32 >= bw {
            crop.w = bw.saturating_sub(crop.x as u32).min(u16::MAX as u32) as u16;
        }
        if crop.y as u32 + crop.h as u32 >= bh {
            crop.h = bh.saturating_sub(crop.y as u32).min(u16::MAX as u32) as u16;
        }
        if crop.w == 0 || crop.h == 0 {
            return None;
        }

        let stretch_x = self.width as f64 / crop.w as f64;
        let stretch_y = self.height as f64 / crop.h as f64;

        Some(BitmapDraw {
            pt: self.pt,
            bitmap,
            crop,
            rop: self.rop,
            pixel_width: self.pixel_width * stretch_x,
            pixel_height: self.pixel_height * stretch_y,
        })
    }
}

/// What one record contributes to the pass
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Effect {
    /// Device points with their scope, for the scan bounding box
    pub registrations: Vec<(DPoint, f64)>,
    /// Colors for the scan color table
    pub colors: Vec<Rgb>,
    pub calls: Vec<DeviceCall>,
}

impl Effect {
    fn register(&mut self, pt: DPoint, scope: f64) {
        self.registrations.push((pt, scope));
    }

    fn color(&mut self, rgb: Rgb) {
        self.colors.push(rgb);
    }

    fn call(&mut self, call: DeviceCall) {
        self.calls.push(call);
    }
}

/// Dispatch one record to its handler
pub(crate) fn handle_record(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    match record.function {
        META_SETMAPMODE => handle_mapmode(st, record),
        META_SETWINDOWORG | META_SETWINDOWEXT | META_OFFSETWINDOWORG | META_SETVIEWPORTORG
        | META_SETVIEWPORTEXT | META_OFFSETVIEWPORTORG => handle_orgext(st, record),
        META_SCALEWINDOWEXT | META_SCALEVIEWPORTEXT => handle_scale(st, record),
        META_MOVETO => handle_moveto(st, record),
        META_FLOODFILL | META_EXTFLOODFILL => handle_flood(st, record),
        META_SETPIXEL => handle_pixel(st, record),
        META_ARC | META_CHORD | META_PIE => handle_arc(st, record),
        META_ELLIPSE => handle_ellipse(st, record),
        META_LINETO => handle_lineto(st, record),
        META_POLYLINE | META_POLYGON => handle_poly(st, record),
        META_POLYPOLYGON => handle_polypolygon(st, record),
        META_ROUNDRECT | META_RECTANGLE => handle_rectangle(st, record),
        META_FILLREGION | META_FRAMEREGION => handle_region_brush(st, record),
        META_PAINTREGION | META_INVERTREGION => handle_region_paint(st, record),
        META_CREATEREGION => handle_region_create(st, record),
        META_SELECTCLIPREGION => handle_clip_select(st, record),
        META_OFFSETCLIPRGN => handle_clip_offset(st, record),
        META_EXCLUDECLIPRECT | META_INTERSECTCLIPRECT => handle_clip_combine(st, record),
        META_DIBBITBLT if record.size() == 9 => handle_rop_draw(st, record),
        META_SETDIBTODEV | META_STRETCHDIB | META_DIBSTRETCHBLT | META_DIBBITBLT => handle_dib_draw(st, record),
        META_DIBCREATEPATTERNBRUSH => handle_dib_brush(st, record),
        META_PATBLT => handle_rop_draw(st, record),
        META_SETROP2 | META_SETTEXTJUSTIFICATION | META_SETTEXTCHAREXTRA | META_SETPOLYFILLMODE
        | META_SETTEXTALIGN | META_SETBKMODE => handle_dc_set(st, record),
        META_SETTEXTCOLOR | META_SETBKCOLOR => handle_dc_color(st, record),
        META_SELECTOBJECT => handle_select(st, record),
        META_SAVEDC => handle_save(st),
        META_RESTOREDC => handle_restore(st),
        META_TEXTOUT | META_EXTTEXTOUT => handle_text(st, record),
        META_CREATEPENINDIRECT => handle_pen_create(st, record),
        META_CREATEBRUSHINDIRECT => handle_brush_create(st, record),
        META_CREATEFONTINDIRECT => handle_font_create(st, record),
        META_CREATEPALETTE => handle_palette_create(st),
        META_DELETEOBJECT => handle_delete(st, record),
        META_SETRELABS | META_SETSTRETCHBLTMODE | META_SETMAPPERFLAGS | META_REALIZEPALETTE
        | META_SELECTPALETTE | META_SETPALENTRIES | META_RESIZEPALETTE | META_ANIMATEPALETTE | META_ESCAPE => {
            trace!("{}: not interpreted", get_record_name(record.function));
            Ok(Effect::default())
        }
        other => {
            debug!("unknown record 0x{:04x} ({} words) ignored", other, record.size());
            Ok(Effect::default())
        }
    }
}

fn point(p: &Params, x: usize, y: usize) -> WmfResult<LPoint> {
    Ok(LPoint::from_words(p.u16(x)?, p.u16(y)?))
}

fn corners(rect: &DRect) -> (DPoint, DPoint) {
    (rect.tl, rect.br)
}

fn poly_rects(region: &Region) -> PolyRectangle {
    PolyRectangle {
        rects: region.rects().to_vec(),
        width: 0.0,
        height: 0.0,
    }
}

/// Handle META_SETMAPMODE record
fn handle_mapmode(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let mode = record.params().u16(0)?;
    let dpi = st.header.placeable.map(|p| p.inch);
    st.dc.mapping.set_mode(mode, dpi, &st.viewport)?;
    Ok(Effect::default())
}

/// Handle window and viewport origin/extent records
fn handle_orgext(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let x = p.s32(1)?;
    let y = p.s32(0)?;
    let (pw, ph) = st.dc.mapping.raw_pixel_size();

    match record.function {
        META_SETWINDOWORG => {
            st.dc.mapping.window.ox = x;
            st.dc.mapping.window.oy = y;
        }
        META_SETWINDOWEXT => {
            st.dc.mapping.window.width = x;
            st.dc.mapping.window.height = y;
            st.dc.mapping.recompute(&st.viewport)?;
        }
        META_OFFSETWINDOWORG => {
            st.dc.mapping.window.ox += x;
            st.dc.mapping.window.oy += y;
        }
        META_SETVIEWPORTORG => {
            st.viewport.origin = DPoint::new(x as f64 * pw, y as f64 * ph);
        }
        META_SETVIEWPORTEXT => {
            st.viewport.width = x;
            st.viewport.height = y;
            st.dc.mapping.recompute(&st.viewport)?;
        }
        META_OFFSETVIEWPORTORG => {
            st.viewport.origin.x += x as f64 * pw;
            st.viewport.origin.y += y as f64 * ph;
        }
        other => return Err(WmfError::glitch(format!("orgext handler given record 0x{:04x}", other))),
    }
    Ok(Effect::default())
}

/// Handle META_SCALEWINDOWEXT and META_SCALEVIEWPORTEXT records
fn handle_scale(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let x2 = p.s32(3)? as f64;
    let x1 = p.s32(2)?;
    let y2 = p.s32(1)? as f64;
    let y1 = p.s32(0)?;

    if x1 == 0 || y1 == 0 {
        return Err(WmfError::bad_format("scale record divides by zero"));
    }
    let (x1, y1) = (x1 as f64, y1 as f64);

    if record.function == META_SCALEWINDOWEXT {
        let window = &mut st.dc.mapping.window;
        window.width = (window.width as f64 * x2 / x1) as i32;
        window.height = (window.height as f64 * y2 / y1) as i32;
    } else {
        st.viewport.width = (st.viewport.width as f64 * x2 / x1) as i32;
        st.viewport.height = (st.viewport.height as f64 * y2 / y1) as i32;
    }
    st.dc.mapping.recompute(&st.viewport)?;
    Ok(Effect::default())
}

/// Handle META_MOVETO record
fn handle_moveto(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    st.current = point(&record.params(), 1, 0)?;
    Ok(Effect::default())
}

/// Handle META_FLOODFILL and META_EXTFLOODFILL records
///
/// FLOODFILL carries color, y, x; EXTFLOODFILL puts the fill type in front.
fn handle_flood(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let (kind, first) = if record.function == META_EXTFLOODFILL {
        (p.u16(0)?, 1)
    } else {
        (FLOODFILLBORDER, 0)
    };
    let color = Rgb::from_words(p.u16(first)?, p.u16(first + 1)?);
    let pt = st.to_device(point(&p, first + 3, first + 2)?);
    let (pw, ph) = st.pixel_size();

    let flood = FloodFill {
        pt,
        color,
        kind,
        pixel_width: pw,
        pixel_height: ph,
    };

    let mut effect = Effect::default();
    effect.register(pt, 0.0);
    effect.color(color);
    if record.function == META_EXTFLOODFILL {
        effect.call(DeviceCall::FloodExterior(flood));
    } else {
        effect.call(DeviceCall::FloodInterior(flood));
    }
    Ok(effect)
}

/// Handle META_SETPIXEL record
fn handle_pixel(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let pt = st.to_device(point(&p, 3, 2)?);
    let color = Rgb::from_words(p.u16(0)?, p.u16(1)?);
    let (pw, ph) = st.pixel_size();

    let mut effect = Effect::default();
    effect.register(pt, pw.max(ph));
    effect.color(color);
    effect.call(DeviceCall::Pixel(DrawPixel {
        pt,
        color,
        pixel_width: pw,
        pixel_height: ph,
    }));
    Ok(effect)
}

/// Point on the bounding ellipse where the sweep crosses into a quadrant
fn quadrant_extreme(quadrant: u8, tl: DPoint, br: DPoint, c: DPoint) -> DPoint {
    match quadrant {
        1 => DPoint::new(br.x, c.y),
        2 => DPoint::new(c.x, tl.y),
        3 => DPoint::new(tl.x, c.y),
        _ => DPoint::new(c.x, br.y),
    }
}

fn quadrant(p: DPoint) -> u8 {
    if p.x > 0.0 && p.y >= 0.0 {
        1
    } else if p.x <= 0.0 && p.y > 0.0 {
        2
    } else if p.x < 0.0 && p.y <= 0.0 {
        3
    } else {
        4
    }
}

/// Axis extremes swept by an arc from `start` to `end` (both relative to the
/// centre), visiting quadrants in decreasing order from the start quadrant.
fn arc_extremes(tl: DPoint, br: DPoint, start: DPoint, end: DPoint) -> Vec<DPoint> {
    let c = DPoint::new((tl.x + br.x) / 2.0, (tl.y + br.y) / 2.0);
    let qs = quadrant(start);
    let qe = quadrant(end);

    if qs == qe {
        let short = match qs {
            1 => end.x < start.x || end.y < start.y,
            2 => end.x < start.x || end.y > start.y,
            3 => end.x > start.x || end.y > start.y,
            _ => end.x > start.x || end.y < start.y,
        };
        if short {
            return Vec::new();
        }
    }

    // Visiting order starting at qs: qs, qs-1, qs-2, qs-3 (cyclic over 1..=4)
    let order: Vec<u8> = (0..4).map(|i| (qs + 3 - i) % 4 + 1).collect();
    let first = order.iter().position(|&q| q == qe).unwrap_or(0);
    order[first..]
        .iter()
        .map(|&q| quadrant_extreme(q, tl, br, c))
        .collect()
}

/// Handle META_ARC, META_CHORD and META_PIE records
fn handle_arc(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let tl = st.to_device(point(&p, 7, 6)?);
    let br = st.to_device(point(&p, 5, 4)?);
    let end_abs = st.to_device(point(&p, 3, 2)?);
    let start_abs = st.to_device(point(&p, 1, 0)?);
    let scope = st.dc.pen_scope();

    let mut effect = Effect::default();
    effect.register(end_abs, scope);
    effect.register(start_abs, scope);

    let c = DPoint::new((tl.x + br.x) / 2.0, (tl.y + br.y) / 2.0);
    let mut start = DPoint::new(start_abs.x - c.x, start_abs.y - c.y);
    let mut end = DPoint::new(end_abs.x - c.x, end_abs.y - c.y);

    for pt in arc_extremes(tl, br, start, end) {
        effect.register(pt, scope);
    }

    let axes = DPoint::new((br.x - tl.x) / 2.0, (br.y - tl.y) / 2.0);
    for rel in [&mut start, &mut end] {
        if rel.x == 0.0 && rel.y == 0.0 {
            rel.x = axes.x;
        }
        rel.x = rel.x.min(axes.x).max(-axes.x);
        rel.y = rel.y.min(axes.y).max(-axes.y);
    }

    let arc = DrawArc { tl, br, start, end };
    effect.call(match record.function {
        META_PIE => DeviceCall::Pie(arc),
        META_CHORD => DeviceCall::Chord(arc),
        _ => DeviceCall::Arc(arc),
    });
    Ok(effect)
}

/// Handle META_ELLIPSE record
fn handle_ellipse(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let tl = st.to_device(point(&p, 3, 2)?);
    let br = st.to_device(point(&p, 1, 0)?);
    let scope = st.dc.pen_scope();

    let mut effect = Effect::default();
    effect.register(tl, scope);
    effect.register(br, scope);
    effect.call(DeviceCall::Ellipse(DrawArc {
        tl,
        br,
        start: DPoint::default(),
        end: DPoint::default(),
    }));
    Ok(effect)
}

/// Handle META_LINETO record
fn handle_lineto(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let to_l = point(&record.params(), 1, 0)?;
    let from = st.to_device(st.current);
    let to = st.to_device(to_l);
    st.current = to_l;

    let scope = st.dc.pen_scope();
    let mut effect = Effect::default();
    effect.register(from, scope);
    effect.register(to, scope);
    effect.call(DeviceCall::Line(DrawLine { from, to }));
    Ok(effect)
}

/// Device points of `count` coordinate pairs starting at word `first`
fn read_points(st: &PassState, p: &Params, first: usize, count: usize) -> WmfResult<Vec<DPoint>> {
    (0..count)
        .map(|i| {
            let l = point(p, first + 2 * i, first + 2 * i + 1)?;
            Ok(st.to_device(l))
        })
        .collect()
}

/// Handle META_POLYLINE and META_POLYGON records
fn handle_poly(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let count = p.u16(0)? as usize;
    let points = read_points(st, &p, 1, count)?;

    let scope = st.dc.pen_scope();
    let mut effect = Effect::default();
    for pt in &points {
        effect.register(*pt, scope);
    }
    let line = PolyLine { points };
    effect.call(if record.function == META_POLYGON {
        DeviceCall::Polygon(line)
    } else {
        DeviceCall::PolyLine(line)
    });
    Ok(effect)
}

/// Handle META_POLYPOLYGON record
fn handle_polypolygon(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let npoly = p.u16(0)? as usize;
    if npoly == 0 {
        return Ok(Effect::default());
    }

    let mut counts = Vec::with_capacity(npoly);
    for i in 1..=npoly {
        let count = p.u16(i)? as usize;
        if count < 3 {
            debug!("POLYPOLYGON: polygon {} has {} points, record skipped", i - 1, count);
            return Ok(Effect::default());
        }
        counts.push(count);
    }

    let scope = st.dc.pen_scope();
    let mut effect = Effect::default();
    let mut polygons = Vec::with_capacity(npoly);
    let mut first = 1 + npoly;
    for count in counts {
        let points = read_points(st, &p, first, count)?;
        for pt in &points {
            effect.register(*pt, scope);
        }
        polygons.push(points);
        first += 2 * count;
    }

    effect.call(DeviceCall::PolyPolygon(PolyPolygon { polygons }));
    Ok(effect)
}

/// Handle META_RECTANGLE and META_ROUNDRECT records
fn handle_rectangle(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let (tl, br, width, height) = if record.function == META_ROUNDRECT {
        let (pw, ph) = st.pixel_size();
        (
            st.to_device(point(&p, 5, 4)?),
            st.to_device(point(&p, 3, 2)?),
            p.u16(1)? as f64 * pw,
            p.u16(0)? as f64 * ph,
        )
    } else {
        (st.to_device(point(&p, 3, 2)?), st.to_device(point(&p, 1, 0)?), 0.0, 0.0)
    };

    let scope = st.dc.pen_scope();
    let mut effect = Effect::default();
    effect.register(tl, scope);
    effect.register(br, scope);
    effect.call(DeviceCall::Rectangle(DrawRectangle { tl, br, width, height }));
    Ok(effect)
}

fn region_object(st: &PassState, handle: u16) -> WmfResult<Region> {
    match st.objects.get(handle)? {
        Some(GraphicsObject::Region(region)) => Ok(region.clone()),
        other => Err(WmfError::glitch(format!(
            "object {} is a {}, expected a region",
            handle,
            other.map(GraphicsObject::kind_name).unwrap_or("free slot")
        ))),
    }
}

fn brush_object(st: &PassState, handle: u16) -> WmfResult<Rc<Brush>> {
    match st.objects.get(handle)? {
        Some(GraphicsObject::Brush(brush)) => Ok(Rc::clone(brush)),
        other => Err(WmfError::glitch(format!(
            "object {} is a {}, expected a brush",
            handle,
            other.map(GraphicsObject::kind_name).unwrap_or("free slot")
        ))),
    }
}

/// Handle META_FILLREGION and META_FRAMEREGION records
fn handle_region_brush(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let region = region_object(st, p.u16(0)?)?;
    let brush = brush_object(st, p.u16(1)?)?;

    let (width, height) = if record.function == META_FRAMEREGION {
        let (pw, ph) = st.pixel_size();
        (p.u16(3)? as f64 * pw, p.u16(2)? as f64 * ph)
    } else {
        (0.0, 0.0)
    };

    let (tl, br) = corners(&region.extents());
    let mut effect = Effect::default();
    effect.register(DPoint::new(tl.x - width, tl.y - height), 0.0);
    effect.register(DPoint::new(br.x + width, br.y + height), 0.0);

    let rects = PolyRectangle {
        rects: region.rects().to_vec(),
        width,
        height,
    };
    effect.call(DeviceCall::RegionClip(PolyRectangle::default()));
    if record.function == META_FRAMEREGION {
        effect.call(DeviceCall::RegionFrame { rects, brush });
    } else {
        effect.call(DeviceCall::RegionPaint {
            rects,
            brush: Some(brush),
            rop: None,
        });
    }
    effect.call(DeviceCall::RegionClip(poly_rects(&st.dc.clip)));
    Ok(effect)
}

/// Handle META_PAINTREGION and META_INVERTREGION records
fn handle_region_paint(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let region = region_object(st, record.params().u16(0)?)?;

    let (tl, br) = corners(&region.extents());
    let mut effect = Effect::default();
    effect.register(tl, 0.0);
    effect.register(br, 0.0);

    let rop = (record.function == META_INVERTREGION).then_some(R2_NOT);
    effect.call(DeviceCall::RegionClip(PolyRectangle::default()));
    effect.call(DeviceCall::RegionPaint {
        rects: poly_rects(&region),
        brush: None,
        rop,
    });
    effect.call(DeviceCall::RegionClip(poly_rects(&st.dc.clip)));
    Ok(effect)
}

/// Handle META_CREATEREGION record
///
/// The band list starts at word 11: each band is `count, top, bottom`,
/// `count` x values in pairs, then `count` again.
fn handle_region_create(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let mut region = Region::new();

    let nbands = p.u16(5)?;
    let mut end = p.offset(10)?;
    for _ in 0..nbands {
        let start = end.offset(1)?;
        let count = start.u16(0)? as usize;
        if count % 2 != 0 {
            return Err(WmfError::bad_format("CREATEREGION: band delimiter not even"));
        }
        end = start.offset(count + 3)?;
        if end.u16(0)? as usize != count {
            return Err(WmfError::bad_format("CREATEREGION: mismatched band delimiters"));
        }

        let y1 = start.u16(1)?;
        let y2 = start.u16(2)?;
        for pair in 0..count / 2 {
            let x1 = start.u16(3 + 2 * pair)?;
            let x2 = start.u16(4 + 2 * pair)?;
            let rect = st.dc.mapping.to_device_rect(
                LPoint::from_words(x1, y1),
                LPoint::from_words(x2, y2),
                &st.viewport,
            );
            region = region.union(&Region::from_rect(&rect));
        }
    }

    let handle = st.objects.insert(GraphicsObject::Region(region))?;
    trace!("CREATEREGION: object {}", handle);
    Ok(Effect::default())
}

/// Handle META_SELECTCLIPREGION record
fn handle_clip_select(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let handle = record.params().u16(0)?;
    let region = match st.objects.get(handle)? {
        Some(GraphicsObject::Region(region)) => region.clone(),
        other => {
            let kind = other.map(GraphicsObject::kind_name).unwrap_or("free slot");
            if st.options.ignore_nonfatal {
                warn!("SELECTCLIPREGION: object {} is a {}, record skipped", handle, kind);
                return Ok(Effect::default());
            }
            return Err(WmfError::glitch(format!(
                "SELECTCLIPREGION: object {} is a {}, expected a region",
                handle, kind
            )));
        }
    };

    st.dc.clip = region;
    let mut effect = Effect::default();
    effect.call(DeviceCall::RegionClip(poly_rects(&st.dc.clip)));
    Ok(effect)
}

/// Handle META_OFFSETCLIPRGN record
fn handle_clip_offset(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let dx = p.s32(1)? as f64 * st.dc.mapping.pixel_width();
    let dy = p.s32(0)? as f64 * st.dc.mapping.pixel_height();
    st.dc.clip.offset(dx, dy);

    let mut effect = Effect::default();
    effect.call(DeviceCall::RegionClip(poly_rects(&st.dc.clip)));
    Ok(effect)
}

/// Handle META_EXCLUDECLIPRECT and META_INTERSECTCLIPRECT records
fn handle_clip_combine(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let rect = st
        .dc
        .mapping
        .to_device_rect(point(&p, 3, 2)?, point(&p, 1, 0)?, &st.viewport);
    let op = if record.function == META_EXCLUDECLIPRECT {
        ClipOp::Exclude
    } else {
        ClipOp::Intersect
    };
    st.dc.clip = combine_clip(&st.dc.clip, &st.visible, &rect, op);

    let mut effect = Effect::default();
    effect.call(DeviceCall::RegionClip(poly_rects(&st.dc.clip)));
    Ok(effect)
}

/// Handle DIB drawing records
fn handle_dib_draw(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();

    // (x, y, w, h) destination, crop, declared size, raster op, bitmap offset
    let (x, y, w, h, crop, read_size, rop, bitmap_at) = match record.function {
        META_SETDIBTODEV => {
            let w = p.u16(6)?;
            let h = p.u16(5)?;
            let crop = Crop {
                x: p.u16(4)?,
                y: p.u16(3)?,
                w,
                h,
            };
            (p.u16(8)?, p.u16(7)?, w, h, crop, (p.u16(2)?, p.u16(1)?), SRCCOPY, 9)
        }
        META_STRETCHDIB => {
            let crop = Crop {
                x: p.u16(6)?,
                y: p.u16(5)?,
                w: p.u16(4)?,
                h: p.u16(3)?,
            };
            let rop = p.u16(0)? as u32 | (p.u16(1)? as u32) << 16;
            (p.u16(10)?, p.u16(9)?, p.u16(8)?, p.u16(7)?, crop, (0, 0), rop, 11)
        }
        META_DIBSTRETCHBLT => {
            let crop = Crop {
                x: p.u16(5)?,
                y: p.u16(4)?,
                w: p.u16(3)?,
                h: p.u16(2)?,
            };
            let rop = p.u16(0)? as u32 | (p.u16(1)? as u32) << 16;
            (p.u16(9)?, p.u16(8)?, p.u16(7)?, p.u16(6)?, crop, (0, 0), rop, 10)
        }
        _ => {
            let w = p.u16(5)?;
            let h = p.u16(4)?;
            let crop = Crop {
                x: p.u16(3)?,
                y: p.u16(2)?,
                w,
                h,
            };
            let rop = p.u16(0)? as u32 | (p.u16(1)? as u32) << 16;
            (p.u16(7)?, p.u16(6)?, w, h, crop, (0, 0), rop, 8)
        }
    };

    if w == 0 || h == 0 || crop.w == 0 || crop.h == 0 {
        debug!("{}: empty destination or source, skipped", get_record_name(record.function));
        return Ok(Effect::default());
    }

    let tl_l = LPoint::from_words(x, y);
    let size_l = LPoint::from_words(w, h);
    let pt = st.to_device(tl_l);
    let far = st.to_device(LPoint::new(tl_l.x + size_l.x.abs(), tl_l.y + size_l.y.abs()));

    let mut effect = Effect::default();
    effect.register(pt, 0.0);
    effect.register(far, 0.0);

    let (pw, ph) = st.pixel_size();
    let bitmap = p.offset(bitmap_at)?;
    effect.call(DeviceCall::Dib(DibDraw {
        read: BitmapRead {
            data: bitmap.as_bytes().to_vec(),
            width: read_size.0,
            height: read_size.1,
        },
        pt,
        crop,
        rop,
        width: w,
        height: h,
        pixel_width: pw,
        pixel_height: ph,
    }));
    Ok(effect)
}

/// Handle META_DIBCREATEPATTERNBRUSH record
fn handle_dib_brush(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let brush = Rc::new(Brush {
        style: BS_DIBPATTERN,
        color: Rgb::BLACK,
        ..Brush::default()
    });
    st.objects.insert(GraphicsObject::Brush(Rc::clone(&brush)))?;
    st.dc.brush = Rc::clone(&brush);

    let mut effect = Effect::default();
    effect.color(Rgb::BLACK);
    effect.call(DeviceCall::PatternBrush {
        brush,
        read: BitmapRead {
            data: p.offset(2)?.as_bytes().to_vec(),
            width: 0,
            height: 0,
        },
    });
    Ok(effect)
}

/// Handle META_PATBLT and the bitmap-less form of META_DIBBITBLT
fn handle_rop_draw(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let (x, y, w, h) = if record.function == META_PATBLT {
        (p.u16(5)?, p.u16(4)?, p.u16(3)?, p.u16(2)?)
    } else {
        (p.u16(8)?, p.u16(7)?, p.u16(6)?, p.u16(5)?)
    };
    let rop = p.u16(0)? as u32 | (p.u16(1)? as u32) << 16;

    if w == 0 || h == 0 {
        debug!("{}: empty area, skipped", get_record_name(record.function));
        return Ok(Effect::default());
    }

    let tl_l = LPoint::from_words(x, y);
    let size_l = LPoint::from_words(w, h);
    let tl = st.to_device(tl_l);
    let br = st.to_device(LPoint::new(tl_l.x + size_l.x, tl_l.y + size_l.y));
    let (pw, ph) = st.pixel_size();

    let mut effect = Effect::default();
    effect.register(tl, 0.0);
    effect.register(br, 0.0);
    effect.call(DeviceCall::Rop(RopDraw {
        tl,
        br,
        rop,
        pixel_width: pw,
        pixel_height: ph,
    }));
    Ok(effect)
}

/// Handle single-word DC attribute records
fn handle_dc_set(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let value = record.params().u16(0)?;
    let dc = &mut st.dc;
    match record.function {
        META_SETROP2 => dc.rop = value,
        META_SETTEXTJUSTIFICATION => dc.break_extra = value,
        META_SETTEXTCHAREXTRA => dc.char_extra = value,
        META_SETPOLYFILLMODE => dc.polyfill_mode = value,
        META_SETTEXTALIGN => dc.text_align = value,
        _ => {
            if value == TRANSPARENT {
                dc.bg_mode = TRANSPARENT;
            } else {
                if value != OPAQUE {
                    debug!("SETBKMODE: unexpected mode {}, using OPAQUE", value);
                }
                dc.bg_mode = OPAQUE;
            }
        }
    }
    Ok(Effect::default())
}

/// Handle META_SETTEXTCOLOR and META_SETBKCOLOR records
fn handle_dc_color(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let color = Rgb::from_words(p.u16(0)?, p.u16(1)?);
    if record.function == META_SETTEXTCOLOR {
        st.dc.text_color = color;
    } else {
        st.dc.background = color;
    }

    let mut effect = Effect::default();
    effect.color(color);
    Ok(effect)
}

/// Handle META_SELECTOBJECT record
fn handle_select(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let handle = record.params().u16(0)?;
    match st.objects.get(handle)? {
        Some(GraphicsObject::Pen(pen)) => st.dc.pen = Rc::clone(pen),
        Some(GraphicsObject::Brush(brush)) => st.dc.brush = Rc::clone(brush),
        Some(GraphicsObject::Font(font)) => st.dc.font = Rc::clone(font),
        other => {
            let kind = other.map(GraphicsObject::kind_name).unwrap_or("free slot");
            if st.options.ignore_nonfatal {
                warn!("SELECTOBJECT: object {} is a {}, nothing selected", handle, kind);
            } else {
                return Err(WmfError::bad_format(format!(
                    "SELECTOBJECT: object {} is a {} and cannot be selected",
                    handle, kind
                )));
            }
        }
    }
    Ok(Effect::default())
}

/// Handle META_SAVEDC record
fn handle_save(st: &mut PassState) -> WmfResult<Effect> {
    st.stack.push(st.dc.clone());
    trace!("SAVEDC: depth {}", st.stack.depth());

    let mut effect = Effect::default();
    effect.call(DeviceCall::CopyUserData);
    Ok(effect)
}

/// Handle META_RESTOREDC record
fn handle_restore(st: &mut PassState) -> WmfResult<Effect> {
    let restored = st.stack.pop()?;
    let discarded = std::mem::replace(&mut st.dc, restored);
    trace!("RESTOREDC: depth {}", st.stack.depth());

    let mut effect = Effect::default();
    effect.call(DeviceCall::FreeUserData(Box::new(discarded)));
    effect.call(DeviceCall::SetUserData);
    effect.call(DeviceCall::RegionClip(poly_rects(&st.dc.clip)));
    Ok(effect)
}

/// Decoded TEXTOUT / EXTTEXTOUT layout
struct TextLayout<'a> {
    origin: LPoint,
    text: &'a [u8],
    options: u16,
    clip: Option<(LPoint, LPoint)>,
    dx: Option<Vec<u16>>,
}

fn text_layout<'a>(st: &PassState, record: &'a Record) -> WmfResult<Option<TextLayout<'a>>> {
    let p = record.params();
    let size = p.size();
    let update_cp = st.dc.text_align & TA_UPDATECP != 0;

    if record.function == META_TEXTOUT {
        let length = p.u16(0)? as usize;
        let needed = if update_cp { 1 } else { 3 } + (length + 1) / 2;
        if size < needed {
            return Err(WmfError::bad_format(format!(
                "TEXTOUT: {} words cannot hold a {} byte string",
                size, length
            )));
        }
        if length == 0 {
            return Ok(None);
        }
        let origin = if update_cp {
            st.current
        } else {
            point(&p, size - 1, size - 2)?
        };
        return Ok(Some(TextLayout {
            origin,
            text: p.offset(1)?.bytes(length)?,
            options: 0,
            clip: None,
            dx: None,
        }));
    }

    let origin = if update_cp { st.current } else { point(&p, 1, 0)? };
    let length = p.u16(2)? as usize;
    if length == 0 {
        return Ok(None);
    }
    let options = p.u16(3)?;
    let (clip, text_at) = if options != 0 {
        (Some((point(&p, 4, 5)?, point(&p, 6, 7)?)), 8)
    } else {
        (None, 4)
    };

    let text_params = p.offset(text_at)?;
    let text = text_params.bytes(length)?;
    let dx_params = text_params.offset((length + 1) / 2)?;
    let dx = if dx_params.size() >= length {
        Some((0..length).map(|i| dx_params.u16(i)).collect::<WmfResult<Vec<_>>>()?)
    } else {
        None
    };

    Ok(Some(TextLayout {
        origin,
        text,
        options,
        clip,
        dx,
    }))
}

/// Handle META_TEXTOUT and META_EXTTEXTOUT records
fn handle_text(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let layout = match text_layout(st, record)? {
        Some(layout) => layout,
        None => return Ok(Effect::default()),
    };
    let mut effect = Effect::default();

    let (tl, br) = match layout.clip {
        Some((a, b)) => {
            let tl = st.to_device(a);
            let br = st.to_device(b);
            effect.register(tl, 0.0);
            effect.register(br, 0.0);
            (tl, br)
        }
        None => (DPoint::default(), DPoint::default()),
    };

    let font: Rc<Font> = Rc::clone(&st.dc.font);
    let (_, ph) = st.pixel_size();
    let font_height = font.height * ph;
    let font_ratio = if font.height == 0.0 { 1.0 } else { font.width / font.height };

    let origin_d = st.to_device(LPoint::default());
    let advance = |st: &PassState, units: u16| st.to_device(LPoint::from_words(units, 0)).x - origin_d.x;

    let mut width = st.metrics.string_width(&font, layout.text) as f64 * font_height * font_ratio;
    if let Some(dx) = &layout.dx {
        let total = dx.iter().fold(0u16, |acc, &d| acc.wrapping_add(d));
        width = advance(st, total);
    }

    let theta = -(font.escapement as f64 / 10.0).to_radians();
    let (sin, cos) = theta.sin_cos();
    let rotate = |x: f64, y: f64| DPoint::new(x * cos - y * sin, x * sin + y * cos);
    let shift = |pt: DPoint, by: DPoint| DPoint::new(pt.x + by.x, pt.y + by.y);

    let mut pt = st.to_device(layout.origin);
    let align = st.dc.text_align;
    match align & TA_BASELINE {
        TA_BASELINE => {}
        TA_BOTTOM => pt = shift(pt, rotate(0.0, -font_height / 3.0)),
        _ => pt = shift(pt, rotate(0.0, font_height)),
    }

    let left = match align & TA_CENTER {
        TA_CENTER => -width / 2.0,
        TA_RIGHT => -width,
        _ => 0.0,
    };
    let ascent = -font_height * ASCENT;
    let descent = font_height * DESCENT;
    let bbox = [
        shift(pt, rotate(left, ascent)),
        shift(pt, rotate(left + width, ascent)),
        shift(pt, rotate(left, descent)),
        shift(pt, rotate(left + width, descent)),
    ];
    for corner in bbox {
        effect.register(corner, 0.0);
    }
    pt = shift(pt, rotate(left, 0.0));

    if align & TA_UPDATECP != 0 {
        match align & TA_CENTER {
            TA_CENTER => {}
            TA_RIGHT => st.current = st.to_logical(pt),
            _ => st.current = st.to_logical(shift(pt, rotate(width, 0.0))),
        }
    }

    let base = DrawText {
        text: layout.text.to_vec(),
        pt,
        tl,
        br,
        bbox,
        flags: layout.options,
        font_height,
        font_ratio,
    };

    match &layout.dx {
        None => effect.call(DeviceCall::Text(base)),
        Some(dx) => {
            let mut offset = 0u16;
            for (i, (&ch, &cell)) in layout.text.iter().zip(dx.iter()).enumerate() {
                let along = advance(st, offset);
                let cell_width = advance(st, cell);
                let glyph_width = st.metrics.string_width(&font, &[ch]) as f64 * font_height * font_ratio;
                let ratio = if glyph_width > 0.0 && cell_width < glyph_width {
                    font_ratio * cell_width / glyph_width
                } else {
                    font_ratio
                };

                effect.call(DeviceCall::Text(DrawText {
                    text: vec![ch],
                    pt: DPoint::new(pt.x + along * cos, pt.y + along * sin),
                    bbox: if i == 0 { bbox } else { [DPoint::default(); 4] },
                    font_ratio: ratio,
                    ..base.clone()
                }));
                offset = offset.wrapping_add(cell);
            }
        }
    }
    Ok(effect)
}

/// Handle META_CREATEPENINDIRECT record
fn handle_pen_create(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let style = p.u16(0)?;
    let w = p.u16(1)?.max(1) as f64;
    let color = Rgb::from_words(p.u16(3)?, p.u16(4)?);
    let (pw, ph) = st.pixel_size();

    let pen = Rc::new(Pen::from_style_word(style, w * pw, w * ph, color));
    st.objects.insert(GraphicsObject::Pen(Rc::clone(&pen)))?;
    st.dc.pen = pen;

    let mut effect = Effect::default();
    effect.color(color);
    Ok(effect)
}

/// Handle META_CREATEBRUSHINDIRECT record
fn handle_brush_create(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let color = Rgb::from_words(p.u16(1)?, p.u16(2)?);
    let brush = Rc::new(Brush {
        style: p.u16(0)?,
        color,
        hatch: p.u16(3)?,
        ..Brush::default()
    });
    st.objects.insert(GraphicsObject::Brush(Rc::clone(&brush)))?;
    st.dc.brush = brush;

    let mut effect = Effect::default();
    effect.color(color);
    Ok(effect)
}

/// Handle META_CREATEFONTINDIRECT record
fn handle_font_create(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let p = record.params();
    let height = (p.s16(0)? as f64).abs();
    let width = (p.s16(1)? as f64).abs();
    let style = p.u16(5)?;
    let strike = p.u16(6)?;
    let precision = p.u16(7)?;
    let quality = p.u16(8)?;

    let name_bytes = p.offset(9)?.as_bytes();
    let name: String = name_bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect();

    let font = Rc::new(Font {
        height,
        width: if width == 0.0 { height } else { width },
        escapement: p.s16(2)?,
        orientation: p.s16(3)?,
        weight: p.u16(4)?,
        italic: style & 0xff != 0,
        underline: style >> 8 != 0,
        strikeout: strike & 0xff != 0,
        charset: (strike >> 8) as u8,
        out_precision: (precision & 0xff) as u8,
        clip_precision: (precision >> 8) as u8,
        quality: (quality & 0xff) as u8,
        pitch_and_family: (quality >> 8) as u8,
        name,
    });
    trace!("CREATEFONTINDIRECT: {:?} {}", font.name, font.height);
    st.objects.insert(GraphicsObject::Font(Rc::clone(&font)))?;
    st.dc.font = font;
    Ok(Effect::default())
}

/// Handle META_CREATEPALETTE record
fn handle_palette_create(st: &mut PassState) -> WmfResult<Effect> {
    st.objects.insert(GraphicsObject::Palette)?;
    Ok(Effect::default())
}

/// Handle META_DELETEOBJECT record
fn handle_delete(st: &mut PassState, record: &Record) -> WmfResult<Effect> {
    let handle = record.params().u16(0)?;
    let mut effect = Effect::default();
    if let Some(GraphicsObject::Brush(brush)) = st.objects.remove(handle)? {
        if let Some(bitmap) = brush.bitmap.take() {
            effect.call(DeviceCall::FreeBitmap(bitmap));
        }
    }
    Ok(effect)
}
