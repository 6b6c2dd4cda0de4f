//! Two-pass metafile player
//!
//! `scan` walks the records once without a backend to find the device
//! bounding box and the colors in use. `play` walks them again and hands
//! every drawing operation to a [`Device`]. Both passes start from the same
//! fresh state, so a metafile can be played any number of times.

use std::io::{Cursor, Read, Seek};

use log::{debug, error, info, trace};

use crate::color::{ColorTable, Rgb};
use crate::coord::{DPoint, DRect, LPoint, Viewport};
use crate::dc::{DcStack, DeviceContext};
use crate::device::{Device, FixedMetrics, FontMetrics};
use crate::error::{WmfError, WmfResult};
use crate::meta::{handle_record, DeviceCall};
use crate::object::ObjectTable;
use crate::records::{get_record_name, MM_DPI};
use crate::region::Region;
use crate::stream::{ByteCursor, Header};

/// Player behavior switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerOptions {
    /// Log and carry on where a malformed but recoverable record would
    /// otherwise stop the pass
    pub ignore_nonfatal: bool,
    /// Log every record as it is read
    pub diagnostics: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Scan,
    Play,
}

/// Progress callback: receives the fraction of the file played so far and
/// returns `true` to stop
pub type ProgressFn = Box<dyn FnMut(f32) -> bool>;

/// Interpreter state for one pass
pub(crate) struct PassState {
    pub header: Header,
    pub options: PlayerOptions,
    pub metrics: Box<dyn FontMetrics>,
    pub dc: DeviceContext,
    pub stack: DcStack,
    pub objects: ObjectTable,
    pub viewport: Viewport,
    /// Current position in logical units
    pub current: LPoint,
    /// Area clip operations are bounded by
    pub visible: Region,
}

impl PassState {
    pub fn new(header: Header, options: PlayerOptions) -> Self {
        Self {
            header,
            options,
            metrics: Box::new(FixedMetrics::default()),
            dc: DeviceContext::default(),
            stack: DcStack::new(),
            objects: ObjectTable::new(header.meta.num_objects as usize),
            viewport: Viewport::default(),
            current: LPoint::default(),
            visible: Region::new(),
        }
    }

    /// Reset to the state every pass starts from
    fn reset(&mut self, visible: Region) -> WmfResult<()> {
        self.dc = DeviceContext::default();
        self.stack = DcStack::new();
        self.objects = ObjectTable::new(self.header.meta.num_objects as usize);
        self.viewport = Viewport::default();
        self.current = LPoint::default();
        self.visible = visible;

        if let Some(placeable) = self.header.placeable {
            self.dc.mapping.set_mode(MM_DPI, Some(placeable.inch), &self.viewport)?;
        }
        Ok(())
    }

    pub fn to_device(&self, l: LPoint) -> DPoint {
        self.dc.mapping.to_device(l, &self.viewport)
    }

    pub fn to_logical(&self, d: DPoint) -> LPoint {
        self.dc.mapping.to_logical(d, &self.viewport)
    }

    /// Absolute device size of one logical unit
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.dc.mapping.pixel_width().abs(), self.dc.mapping.pixel_height().abs())
    }
}

/// Device bounding box grown point by point during scan
#[derive(Debug, Clone, Copy, Default)]
struct BoundingBox {
    rect: Option<DRect>,
}

impl BoundingBox {
    fn register(&mut self, pt: DPoint, scope: f64) {
        match self.rect.as_mut() {
            None => self.rect = Some(DRect { tl: pt, br: pt }),
            Some(rect) => {
                rect.tl.x = rect.tl.x.min(pt.x - scope);
                rect.tl.y = rect.tl.y.min(pt.y - scope);
                rect.br.x = rect.br.x.max(pt.x + scope);
                rect.br.y = rect.br.y.max(pt.y + scope);
            }
        }
    }

    fn rect(&self) -> DRect {
        self.rect.unwrap_or_default()
    }
}

/// Metafile player over a seekable byte source
pub struct Player<R> {
    cursor: ByteCursor<R>,
    state: PassState,
    colors: ColorTable,
    bbox: Option<DRect>,
    error: Option<WmfError>,
    progress: Option<ProgressFn>,
    opened: bool,
}

impl<'a> Player<Cursor<&'a [u8]>> {
    /// Player over an in-memory metafile
    pub fn from_bytes(data: &'a [u8], options: PlayerOptions) -> WmfResult<Self> {
        Self::new(Cursor::new(data), options)
    }
}

impl<R: Read + Seek> Player<R> {
    /// Read the metafile header from `source`
    pub fn new(source: R, options: PlayerOptions) -> WmfResult<Self> {
        let mut cursor = ByteCursor::new(source);
        let header = cursor.read_header(options.ignore_nonfatal)?;

        if let Some(placeable) = header.placeable {
            info!(
                "placeable metafile: bounds ({}, {})-({}, {}) at {} units per inch",
                placeable.left, placeable.top, placeable.right, placeable.bottom, placeable.inch
            );
        }

        Ok(Self {
            cursor,
            state: PassState::new(header, options),
            colors: ColorTable::new(),
            bbox: None,
            error: None,
            progress: None,
            opened: false,
        })
    }

    /// Use `metrics` for text widths instead of the fixed advance
    pub fn with_metrics(mut self, metrics: Box<dyn FontMetrics>) -> Self {
        self.state.metrics = metrics;
        self
    }

    pub fn set_progress(&mut self, progress: ProgressFn) {
        self.progress = Some(progress);
    }

    pub fn header(&self) -> &Header {
        &self.state.header
    }

    /// Colors collected by the scan
    pub fn colors(&self) -> &[Rgb] {
        self.colors.colors()
    }

    pub fn color_table(&self) -> &ColorTable {
        &self.colors
    }

    /// The error that stopped the player, if any
    pub fn error(&self) -> Option<&WmfError> {
        self.error.as_ref()
    }

    /// Walk the records without a backend and return the device bounding box.
    ///
    /// A second scan returns the cached box.
    pub fn scan(&mut self) -> WmfResult<DRect> {
        self.check()?;
        if let Some(bbox) = self.bbox {
            debug!("already scanned; skipping");
            return Ok(bbox);
        }

        let mut bounds = BoundingBox::default();
        let result = self.run_pass(Mode::Scan, None, &mut bounds);
        self.record_error(result)?;

        let bbox = bounds.rect();
        debug!(
            "scan: bbox ({:.2}, {:.2})-({:.2}, {:.2}), {} colors",
            bbox.tl.x,
            bbox.tl.y,
            bbox.br.x,
            bbox.br.y,
            self.colors.count()
        );
        self.bbox = Some(bbox);
        Ok(bbox)
    }

    /// Walk the records again, drawing through `device`
    pub fn play(&mut self, device: &mut dyn Device) -> WmfResult<()> {
        self.check()?;
        let bbox = match self.bbox {
            Some(bbox) => bbox,
            None => return self.record_error(Err(WmfError::glitch("play called before scan"))),
        };

        if !self.opened {
            let opened = device.device_open();
            self.record_error(opened)?;
            self.opened = true;
        }
        let begun = device.device_begin(&bbox);
        if begun.is_err() {
            // a half-begun backend still gets its end call
            let ended = device.device_end();
            return self.record_error(begun.and(ended));
        }

        let mut bounds = BoundingBox::default();
        let result = self.run_pass(Mode::Play, Some(device), &mut bounds);
        self.record_error(result)
    }

    /// Release the backend opened by the first play
    pub fn close(&mut self, device: &mut dyn Device) -> WmfResult<()> {
        if self.opened {
            self.opened = false;
            device.device_close()?;
        }
        self.error.clone().map_or(Ok(()), Err)
    }

    /// Size of the image in device units.
    ///
    /// The placeable bounds win when they are not degenerate; otherwise the
    /// scanned box is used.
    pub fn size(&self) -> WmfResult<(f64, f64)> {
        self.check()?;
        let bbox = self
            .bbox
            .ok_or_else(|| WmfError::glitch("size requested before scan"))?;

        if let Some(p) = self.state.header.placeable {
            let width = (p.right as i32 - p.left as i32).abs();
            let height = (p.bottom as i32 - p.top as i32).abs();
            if width != 0 && height != 0 {
                return Ok((width as f64, height as f64));
            }
        }
        Ok((bbox.width(), bbox.height()))
    }

    /// Integer display size at `res_x` by `res_y` dots per inch
    pub fn display_size(&self, res_x: f64, res_y: f64) -> WmfResult<(u32, u32)> {
        let (width, height) = self.size()?;

        let units_per_inch = match self.state.header.placeable {
            Some(p) => p.inch as f64,
            None if width * height < 1024.0 * 1024.0 => 72.0,
            None => 1440.0,
        };
        if units_per_inch == 0.0 {
            return Err(WmfError::bad_format("placeable header declares 0 units per inch"));
        }

        Ok((
            (width * res_x / units_per_inch) as u32,
            (height * res_y / units_per_inch) as u32,
        ))
    }

    fn check(&self) -> WmfResult<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Keep the first error; later calls keep returning it
    fn record_error<T>(&mut self, result: WmfResult<T>) -> WmfResult<T> {
        if let Err(err) = &result {
            if self.error.is_none() {
                error!("{}", err);
                self.error = Some(err.clone());
            }
        }
        result
    }

    fn run_pass<'d>(
        &mut self,
        mode: Mode,
        mut device: Option<&mut (dyn Device + 'd)>,
        bounds: &mut BoundingBox,
    ) -> WmfResult<()> {
        let mut result = self.start_pass(mode, device.as_deref_mut());
        if result.is_ok() {
            result = self.play_records(mode, device.as_deref_mut(), bounds);
        }
        let cleanup = self.end_pass(device);
        result.and(cleanup)
    }

    fn start_pass<'d>(&mut self, mode: Mode, device: Option<&mut (dyn Device + 'd)>) -> WmfResult<()> {
        let visible = match mode {
            Mode::Scan => Region::new(),
            Mode::Play => Region::from_rect(&self.bbox.unwrap_or_default()),
        };
        self.state.reset(visible)?;
        self.cursor.seek(self.state.header.records_start)?;

        if let Some(device) = device {
            self.state.dc.user_data = device.udata_init(&self.state.dc)?;
        }
        Ok(())
    }

    fn play_records<'d>(
        &mut self,
        mode: Mode,
        mut device: Option<&mut (dyn Device + 'd)>,
        bounds: &mut BoundingBox,
    ) -> WmfResult<()> {
        let max_record_size = self.state.header.meta.max_record_size;

        while let Some(record) = self.cursor.read_record(max_record_size)? {
            if self.state.options.diagnostics {
                debug!(
                    "{:?} record {} ({} words) at {}",
                    mode,
                    get_record_name(record.function),
                    record.size(),
                    record.position
                );
            }

            let effect = handle_record(&mut self.state, &record)?;

            match (mode, device.as_deref_mut()) {
                (Mode::Scan, _) => {
                    for (pt, scope) in effect.registrations {
                        bounds.register(pt, scope);
                    }
                    for rgb in effect.colors {
                        self.colors.add(rgb);
                    }
                }
                (Mode::Play, Some(device)) => {
                    for call in effect.calls {
                        self.execute(device, call)?;
                    }
                    self.report_progress()?;
                }
                (Mode::Play, None) => return Err(WmfError::glitch("play pass without a device")),
            }
        }
        trace!("{:?}: end of records", mode);
        Ok(())
    }

    /// Release what the pass still holds; every step runs, the first error
    /// is returned
    fn end_pass<'d>(&mut self, device: Option<&mut (dyn Device + 'd)>) -> WmfResult<()> {
        let saved: Vec<DeviceContext> = self.state.stack.drain().collect();
        let bitmaps = self.state.objects.pattern_bitmaps();

        let device = match device {
            Some(device) => device,
            None => return Ok(()),
        };

        if !saved.is_empty() {
            debug!("{} saved contexts left on the stack", saved.len());
        }

        let mut result = device.udata_free(&self.state.dc);
        for dc in &saved {
            result = result.and(device.udata_free(dc));
        }
        for bitmap in &bitmaps {
            result = result.and(device.bmp_free(bitmap));
        }
        result.and(device.device_end())
    }

    fn report_progress(&mut self) -> WmfResult<()> {
        let progress = match self.progress.as_mut() {
            Some(progress) => progress,
            None => return Ok(()),
        };

        let start = self.state.header.header_start as f64;
        let current = self.cursor.tell()? as f64 - start;
        let total = self.state.header.meta.file_size as f64 * 2.0 - start;
        let fraction = if total > 0.0 { (current / total) as f32 } else { 1.0 };

        if progress(fraction) {
            info!("stopped by progress callback at {:.0}%", fraction * 100.0);
            return Err(WmfError::UserExit);
        }
        Ok(())
    }

    fn execute(&mut self, device: &mut dyn Device, call: DeviceCall) -> WmfResult<()> {
        if let DeviceCall::CopyUserData = call {
            let data = device.udata_copy(&self.state.dc, self.state.dc.user_data)?;
            self.state.dc.user_data = data;
            return Ok(());
        }

        let dc = &self.state.dc;
        match call {
            DeviceCall::FloodInterior(flood) => device.flood_interior(dc, &flood),
            DeviceCall::FloodExterior(flood) => device.flood_exterior(dc, &flood),
            DeviceCall::Pixel(pixel) => device.draw_pixel(dc, &pixel),
            DeviceCall::Arc(arc) => device.draw_arc(dc, &arc),
            DeviceCall::Chord(arc) => device.draw_chord(dc, &arc),
            DeviceCall::Pie(arc) => device.draw_pie(dc, &arc),
            DeviceCall::Ellipse(arc) => device.draw_ellipse(dc, &arc),
            DeviceCall::Line(line) => device.draw_line(dc, &line),
            DeviceCall::PolyLine(line) => device.poly_line(dc, &line),
            DeviceCall::Polygon(polygon) => device.draw_polygon(dc, &polygon),
            DeviceCall::PolyPolygon(polygons) => device.draw_polypolygon(dc, &polygons),
            DeviceCall::Rectangle(rect) => device.draw_rectangle(dc, &rect),
            DeviceCall::Rop(rop) => device.rop_draw(dc, &rop),
            DeviceCall::Dib(dib) => {
                let bitmap = match device.bmp_read(&dib.read)? {
                    Some(bitmap) => bitmap,
                    None => return Ok(()),
                };
                let drawn = match dib.fit(bitmap) {
                    Some(draw) => device.bmp_draw(dc, &draw),
                    None => {
                        debug!("bitmap crop is empty; not drawn");
                        Ok(())
                    }
                };
                drawn.and(device.bmp_free(&bitmap))
            }
            DeviceCall::PatternBrush { brush, read } => {
                brush.bitmap.set(device.bmp_read(&read)?);
                Ok(())
            }
            DeviceCall::FreeBitmap(bitmap) => device.bmp_free(&bitmap),
            DeviceCall::Text(text) => device.draw_text(dc, &text),
            DeviceCall::RegionClip(rects) => device.region_clip(dc, &rects),
            DeviceCall::RegionPaint { rects, brush, rop } => {
                if brush.is_none() && rop.is_none() {
                    return device.region_paint(dc, &rects);
                }
                let mut temp = dc.clone();
                if let Some(brush) = brush {
                    temp.brush = brush;
                }
                if let Some(rop) = rop {
                    temp.rop = rop;
                }
                device.region_paint(&temp, &rects)
            }
            DeviceCall::RegionFrame { rects, brush } => {
                let mut temp = dc.clone();
                temp.brush = brush;
                device.region_frame(&temp, &rects)
            }
            DeviceCall::FreeUserData(old) => device.udata_free(&old),
            DeviceCall::SetUserData => device.udata_set(dc),
            DeviceCall::CopyUserData => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::*;

    fn metafile(num_objects: u16, records: &[(u16, &[u16])]) -> Vec<u8> {
        let mut body = Vec::new();
        let mut max = 3u32;
        for (function, words) in records {
            let size = words.len() as u32 + 3;
            max = max.max(size);
            body.extend_from_slice(&size.to_le_bytes());
            body.extend_from_slice(&function.to_le_bytes());
            for w in words.iter() {
                body.extend_from_slice(&w.to_le_bytes());
            }
        }
        body.extend_from_slice(&3u32.to_le_bytes());
        body.extend_from_slice(&0u16.to_le_bytes());

        let file_size = 9 + body.len() as u32 / 2;
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&9u16.to_le_bytes());
        data.extend_from_slice(&0x0300u16.to_le_bytes());
        data.extend_from_slice(&file_size.to_le_bytes());
        data.extend_from_slice(&num_objects.to_le_bytes());
        data.extend_from_slice(&max.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend(body);
        data
    }

    #[test]
    fn test_bounding_box_growth() {
        let mut bounds = BoundingBox::default();
        assert_eq!(bounds.rect(), DRect::default());
        bounds.register(DPoint::new(10.0, 10.0), 5.0);
        assert_eq!(bounds.rect(), DRect::new(10.0, 10.0, 10.0, 10.0));
        bounds.register(DPoint::new(20.0, 0.0), 1.0);
        assert_eq!(bounds.rect(), DRect::new(10.0, -1.0, 21.0, 10.0));
    }

    #[test]
    fn test_scan_rectangle() {
        let data = metafile(0, &[(META_RECTANGLE, &[50, 100, 0, 0])]);
        let mut player = Player::from_bytes(&data, PlayerOptions::default()).unwrap();
        let bbox = player.scan().unwrap();
        assert_eq!(bbox, DRect::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(player.size().unwrap(), (100.0, 50.0));
    }

    #[test]
    fn test_scan_is_cached() {
        let data = metafile(0, &[(META_LINETO, &[30, 40])]);
        let mut player = Player::from_bytes(&data, PlayerOptions::default()).unwrap();
        let first = player.scan().unwrap();
        let second = player.scan().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_play_before_scan_is_glitch() {
        let data = metafile(0, &[]);
        let mut player = Player::from_bytes(&data, PlayerOptions::default()).unwrap();
        let mut device = crate::device::NullDevice;
        assert!(matches!(player.play(&mut device), Err(WmfError::Glitch(_))));
        // sticky
        assert!(matches!(player.scan(), Err(WmfError::Glitch(_))));
    }

    #[test]
    fn test_size_before_scan() {
        let data = metafile(0, &[]);
        let player = Player::from_bytes(&data, PlayerOptions::default()).unwrap();
        assert!(matches!(player.size(), Err(WmfError::Glitch(_))));
    }

    #[test]
    fn test_empty_metafile_has_zero_box() {
        let data = metafile(0, &[]);
        let mut player = Player::from_bytes(&data, PlayerOptions::default()).unwrap();
        assert_eq!(player.scan().unwrap(), DRect::default());
        assert_eq!(player.display_size(72.0, 72.0).unwrap(), (0, 0));
    }

    #[test]
    fn test_display_size_small_image_uses_72() {
        let data = metafile(0, &[(META_RECTANGLE, &[100, 200, 0, 0])]);
        let mut player = Player::from_bytes(&data, PlayerOptions::default()).unwrap();
        player.scan().unwrap();
        assert_eq!(player.display_size(144.0, 144.0).unwrap(), (400, 200));
    }

    #[test]
    fn test_scan_collects_colors() {
        let data = metafile(0, &[(META_SETTEXTCOLOR, &[0x00ff, 0x0000])]);
        let mut player = Player::from_bytes(&data, PlayerOptions::default()).unwrap();
        player.scan().unwrap();
        assert!(player.colors().contains(&Rgb::new(0xff, 0, 0)));
    }

    #[test]
    fn test_unbalanced_restore_is_sticky() {
        let data = metafile(0, &[(META_RESTOREDC, &[0xffff])]);
        let mut player = Player::from_bytes(&data, PlayerOptions::default()).unwrap();
        assert!(matches!(player.scan(), Err(WmfError::Glitch(_))));
        assert!(matches!(player.error(), Some(WmfError::Glitch(_))));
        assert!(matches!(player.scan(), Err(WmfError::Glitch(_))));
    }

    #[test]
    fn test_progress_can_stop_play() {
        let data = metafile(0, &[(META_LINETO, &[1, 1]), (META_LINETO, &[2, 2])]);
        let mut player = Player::from_bytes(&data, PlayerOptions::default()).unwrap();
        player.scan().unwrap();
        player.set_progress(Box::new(|_| true));
        let mut device = crate::device::NullDevice;
        assert_eq!(player.play(&mut device), Err(WmfError::UserExit));
    }
}
