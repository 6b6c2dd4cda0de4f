#![allow(dead_code)]

use docquill_wmf::coord::DRect;
use docquill_wmf::dc::DeviceContext;
use docquill_wmf::device::*;
use docquill_wmf::stream::{PlaceableHeader, PLACEABLE_KEY};
use docquill_wmf::{WmfError, WmfResult};

/// Byte builder for test metafiles
pub struct MetafileBuilder {
    placeable: Option<PlaceableHeader>,
    num_objects: u16,
    records: Vec<(u32, u16, Vec<u16>)>,
}

impl MetafileBuilder {
    pub fn new() -> Self {
        Self {
            placeable: None,
            num_objects: 0,
            records: Vec::new(),
        }
    }

    pub fn objects(mut self, count: u16) -> Self {
        self.num_objects = count;
        self
    }

    pub fn placeable(mut self, left: i16, top: i16, right: i16, bottom: i16, inch: u16) -> Self {
        let mut header = PlaceableHeader {
            key: PLACEABLE_KEY,
            handle: 0,
            left,
            top,
            right,
            bottom,
            inch,
            reserved: 0,
            checksum: 0,
        };
        header.checksum = header.compute_checksum();
        self.placeable = Some(header);
        self
    }

    pub fn record(mut self, function: u16, words: &[u16]) -> Self {
        self.records.push((words.len() as u32 + 3, function, words.to_vec()));
        self
    }

    /// Record whose size field disagrees with its parameters
    pub fn raw_record(mut self, size: u32, function: u16, words: &[u16]) -> Self {
        self.records.push((size, function, words.to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut body = Vec::new();
        let mut max = 3u32;
        for (size, function, words) in &self.records {
            max = max.max(words.len() as u32 + 3);
            body.extend_from_slice(&size.to_le_bytes());
            body.extend_from_slice(&function.to_le_bytes());
            for w in words {
                body.extend_from_slice(&w.to_le_bytes());
            }
        }
        body.extend_from_slice(&3u32.to_le_bytes());
        body.extend_from_slice(&0u16.to_le_bytes());

        let mut data = Vec::new();
        if let Some(p) = self.placeable {
            data.extend_from_slice(&p.key.to_le_bytes());
            data.extend_from_slice(&p.handle.to_le_bytes());
            data.extend_from_slice(&p.left.to_le_bytes());
            data.extend_from_slice(&p.top.to_le_bytes());
            data.extend_from_slice(&p.right.to_le_bytes());
            data.extend_from_slice(&p.bottom.to_le_bytes());
            data.extend_from_slice(&p.inch.to_le_bytes());
            data.extend_from_slice(&p.reserved.to_le_bytes());
            data.extend_from_slice(&p.checksum.to_le_bytes());
        }

        let file_size = 9 + body.len() as u32 / 2;
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&9u16.to_le_bytes());
        data.extend_from_slice(&0x0300u16.to_le_bytes());
        data.extend_from_slice(&file_size.to_le_bytes());
        data.extend_from_slice(&self.num_objects.to_le_bytes());
        data.extend_from_slice(&max.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend(body);
        data
    }
}

/// Device that records the name of every call it receives
#[derive(Default)]
pub struct RecordingDevice {
    pub calls: Vec<String>,
    pub rectangles: Vec<DrawRectangle>,
    pub clips: Vec<PolyRectangle>,
    pub begin_bbox: Option<DRect>,
    pub fail_begin: bool,
    next_data: u32,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == name).count()
    }

    fn log(&mut self, name: &str) {
        self.calls.push(name.to_string());
    }
}

impl Device for RecordingDevice {
    fn device_open(&mut self) -> WmfResult<()> {
        self.log("device_open");
        Ok(())
    }

    fn device_close(&mut self) -> WmfResult<()> {
        self.log("device_close");
        Ok(())
    }

    fn device_begin(&mut self, bbox: &DRect) -> WmfResult<()> {
        self.begin_bbox = Some(*bbox);
        self.log("device_begin");
        if self.fail_begin {
            return Err(WmfError::DeviceError("begin refused".to_string()));
        }
        Ok(())
    }

    fn device_end(&mut self) -> WmfResult<()> {
        self.log("device_end");
        Ok(())
    }

    fn draw_line(&mut self, _dc: &DeviceContext, _line: &DrawLine) -> WmfResult<()> {
        self.log("draw_line");
        Ok(())
    }

    fn draw_rectangle(&mut self, _dc: &DeviceContext, rect: &DrawRectangle) -> WmfResult<()> {
        self.rectangles.push(rect.clone());
        self.log("draw_rectangle");
        Ok(())
    }

    fn draw_ellipse(&mut self, _dc: &DeviceContext, _ellipse: &DrawArc) -> WmfResult<()> {
        self.log("draw_ellipse");
        Ok(())
    }

    fn draw_text(&mut self, _dc: &DeviceContext, _text: &DrawText) -> WmfResult<()> {
        self.log("draw_text");
        Ok(())
    }

    fn udata_init(&mut self, _dc: &DeviceContext) -> WmfResult<Option<UserData>> {
        self.log("udata_init");
        self.next_data += 1;
        Ok(Some(UserData(self.next_data)))
    }

    fn udata_copy(&mut self, _dc: &DeviceContext, _data: Option<UserData>) -> WmfResult<Option<UserData>> {
        self.log("udata_copy");
        self.next_data += 1;
        Ok(Some(UserData(self.next_data)))
    }

    fn udata_set(&mut self, _dc: &DeviceContext) -> WmfResult<()> {
        self.log("udata_set");
        Ok(())
    }

    fn udata_free(&mut self, _dc: &DeviceContext) -> WmfResult<()> {
        self.log("udata_free");
        Ok(())
    }

    fn region_clip(&mut self, _dc: &DeviceContext, rects: &PolyRectangle) -> WmfResult<()> {
        self.clips.push(rects.clone());
        self.log("region_clip");
        Ok(())
    }
}
