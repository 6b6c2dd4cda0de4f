//! Metafile byte stream: header and record framing
//!
//! `ByteCursor` wraps any `Read + Seek` source. The player reads the header
//! once, remembers the offset of the first record and seeks back to it
//! before each pass, so scan and play see exactly the same bytes.

use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, warn};

use crate::error::{WmfError, WmfResult};

/// Key at the start of a placeable (Aldus) metafile
pub const PLACEABLE_KEY: u32 = 0x9AC6_CDD7;

/// Size of the placeable prefix in bytes
pub const PLACEABLE_SIZE: u64 = 22;

/// Optional placeable header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaceableHeader {
    pub key: u32,
    pub handle: u16,
    pub left: i16,
    pub top: i16,
    pub right: i16,
    pub bottom: i16,
    /// Metafile units per inch
    pub inch: u16,
    pub reserved: u32,
    pub checksum: u16,
}

impl PlaceableHeader {
    /// XOR of the ten 16-bit words that precede the checksum
    pub fn compute_checksum(&self) -> u16 {
        let mut sum = 0u16;
        sum ^= (self.key & 0xFFFF) as u16;
        sum ^= (self.key >> 16) as u16;
        sum ^= self.handle;
        sum ^= self.left as u16;
        sum ^= self.top as u16;
        sum ^= self.right as u16;
        sum ^= self.bottom as u16;
        sum ^= self.inch;
        sum ^= (self.reserved & 0xFFFF) as u16;
        sum ^= (self.reserved >> 16) as u16;
        sum
    }

    pub fn checksum_ok(&self) -> bool {
        self.compute_checksum() == self.checksum
    }
}

/// Mandatory metafile header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetaHeader {
    pub file_type: u16,
    /// Header size in words; always 9
    pub header_size: u16,
    pub version: u16,
    /// File size in words
    pub file_size: u32,
    /// Number of object table slots the records may use
    pub num_objects: u16,
    /// Largest record in words
    pub max_record_size: u32,
    pub num_params: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub placeable: Option<PlaceableHeader>,
    pub meta: MetaHeader,
    /// Stream offset of the mandatory header
    pub header_start: u64,
    /// Stream offset of the first record
    pub records_start: u64,
}

impl Header {
    pub fn is_placeable(&self) -> bool {
        self.placeable.is_some()
    }

    /// Units per inch from the placeable header, 0 when absent
    pub fn dpi(&self) -> u16 {
        self.placeable.map(|p| p.inch).unwrap_or(0)
    }
}

/// Read-only view over record parameter words
///
/// Word `i` is little-endian at byte offset `2 * i`.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    data: &'a [u8],
}

impl<'a> Params<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Number of parameter words in this view
    pub fn size(&self) -> usize {
        self.data.len() / 2
    }

    pub fn u16(&self, index: usize) -> WmfResult<u16> {
        if index >= self.size() {
            return Err(WmfError::bad_format(format!(
                "parameter index {} out of range (record has {} words)",
                index,
                self.size()
            )));
        }
        Ok(u16::from_le_bytes([self.data[2 * index], self.data[2 * index + 1]]))
    }

    pub fn s16(&self, index: usize) -> WmfResult<i16> {
        Ok(self.u16(index)? as i16)
    }

    /// Sign-extended 16-bit parameter
    pub fn s32(&self, index: usize) -> WmfResult<i32> {
        Ok(self.s16(index)? as i32)
    }

    /// Sub-view starting at word `index`
    pub fn offset(&self, index: usize) -> WmfResult<Params<'a>> {
        if index > self.size() {
            return Err(WmfError::bad_format(format!(
                "offset {} beyond record of {} words",
                index,
                self.size()
            )));
        }
        Ok(Params {
            data: &self.data[2 * index..],
        })
    }

    /// The first `count` bytes of the view
    pub fn bytes(&self, count: usize) -> WmfResult<&'a [u8]> {
        if count > self.data.len() {
            return Err(WmfError::bad_format(format!(
                "{} bytes requested from a {} byte parameter block",
                count,
                self.data.len()
            )));
        }
        Ok(&self.data[..count])
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }
}

/// One metafile record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub function: u16,
    /// Stream offset of the parameter block
    pub position: u64,
    params: Vec<u8>,
}

impl Record {
    pub fn new(function: u16, params: Vec<u8>) -> Self {
        Self {
            function,
            position: 0,
            params,
        }
    }

    /// Parameter word count (record size minus the 3-word framing)
    pub fn size(&self) -> usize {
        self.params.len() / 2
    }

    pub fn params(&self) -> Params<'_> {
        Params::new(&self.params)
    }
}

/// Little-endian cursor over a seekable byte source
pub struct ByteCursor<R> {
    inner: R,
}

impl<'a> ByteCursor<Cursor<&'a [u8]>> {
    pub fn from_bytes(data: &'a [u8]) -> Self {
        Self::new(Cursor::new(data))
    }
}

impl<R: Read + Seek> ByteCursor<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn tell(&mut self) -> WmfResult<u64> {
        self.inner
            .stream_position()
            .map_err(|e| WmfError::BadFile(format!("tell failed: {}", e)))
    }

    pub fn seek(&mut self, pos: u64) -> WmfResult<()> {
        self.inner
            .seek(SeekFrom::Start(pos))
            .map(|_| ())
            .map_err(|e| WmfError::BadFile(format!("seek failed: {}", e)))
    }

    pub fn read_u16(&mut self) -> WmfResult<u16> {
        Ok(self.inner.read_u16::<LittleEndian>()?)
    }

    pub fn read_i16(&mut self) -> WmfResult<i16> {
        Ok(self.inner.read_i16::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> WmfResult<u32> {
        Ok(self.inner.read_u32::<LittleEndian>()?)
    }

    /// Read the placeable prefix (if present) and the mandatory header.
    ///
    /// A placeable checksum mismatch is `BadFormat` unless `lenient` is set,
    /// in which case it is only logged.
    pub fn read_header(&mut self, lenient: bool) -> WmfResult<Header> {
        let start = self.tell()?;

        let key = self.read_u32()?;
        let (placeable, header_start, file_type, header_size) = if key == PLACEABLE_KEY {
            let placeable = PlaceableHeader {
                key,
                handle: self.read_u16()?,
                left: self.read_i16()?,
                top: self.read_i16()?,
                right: self.read_i16()?,
                bottom: self.read_i16()?,
                inch: self.read_u16()?,
                reserved: self.read_u32()?,
                checksum: self.read_u16()?,
            };

            if !placeable.checksum_ok() {
                let msg = format!(
                    "placeable header checksum 0x{:04x} does not match computed 0x{:04x}",
                    placeable.checksum,
                    placeable.compute_checksum()
                );
                if lenient {
                    warn!("{}", msg);
                } else {
                    return Err(WmfError::BadFormat(msg));
                }
            }

            let header_start = self.tell()?;
            let file_type = self.read_u16()?;
            let header_size = self.read_u16()?;
            (Some(placeable), header_start, file_type, header_size)
        } else {
            // No prefix: the key bytes are already file type and header size
            (None, start, (key & 0xFFFF) as u16, (key >> 16) as u16)
        };

        if header_size != 9 {
            return Err(WmfError::bad_format(format!(
                "header size {} words, expected 9; not a metafile",
                header_size
            )));
        }

        let meta = MetaHeader {
            file_type,
            header_size,
            version: self.read_u16()?,
            file_size: self.read_u32()?,
            num_objects: self.read_u16()?,
            max_record_size: self.read_u32()?,
            num_params: self.read_u16()?,
        };

        let records_start = self.tell()?;

        debug!(
            "WMF header: placeable={} version=0x{:04x} size={} words objects={} max record={} words",
            placeable.is_some(),
            meta.version,
            meta.file_size,
            meta.num_objects,
            meta.max_record_size
        );

        Ok(Header {
            placeable,
            meta,
            header_start,
            records_start,
        })
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` at the end-of-records sentinel or when the stream
    /// ends inside the size field.
    pub fn read_record(&mut self, max_record_size: u32) -> WmfResult<Option<Record>> {
        let size = match self.read_u32() {
            Ok(size) => size,
            Err(WmfError::UnexpectedEof) => return Ok(None),
            Err(e) => return Err(e),
        };
        let function = self.read_u16()?;

        if size == 3 && function == 0 {
            return Ok(None);
        }
        if size < 3 || size - 3 > max_record_size {
            return Err(WmfError::bad_format(format!(
                "record size {} words outside 3..={}",
                size,
                max_record_size.saturating_add(3)
            )));
        }

        let position = self.tell()?;
        let mut params = vec![0u8; (size as usize - 3) * 2];
        self.inner.read_exact(&mut params)?;

        Ok(Some(Record {
            function,
            position,
            params,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_header(max_record: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&9u16.to_le_bytes());
        data.extend_from_slice(&0x0300u16.to_le_bytes());
        data.extend_from_slice(&100u32.to_le_bytes());
        data.extend_from_slice(&4u16.to_le_bytes());
        data.extend_from_slice(&max_record.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data
    }

    fn placeable_prefix(checksum: Option<u16>) -> Vec<u8> {
        let mut ph = PlaceableHeader {
            key: PLACEABLE_KEY,
            handle: 0,
            left: 0,
            top: 0,
            right: 1440,
            bottom: 720,
            inch: 1440,
            reserved: 0,
            checksum: 0,
        };
        ph.checksum = checksum.unwrap_or_else(|| ph.compute_checksum());
        let mut data = Vec::new();
        data.extend_from_slice(&ph.key.to_le_bytes());
        data.extend_from_slice(&ph.handle.to_le_bytes());
        data.extend_from_slice(&ph.left.to_le_bytes());
        data.extend_from_slice(&ph.top.to_le_bytes());
        data.extend_from_slice(&ph.right.to_le_bytes());
        data.extend_from_slice(&ph.bottom.to_le_bytes());
        data.extend_from_slice(&ph.inch.to_le_bytes());
        data.extend_from_slice(&ph.reserved.to_le_bytes());
        data.extend_from_slice(&ph.checksum.to_le_bytes());
        data
    }

    #[test]
    fn test_bare_header() {
        let data = bare_header(16);
        let mut cursor = ByteCursor::from_bytes(&data);
        let header = cursor.read_header(false).unwrap();
        assert!(!header.is_placeable());
        assert_eq!(header.meta.num_objects, 4);
        assert_eq!(header.meta.max_record_size, 16);
        assert_eq!(header.header_start, 0);
        assert_eq!(header.records_start, 18);
    }

    #[test]
    fn test_placeable_header() {
        let mut data = placeable_prefix(None);
        data.extend(bare_header(16));
        let mut cursor = ByteCursor::from_bytes(&data);
        let header = cursor.read_header(false).unwrap();
        let placeable = header.placeable.unwrap();
        assert_eq!(placeable.right, 1440);
        assert_eq!(header.dpi(), 1440);
        assert_eq!(header.header_start, PLACEABLE_SIZE);
        assert_eq!(header.records_start, PLACEABLE_SIZE + 18);
    }

    #[test]
    fn test_bad_checksum() {
        let mut data = placeable_prefix(Some(0x1234));
        data.extend(bare_header(16));
        let mut cursor = ByteCursor::from_bytes(&data);
        assert!(matches!(cursor.read_header(false), Err(WmfError::BadFormat(_))));

        let mut cursor = ByteCursor::from_bytes(&data);
        assert!(cursor.read_header(true).is_ok());
    }

    #[test]
    fn test_wrong_header_size() {
        let mut data = bare_header(16);
        data[2] = 8;
        let mut cursor = ByteCursor::from_bytes(&data);
        assert!(matches!(cursor.read_header(false), Err(WmfError::BadFormat(_))));
    }

    #[test]
    fn test_truncated_header() {
        let data = bare_header(16);
        let mut cursor = ByteCursor::from_bytes(&data[..10]);
        assert_eq!(cursor.read_header(false), Err(WmfError::UnexpectedEof));
    }

    #[test]
    fn test_read_records() {
        let mut data = Vec::new();
        data.extend_from_slice(&5u32.to_le_bytes());
        data.extend_from_slice(&0x0214u16.to_le_bytes());
        data.extend_from_slice(&7u16.to_le_bytes());
        data.extend_from_slice(&(-3i16).to_le_bytes());
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());

        let mut cursor = ByteCursor::from_bytes(&data);
        let record = cursor.read_record(16).unwrap().unwrap();
        assert_eq!(record.function, 0x0214);
        assert_eq!(record.size(), 2);
        assert_eq!(record.position, 6);
        assert_eq!(record.params().u16(0).unwrap(), 7);
        assert_eq!(record.params().s32(1).unwrap(), -3);
        assert!(cursor.read_record(16).unwrap().is_none());
    }

    #[test]
    fn test_record_size_below_three() {
        let mut data = Vec::new();
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&0x0214u16.to_le_bytes());
        let mut cursor = ByteCursor::from_bytes(&data);
        assert!(matches!(cursor.read_record(16), Err(WmfError::BadFormat(_))));
    }

    #[test]
    fn test_record_larger_than_max() {
        let mut data = Vec::new();
        data.extend_from_slice(&20u32.to_le_bytes());
        data.extend_from_slice(&0x0214u16.to_le_bytes());
        let mut cursor = ByteCursor::from_bytes(&data);
        assert!(matches!(cursor.read_record(16), Err(WmfError::BadFormat(_))));
    }

    #[test]
    fn test_eof_in_size_ends_cleanly() {
        let data = [0x05u8, 0x00];
        let mut cursor = ByteCursor::from_bytes(&data);
        assert_eq!(cursor.read_record(16), Ok(None));
    }

    #[test]
    fn test_truncated_parameters() {
        let mut data = Vec::new();
        data.extend_from_slice(&6u32.to_le_bytes());
        data.extend_from_slice(&0x0214u16.to_le_bytes());
        data.extend_from_slice(&[1, 0, 2]);
        let mut cursor = ByteCursor::from_bytes(&data);
        assert_eq!(cursor.read_record(16), Err(WmfError::UnexpectedEof));
    }

    #[test]
    fn test_params_bounds_and_offset() {
        let bytes = [1u8, 0, 2, 0, 3, 0];
        let params = Params::new(&bytes);
        assert_eq!(params.size(), 3);
        assert!(params.u16(3).is_err());

        let tail = params.offset(1).unwrap();
        assert_eq!(tail.size(), 2);
        assert_eq!(tail.u16(0).unwrap(), 2);
        assert_eq!(params.offset(3).unwrap().size(), 0);
        assert!(params.offset(4).is_err());
        assert_eq!(params.bytes(3).unwrap(), &[1, 0, 2]);
        assert!(params.bytes(7).is_err());
    }
}
