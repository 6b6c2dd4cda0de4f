//! Graphics objects and the positional object table
//!
//! Records refer to objects by slot index. A create record takes the first
//! free slot, so the allocation order has to match what the metafile's
//! writer assumed.

use std::cell::Cell;
use std::rc::Rc;

use crate::color::Rgb;
use crate::device::Bitmap;
use crate::error::{WmfError, WmfResult};
use crate::records::*;
use crate::region::Region;

#[derive(Debug, Clone, PartialEq)]
pub struct Pen {
    /// PS_* style (low nibble of the style word)
    pub style: u16,
    pub endcap: u16,
    pub join: u16,
    /// Device units
    pub width: f64,
    pub height: f64,
    pub color: Rgb,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            style: PS_SOLID,
            endcap: PS_ENDCAP_ROUND,
            join: PS_JOIN_ROUND,
            width: 1.0,
            height: 1.0,
            color: Rgb::BLACK,
        }
    }
}

impl Pen {
    /// Split a raw LOGPEN style word into style, end cap and join
    pub fn from_style_word(style: u16, width: f64, height: f64, color: Rgb) -> Self {
        Self {
            style: style & PS_STYLE_MASK,
            endcap: style & PS_ENDCAP_MASK,
            join: style & PS_JOIN_MASK,
            width,
            height,
            color,
        }
    }

    pub fn is_null(&self) -> bool {
        self.style == PS_NULL
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    /// BS_* style
    pub style: u16,
    pub color: Rgb,
    /// HS_* hatch for hatched brushes
    pub hatch: u16,
    /// Pattern bitmap, filled in during play by the backend
    pub bitmap: Cell<Option<Bitmap>>,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            style: BS_NULL,
            color: Rgb::BLACK,
            hatch: HS_HORIZONTAL,
            bitmap: Cell::new(None),
        }
    }
}

impl Brush {
    pub fn is_null(&self) -> bool {
        self.style == BS_NULL
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    /// Logical units, always positive
    pub height: f64,
    pub width: f64,
    /// Tenths of a degree, counter-clockwise
    pub escapement: i16,
    pub orientation: i16,
    pub weight: u16,
    pub italic: bool,
    pub underline: bool,
    pub strikeout: bool,
    pub charset: u8,
    pub out_precision: u8,
    pub clip_precision: u8,
    pub quality: u8,
    pub pitch_and_family: u8,
    pub name: String,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            height: 12.0,
            width: 12.0,
            escapement: 0,
            orientation: 0,
            weight: 0,
            italic: false,
            underline: false,
            strikeout: false,
            charset: 0,
            out_precision: 0,
            clip_precision: 0,
            quality: 0,
            pitch_and_family: 0,
            name: "Times".to_string(),
        }
    }
}

/// Content of one object table slot
#[derive(Debug, Clone, PartialEq)]
pub enum GraphicsObject {
    Pen(Rc<Pen>),
    Brush(Rc<Brush>),
    Font(Rc<Font>),
    Region(Region),
    /// Palettes are not interpreted; the slot is only marked as used
    Palette,
}

impl GraphicsObject {
    pub fn kind_name(&self) -> &'static str {
        match self {
            GraphicsObject::Pen(_) => "pen",
            GraphicsObject::Brush(_) => "brush",
            GraphicsObject::Font(_) => "font",
            GraphicsObject::Region(_) => "region",
            GraphicsObject::Palette => "palette",
        }
    }
}

/// Fixed-capacity table of graphics objects addressed by slot index
#[derive(Debug, Clone, Default)]
pub struct ObjectTable {
    slots: Vec<Option<GraphicsObject>>,
}

impl ObjectTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Store `object` in the first free slot and return its handle
    pub fn insert(&mut self, object: GraphicsObject) -> WmfResult<usize> {
        match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots[index] = Some(object);
                Ok(index)
            }
            None => Err(WmfError::bad_format(format!(
                "object out of range: all {} slots in use",
                self.slots.len()
            ))),
        }
    }

    fn check(&self, handle: u16) -> WmfResult<usize> {
        let index = handle as usize;
        if index >= self.slots.len() {
            return Err(WmfError::bad_format(format!(
                "object {} out of range (table holds {})",
                handle,
                self.slots.len()
            )));
        }
        Ok(index)
    }

    /// Slot content; `BadFormat` when the handle is beyond the table
    pub fn get(&self, handle: u16) -> WmfResult<Option<&GraphicsObject>> {
        let index = self.check(handle)?;
        Ok(self.slots[index].as_ref())
    }

    /// Empty the slot and hand back what it held
    pub fn remove(&mut self, handle: u16) -> WmfResult<Option<GraphicsObject>> {
        let index = self.check(handle)?;
        Ok(self.slots[index].take())
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn iter(&self) -> impl Iterator<Item = &GraphicsObject> {
        self.slots.iter().flatten()
    }

    /// Pattern bitmaps still held by brushes in the table
    pub fn pattern_bitmaps(&self) -> Vec<Bitmap> {
        self.iter()
            .filter_map(|obj| match obj {
                GraphicsObject::Brush(brush) => brush.bitmap.take(),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_free_slot() {
        let mut table = ObjectTable::new(3);
        assert_eq!(table.insert(GraphicsObject::Palette).unwrap(), 0);
        assert_eq!(table.insert(GraphicsObject::Pen(Rc::new(Pen::default()))).unwrap(), 1);
        table.remove(0).unwrap();
        assert_eq!(table.insert(GraphicsObject::Font(Rc::new(Font::default()))).unwrap(), 0);
        assert_eq!(table.insert(GraphicsObject::Region(Region::new())).unwrap(), 2);
    }

    #[test]
    fn test_exhaustion_is_bad_format() {
        let mut table = ObjectTable::new(1);
        table.insert(GraphicsObject::Palette).unwrap();
        assert!(matches!(table.insert(GraphicsObject::Palette), Err(WmfError::BadFormat(_))));
    }

    #[test]
    fn test_out_of_range_handle() {
        let mut table = ObjectTable::new(2);
        assert_eq!(table.get(1).unwrap(), None);
        assert!(table.get(2).is_err());
        assert!(table.remove(5).is_err());
    }

    #[test]
    fn test_pen_style_word() {
        let pen = Pen::from_style_word(PS_DASH | PS_ENDCAP_FLAT | PS_JOIN_MITER, 2.0, 2.0, Rgb::WHITE);
        assert_eq!(pen.style, PS_DASH);
        assert_eq!(pen.endcap, PS_ENDCAP_FLAT);
        assert_eq!(pen.join, PS_JOIN_MITER);
        assert!(!pen.is_null());
    }

    #[test]
    fn test_pattern_bitmaps_taken_once() {
        let mut table = ObjectTable::new(2);
        let brush = Brush {
            style: BS_DIBPATTERN,
            ..Brush::default()
        };
        brush.bitmap.set(Some(Bitmap {
            width: 8,
            height: 8,
            id: 4,
        }));
        table.insert(GraphicsObject::Brush(Rc::new(brush))).unwrap();
        assert_eq!(table.pattern_bitmaps().len(), 1);
        assert!(table.pattern_bitmaps().is_empty());
    }
}
