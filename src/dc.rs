//! Device context and the save/restore stack

use std::rc::Rc;

use crate::color::Rgb;
use crate::coord::Mapping;
use crate::device::UserData;
use crate::error::{WmfError, WmfResult};
use crate::object::{Brush, Font, Pen};
use crate::records::*;
use crate::region::Region;

/// Current graphics state
///
/// Pen, brush and font are shared with the object table slots they were
/// selected from; the clip region is owned.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceContext {
    pub pen: Rc<Pen>,
    pub brush: Rc<Brush>,
    pub font: Rc<Font>,

    pub text_color: Rgb,
    pub background: Rgb,
    /// TRANSPARENT or OPAQUE
    pub bg_mode: u16,
    /// ALTERNATE or WINDING
    pub polyfill_mode: u16,
    /// R2_* binary raster operation
    pub rop: u16,
    /// TA_* flags
    pub text_align: u16,
    pub char_extra: u16,
    pub break_extra: u16,

    pub mapping: Mapping,
    pub clip: Region,

    pub user_data: Option<UserData>,
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self {
            pen: Rc::new(Pen::default()),
            brush: Rc::new(Brush::default()),
            font: Rc::new(Font::default()),
            text_color: Rgb::BLACK,
            background: Rgb::WHITE,
            bg_mode: OPAQUE,
            polyfill_mode: ALTERNATE,
            rop: R2_COPYPEN,
            text_align: TA_LEFT | TA_TOP,
            char_extra: 0,
            break_extra: 0,
            mapping: Mapping::default(),
            clip: Region::new(),
            user_data: None,
        }
    }
}

impl DeviceContext {
    pub fn is_opaque(&self) -> bool {
        self.bg_mode != TRANSPARENT
    }

    /// Half the pen thickness in device units, as used to grow the scan box.
    ///
    /// Null pens and hairlines (at most one device unit each way) add nothing.
    pub fn pen_scope(&self) -> f64 {
        let pen = &self.pen;
        if pen.is_null() {
            return 0.0;
        }
        let thickness = pen.width.abs().max(pen.height.abs());
        if thickness <= 1.0 {
            0.0
        } else {
            thickness / 2.0
        }
    }
}

/// Saved device contexts, most recent last
#[derive(Debug, Clone, Default)]
pub struct DcStack {
    saved: Vec<DeviceContext>,
}

impl DcStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn push(&mut self, dc: DeviceContext) {
        self.saved.push(dc);
    }

    /// `Glitch` when nothing was saved
    pub fn pop(&mut self) -> WmfResult<DeviceContext> {
        self.saved
            .pop()
            .ok_or_else(|| WmfError::glitch("restore without a matching save"))
    }

    /// Remove every saved context, most recent first
    pub fn drain(&mut self) -> impl Iterator<Item = DeviceContext> + '_ {
        self.saved.drain(..).rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::DRect;

    #[test]
    fn test_defaults() {
        let dc = DeviceContext::default();
        assert_eq!(dc.background, Rgb::WHITE);
        assert_eq!(dc.text_color, Rgb::BLACK);
        assert!(dc.is_opaque());
        assert!(dc.brush.is_null());
        assert_eq!(dc.font.name, "Times");
        assert_eq!(dc.pen_scope(), 0.0);
    }

    #[test]
    fn test_pen_scope() {
        let mut dc = DeviceContext::default();
        dc.pen = Rc::new(Pen {
            width: 6.0,
            height: 4.0,
            ..Pen::default()
        });
        assert_eq!(dc.pen_scope(), 3.0);

        dc.pen = Rc::new(Pen {
            style: PS_NULL,
            width: 6.0,
            height: 6.0,
            ..Pen::default()
        });
        assert_eq!(dc.pen_scope(), 0.0);
    }

    #[test]
    fn test_stack_balance() {
        let mut stack = DcStack::new();
        let mut dc = DeviceContext::default();
        dc.clip = Region::from_rect(&DRect::new(0.0, 0.0, 5.0, 5.0));
        stack.push(dc.clone());
        dc.clip = Region::new();
        assert_eq!(stack.depth(), 1);

        let restored = stack.pop().unwrap();
        assert_eq!(restored.clip.len(), 1);
        assert_eq!(stack.depth(), 0);
        assert!(matches!(stack.pop(), Err(WmfError::Glitch(_))));
    }

    #[test]
    fn test_saved_copy_shares_pen() {
        let dc = DeviceContext::default();
        let copy = dc.clone();
        assert!(Rc::ptr_eq(&dc.pen, &copy.pen));
    }
}
