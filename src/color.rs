//! RGB colors and the scan-time color table

use log::debug;

use crate::error::{WmfError, WmfResult};

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 0xff,
        g: 0xff,
        b: 0xff,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Color from the two record words of a COLORREF: red in the low byte of
    /// the first, green in its high byte, blue in the low byte of the second
    pub fn from_words(rg: u16, b: u16) -> Self {
        Self {
            r: (rg & 0xff) as u8,
            g: (rg >> 8) as u8,
            b: (b & 0xff) as u8,
        }
    }

    /// `#rrggbb` form used by SVG attributes
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Largest per-channel difference
    fn distance(&self, other: &Rgb) -> u32 {
        let dr = (self.r as i32 - other.r as i32).unsigned_abs();
        let dg = (self.g as i32 - other.g as i32).unsigned_abs();
        let db = (self.b as i32 - other.b as i32).unsigned_abs();
        dr.max(dg).max(db)
    }
}

/// Colors referenced by the metafile, collected during scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorTable {
    entries: Vec<Rgb>,
}

impl ColorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rgb: Rgb) {
        if !self.entries.contains(&rgb) {
            self.entries.push(rgb);
        }
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.entries
    }

    /// Index of `rgb`, or of the closest entry when there is no exact match.
    ///
    /// An empty table is a `Glitch`; with `lenient` set it only logs and
    /// answers 0.
    pub fn index(&self, rgb: &Rgb, lenient: bool) -> WmfResult<usize> {
        if self.entries.is_empty() {
            if lenient {
                debug!("color table has no entries");
                return Ok(0);
            }
            return Err(WmfError::glitch("color table has no entries"));
        }

        if let Some(i) = self.entries.iter().position(|c| c == rgb) {
            return Ok(i);
        }

        let mut best = 0;
        let mut dbest = 766;
        for (i, c) in self.entries.iter().enumerate() {
            let d = rgb.distance(c);
            if d < dbest {
                best = i;
                dbest = d;
            }
        }
        Ok(best)
    }

    pub fn get(&self, index: usize) -> WmfResult<Rgb> {
        self.entries
            .get(index)
            .copied()
            .ok_or_else(|| WmfError::glitch(format!("color index {} out of range", index)))
    }
}
