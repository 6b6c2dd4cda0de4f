//! Banded rectangle regions
//!
//! A region is a list of non-overlapping device rectangles sorted into
//! horizontal bands. Every rectangle of a band shares its top and bottom;
//! bands are ordered top to bottom and rectangles within a band left to
//! right. Boolean operations walk both operands band by band and coalesce
//! vertically adjacent bands whose x-spans match, so equal areas always end
//! up with the same rectangle list.

use crate::coord::DRect;

/// Classification of a region by rectangle count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionKind {
    #[default]
    Null,
    Simple,
    Complex,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Region {
    rects: Vec<DRect>,
    extents: DRect,
    kind: RegionKind,
}

/// How a clip rectangle is combined with the current clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOp {
    Exclude,
    Intersect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BandOp {
    Union,
    Subtract,
    Intersect,
}

impl BandOp {
    fn keeps_first(self) -> bool {
        matches!(self, BandOp::Union | BandOp::Subtract)
    }

    fn keeps_second(self) -> bool {
        matches!(self, BandOp::Union)
    }
}

impl Region {
    /// The empty region
    pub fn new() -> Self {
        Self::default()
    }

    /// Region covering `rect`; a degenerate rectangle gives the empty region
    pub fn from_rect(rect: &DRect) -> Self {
        let mut region = Self::new();
        region.set_rect(Some(rect));
        region
    }

    /// Replace the contents with a single rectangle (or nothing)
    pub fn set_rect(&mut self, rect: Option<&DRect>) {
        self.rects.clear();
        match rect {
            Some(r) if r.tl.x != r.br.x && r.tl.y != r.br.y => {
                self.rects.push(*r);
                self.extents = *r;
                self.kind = RegionKind::Simple;
            }
            _ => {
                self.extents = DRect::default();
                self.kind = RegionKind::Null;
            }
        }
    }

    pub fn rects(&self) -> &[DRect] {
        &self.rects
    }

    pub fn extents(&self) -> DRect {
        self.extents
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Translate every rectangle and the extents by a device offset
    pub fn offset(&mut self, dx: f64, dy: f64) {
        for r in self.rects.iter_mut().chain(std::iter::once(&mut self.extents)) {
            r.tl.x += dx;
            r.tl.y += dy;
            r.br.x += dx;
            r.br.y += dy;
        }
    }

    pub fn union(&self, other: &Region) -> Region {
        if std::ptr::eq(self, other) || self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        if self.len() == 1 && contains(&self.extents, &other.extents) {
            return self.clone();
        }
        if other.len() == 1 && contains(&other.extents, &self.extents) {
            return other.clone();
        }

        let rects = region_op(self, other, BandOp::Union);
        let extents = DRect::new(
            self.extents.tl.x.min(other.extents.tl.x),
            self.extents.tl.y.min(other.extents.tl.y),
            self.extents.br.x.max(other.extents.br.x),
            self.extents.br.y.max(other.extents.br.y),
        );
        let kind = if rects.is_empty() {
            RegionKind::Null
        } else {
            RegionKind::Complex
        };
        Region { rects, extents, kind }
    }

    pub fn intersect(&self, other: &Region) -> Region {
        let rects = if self.is_empty() || other.is_empty() || !self.extents.overlaps(&other.extents) {
            Vec::new()
        } else {
            region_op(self, other, BandOp::Intersect)
        };
        Region::from_banded(rects)
    }

    /// Area of `self` not covered by `other`
    pub fn subtract(&self, other: &Region) -> Region {
        if self.is_empty() || other.is_empty() || !self.extents.overlaps(&other.extents) {
            return self.clone();
        }
        Region::from_banded(region_op(self, other, BandOp::Subtract))
    }

    fn from_banded(rects: Vec<DRect>) -> Region {
        let extents = banded_extents(&rects);
        let kind = if rects.is_empty() {
            RegionKind::Null
        } else {
            RegionKind::Complex
        };
        Region { rects, extents, kind }
    }
}

/// Combine the clip with one rectangle.
///
/// An empty clip is first replaced by the visible region, except that an
/// intersection with an empty clip simply yields the rectangle.
pub fn combine_clip(clip: &Region, visible: &Region, rect: &DRect, op: ClipOp) -> Region {
    let rgn = Region::from_rect(rect);

    if clip.is_empty() && op == ClipOp::Intersect {
        return rgn;
    }

    let base = if clip.is_empty() { visible } else { clip };

    match op {
        ClipOp::Exclude => base.subtract(&rgn),
        ClipOp::Intersect => base.intersect(&rgn),
    }
}

fn contains(outer: &DRect, inner: &DRect) -> bool {
    outer.tl.x <= inner.tl.x && outer.tl.y <= inner.tl.y && outer.br.x >= inner.br.x && outer.br.y >= inner.br.y
}

/// Extents of a banded list: first rect has the smallest top, last the
/// largest bottom.
fn banded_extents(rects: &[DRect]) -> DRect {
    let (first, last) = match (rects.first(), rects.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return DRect::default(),
    };
    let mut extents = DRect::new(first.tl.x, first.tl.y, last.br.x, last.br.y);
    for r in rects {
        extents.tl.x = extents.tl.x.min(r.tl.x);
        extents.br.x = extents.br.x.max(r.br.x);
    }
    extents
}

fn band_end(rects: &[DRect], start: usize) -> usize {
    let top = rects[start].tl.y;
    let mut end = start;
    while end < rects.len() && rects[end].tl.y == top {
        end += 1;
    }
    end
}

fn region_op(reg1: &Region, reg2: &Region, op: BandOp) -> Vec<DRect> {
    let r1s = &reg1.rects;
    let r2s = &reg2.rects;
    let mut out = Vec::with_capacity(r1s.len().max(r2s.len()) * 2);

    let mut r1 = 0;
    let mut r2 = 0;

    // Bottom of the last intersection; clips the top of non-overlap bands
    let mut ybot = reg1.extents.tl.y.min(reg2.extents.tl.y);
    let mut prev_band = 0;

    loop {
        let mut cur_band = out.len();

        let r1_band_end = band_end(r1s, r1);
        let r2_band_end = band_end(r2s, r2);

        let ytop;
        if r1s[r1].tl.y < r2s[r2].tl.y {
            let top = r1s[r1].tl.y.max(ybot);
            let bot = r1s[r1].br.y.min(r2s[r2].tl.y);
            if top != bot && op.keeps_first() {
                copy_band(&mut out, &r1s[r1..r1_band_end], top, bot);
            }
            ytop = r2s[r2].tl.y;
        } else if r2s[r2].tl.y < r1s[r1].tl.y {
            let top = r2s[r2].tl.y.max(ybot);
            let bot = r2s[r2].br.y.min(r1s[r1].tl.y);
            if top != bot && op.keeps_second() {
                copy_band(&mut out, &r2s[r2..r2_band_end], top, bot);
            }
            ytop = r1s[r1].tl.y;
        } else {
            ytop = r1s[r1].tl.y;
        }

        if out.len() != cur_band {
            prev_band = coalesce(&mut out, prev_band, cur_band);
        }

        ybot = r1s[r1].br.y.min(r2s[r2].br.y);
        cur_band = out.len();
        if ybot > ytop {
            let a = &r1s[r1..r1_band_end];
            let b = &r2s[r2..r2_band_end];
            match op {
                BandOp::Union => union_band(&mut out, a, b, ytop, ybot),
                BandOp::Subtract => subtract_band(&mut out, a, b, ytop, ybot),
                BandOp::Intersect => intersect_band(&mut out, a, b, ytop, ybot),
            }
        }

        if out.len() != cur_band {
            prev_band = coalesce(&mut out, prev_band, cur_band);
        }

        if r1s[r1].br.y == ybot {
            r1 = r1_band_end;
        }
        if r2s[r2].br.y == ybot {
            r2 = r2_band_end;
        }

        if r1 == r1s.len() || r2 == r2s.len() {
            break;
        }
    }

    // Whatever is left of one operand lies below the other
    let cur_band = out.len();
    if r1 != r1s.len() {
        if op.keeps_first() {
            while r1 != r1s.len() {
                let end = band_end(r1s, r1);
                copy_band(&mut out, &r1s[r1..end], r1s[r1].tl.y.max(ybot), r1s[r1].br.y);
                r1 = end;
            }
        }
    } else if r2 != r2s.len() && op.keeps_second() {
        while r2 != r2s.len() {
            let end = band_end(r2s, r2);
            copy_band(&mut out, &r2s[r2..end], r2s[r2].tl.y.max(ybot), r2s[r2].br.y);
            r2 = end;
        }
    }

    if out.len() != cur_band {
        coalesce(&mut out, prev_band, cur_band);
    }

    out
}

/// Merge the band starting at `cur_start` into the previous band when both
/// have identical x-spans and touch vertically. Returns the start of the
/// band the next call should treat as previous.
fn coalesce(rects: &mut Vec<DRect>, prev_start: usize, cur_start: usize) -> usize {
    let reg_end = rects.len();
    let prev_num = cur_start - prev_start;

    let band_top = rects[cur_start].tl.y;
    let mut cur = cur_start;
    while cur != reg_end && rects[cur].tl.y == band_top {
        cur += 1;
    }
    let cur_num = cur - cur_start;

    // Several bands were appended at once: the next call starts at the last
    let mut next_start = cur_start;
    if cur != reg_end {
        let mut last = reg_end - 1;
        while last > 0 && rects[last - 1].tl.y == rects[last].tl.y {
            last -= 1;
        }
        next_start = last;
    }

    if cur_num != prev_num || cur_num == 0 {
        return next_start;
    }
    if rects[prev_start].br.y != rects[cur_start].tl.y {
        return next_start;
    }
    for i in 0..prev_num {
        let p = rects[prev_start + i];
        let c = rects[cur_start + i];
        if p.tl.x != c.tl.x || p.br.x != c.br.x {
            return next_start;
        }
    }

    for i in 0..cur_num {
        rects[prev_start + i].br.y = rects[cur_start + i].br.y;
    }
    rects.drain(cur_start..cur_start + cur_num);

    if cur_start + cur_num == reg_end {
        prev_start
    } else {
        next_start - cur_num
    }
}

fn copy_band(out: &mut Vec<DRect>, band: &[DRect], top: f64, bottom: f64) {
    out.extend(band.iter().map(|r| DRect::new(r.tl.x, top, r.br.x, bottom)));
}

/// Append `r` clipped to the band, extending the previous rect when they touch
fn merge_rect(out: &mut Vec<DRect>, r: &DRect, top: f64, bottom: f64) {
    if let Some(prior) = out.last_mut() {
        if prior.tl.y == top && prior.br.y == bottom && prior.br.x >= r.tl.x {
            if prior.br.x < r.br.x {
                prior.br.x = r.br.x;
            }
            return;
        }
    }
    out.push(DRect::new(r.tl.x, top, r.br.x, bottom));
}

fn union_band(out: &mut Vec<DRect>, a: &[DRect], b: &[DRect], top: f64, bottom: f64) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i].tl.x < b[j].tl.x {
            merge_rect(out, &a[i], top, bottom);
            i += 1;
        } else {
            merge_rect(out, &b[j], top, bottom);
            j += 1;
        }
    }
    for r in a[i..].iter().chain(b[j..].iter()) {
        merge_rect(out, r, top, bottom);
    }
}

fn subtract_band(out: &mut Vec<DRect>, m: &[DRect], s: &[DRect], top: f64, bottom: f64) {
    let (mut i, mut j) = (0, 0);
    let mut left = m[0].tl.x;

    while i < m.len() && j < s.len() {
        if s[j].br.x <= left {
            // subtrahend entirely to the left
            j += 1;
        } else if s[j].tl.x <= left {
            left = s[j].br.x;
            if left >= m[i].br.x {
                i += 1;
                if i < m.len() {
                    left = m[i].tl.x;
                }
            } else {
                j += 1;
            }
        } else if s[j].tl.x < m[i].br.x {
            out.push(DRect::new(left, top, s[j].tl.x, bottom));
            left = s[j].br.x;
            if left >= m[i].br.x {
                i += 1;
                if i < m.len() {
                    left = m[i].tl.x;
                }
            } else {
                j += 1;
            }
        } else {
            if m[i].br.x > left {
                out.push(DRect::new(left, top, m[i].br.x, bottom));
            }
            i += 1;
            if i < m.len() {
                left = m[i].tl.x;
            }
        }
    }

    while i < m.len() {
        out.push(DRect::new(left, top, m[i].br.x, bottom));
        i += 1;
        if i < m.len() {
            left = m[i].tl.x;
        }
    }
}

fn intersect_band(out: &mut Vec<DRect>, a: &[DRect], b: &[DRect], top: f64, bottom: f64) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let left = a[i].tl.x.max(b[j].tl.x);
        let right = a[i].br.x.min(b[j].br.x);
        if left < right {
            out.push(DRect::new(left, top, right, bottom));
        }

        if a[i].br.x < b[j].br.x {
            i += 1;
        } else if b[j].br.x < a[i].br.x {
            j += 1;
        } else {
            i += 1;
            j += 1;
        }
    }
}
