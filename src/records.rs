//! WMF record function codes and GDI constants used by the player

pub const META_EOF: u16 = 0x0000;
pub const META_REALIZEPALETTE: u16 = 0x0035;
pub const META_SETPALENTRIES: u16 = 0x0037;
pub const META_SAVEDC: u16 = 0x001E;
pub const META_CREATEPALETTE: u16 = 0x00F7;
pub const META_SETBKMODE: u16 = 0x0102;
pub const META_SETMAPMODE: u16 = 0x0103;
pub const META_SETROP2: u16 = 0x0104;
pub const META_SETRELABS: u16 = 0x0105;
pub const META_SETPOLYFILLMODE: u16 = 0x0106;
pub const META_SETSTRETCHBLTMODE: u16 = 0x0107;
pub const META_SETTEXTCHAREXTRA: u16 = 0x0108;
pub const META_RESTOREDC: u16 = 0x0127;
pub const META_INVERTREGION: u16 = 0x012A;
pub const META_PAINTREGION: u16 = 0x012B;
pub const META_SELECTCLIPREGION: u16 = 0x012C;
pub const META_SELECTOBJECT: u16 = 0x012D;
pub const META_SETTEXTALIGN: u16 = 0x012E;
pub const META_RESIZEPALETTE: u16 = 0x0139;
pub const META_DIBCREATEPATTERNBRUSH: u16 = 0x0142;
pub const META_DELETEOBJECT: u16 = 0x01F0;
pub const META_CREATEPATTERNBRUSH: u16 = 0x01F9;
pub const META_SETBKCOLOR: u16 = 0x0201;
pub const META_SETTEXTCOLOR: u16 = 0x0209;
pub const META_SETTEXTJUSTIFICATION: u16 = 0x020A;
pub const META_SETWINDOWORG: u16 = 0x020B;
pub const META_SETWINDOWEXT: u16 = 0x020C;
pub const META_SETVIEWPORTORG: u16 = 0x020D;
pub const META_SETVIEWPORTEXT: u16 = 0x020E;
pub const META_OFFSETWINDOWORG: u16 = 0x020F;
pub const META_OFFSETVIEWPORTORG: u16 = 0x0211;
pub const META_LINETO: u16 = 0x0213;
pub const META_MOVETO: u16 = 0x0214;
pub const META_OFFSETCLIPRGN: u16 = 0x0220;
pub const META_FILLREGION: u16 = 0x0228;
pub const META_SETMAPPERFLAGS: u16 = 0x0231;
pub const META_SELECTPALETTE: u16 = 0x0234;
pub const META_CREATEPENINDIRECT: u16 = 0x02FA;
pub const META_CREATEFONTINDIRECT: u16 = 0x02FB;
pub const META_CREATEBRUSHINDIRECT: u16 = 0x02FC;
pub const META_POLYGON: u16 = 0x0324;
pub const META_POLYLINE: u16 = 0x0325;
pub const META_SCALEWINDOWEXT: u16 = 0x0410;
pub const META_SCALEVIEWPORTEXT: u16 = 0x0412;
pub const META_EXCLUDECLIPRECT: u16 = 0x0415;
pub const META_INTERSECTCLIPRECT: u16 = 0x0416;
pub const META_ELLIPSE: u16 = 0x0418;
pub const META_FLOODFILL: u16 = 0x0419;
pub const META_RECTANGLE: u16 = 0x041B;
pub const META_SETPIXEL: u16 = 0x041F;
pub const META_FRAMEREGION: u16 = 0x0429;
pub const META_ANIMATEPALETTE: u16 = 0x0436;
pub const META_TEXTOUT: u16 = 0x0521;
pub const META_POLYPOLYGON: u16 = 0x0538;
pub const META_EXTFLOODFILL: u16 = 0x0548;
pub const META_ROUNDRECT: u16 = 0x061C;
pub const META_PATBLT: u16 = 0x061D;
pub const META_ESCAPE: u16 = 0x0626;
pub const META_CREATEREGION: u16 = 0x06FF;
pub const META_ARC: u16 = 0x0817;
pub const META_PIE: u16 = 0x081A;
pub const META_CHORD: u16 = 0x0830;
pub const META_BITBLT: u16 = 0x0922;
pub const META_DIBBITBLT: u16 = 0x0940;
pub const META_EXTTEXTOUT: u16 = 0x0A32;
pub const META_STRETCHBLT: u16 = 0x0B23;
pub const META_DIBSTRETCHBLT: u16 = 0x0B41;
pub const META_SETDIBTODEV: u16 = 0x0D33;
pub const META_STRETCHDIB: u16 = 0x0F43;

// Mapping modes
pub const MM_TEXT: u16 = 1;
pub const MM_LOMETRIC: u16 = 2;
pub const MM_HIMETRIC: u16 = 3;
pub const MM_LOENGLISH: u16 = 4;
pub const MM_HIENGLISH: u16 = 5;
pub const MM_TWIPS: u16 = 6;
pub const MM_ISOTROPIC: u16 = 7;
pub const MM_ANISOTROPIC: u16 = 8;
/// Not a GDI mode: scale taken from the placeable header's units-per-inch.
pub const MM_DPI: u16 = 9;

// Background modes
pub const TRANSPARENT: u16 = 1;
pub const OPAQUE: u16 = 2;

// Polygon fill modes
pub const ALTERNATE: u16 = 1;
pub const WINDING: u16 = 2;

// Binary raster ops
pub const R2_BLACK: u16 = 1;
pub const R2_NOT: u16 = 6;
pub const R2_COPYPEN: u16 = 13;
pub const R2_WHITE: u16 = 16;

// Text alignment
pub const TA_NOUPDATECP: u16 = 0;
pub const TA_UPDATECP: u16 = 1;
pub const TA_LEFT: u16 = 0;
pub const TA_RIGHT: u16 = 2;
pub const TA_CENTER: u16 = 6;
pub const TA_TOP: u16 = 0;
pub const TA_BOTTOM: u16 = 8;
pub const TA_BASELINE: u16 = 24;

// ExtTextOut options
pub const ETO_OPAQUE: u16 = 0x0002;
pub const ETO_CLIPPED: u16 = 0x0004;

// Pen styles
pub const PS_SOLID: u16 = 0;
pub const PS_DASH: u16 = 1;
pub const PS_DOT: u16 = 2;
pub const PS_DASHDOT: u16 = 3;
pub const PS_DASHDOTDOT: u16 = 4;
pub const PS_NULL: u16 = 5;
pub const PS_INSIDEFRAME: u16 = 6;
pub const PS_STYLE_MASK: u16 = 0x000F;
pub const PS_ENDCAP_ROUND: u16 = 0x0000;
pub const PS_ENDCAP_SQUARE: u16 = 0x0100;
pub const PS_ENDCAP_FLAT: u16 = 0x0200;
pub const PS_ENDCAP_MASK: u16 = 0x0F00;
pub const PS_JOIN_ROUND: u16 = 0x0000;
pub const PS_JOIN_BEVEL: u16 = 0x1000;
pub const PS_JOIN_MITER: u16 = 0x2000;
pub const PS_JOIN_MASK: u16 = 0xF000;

// Brush styles
pub const BS_SOLID: u16 = 0;
pub const BS_NULL: u16 = 1;
pub const BS_HATCHED: u16 = 2;
pub const BS_PATTERN: u16 = 3;
pub const BS_DIBPATTERN: u16 = 5;

// Hatch styles
pub const HS_HORIZONTAL: u16 = 0;
pub const HS_VERTICAL: u16 = 1;
pub const HS_FDIAGONAL: u16 = 2;
pub const HS_BDIAGONAL: u16 = 3;
pub const HS_CROSS: u16 = 4;
pub const HS_DIAGCROSS: u16 = 5;

// Flood fill types
pub const FLOODFILLBORDER: u16 = 0;
pub const FLOODFILLSURFACE: u16 = 1;

/// Get a human readable name for a record function code
pub fn get_record_name(function: u16) -> &'static str {
    match function {
        META_EOF => "EOF",
        META_REALIZEPALETTE => "REALIZEPALETTE",
        META_SETPALENTRIES => "SETPALENTRIES",
        META_SAVEDC => "SAVEDC",
        META_CREATEPALETTE => "CREATEPALETTE",
        META_SETBKMODE => "SETBKMODE",
        META_SETMAPMODE => "SETMAPMODE",
        META_SETROP2 => "SETROP2",
        META_SETRELABS => "SETRELABS",
        META_SETPOLYFILLMODE => "SETPOLYFILLMODE",
        META_SETSTRETCHBLTMODE => "SETSTRETCHBLTMODE",
        META_SETTEXTCHAREXTRA => "SETTEXTCHAREXTRA",
        META_RESTOREDC => "RESTOREDC",
        META_INVERTREGION => "INVERTREGION",
        META_PAINTREGION => "PAINTREGION",
        META_SELECTCLIPREGION => "SELECTCLIPREGION",
        META_SELECTOBJECT => "SELECTOBJECT",
        META_SETTEXTALIGN => "SETTEXTALIGN",
        META_RESIZEPALETTE => "RESIZEPALETTE",
        META_DIBCREATEPATTERNBRUSH => "DIBCREATEPATTERNBRUSH",
        META_DELETEOBJECT => "DELETEOBJECT",
        META_CREATEPATTERNBRUSH => "CREATEPATTERNBRUSH",
        META_SETBKCOLOR => "SETBKCOLOR",
        META_SETTEXTCOLOR => "SETTEXTCOLOR",
        META_SETTEXTJUSTIFICATION => "SETTEXTJUSTIFICATION",
        META_SETWINDOWORG => "SETWINDOWORG",
        META_SETWINDOWEXT => "SETWINDOWEXT",
        META_SETVIEWPORTORG => "SETVIEWPORTORG",
        META_SETVIEWPORTEXT => "SETVIEWPORTEXT",
        META_OFFSETWINDOWORG => "OFFSETWINDOWORG",
        META_OFFSETVIEWPORTORG => "OFFSETVIEWPORTORG",
        META_LINETO => "LINETO",
        META_MOVETO => "MOVETO",
        META_OFFSETCLIPRGN => "OFFSETCLIPRGN",
        META_FILLREGION => "FILLREGION",
        META_SETMAPPERFLAGS => "SETMAPPERFLAGS",
        META_SELECTPALETTE => "SELECTPALETTE",
        META_CREATEPENINDIRECT => "CREATEPENINDIRECT",
        META_CREATEFONTINDIRECT => "CREATEFONTINDIRECT",
        META_CREATEBRUSHINDIRECT => "CREATEBRUSHINDIRECT",
        META_POLYGON => "POLYGON",
        META_POLYLINE => "POLYLINE",
        META_SCALEWINDOWEXT => "SCALEWINDOWEXT",
        META_SCALEVIEWPORTEXT => "SCALEVIEWPORTEXT",
        META_EXCLUDECLIPRECT => "EXCLUDECLIPRECT",
        META_INTERSECTCLIPRECT => "INTERSECTCLIPRECT",
        META_ELLIPSE => "ELLIPSE",
        META_FLOODFILL => "FLOODFILL",
        META_RECTANGLE => "RECTANGLE",
        META_SETPIXEL => "SETPIXEL",
        META_FRAMEREGION => "FRAMEREGION",
        META_ANIMATEPALETTE => "ANIMATEPALETTE",
        META_TEXTOUT => "TEXTOUT",
        META_POLYPOLYGON => "POLYPOLYGON",
        META_EXTFLOODFILL => "EXTFLOODFILL",
        META_ROUNDRECT => "ROUNDRECT",
        META_PATBLT => "PATBLT",
        META_ESCAPE => "ESCAPE",
        META_CREATEREGION => "CREATEREGION",
        META_ARC => "ARC",
        META_PIE => "PIE",
        META_CHORD => "CHORD",
        META_BITBLT => "BITBLT",
        META_DIBBITBLT => "DIBBITBLT",
        META_EXTTEXTOUT => "EXTTEXTOUT",
        META_STRETCHBLT => "STRETCHBLT",
        META_DIBSTRETCHBLT => "DIBSTRETCHBLT",
        META_SETDIBTODEV => "SETDIBTODEV",
        META_STRETCHDIB => "STRETCHDIB",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_names() {
        assert_eq!(get_record_name(META_RECTANGLE), "RECTANGLE");
        assert_eq!(get_record_name(META_CREATEREGION), "CREATEREGION");
        assert_eq!(get_record_name(0x7777), "UNKNOWN");
    }
}
