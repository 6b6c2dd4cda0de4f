mod common;

use common::MetafileBuilder;
use docquill_wmf::records::*;
use docquill_wmf::wmf::convert_wmf_to_svg_with;
use docquill_wmf::{convert_wmf_to_svg, is_wmf_format, PlayerOptions, SvgOptions, WmfError};

fn drawing() -> Vec<u8> {
    MetafileBuilder::new()
        .objects(2)
        .record(META_CREATEBRUSHINDIRECT, &[BS_SOLID, 0x00ff, 0x0000, 0])
        .record(META_RECTANGLE, &[50, 100, 0, 0])
        .record(META_TEXTOUT, &[2, u16::from_le_bytes(*b"Hi"), 30, 10])
        .build()
}

#[test]
fn test_convert_rectangle_and_text() {
    let data = drawing();
    assert!(is_wmf_format(&data));

    let svg = convert_wmf_to_svg(&data).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("<rect"));
    assert!(svg.contains("fill:#ff0000"));
    assert!(svg.contains("<text"));
    assert!(svg.contains("Hi"));
    assert!(svg.contains("font-family:'Times'"));
}

#[test]
fn test_fixed_canvas_and_description() {
    let data = drawing();
    let svg = convert_wmf_to_svg_with(
        &data,
        PlayerOptions::default(),
        SvgOptions {
            width: 300,
            height: 200,
            description: Some("logo".to_string()),
            ..SvgOptions::default()
        },
    )
    .unwrap();
    assert!(svg.contains("width=\"300\""));
    assert!(svg.contains("<desc>"));
    assert!(svg.contains("logo"));
}

#[test]
fn test_empty_drawing_has_no_canvas() {
    // nothing registered: zero bounding box, which the SVG backend rejects
    let data = MetafileBuilder::new().record(META_SETBKMODE, &[TRANSPARENT]).build();
    assert!(matches!(convert_wmf_to_svg(&data), Err(WmfError::Glitch(_))));
}

#[test]
fn test_hatched_brush_needs_lenient_mode() {
    let data = MetafileBuilder::new()
        .objects(1)
        .record(META_CREATEBRUSHINDIRECT, &[BS_HATCHED, 0, 0, HS_CROSS])
        .record(META_RECTANGLE, &[10, 10, 0, 0])
        .build();

    assert!(matches!(convert_wmf_to_svg(&data), Err(WmfError::Glitch(_))));

    let lenient = PlayerOptions {
        ignore_nonfatal: true,
        ..PlayerOptions::default()
    };
    let svg = convert_wmf_to_svg_with(&data, lenient, SvgOptions::default()).unwrap();
    assert!(svg.contains("<rect"));
}

fn name_words(name: &[u8]) -> Vec<u16> {
    let mut bytes = name.to_vec();
    bytes.push(0);
    if bytes.len() % 2 == 1 {
        bytes.push(0);
    }
    bytes.chunks(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect()
}

#[test]
fn test_markup_in_text_is_escaped() {
    let data = MetafileBuilder::new()
        .record(META_RECTANGLE, &[50, 100, 0, 0])
        .record(META_TEXTOUT, &[2, u16::from_le_bytes(*b"<&"), 30, 10])
        .build();

    let svg = convert_wmf_to_svg(&data).unwrap();
    assert!(!svg.contains("<&"));
    assert!(svg.contains("&lt;&amp;"));
}

#[test]
fn test_font_family_is_quoted() {
    let mut font = vec![12, 0, 0, 0, 400, 0, 0, 0, 0];
    font.extend(name_words(b"Times New;Roman's"));
    let data = MetafileBuilder::new()
        .objects(1)
        .record(META_CREATEFONTINDIRECT, &font)
        .record(META_TEXTOUT, &[2, u16::from_le_bytes(*b"Hi"), 30, 10])
        .record(META_RECTANGLE, &[50, 100, 0, 0])
        .build();

    let svg = convert_wmf_to_svg(&data).unwrap();
    assert!(svg.contains("font-family:'Times NewRomans';"));
}
