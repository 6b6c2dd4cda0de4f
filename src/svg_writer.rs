//! SVG writer for generating SVG output

use svg::node::element::{Description, Ellipse, Image, Line, Path, Polygon, Polyline, Rectangle, Text};
use svg::node::Text as TextNode;
use svg::Document;

/// SVG writer for building SVG documents
pub struct SvgWriter {
    width: u32,
    height: u32,
    description: Option<String>,
    elements: Vec<svg::node::element::Element>,
}

fn points_attr(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{:.3},{:.3}", x, y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape character data and attribute values; the svg crate writes both verbatim
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

impl SvgWriter {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            description: None,
            elements: Vec::new(),
        }
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = Some(description.to_string());
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of drawing elements added so far
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Add a rectangle, optionally with rounded corners
    pub fn add_rect(&mut self, x: f64, y: f64, width: f64, height: f64, corner: Option<(f64, f64)>, style: &str) {
        let mut rect = Rectangle::new()
            .set("x", x)
            .set("y", y)
            .set("width", width)
            .set("height", height);

        if let Some((rx, ry)) = corner {
            rect = rect.set("rx", rx).set("ry", ry);
        }

        self.elements.push(rect.set("style", style).into());
    }

    pub fn add_ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64, style: &str) {
        let ellipse = Ellipse::new()
            .set("cx", cx)
            .set("cy", cy)
            .set("rx", rx)
            .set("ry", ry)
            .set("style", style);
        self.elements.push(ellipse.into());
    }

    pub fn add_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, style: &str) {
        let line = Line::new()
            .set("x1", x1)
            .set("y1", y1)
            .set("x2", x2)
            .set("y2", y2)
            .set("style", style);
        self.elements.push(line.into());
    }

    pub fn add_polyline(&mut self, points: &[(f64, f64)], style: &str) {
        let polyline = Polyline::new().set("points", points_attr(points)).set("style", style);
        self.elements.push(polyline.into());
    }

    pub fn add_polygon(&mut self, points: &[(f64, f64)], style: &str) {
        let polygon = Polygon::new().set("points", points_attr(points)).set("style", style);
        self.elements.push(polygon.into());
    }

    /// Add a path to the SVG
    pub fn add_path(&mut self, path_data: &str, style: &str) {
        let path = Path::new().set("d", path_data).set("style", style);
        self.elements.push(path.into());
    }

    /// Add text placed and rotated by `transform`
    pub fn add_text_styled(&mut self, text: &str, style: &str, transform: &str) {
        let text_elem = Text::new()
            .set("x", 0)
            .set("y", 0)
            .set("style", escape_xml(style))
            .set("transform", transform)
            .add(TextNode::new(escape_xml(text)));

        self.elements.push(text_elem.into());
    }

    /// Add an image to the SVG (as base64 embedded)
    pub fn add_image(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        image_data: &[u8],
        mime_type: &str,
    ) {
        use base64::{engine::general_purpose, Engine as _};
        let base64_data = general_purpose::STANDARD.encode(image_data);
        let data_uri = format!("data:{};base64,{}", mime_type, base64_data);

        let image = Image::new()
            .set("x", x)
            .set("y", y)
            .set("width", width)
            .set("height", height)
            .set("preserveAspectRatio", "none")
            .set("xlink:href", data_uri);

        self.elements.push(image.into());
    }

    /// Finish and generate SVG string
    pub fn finish(self) -> String {
        let mut document = Document::new()
            .set("width", self.width)
            .set("height", self.height)
            .set("viewBox", format!("0 0 {} {}", self.width, self.height))
            .set("xmlns:xlink", "http://www.w3.org/1999/xlink");

        if let Some(description) = self.description {
            document = document.add(Description::new().add(TextNode::new(escape_xml(&description))));
        }

        for element in self.elements {
            document = document.add(element);
        }

        document.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document() {
        let writer = SvgWriter::new(40, 20);
        assert!(writer.is_empty());
        let out = writer.finish();
        assert!(out.contains("<svg"));
        assert!(out.contains("viewBox=\"0 0 40 20\""));
    }

    #[test]
    fn test_rect_with_corners() {
        let mut writer = SvgWriter::new(10, 10);
        writer.add_rect(1.0, 2.0, 3.0, 4.0, Some((0.5, 0.5)), "fill:none");
        assert_eq!(writer.len(), 1);
        let out = writer.finish();
        assert!(out.contains("<rect"));
        assert!(out.contains("rx=\"0.5\""));
    }

    #[test]
    fn test_polygon_points() {
        let mut writer = SvgWriter::new(10, 10);
        writer.add_polygon(&[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)], "fill:#000000");
        let out = writer.finish();
        assert!(out.contains("0.000,0.000 5.000,0.000 5.000,5.000"));
    }

    #[test]
    fn test_description_and_image() {
        let mut writer = SvgWriter::new(10, 10);
        writer.set_description("chart");
        writer.add_image(0.0, 0.0, 10.0, 10.0, b"abc", "image/png");
        let out = writer.finish();
        assert!(out.contains("chart"));
        assert!(out.contains("data:image/png;base64,YWJj"));
    }

    #[test]
    fn test_text_is_escaped() {
        let mut writer = SvgWriter::new(10, 10);
        writer.set_description("R&D");
        writer.add_text_styled("a<b & c>d", "font-family:'A&B'", "matrix(1 0 0 1 0 0)");
        let out = writer.finish();
        assert!(out.contains("a&lt;b &amp; c&gt;d"));
        assert!(out.contains("R&amp;D"));
        assert!(out.contains("font-family:'A&amp;B'"));
        assert!(!out.contains("a<b"));
    }
}
