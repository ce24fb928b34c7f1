//! Serializes laid-out pages with the standard Type1 faces.

use anyhow::Context;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::report::canvas::{Align, Element, Page, Rgb};
use crate::report::layout::{PAGE_HEIGHT, PAGE_WIDTH};
use crate::report::metrics::{text_width, Font};

/// Bezier handle length for quarter circles.
const KAPPA: f64 = 0.552_284_75;

pub fn write_pdf(pages: &[Page], title: &str) -> anyhow::Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), id);
    }
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for (index, page) in pages.iter().enumerate() {
        let content = Content {
            operations: page_operations(page),
        };
        let encoded = content
            .encode()
            .with_context(|| format!("failed to encode content of page {}", index + 1))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), real(PAGE_WIDTH), real(PAGE_HEIGHT)],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(encode_win_ansi(title), StringFormat::Literal),
        "Producer" => Object::String(b"Aether Equity Research".to_vec(), StringFormat::Literal),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).context("failed to serialize PDF")?;
    Ok(buffer)
}

/// Encodes `text` for a WinAnsi font. Characters outside the code page become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let (bytes, _, unmappable) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut buf));
        if unmappable || bytes.len() != 1 {
            out.push(b'?');
        } else {
            out.push(bytes[0]);
        }
    }
    out
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn flip(y: f64) -> f64 {
    PAGE_HEIGHT - y
}

fn color_operands(color: Rgb) -> Vec<Object> {
    color
        .iter()
        .map(|c| real(f64::from(*c) / 255.0))
        .collect()
}

fn op(operator: &str, operands: Vec<Object>) -> Operation {
    Operation::new(operator, operands)
}

fn move_to(ops: &mut Vec<Operation>, x: f64, y: f64) {
    ops.push(op("m", vec![real(x), real(flip(y))]));
}

fn line_to(ops: &mut Vec<Operation>, x: f64, y: f64) {
    ops.push(op("l", vec![real(x), real(flip(y))]));
}

fn curve_to(ops: &mut Vec<Operation>, c1: (f64, f64), c2: (f64, f64), end: (f64, f64)) {
    ops.push(op(
        "c",
        vec![
            real(c1.0),
            real(flip(c1.1)),
            real(c2.0),
            real(flip(c2.1)),
            real(end.0),
            real(flip(end.1)),
        ],
    ));
}

/// Converts one page's display list into content-stream operators.
pub fn page_operations(page: &Page) -> Vec<Operation> {
    let mut ops = Vec::new();
    for element in &page.elements {
        match element {
            Element::Rect { x, y, w, h, fill } => {
                ops.push(op("rg", color_operands(*fill)));
                ops.push(op("re", vec![real(*x), real(flip(y + h)), real(*w), real(*h)]));
                ops.push(op("f", vec![]));
            }
            Element::RoundedRect { x, y, w, h, r, fill } => {
                ops.push(op("rg", color_operands(*fill)));
                rounded_rect_path(&mut ops, *x, *y, *w, *h, *r);
                ops.push(op("f", vec![]));
            }
            Element::Circle { cx, cy, r, fill } => {
                ops.push(op("rg", color_operands(*fill)));
                circle_path(&mut ops, *cx, *cy, *r);
                ops.push(op("f", vec![]));
            }
            Element::Line {
                x1,
                y1,
                x2,
                y2,
                width,
                stroke,
            } => {
                ops.push(op("RG", color_operands(*stroke)));
                ops.push(op("w", vec![real(*width)]));
                move_to(&mut ops, *x1, *y1);
                line_to(&mut ops, *x2, *y2);
                ops.push(op("S", vec![]));
            }
            Element::Text {
                text,
                x,
                y,
                font,
                size,
                color,
                align,
                vertical,
            } => {
                let width = text_width(text, *font, *size);
                let x = match align {
                    Align::Left => *x,
                    Align::Center => x - width / 2.0,
                    Align::Right => x - width,
                };
                let matrix = if *vertical {
                    [0.0, 1.0, -1.0, 0.0, x, flip(*y)]
                } else {
                    [1.0, 0.0, 0.0, 1.0, x, flip(*y)]
                };
                ops.push(op("BT", vec![]));
                ops.push(op("Tf", vec![font.resource_name().into(), real(*size)]));
                ops.push(op("rg", color_operands(*color)));
                ops.push(op("Tm", matrix.iter().map(|v| real(*v)).collect()));
                ops.push(op(
                    "Tj",
                    vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                ));
                ops.push(op("ET", vec![]));
            }
        }
    }
    ops
}

fn rounded_rect_path(ops: &mut Vec<Operation>, x: f64, y: f64, w: f64, h: f64, r: f64) {
    let r = r.min(w / 2.0).min(h / 2.0).max(0.0);
    let k = r * KAPPA;
    let (right, bottom) = (x + w, y + h);

    move_to(ops, x + r, y);
    line_to(ops, right - r, y);
    curve_to(ops, (right - r + k, y), (right, y + r - k), (right, y + r));
    line_to(ops, right, bottom - r);
    curve_to(ops, (right, bottom - r + k), (right - r + k, bottom), (right - r, bottom));
    line_to(ops, x + r, bottom);
    curve_to(ops, (x + r - k, bottom), (x, bottom - r + k), (x, bottom - r));
    line_to(ops, x, y + r);
    curve_to(ops, (x, y + r - k), (x + r - k, y), (x + r, y));
    ops.push(op("h", vec![]));
}

fn circle_path(ops: &mut Vec<Operation>, cx: f64, cy: f64, r: f64) {
    let k = r * KAPPA;
    move_to(ops, cx + r, cy);
    curve_to(ops, (cx + r, cy + k), (cx + k, cy + r), (cx, cy + r));
    curve_to(ops, (cx - k, cy + r), (cx - r, cy + k), (cx - r, cy));
    curve_to(ops, (cx - r, cy - k), (cx - k, cy - r), (cx, cy - r));
    curve_to(ops, (cx + k, cy - r), (cx + r, cy - k), (cx + r, cy));
    ops.push(op("h", vec![]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::canvas::Canvas;

    fn reals(operation: &Operation) -> Vec<f32> {
        operation
            .operands
            .iter()
            .map(|o| match o {
                Object::Real(v) => *v,
                Object::Integer(v) => *v as f32,
                other => panic!("unexpected operand {other:?}"),
            })
            .collect()
    }

    #[test]
    fn win_ansi_covers_latin_and_report_punctuation() {
        assert_eq!(encode_win_ansi("Análisis"), b"An\xe1lisis".to_vec());
        assert_eq!(encode_win_ansi("• —"), vec![0x95, b' ', 0x97]);
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }

    #[test]
    fn text_is_flipped_and_right_aligned() {
        let mut canvas = Canvas::new();
        canvas.set_font(Font::HelveticaBold, 10.0);
        canvas.text_aligned("02", 500.0, 100.0, Align::Right);
        let pages = canvas.into_pages();
        let ops = page_operations(&pages[0]);

        let names: Vec<&str> = ops.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(names, vec!["BT", "Tf", "rg", "Tm", "Tj", "ET"]);

        let tm = reals(&ops[3]);
        let width = text_width("02", Font::HelveticaBold, 10.0);
        assert!((f64::from(tm[4]) - (500.0 - width)).abs() < 1e-3);
        assert!((f64::from(tm[5]) - (PAGE_HEIGHT - 100.0)).abs() < 1e-3);
        assert_eq!(ops[1].operands[0], Object::Name(b"F2".to_vec()));
    }

    #[test]
    fn rect_origin_moves_to_bottom_left() {
        let mut canvas = Canvas::new();
        canvas.rect(10.0, 20.0, 100.0, 50.0, [255, 0, 0]);
        let ops = page_operations(&canvas.into_pages()[0]);
        assert_eq!(reals(&ops[0]), vec![1.0, 0.0, 0.0]);
        let re = reals(&ops[1]);
        assert!((f64::from(re[1]) - (PAGE_HEIGHT - 70.0)).abs() < 1e-3);
        assert_eq!(ops[2].operator, "f");
    }

    #[test]
    fn writes_a_loadable_document() {
        let mut canvas = Canvas::new();
        canvas.text("Cover", 60.0, 60.0);
        canvas.add_page();
        canvas.circle(100.0, 100.0, 20.0, [16, 185, 129]);
        canvas.rounded_rect(60.0, 150.0, 200.0, 80.0, 12.0, [14, 21, 36]);

        let bytes = write_pdf(&canvas.into_pages(), "NVDA report").unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }
}
