use crate::report::metrics::Font;

pub type Rgb = [u8; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// One drawing instruction. Coordinates are points from the top-left corner; text `y`
/// is the baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        fill: Rgb,
    },
    RoundedRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        r: f64,
        fill: Rgb,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        fill: Rgb,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        width: f64,
        stroke: Rgb,
    },
    Text {
        text: String,
        x: f64,
        y: f64,
        font: Font,
        size: f64,
        color: Rgb,
        align: Align,
        /// Rotated 90° counter-clockwise around (x, y).
        vertical: bool,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub elements: Vec<Element>,
}

impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Current text state plus the page being drawn, mirroring a pen-based PDF API.
#[derive(Debug)]
pub struct Canvas {
    pages: Vec<Page>,
    font: Font,
    size: f64,
    color: Rgb,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            font: Font::Helvetica,
            size: 12.0,
            color: [0, 0, 0],
        }
    }

    pub fn add_page(&mut self) {
        self.pages.push(Page::default());
    }

    pub fn page_number(&self) -> usize {
        self.pages.len()
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }

    fn push(&mut self, element: Element) {
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    pub fn set_font(&mut self, font: Font, size: f64) {
        self.font = font;
        self.size = size;
    }

    pub fn set_color(&mut self, color: Rgb) {
        self.color = color;
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: Rgb) {
        self.push(Element::Rect { x, y, w, h, fill });
    }

    pub fn rounded_rect(&mut self, x: f64, y: f64, w: f64, h: f64, r: f64, fill: Rgb) {
        self.push(Element::RoundedRect { x, y, w, h, r, fill });
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: Rgb) {
        self.push(Element::Circle { cx, cy, r, fill });
    }

    pub fn line(&mut self, (x1, y1): (f64, f64), (x2, y2): (f64, f64), width: f64, stroke: Rgb) {
        self.push(Element::Line {
            x1,
            y1,
            x2,
            y2,
            width,
            stroke,
        });
    }

    pub fn text(&mut self, text: &str, x: f64, y: f64) {
        self.text_aligned(text, x, y, Align::Left);
    }

    pub fn text_aligned(&mut self, text: &str, x: f64, y: f64, align: Align) {
        if text.is_empty() {
            return;
        }
        self.push(Element::Text {
            text: text.to_string(),
            x,
            y,
            font: self.font,
            size: self.size,
            color: self.color,
            align,
            vertical: false,
        });
    }

    pub fn text_vertical(&mut self, text: &str, x: f64, y: f64) {
        self.push(Element::Text {
            text: text.to_string(),
            x,
            y,
            font: self.font,
            size: self.size,
            color: self.color,
            align: Align::Left,
            vertical: true,
        });
    }

    /// Draws pre-wrapped lines; returns the height consumed.
    pub fn lines(&mut self, lines: &[String], x: f64, y: f64, line_height: f64) -> f64 {
        for (i, line) in lines.iter().enumerate() {
            self.text(line, x, y + i as f64 * line_height);
        }
        lines.len() as f64 * line_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_inherits_current_pen() {
        let mut canvas = Canvas::new();
        canvas.set_font(Font::HelveticaBold, 20.0);
        canvas.set_color([1, 2, 3]);
        canvas.text("NVDA", 10.0, 20.0);
        canvas.add_page();
        canvas.text("", 0.0, 0.0);
        canvas.lines(&["a".to_string(), "b".to_string()], 0.0, 100.0, 14.0);

        let pages = canvas.into_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(
            pages[0].elements[0],
            Element::Text {
                text: "NVDA".to_string(),
                x: 10.0,
                y: 20.0,
                font: Font::HelveticaBold,
                size: 20.0,
                color: [1, 2, 3],
                align: Align::Left,
                vertical: false,
            }
        );
        assert_eq!(pages[1].texts().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
