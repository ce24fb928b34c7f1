//! Glyph widths for the standard PDF faces and the text wrapping built on them.

/// Standard Type1 faces; no font files are embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    TimesBold,
    TimesItalic,
}

impl Font {
    pub const ALL: [Font; 5] = [
        Font::Helvetica,
        Font::HelveticaBold,
        Font::HelveticaOblique,
        Font::TimesBold,
        Font::TimesItalic,
    ];

    pub fn base_font(self) -> &'static str {
        match self {
            Font::Helvetica => "Helvetica",
            Font::HelveticaBold => "Helvetica-Bold",
            Font::HelveticaOblique => "Helvetica-Oblique",
            Font::TimesBold => "Times-Bold",
            Font::TimesItalic => "Times-Italic",
        }
    }

    /// Name under which the face is registered in the page resources.
    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Helvetica => "F1",
            Font::HelveticaBold => "F2",
            Font::HelveticaOblique => "F3",
            Font::TimesBold => "F4",
            Font::TimesItalic => "F5",
        }
    }

    /// Advance width in 1/1000 em.
    fn char_width(self, c: char) -> u16 {
        let table = match self {
            Font::HelveticaBold | Font::TimesBold => &HELVETICA_BOLD,
            // Times is only drawn unmeasured (ticker, quote marks).
            Font::Helvetica | Font::HelveticaOblique | Font::TimesItalic => &HELVETICA,
        };
        let c = fold_latin(c);
        match c {
            ' '..='~' => table[c as usize - 32],
            '•' => 350,
            '—' | '…' => 1000,
            _ => 556,
        }
    }
}

// AFM advance widths for U+0020..=U+007E.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n..z
    334, 260, 334, 584, // {..~
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// Accented Latin letters share the advance of their base letter.
fn fold_latin(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => 'A',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => 'O',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'Ñ' => 'N',
        'Ç' => 'C',
        '¿' => '?',
        '¡' => '!',
        other => other,
    }
}

pub fn text_width(text: &str, font: Font, size: f64) -> f64 {
    let units: f64 = text.chars().map(|c| f64::from(font.char_width(c))).sum();
    units * size / 1000.0
}

/// Greedy word wrap at `max_width` points.
///
/// Explicit newlines start a new line. A single word wider than the column is split at
/// character boundaries. Empty input yields no lines.
pub fn wrap_text(text: &str, font: Font, size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    if text.trim().is_empty() {
        return lines;
    }

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };

            if text_width(&candidate, font, size) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if text_width(word, font, size) > max_width {
                let mut chunks = split_word(word, font, size, max_width);
                current = chunks.pop().unwrap_or_default();
                lines.extend(chunks);
            } else {
                current = word.to_string();
            }
        }

        if current.is_empty() && paragraph.trim().is_empty() {
            lines.push(String::new());
        } else if !current.is_empty() {
            lines.push(current);
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

fn split_word(word: &str, font: Font, size: f64, max_width: f64) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for c in word.chars() {
        let mut candidate = current.clone();
        candidate.push(c);
        if !current.is_empty() && text_width(&candidate, font, size) > max_width {
            chunks.push(std::mem::replace(&mut current, c.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Largest size in `min..=preferred` (1pt steps) at which `text` fits `width`.
pub fn fit_font_size(text: &str, font: Font, width: f64, preferred: f64, min: f64) -> f64 {
    let mut size = preferred;
    while text_width(text, font, size) > width && size > min {
        size -= 1.0;
    }
    size
}
