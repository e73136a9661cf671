//! Minimal PDF writer for plain text documents.
//!
//! Text is set in the built-in Courier face so every glyph has the same
//! advance and wrapping can be computed from character counts alone.

use std::fmt::Write as _;

/// Page geometry in PDF points, measured from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub line_height: f32,
    pub max_width: f32,
    /// A new page starts once the next baseline would pass this
    pub bottom_limit: f32,
    pub font_size: f32,
    /// Horizontal advance of one Courier glyph at `font_size`
    pub glyph_advance: f32,
}

impl Default for PdfLayout {
    fn default() -> Self {
        Self {
            page_width: 595.28,
            page_height: 841.89,
            margin: 40.0,
            line_height: 16.0,
            max_width: 515.0,
            bottom_limit: 800.0,
            font_size: 12.0,
            glyph_advance: 7.2,
        }
    }
}

impl PdfLayout {
    /// Characters that fit on one line.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn columns(&self) -> usize {
        ((self.max_width / self.glyph_advance).floor() as usize).max(1)
    }

    /// Word-wrap `text` to [`Self::columns`], honoring hard line breaks.
    /// Indentation and runs of spaces inside a line are kept; the gap a
    /// line breaks at is dropped. Words longer than a line are split.
    #[must_use]
    pub fn wrap(&self, text: &str) -> Vec<String> {
        let mut filler = LineFiller::new(self.columns());

        for paragraph in text.split('\n') {
            let paragraph = paragraph.trim_end_matches('\r').replace('\t', "    ");
            let mut word = String::new();
            let mut gap = 0usize;

            for ch in paragraph.chars() {
                if ch.is_whitespace() {
                    if !word.is_empty() {
                        filler.place(&std::mem::take(&mut word), gap);
                        gap = 0;
                    }
                    gap += 1;
                } else {
                    word.push(ch);
                }
            }
            if !word.is_empty() {
                filler.place(&word, gap);
            }
            filler.end_paragraph();
        }

        filler.lines
    }

    /// Split wrapped lines into pages. Always yields at least one page.
    #[must_use]
    pub fn paginate(&self, text: &str) -> Vec<Vec<String>> {
        let mut pages = vec![Vec::new()];
        let mut y = self.margin;

        for line in self.wrap(text) {
            if y + self.line_height > self.bottom_limit {
                pages.push(Vec::new());
                y = self.margin;
            }
            if let Some(page) = pages.last_mut() {
                page.push(line);
            }
            y += self.line_height;
        }

        pages
    }
}

struct LineFiller {
    columns: usize,
    lines: Vec<String>,
    line: String,
    width: usize,
}

impl LineFiller {
    const fn new(columns: usize) -> Self {
        Self {
            columns,
            lines: Vec::new(),
            line: String::new(),
            width: 0,
        }
    }

    /// Append `word` after `gap` blanks, breaking first if it does not fit.
    fn place(&mut self, word: &str, gap: usize) {
        let word_width = word.chars().count();

        if self.width + gap + word_width <= self.columns {
            self.line.push_str(&" ".repeat(gap));
            self.line.push_str(word);
            self.width += gap + word_width;
        } else if word_width > self.columns {
            self.break_line();
            let chars = word.chars().collect::<Vec<_>>();
            let mut chunks = chars.chunks(self.columns).peekable();
            while let Some(chunk) = chunks.next() {
                let piece = chunk.iter().collect::<String>();
                if chunks.peek().is_some() {
                    self.lines.push(piece);
                } else {
                    self.width = chunk.len();
                    self.line = piece;
                }
            }
        } else {
            self.break_line();
            self.line.push_str(word);
            self.width = word_width;
        }
    }

    fn break_line(&mut self) {
        if !self.line.is_empty() {
            self.lines.push(std::mem::take(&mut self.line));
        }
        self.width = 0;
    }

    fn end_paragraph(&mut self) {
        self.lines.push(std::mem::take(&mut self.line));
        self.width = 0;
    }
}

/// Render `text` as a complete PDF 1.4 document.
#[must_use]
pub fn render_pdf(text: &str, layout: &PdfLayout) -> Vec<u8> {
    let pages = layout.paginate(text);
    let mut writer = ObjectWriter::new();

    let page_count = pages.len();
    let kids = (0..page_count)
        .map(|index| format!("{} 0 R", 4 + index * 2))
        .collect::<Vec<_>>()
        .join(" ");

    writer.object(b"<< /Type /Catalog /Pages 2 0 R >>");
    writer.object(format!("<< /Type /Pages /Kids [{kids}] /Count {page_count} >>").as_bytes());
    writer.object(b"<< /Type /Font /Subtype /Type1 /BaseFont /Courier /Encoding /WinAnsiEncoding >>");

    for (index, lines) in pages.iter().enumerate() {
        let contents_id = 5 + index * 2;
        writer.object(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {contents_id} 0 R >>",
                layout.page_width, layout.page_height
            )
            .as_bytes(),
        );

        let stream = content_stream(lines, layout);
        let mut body = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
        body.extend_from_slice(&stream);
        body.extend_from_slice(b"\nendstream");
        writer.object(&body);
    }

    writer.finish()
}

#[allow(clippy::cast_precision_loss)]
fn content_stream(lines: &[String], layout: &PdfLayout) -> Vec<u8> {
    let mut stream = Vec::new();
    let mut header = String::new();
    let _ = write!(header, "BT\n/F1 {:.0} Tf\n", layout.font_size);
    stream.extend_from_slice(header.as_bytes());

    let mut y = layout.margin;
    for line in lines {
        let baseline = layout.page_height - y;
        stream.extend_from_slice(
            format!("1 0 0 1 {:.2} {:.2} Tm\n(", layout.margin, baseline).as_bytes(),
        );
        stream.extend_from_slice(&encode_text(line));
        stream.extend_from_slice(b") Tj\n");
        y += layout.line_height;
    }

    stream.extend_from_slice(b"ET");
    stream
}

/// Encode a line as an escaped WinAnsi string literal body.
/// Characters outside Latin-1 become `?`.
fn encode_text(line: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(line.len());
    for ch in line.chars() {
        match ch {
            '(' | ')' | '\\' => {
                bytes.push(b'\\');
                bytes.push(ch as u8);
            }
            ' '..='~' => bytes.push(ch as u8),
            '\u{a0}'..='\u{ff}' => bytes.push(u32::from(ch).to_le_bytes()[0]),
            c if c.is_control() => {}
            _ => bytes.push(b'?'),
        }
    }
    bytes
}

struct ObjectWriter {
    buffer: Vec<u8>,
    offsets: Vec<usize>,
}

impl ObjectWriter {
    fn new() -> Self {
        Self {
            buffer: b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec(),
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, body: &[u8]) {
        self.offsets.push(self.buffer.len());
        let id = self.offsets.len();
        self.buffer
            .extend_from_slice(format!("{id} 0 obj\n").as_bytes());
        self.buffer.extend_from_slice(body);
        self.buffer.extend_from_slice(b"\nendobj\n");
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_offset = self.buffer.len();
        let size = self.offsets.len() + 1;

        let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
        for offset in &self.offsets {
            let _ = writeln!(xref, "{offset:010} 00000 n ");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {size} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        );

        self.buffer.extend_from_slice(xref.as_bytes());
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack
            .windows(needle.len())
            .any(|window| window == needle)
    }

    #[test]
    fn a4_layout_fits_71_columns() {
        assert_eq!(PdfLayout::default().columns(), 71);
    }

    #[test]
    fn wrap_breaks_on_words_and_keeps_blank_lines() {
        let layout = PdfLayout {
            max_width: 75.0,
            ..PdfLayout::default()
        };
        assert_eq!(layout.columns(), 10);

        let lines = layout.wrap("one two three four\n\nfive");
        assert_eq!(lines, vec!["one two", "three four", "", "five"]);
    }

    #[test]
    fn wrap_splits_words_longer_than_a_line() {
        let layout = PdfLayout {
            max_width: 40.0,
            ..PdfLayout::default()
        };
        assert_eq!(layout.columns(), 5);

        let lines = layout.wrap("abcdefghijkl mn");
        assert_eq!(lines, vec!["abcde", "fghij", "kl mn"]);
    }

    #[test]
    fn wrap_keeps_indentation_and_inner_spacing() {
        let layout = PdfLayout {
            max_width: 75.0,
            ..PdfLayout::default()
        };

        let lines = layout.wrap("  - item\nk:  v\n\tfn x()");
        assert_eq!(lines, vec!["  - item", "k:  v", "    fn x()"]);
    }

    #[test]
    fn wrap_drops_only_the_gap_it_breaks_at() {
        let layout = PdfLayout {
            max_width: 75.0,
            ..PdfLayout::default()
        };

        let lines = layout.wrap("    keep ab   cd");
        assert_eq!(lines, vec!["    keep", "ab   cd"]);
    }

    #[test]
    fn forty_seven_lines_fit_on_a_page() {
        let layout = PdfLayout::default();
        let text = vec!["x"; 100].join("\n");
        let pages = layout.paginate(&text);

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].len(), 47);
        assert_eq!(pages[1].len(), 47);
        assert_eq!(pages[2].len(), 6);
    }

    #[test]
    fn empty_text_still_yields_one_page() {
        assert_eq!(PdfLayout::default().paginate("").len(), 1);
    }

    #[test]
    fn rendered_document_has_valid_structure() {
        let text = vec!["line"; 60].join("\n");
        let pdf = render_pdf(&text, &PdfLayout::default());

        assert!(pdf.starts_with(b"%PDF-1.4\n"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        assert!(contains(&pdf, b"/Count 2"));
        assert!(contains(&pdf, b"/Kids [4 0 R 6 0 R]"));
        assert!(contains(&pdf, b"/BaseFont /Courier"));
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let pdf = render_pdf("hello", &PdfLayout::default());
        let text = String::from_utf8_lossy(&pdf);
        let xref_start = text.find("xref\n").unwrap();

        let entries = text[xref_start..]
            .lines()
            .skip(3)
            .take_while(|line| line.ends_with(" n "))
            .map(|line| line[..10].parse::<usize>().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(entries.len(), 5);

        for (index, offset) in entries.iter().enumerate() {
            let expected = format!("{} 0 obj", index + 1);
            assert!(pdf[*offset..].starts_with(expected.as_bytes()));
        }
    }

    #[test]
    fn text_is_escaped_and_mapped_to_win_ansi() {
        assert_eq!(encode_text("a(b)c\\"), b"a\\(b\\)c\\\\".to_vec());
        assert_eq!(encode_text("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_text("ok 🔒"), b"ok ?".to_vec());
    }
}
