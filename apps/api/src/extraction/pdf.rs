//! PDF text reconstruction.
//!
//! pdf-extract walks the content streams and reports every glyph with its text-space
//! transform. We collect those glyphs into positioned fragments (one per shown
//! string) and rebuild two candidate texts from them:
//!
//! - layout-bucketed: rows by rounded y, top to bottom, each row sorted by x
//! - end-of-line joined: stream order, breaking wherever the stream moved to a new line
//!
//! Which one reads better depends on the producer, so both are scored and the
//! caller keeps the stronger one.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use pdf_extract::{Document, MediaBox, Object, OutputDev, OutputError, Transform};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::ExtractionStrategy;
use crate::text::{compute_diagnostics, normalize, Diagnostics};

/// Score margin inside which the two reconstructions count as a tie.
const SELECTION_MARGIN: f64 = 5.0;

lazy_static! {
    static ref NO_SPACE_BEFORE: Regex = Regex::new(r"^[,.:;)\]]").unwrap();
    static ref NO_SPACE_AFTER: Regex = Regex::new(r"[(\[$]$").unwrap();
    static ref INLINE_SPACES: Regex = Regex::new(r"[ \u{00A0}]{2,}").unwrap();
}

/// One shown string, positioned in top-left page coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub end_of_line: bool,
}

/// Both reconstructions plus every link annotation URI, in page order.
#[derive(Debug, Clone, Default)]
pub struct PdfText {
    pub layout: String,
    pub end_of_line: String,
    pub link_urls: Vec<String>,
}

/// Why one reconstruction was kept over the other.
#[derive(Debug, Clone, Serialize)]
pub struct PdfSelection {
    pub chosen: ExtractionStrategy,
    pub layout_score: f64,
    pub end_of_line_score: f64,
    pub layout: Diagnostics,
    pub end_of_line: Diagnostics,
}

// ────────────────────────────────────────────────────────────────────────────
// Glyph collection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FragmentCollector {
    page: u32,
    page_height: f64,
    current: Option<TextFragment>,
    last_end: f64,
    fragments: Vec<TextFragment>,
}

impl FragmentCollector {
    fn flush(&mut self) {
        if let Some(fragment) = self.current.take() {
            if !fragment.text.is_empty() {
                self.fragments.push(fragment);
            }
        }
    }

    fn mark_end_of_line(&mut self) {
        if let Some(last) = self.fragments.last_mut() {
            if last.page == self.page {
                last.end_of_line = true;
            }
        }
    }
}

impl OutputDev for FragmentCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.page = page_num;
        self.page_height = media_box.ury - media_box.lly;
        self.last_end = 0.0;
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.flush();
        self.mark_end_of_line();
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        let x = trm.m31;
        let y = self.page_height - trm.m32;
        let scaled = ((font_size * trm.m11 + font_size * trm.m21)
            * (font_size * trm.m12 + font_size * trm.m22))
            .abs()
            .sqrt();

        match self.current.as_mut() {
            None => {
                self.current = Some(TextFragment {
                    page: self.page,
                    x,
                    y,
                    text: char.to_string(),
                    end_of_line: false,
                });
            }
            Some(fragment) => {
                if x > self.last_end + scaled * 0.1 && !fragment.text.ends_with(' ') {
                    fragment.text.push(' ');
                }
                fragment.text.push_str(char);
            }
        }
        self.last_end = x + width * scaled;
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        self.flush();
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        self.flush();
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        self.flush();
        self.mark_end_of_line();
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Extraction
// ────────────────────────────────────────────────────────────────────────────

/// Parses the document and builds both reconstructions. Encrypted documents are
/// tried with the empty user password, which covers most "protected" resumes.
pub fn extract_pdf(bytes: &[u8]) -> Result<PdfText> {
    let mut doc = Document::load_mem(bytes).context("failed to parse PDF")?;
    if doc.is_encrypted() {
        doc.decrypt("").context("failed to decrypt PDF")?;
    }

    let mut collector = FragmentCollector::default();
    pdf_extract::output_doc(&doc, &mut collector).context("failed to read PDF text")?;
    collector.flush();

    let mut pages: BTreeMap<u32, Vec<TextFragment>> = BTreeMap::new();
    for fragment in collector.fragments {
        pages.entry(fragment.page).or_default().push(fragment);
    }
    debug!("PDF: {} pages with text", pages.len());

    let mut layout_pages = Vec::new();
    let mut eol_pages = Vec::new();
    for fragments in pages.values() {
        let layout = normalize(&layout_text(fragments));
        if !layout.is_empty() {
            layout_pages.push(layout);
        }
        let eol = normalize(&end_of_line_text(fragments));
        if !eol.is_empty() {
            eol_pages.push(eol);
        }
    }

    Ok(PdfText {
        layout: normalize(&layout_pages.join("\n\n")),
        end_of_line: normalize(&eol_pages.join("\n\n")),
        link_urls: annotation_uris(&doc),
    })
}

/// URIs from link annotations (`/Annots` → `/A` → `/URI`), page by page.
fn annotation_uris(doc: &Document) -> Vec<String> {
    let mut urls = Vec::new();
    for page_id in doc.get_pages().into_values() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };
        let Some(annots) = page
            .get(b"Annots")
            .ok()
            .and_then(|o| doc.dereference(o).ok())
            .and_then(|(_, o)| o.as_array().ok())
        else {
            continue;
        };
        for annot in annots {
            if let Some(uri) = link_uri(doc, annot) {
                urls.push(uri);
            }
        }
    }
    urls
}

fn link_uri(doc: &Document, annot: &Object) -> Option<String> {
    let (_, annot) = doc.dereference(annot).ok()?;
    let action = annot.as_dict().ok()?.get(b"A").ok()?;
    let (_, action) = doc.dereference(action).ok()?;
    let uri = action.as_dict().ok()?.get(b"URI").ok()?;
    let (_, uri) = doc.dereference(uri).ok()?;
    let uri = String::from_utf8_lossy(uri.as_str().ok()?).trim().to_string();
    (!uri.is_empty()).then_some(uri)
}

// ────────────────────────────────────────────────────────────────────────────
// Reconstruction
// ────────────────────────────────────────────────────────────────────────────

/// Appends a token with punctuation-aware spacing.
fn push_token(line: &mut String, token: &str) {
    if line.is_empty() {
        line.push_str(token);
    } else if NO_SPACE_BEFORE.is_match(token) || NO_SPACE_AFTER.is_match(line) {
        line.push_str(token);
    } else {
        line.push(' ');
        line.push_str(token);
    }
}

fn clean_line(line: &str) -> String {
    INLINE_SPACES.replace_all(line, " ").trim().to_string()
}

/// Rows keyed by y rounded to half a point, emitted top to bottom.
pub fn layout_text(fragments: &[TextFragment]) -> String {
    let mut rows: BTreeMap<i64, Vec<&TextFragment>> = BTreeMap::new();
    for fragment in fragments.iter().filter(|f| !f.text.trim().is_empty()) {
        rows.entry((fragment.y * 2.0).round() as i64)
            .or_default()
            .push(fragment);
    }

    let mut lines = Vec::with_capacity(rows.len());
    for row in rows.values_mut() {
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
        let mut line = String::new();
        for fragment in row.iter() {
            push_token(&mut line, &fragment.text);
        }
        let cleaned = clean_line(&line);
        if !cleaned.is_empty() {
            lines.push(cleaned);
        }
    }
    lines.join("\n")
}

/// Stream order; a line ends wherever the content stream moved to a new line.
pub fn end_of_line_text(fragments: &[TextFragment]) -> String {
    let mut lines = Vec::new();
    let mut line = String::new();

    for fragment in fragments {
        let token = clean_line(&fragment.text);
        if !token.is_empty() {
            push_token(&mut line, &token);
        }
        if fragment.end_of_line && !line.trim().is_empty() {
            lines.push(line.trim().to_string());
            line.clear();
        }
    }
    if !line.trim().is_empty() {
        lines.push(line.trim().to_string());
    }
    lines.join("\n")
}

/// Keeps the reconstruction with the higher extraction score. Within the margin,
/// more bullet markers win, then the longer text; layout wins a full tie.
pub fn select_reconstruction(layout: &str, end_of_line: &str) -> PdfSelection {
    let layout_diag = compute_diagnostics(layout);
    let eol_diag = compute_diagnostics(end_of_line);
    let layout_score = layout_diag.extraction_score();
    let eol_score = eol_diag.extraction_score();

    let chosen = if eol_score > layout_score + SELECTION_MARGIN {
        ExtractionStrategy::EndOfLineJoined
    } else if layout_score > eol_score + SELECTION_MARGIN {
        ExtractionStrategy::LayoutBucketed
    } else if eol_diag.bullet_markers != layout_diag.bullet_markers {
        if eol_diag.bullet_markers > layout_diag.bullet_markers {
            ExtractionStrategy::EndOfLineJoined
        } else {
            ExtractionStrategy::LayoutBucketed
        }
    } else if eol_diag.extracted_text_length > layout_diag.extracted_text_length {
        ExtractionStrategy::EndOfLineJoined
    } else {
        ExtractionStrategy::LayoutBucketed
    };

    PdfSelection {
        chosen,
        layout_score,
        end_of_line_score: eol_score,
        layout: layout_diag,
        end_of_line: eol_diag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(x: f64, y: f64, text: &str, end_of_line: bool) -> TextFragment {
        TextFragment {
            page: 1,
            x,
            y,
            text: text.to_string(),
            end_of_line,
        }
    }

    #[test]
    fn test_layout_orders_rows_top_to_bottom_and_by_x() {
        let fragments = vec![
            frag(200.0, 100.2, "Corp", false),
            frag(50.0, 100.0, "Acme", false),
            frag(50.0, 80.0, "Jane Doe", true),
            frag(50.0, 120.0, "Engineer", true),
        ];
        assert_eq!(layout_text(&fragments), "Jane Doe\nAcme Corp\nEngineer");
    }

    #[test]
    fn test_punctuation_aware_joining() {
        let fragments = vec![
            frag(10.0, 50.0, "Python", false),
            frag(60.0, 50.0, ", Go", false),
            frag(90.0, 50.0, "(", false),
            frag(95.0, 50.0, "Rust", false),
            frag(120.0, 50.0, ")", false),
            frag(130.0, 50.0, "$", false),
            frag(135.0, 50.0, "5M", false),
        ];
        assert_eq!(layout_text(&fragments), "Python, Go (Rust) $5M");
    }

    #[test]
    fn test_blank_fragments_are_skipped() {
        let fragments = vec![frag(10.0, 50.0, "   ", false), frag(20.0, 50.0, "Skills", false)];
        assert_eq!(layout_text(&fragments), "Skills");
    }

    #[test]
    fn test_end_of_line_text_breaks_on_flags() {
        let fragments = vec![
            frag(10.0, 10.0, "EXPERIENCE", true),
            frag(10.0, 30.0, "•", false),
            frag(20.0, 30.0, "Led   migration", true),
            frag(10.0, 50.0, "", true),
            frag(10.0, 70.0, "Tail", false),
        ];
        assert_eq!(
            end_of_line_text(&fragments),
            "EXPERIENCE\n• Led migration\nTail"
        );
    }

    #[test]
    fn test_selection_prefers_clearly_higher_score() {
        let flat = "Jane Doe Experience Engineer at Acme";
        let structured = "WORK EXPERIENCE\nEngineer — Acme\nJan 2019 - Present\n• Built APIs\n• Cut costs 20%\nEngineer — Beta\nMar 2016 - Dec 2018\n• Shipped app\nEDUCATION\nState University 2015\nSKILLS\nRust";
        let sel = select_reconstruction(flat, structured);
        assert_eq!(sel.chosen, ExtractionStrategy::EndOfLineJoined);
        assert!(sel.end_of_line_score > sel.layout_score + SELECTION_MARGIN);
    }

    #[test]
    fn test_selection_tie_breaks_on_bullets_then_length() {
        let a = "Summary\n• one\n• two";
        let b = "Summary\n• one two three four";
        let sel = select_reconstruction(b, a);
        assert_eq!(sel.chosen, ExtractionStrategy::EndOfLineJoined, "more bullets wins a tie");

        let sel = select_reconstruction("same text", "same text");
        assert_eq!(sel.chosen, ExtractionStrategy::LayoutBucketed, "layout wins a full tie");

        let sel = select_reconstruction("short", "short but longer");
        assert_eq!(sel.chosen, ExtractionStrategy::EndOfLineJoined);
    }

    #[test]
    fn test_malformed_pdf_is_an_error() {
        assert!(extract_pdf(b"%PDF-1.4 definitely not a pdf").is_err());
        assert!(extract_pdf(b"").is_err());
    }
}
