//! DOCX text and hyperlink extraction straight from the package XML.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{Cursor, Read};

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use tracing::warn;

const DOCUMENT_XML: &str = "word/document.xml";
const DOCUMENT_RELS: &str = "word/_rels/document.xml.rels";

lazy_static! {
    static ref FIELD_DOUBLE: Regex = Regex::new(r#"(?i)HYPERLINK\s+"([^"]+)""#).unwrap();
    static ref FIELD_SINGLE: Regex = Regex::new(r"(?i)HYPERLINK\s+'([^']+)'").unwrap();
    static ref PROFILE_HOST: Regex = Regex::new(r"(?i)^(?:www\.)?(?:linkedin\.com|github\.com)/").unwrap();
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocxText {
    pub text: String,
    /// Candidate URLs in discovery order, not yet deduplicated.
    pub link_urls: Vec<String>,
}

/// What one pass over `document.xml` collects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentParts {
    /// Runs, tabs, breaks and paragraph ends in document order.
    pub body: String,
    /// Field instruction text (`w:instrText`), concatenated.
    pub instructions: String,
    /// `r:id` of every `w:hyperlink`, in order.
    pub hyperlink_ids: Vec<String>,
}

impl DocumentParts {
    /// Body followed by the field instructions so hyperlink targets stay searchable.
    pub fn text(&self) -> String {
        format!("{}{}", self.body, self.instructions)
    }
}

/// Reads `word/document.xml` (and its relationships, when present) out of the
/// archive. A valid archive without a document part yields empty text.
pub fn extract_docx(bytes: &[u8]) -> Result<DocxText> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).context("not a zip archive")?;

    let Some(xml) = read_part(&mut archive, DOCUMENT_XML)? else {
        return Ok(DocxText::default());
    };
    let rels = read_part(&mut archive, DOCUMENT_RELS)?.unwrap_or_default();

    let parts = scan_document(&xml);
    Ok(DocxText {
        text: parts.text(),
        link_urls: hyperlink_urls(&parts, &rels),
    })
}

fn read_part<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Result<Option<String>> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("failed to open {name}")),
    };
    let mut buf = Vec::new();
    part.read_to_end(&mut buf)
        .with_context(|| format!("failed to read {name}"))?;
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

#[derive(Clone, Copy, PartialEq)]
enum TextTarget {
    None,
    Body,
    Instruction,
}

fn attribute(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(Cow::into_owned))
}

/// Streams the WordprocessingML body. Text counts only inside `w:t` within a run;
/// tabs and breaks only inside a run, so paragraph tab-stop definitions are ignored.
/// Malformed XML stops the scan and keeps what was read so far.
pub fn scan_document(xml: &str) -> DocumentParts {
    let mut reader = Reader::from_str(xml);
    let mut parts = DocumentParts::default();
    let mut buf = Vec::new();
    let mut run_depth = 0usize;
    let mut target = TextTarget::None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"r" => run_depth += 1,
                b"t" if run_depth > 0 => target = TextTarget::Body,
                b"instrText" => target = TextTarget::Instruction,
                b"hyperlink" => parts.hyperlink_ids.extend(attribute(e, b"r:id")),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"tab" if run_depth > 0 => parts.body.push('\t'),
                b"br" | b"cr" if run_depth > 0 => parts.body.push('\n'),
                b"p" => parts.body.push('\n'),
                b"hyperlink" => parts.hyperlink_ids.extend(attribute(e, b"r:id")),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"t" | b"instrText" => target = TextTarget::None,
                b"p" => parts.body.push('\n'),
                _ => {}
            },
            Ok(Event::Text(ref e)) if target != TextTarget::None => {
                let text = e
                    .unescape()
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| String::from_utf8_lossy(e).into_owned());
                push_text(&mut parts, target, &text);
            }
            Ok(Event::CData(e)) if target != TextTarget::None => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                push_text(&mut parts, target, &text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("document.xml is malformed at byte {}: {}", reader.buffer_position(), e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    parts
}

fn push_text(parts: &mut DocumentParts, target: TextTarget, text: &str) {
    match target {
        TextTarget::Body => parts.body.push_str(text),
        TextTarget::Instruction => parts.instructions.push_str(text),
        TextTarget::None => {}
    }
}

/// Body text of a `document.xml` string.
pub fn document_text(xml: &str) -> String {
    scan_document(xml).text()
}

/// Bare `linkedin.com/...` and `github.com/...` targets get an https scheme.
pub fn normalize_likely_url(raw: &str) -> String {
    let url = raw.trim();
    let lower = url.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return url.to_string();
    }
    if PROFILE_HOST.is_match(url) {
        let bare = if lower.starts_with("www.") { &url[4..] } else { url };
        return format!("https://{bare}");
    }
    url.to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub target: String,
    pub is_hyperlink: bool,
}

/// `Id` → target for every `Relationship` in a `.rels` part, in document order.
pub fn relationships(rels: &str) -> Vec<(String, Relationship)> {
    let mut reader = Reader::from_str(rels);
    let mut out = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attribute(e, b"Id"), attribute(e, b"Target")) {
                    let is_hyperlink = attribute(e, b"Type")
                        .is_some_and(|t| t.to_lowercase().ends_with("/hyperlink"))
                        || attribute(e, b"TargetMode")
                            .is_some_and(|m| m.eq_ignore_ascii_case("external"));
                    out.push((id, Relationship { target, is_hyperlink }));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("document.xml.rels is malformed: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    out
}

/// Hyperlink targets from `<w:hyperlink r:id>` references, `HYPERLINK` field codes,
/// and any relationship target pointing at a LinkedIn or GitHub profile.
pub fn hyperlink_urls(parts: &DocumentParts, rels: &str) -> Vec<String> {
    let rels = relationships(rels);
    let by_id: HashMap<&str, &Relationship> = rels.iter().map(|(id, r)| (id.as_str(), r)).collect();
    let mut urls = Vec::new();

    for id in &parts.hyperlink_ids {
        if let Some(rel) = by_id.get(id.as_str()) {
            if rel.is_hyperlink {
                urls.push(normalize_likely_url(&rel.target));
            }
        }
    }

    for re in [&*FIELD_DOUBLE, &*FIELD_SINGLE] {
        for caps in re.captures_iter(&parts.instructions) {
            urls.push(normalize_likely_url(&caps[1]));
        }
    }

    for (_, rel) in &rels {
        let lower = rel.target.to_lowercase();
        if lower.contains("linkedin.com") || lower.contains("github.com") {
            urls.push(normalize_likely_url(&rel.target));
        }
    }

    urls.retain(|u| !u.is_empty());
    urls
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    /// Builds a minimal .docx package in memory.
    pub(crate) fn build_docx(document_xml: &str, rels_xml: Option<&str>) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let options = SimpleFileOptions::default();
            zip.start_file(DOCUMENT_XML, options).unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            if let Some(rels) = rels_xml {
                zip.start_file(DOCUMENT_RELS, options).unwrap();
                zip.write_all(rels.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    const BODY: &str = r#"<w:document><w:body>
<w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Engineer </w:t></w:r><w:r><w:tab/><w:t>R&amp;D</w:t></w:r></w:p>
<w:p><w:r><w:t>Line one</w:t><w:br/><w:t>Line two</w:t></w:r></w:p>
<w:p><w:hyperlink r:id="rId7"><w:r><w:t>LinkedIn</w:t></w:r></w:hyperlink></w:p>
<w:p><w:r><w:instrText xml:space="preserve"> HYPERLINK "https://github.com/janedoe" </w:instrText></w:r></w:p>
</w:body></w:document>"#;

    const RELS: &str = r#"<Relationships>
<Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="www.linkedin.com/in/janedoe" TargetMode="External"/>
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

    #[test]
    fn test_document_text_keeps_paragraphs_tabs_and_breaks() {
        let text = document_text(BODY);
        assert!(text.contains("Jane Doe\n"), "paragraph end becomes a newline: {text:?}");
        assert!(text.contains("Engineer \tR&D"), "tab and entity decoded: {text:?}");
        assert!(text.contains("Line one\nLine two"), "w:br becomes a newline: {text:?}");
        assert!(
            text.trim_end().ends_with(r#"HYPERLINK "https://github.com/janedoe""#),
            "instruction text is appended after the body: {text:?}"
        );
    }

    #[test]
    fn test_numeric_entities_and_cdata() {
        let xml = "<w:p><w:r><w:t>caf&#233; &#x2013; &lt;b&gt;</w:t><w:t><![CDATA[a < b]]></w:t></w:r></w:p>";
        assert_eq!(document_text(xml), "café – <b>a < b\n");
    }

    #[test]
    fn test_tab_stop_definitions_are_not_text() {
        let xml = r#"<w:p><w:pPr><w:tabs><w:tab w:val="right" w:pos="9360"/></w:tabs></w:pPr><w:r><w:t>Jane Doe</w:t></w:r></w:p>"#;
        assert_eq!(document_text(xml), "Jane Doe\n", "pPr tab stops produce no tab");
    }

    #[test]
    fn test_run_tab_with_attributes_and_slashes() {
        let xml = r#"<w:p><w:r><w:t>Engineer</w:t><w:tab w:val="a/b"/><w:t>2020</w:t><w:br w:type="textWrapping"/></w:r></w:p>"#;
        assert_eq!(document_text(xml), "Engineer\t2020\n\n");
    }

    #[test]
    fn test_malformed_xml_keeps_text_read_so_far() {
        let text = document_text("<w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p><w:p><w:r></w:x>");
        assert!(text.starts_with("Jane Doe\n"), "{text:?}");
    }

    #[test]
    fn test_normalize_likely_url() {
        assert_eq!(
            normalize_likely_url("www.linkedin.com/in/jane"),
            "https://linkedin.com/in/jane"
        );
        assert_eq!(normalize_likely_url("github.com/jane"), "https://github.com/jane");
        assert_eq!(normalize_likely_url(" https://x.dev/a?b=1&c=2 "), "https://x.dev/a?b=1&c=2");
        assert_eq!(normalize_likely_url("mailto:jane@x.dev"), "mailto:jane@x.dev");
    }

    #[test]
    fn test_hyperlinks_resolved_from_rels_and_fields() {
        let parts = scan_document(BODY);
        assert_eq!(parts.hyperlink_ids, vec!["rId7"]);
        let urls = hyperlink_urls(&parts, RELS);
        assert_eq!(urls[0], "https://linkedin.com/in/janedoe");
        assert!(urls.contains(&"https://github.com/janedoe".to_string()));
        assert!(
            !urls.iter().any(|u| u.contains("styles.xml")),
            "non-hyperlink relationships are ignored"
        );
    }

    #[test]
    fn test_extract_docx_from_archive() {
        let bytes = build_docx(BODY, Some(RELS));
        let out = extract_docx(&bytes).unwrap();
        assert!(out.text.starts_with("Jane Doe"));
        assert!(!out.link_urls.is_empty());
    }

    #[test]
    fn test_archive_without_document_part_is_empty() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file("other.xml", SimpleFileOptions::default()).unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let out = extract_docx(&buf.into_inner()).unwrap();
        assert_eq!(out, DocxText::default());
    }

    #[test]
    fn test_non_zip_bytes_are_an_error() {
        assert!(extract_docx(b"plain text pretending to be docx").is_err());
    }
}
