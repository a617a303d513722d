//! Regex tables shared by diagnostics, hint scanning, contact detection and sanitizing.
//!
//! Everything here is compiled once. Patterns that embed the month alternation are
//! built by substituting `{month}` so the alternation is defined in exactly one place.

use lazy_static::lazy_static;
use regex::Regex;

/// Month names, abbreviated or full, with an optional trailing dot ("Sep", "Sept.", "September").
pub const MONTH: &str = r"(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|Jun(?:e)?|Jul(?:y)?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)\.?";

fn with_month(template: &str) -> String {
    template.replace("{month}", MONTH)
}

lazy_static! {
    // ── Dates ────────────────────────────────────────────────────────────────
    /// "2019 - 2021", "2019 – present", "2018 to 2020"
    pub static ref YEAR_RANGE: Regex = Regex::new(
        r"(?i)\b(?:19|20)\d{2}\s*[-–—→to]{1,3}\s*(?:present|current|\b(?:19|20)\d{2}\b)"
    ).unwrap();

    /// "Mar 2021"
    pub static ref MONTH_YEAR: Regex = Regex::new(&with_month(
        r"(?i)\b{month}\s+(?:19|20)\d{2}\b"
    )).unwrap();

    /// "Mar 2021 - Present", "Jan 2019 – Dec 2020", "Jan 2019 - 2020"
    pub static ref MONTH_YEAR_RANGE: Regex = Regex::new(&with_month(
        r"(?i)\b{month}\s+(?:19|20)\d{2}\s*[-–—→to]{1,3}\s*(?:present|current|{month}\s+(?:19|20)\d{2}|\b(?:19|20)\d{2}\b)"
    )).unwrap();

    /// Either form of range, used to spot role header lines.
    pub static ref DATE_RANGE_LINE: Regex = Regex::new(&with_month(
        r"(?i)\b(?:{month}\s+)?(?:19|20)\d{2}\s*[-–—→to]{1,3}\s*(?:present|current|(?:{month}\s+)?(?:19|20)\d{2}|\b(?:19|20)\d{2}\b)"
    )).unwrap();

    pub static ref YEAR: Regex = Regex::new(r"\b(?:19|20)\d{2}\b").unwrap();

    // ── Structure ────────────────────────────────────────────────────────────
    pub static ref EDU_SIGNAL: Regex = Regex::new(
        r"(?i)\b(?:university|college|institute|mba|bachelor|master|phd|b\.s\.|m\.s\.|bachelors|masters)\b"
    ).unwrap();

    /// Narrower education vocabulary used to pick education hint lines.
    pub static ref EDU_LINE: Regex = Regex::new(
        r"(?i)\b(?:university|college|institute|mba|bachelor|master|phd|b\.s\.|m\.s\.)\b"
    ).unwrap();

    pub static ref BULLET_GLYPH: Regex = Regex::new(r"•\s+").unwrap();
    pub static ref DASH_BULLET: Regex = Regex::new(r"\n\s*-\s+").unwrap();
    pub static ref STAR_BULLET: Regex = Regex::new(r"\n\s*\*\s+").unwrap();

    pub static ref EXPERIENCE_WORD: Regex = Regex::new(r"(?i)\bexperience\b").unwrap();
    pub static ref EDUCATION_WORD: Regex = Regex::new(r"(?i)\beducation\b").unwrap();
    pub static ref SKILLS_WORD: Regex = Regex::new(r"(?i)\bskills\b").unwrap();

    // ── Contact ──────────────────────────────────────────────────────────────
    pub static ref EMAIL: Regex = Regex::new(
        r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}"
    ).unwrap();

    pub static ref EMAIL_BOUNDED: Regex = Regex::new(
        r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b"
    ).unwrap();

    /// North-American phone shape used to reject contact noise in titles and skills.
    pub static ref US_PHONE: Regex = Regex::new(
        r"(?:\+?1[\s.-]?)?(?:\(\d{3}\)|\d{3})[\s.-]?\d{3}[\s.-]?\d{4}"
    ).unwrap();

    pub static ref US_PHONE_BOUNDED: Regex = Regex::new(
        r"\b(?:\+?1[\s.-]?)?(?:\(\d{3}\)|\d{3})[\s.-]?\d{3}[\s.-]?\d{4}\b"
    ).unwrap();

    pub static ref WEB_URL: Regex = Regex::new(r"(?i)https?://|www\.").unwrap();
    pub static ref HTTP_URL_TOKEN: Regex = Regex::new(r"(?i)\bhttps?://\S+\b").unwrap();
    pub static ref WWW_TOKEN: Regex = Regex::new(r"(?i)\bwww\.\S+\b").unwrap();

    /// Email detection, most specific provider first.
    pub static ref EMAIL_PATTERNS: Vec<Regex> = [
        r"(?i)[a-z0-9._%+-]+@gmail\.com",
        r"(?i)[a-z0-9._%+-]+@yahoo\.com",
        r"(?i)[a-z0-9._%+-]+@outlook\.com",
        r"(?i)[a-z0-9._%+-]+@hotmail\.com",
        r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    /// Phone detection, most specific shape first.
    pub static ref PHONE_PATTERNS: Vec<Regex> = [
        r"\+1\s*\(\d{3}\)\s*\d{3}[-.\s]?\d{4}",
        r"\+1[-.\s]?\d{3}[-.\s]?\d{3}[-.\s]?\d{4}",
        r"\(\d{3}\)\s*\d{3}[-.\s]?\d{4}",
        r"\d{3}[-.\s]\d{3}[-.\s]\d{4}",
        r"\d{3}\.\d{3}\.\d{4}",
        r"\d{3}\s+\d{3}\s+\d{4}",
        r"\+\d{1,3}[-.\s]?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    pub static ref LINKEDIN_WITH_SCHEME: Regex = Regex::new(
        r"(?i)\bhttps?://(?:www\.)?linkedin\.com/in/[A-Za-z0-9_-]+/?\b"
    ).unwrap();
    pub static ref LINKEDIN_BARE: Regex = Regex::new(
        r"(?i)\blinkedin\.com/in/[A-Za-z0-9_-]+/?\b"
    ).unwrap();
    pub static ref LINKEDIN_PROFILE_LINK: Regex = Regex::new(r"(?i)\blinkedin\.com/in/[a-z0-9_-]+/?").unwrap();
    pub static ref LINKEDIN_ANY_LINK: Regex = Regex::new(r"(?i)\blinkedin\.com/").unwrap();
    pub static ref GITHUB_WITH_SCHEME: Regex = Regex::new(
        r"(?i)\bhttps?://(?:www\.)?github\.com/[A-Za-z0-9_.-]+"
    ).unwrap();
    pub static ref GITHUB_PROFILE_LINK: Regex = Regex::new(r"(?i)\bgithub\.com/[a-z0-9_.-]+").unwrap();

    // Wrapped-URL stitching
    static ref WRAPPED_URL: Regex = Regex::new(r"(\bhttps?://[^\s]+)\s*\n\s*([^\s]+)").unwrap();
    static ref WRAPPED_LINKEDIN: Regex = Regex::new(
        r"(?i)(\blinkedin\.com/in/[A-Za-z0-9_-]+)\s*\n\s*([A-Za-z0-9_-]+/?)"
    ).unwrap();
    static ref SPACED_URL: Regex = Regex::new(r"(\bhttps?://[^\s]+)\s+([^\s]+)").unwrap();
}

/// True when the text contains an email, a URL or a phone number.
pub fn has_contact_artifact(s: &str) -> bool {
    EMAIL.is_match(s) || WEB_URL.is_match(s) || US_PHONE.is_match(s)
}

/// Re-joins URLs that extraction wrapped across lines or split with a space,
/// so the contact regexes can capture the whole link.
pub fn stitch_wrapped_urls(text: &str) -> String {
    let t = WRAPPED_URL.replace_all(text, "${1}${2}");
    let t = WRAPPED_LINKEDIN.replace_all(&t, "${1}${2}");
    SPACED_URL.replace_all(&t, "${1}${2}").into_owned()
}

/// Returns the first match of the first pattern that matches anything.
pub fn first_match(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.as_str().trim().to_string())
}
