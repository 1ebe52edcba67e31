//! Post-processing: deterministic cleanup of extracted text, model output
//! and third-party titles.
//!
//! Each rule is a pure `&str → String` function so it can be tested on its
//! own and reordered without side effects.

use once_cell::sync::Lazy;
use regex::Regex;

// ── Extracted text ───────────────────────────────────────────────────────────

/// Normalise text coming out of a parser or transcriber.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Trim the whole document
pub fn normalise_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Words ────────────────────────────────────────────────────────────────────

/// Whitespace-delimited word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Keep the first `n` words, joined by single spaces. No ellipsis.
pub fn truncate_words(text: &str, n: usize) -> String {
    text.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

// ── Titles ───────────────────────────────────────────────────────────────────

static RE_HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\w+\s*").unwrap());

/// Remove hashtag tokens (and the whitespace after them) from a video title.
pub fn clean_title(title: &str) -> String {
    RE_HASHTAG.replace_all(title, "").trim().to_string()
}

static RE_NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(x[0-9A-Fa-f]+|[0-9]+);").unwrap());

/// Decode the HTML entities the YouTube API leaves in snippet titles.
pub fn decode_html_entities(input: &str) -> String {
    let s = RE_NUMERIC_ENTITY.replace_all(input, |caps: &regex::Captures<'_>| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    s.replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

// ── Model output ─────────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-z]*\n(.*)\n```\s*$").unwrap());

/// Strip a code fence wrapped around the whole reply (models sometimes add one).
pub fn strip_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.trim().to_string()
    }
}

static RE_LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s*").unwrap());

/// Parse a model's keyword reply into at most `top_n` unique phrases.
///
/// Accepts one phrase per line or a single comma-separated line; strips list
/// markers, quotes and trailing punctuation, lowercases, and drops duplicates
/// while keeping rank order.
pub fn parse_keyword_lines(raw: &str, top_n: usize) -> Vec<String> {
    let body = strip_fences(raw);
    let lines: Vec<&str> = body.lines().filter(|l| !l.trim().is_empty()).collect();
    let candidates: Vec<&str> = if lines.len() == 1 {
        lines[0].split(',').collect()
    } else {
        lines
    };

    let mut out: Vec<String> = Vec::new();
    for candidate in candidates {
        // "Keywords:" style headers
        if candidate.trim().ends_with(':') {
            continue;
        }
        let phrase = RE_LIST_MARKER.replace(candidate, "");
        let phrase = phrase
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
            .trim_end_matches(['.', ',', ';', ':'])
            .trim()
            .to_lowercase();
        if phrase.is_empty() || out.contains(&phrase) {
            continue;
        }
        out.push(phrase);
        if out.len() == top_n {
            break;
        }
    }
    out
}

// ── Tests ────────────────────────────────────────────────────────────────────
