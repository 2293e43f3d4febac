//! Deterministic cleanup of page Markdown and assembly of the document.
//!
//! Vision models occasionally wrap their answer in code fences, invent image
//! links, or emit tables without a header separator, even when told not to.
//! Those quirks are fixed here with plain string and regex passes rather
//! than in the prompt. Text-layer pages go through the same passes, which
//! for them mostly means line-ending and whitespace normalisation.

use once_cell::sync::Lazy;
use regex::Regex;

type Pass = fn(&str) -> String;

/// Cleanup passes, in application order.
///
/// Line endings are normalised before anything that splits on `\n`, and
/// fences are stripped before table detection sees the content.
const PASSES: &[(&str, Pass)] = &[
    ("line_endings", normalise_line_endings),
    ("outer_fences", strip_outer_fences),
    ("invisible_chars", remove_invisible_chars),
    ("trailing_whitespace", trim_trailing_whitespace),
    ("table_separators", insert_missing_table_separator),
    ("placeholder_images", replace_placeholder_images),
    ("blank_lines", collapse_blank_lines),
];

/// Clean one page of Markdown. The result is trimmed and has no trailing
/// newline; [`join_pages`] adds the separators.
pub fn clean_markdown(input: &str) -> String {
    let cleaned = PASSES
        .iter()
        .fold(input.to_string(), |text, (_, pass)| pass(&text));
    cleaned.trim().to_string()
}

/// Join cleaned pages in order into one document ending with a newline.
///
/// Empty pages are skipped.
pub fn join_pages<'a>(pages: impl IntoIterator<Item = &'a str>) -> String {
    let body = pages
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    if body.is_empty() {
        String::new()
    } else {
        format!("{body}\n")
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?[ \t]*\n(.*)\n```$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}',
        ],
        "",
    )
}

fn trim_trailing_whitespace(input: &str) -> String {
    input.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

static RE_EXCESS_BLANKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// At most one blank line between blocks.
fn collapse_blank_lines(input: &str) -> String {
    RE_EXCESS_BLANKS.replace_all(input, "\n\n").into_owned()
}

fn is_table_row(line: &str) -> bool {
    let t = line.trim();
    t.len() > 2 && t.starts_with('|') && t.ends_with('|')
}

fn is_separator_row(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('|') && t.contains('-') && t.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

/// GFM needs a `| --- |` row after the header; add it when a table starts
/// without one.
fn insert_missing_table_separator(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut out = Vec::with_capacity(lines.len() + 4);

    for (i, line) in lines.iter().enumerate() {
        out.push(line.to_string());

        let starts_table = is_table_row(line)
            && !is_separator_row(line)
            && (i == 0 || !is_table_row(lines[i - 1]));
        let next = lines.get(i + 1).copied().unwrap_or("");
        if starts_table && is_table_row(next) && !is_separator_row(next) {
            let cols = line.trim().matches('|').count().saturating_sub(1).max(1);
            out.push(format!("|{}", " --- |".repeat(cols)));
        }
    }
    out.join("\n")
}

static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]*)\)").unwrap());

const PLACEHOLDER_HOSTS: &[&str] = &[
    "example.com",
    "placeholder.com",
    "dummyimage.com",
    "placehold.it",
    "picsum.photos",
];

/// The model sees figures but has no file to link; it invents URLs like
/// `image.png`. Keep the alt text as an italic caption instead.
fn replace_placeholder_images(input: &str) -> String {
    RE_IMAGE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let alt = caps[1].trim();
            let url = caps[2].trim();
            let real = (url.starts_with("http://") || url.starts_with("https://"))
                && !PLACEHOLDER_HOSTS.iter().any(|h| url.contains(h));
            if real {
                caps[0].to_string()
            } else if alt.is_empty() {
                String::new()
            } else {
                format!("*{alt}*")
            }
        })
        .into_owned()
}
