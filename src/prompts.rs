//! Prompts for OCR of rendered PDF pages.
//!
//! Callers can override the system prompt via
//! [`crate::config::VisionConfig::system_prompt`]; the language hint is
//! appended either way so the configured OCR languages always reach the
//! model.

/// Default system prompt for turning one page image into Markdown.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert document converter. Convert the scanned PDF page in the image to clean, well-structured Markdown.

Follow these rules precisely:

1. TEXT
   - Transcribe ALL visible text, in the reading order a human would use
   - Do not translate; keep the document's own language and spelling

2. STRUCTURE
   - Use # for the page title (at most one), ## and ### for sections
   - Use - for unordered lists and 1. 2. 3. for ordered lists
   - Use **bold** and *italic* to match visible emphasis

3. TABLES
   - Convert tables to GFM pipe tables with a header separator row

4. FORMULAS
   - Render mathematics as LaTeX: $inline$ and $$display$$

5. IGNORE
   - Page numbers, running headers and footers, decorative rules

6. OUTPUT
   - Output ONLY the Markdown content
   - Do NOT wrap the output in ```markdown fences
   - Do NOT add commentary"#;

/// Sentence telling the model which languages to expect on the page.
///
/// Returns an empty string for an empty list.
pub fn language_hint(languages: &[String]) -> String {
    match languages {
        [] => String::new(),
        [one] => format!("The page is written in the language with code '{one}'."),
        many => format!(
            "The page may contain text in these languages (ISO codes, most likely first): {}.",
            many.join(", ")
        ),
    }
}

/// Full system prompt: the base prompt followed by the language hint.
pub fn system_prompt(base: Option<&str>, languages: &[String]) -> String {
    let base = base.unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let hint = language_hint(languages);
    if hint.is_empty() {
        base.to_string()
    } else {
        format!("{base}\n\n{hint}")
    }
}
