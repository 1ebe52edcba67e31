//! Prompts for the LLM-backed keyword extractor and chunk summariser.

/// System prompt for keyword extraction.
pub const KEYWORD_SYSTEM_PROMPT: &str = r#"You extract study topics from course material.

Rules:
1. Return only key phrases of one or two words.
2. Order them from most to least central to the text.
3. Prefer concrete subject terms (e.g. "photosynthesis", "binary search") over generic words ("introduction", "chapter").
4. Output one phrase per line, lowercase, with no numbering, bullets or commentary."#;

/// User message asking for the top `top_n` key phrases of `text`.
pub fn keyword_request(text: &str, top_n: usize) -> String {
    format!("Return the {top_n} most relevant key phrases for this text:\n\n{text}")
}

/// System prompt for abstractive chunk summarisation.
pub const SUMMARY_SYSTEM_PROMPT: &str = r#"You write faithful abstractive summaries of study material.

Rules:
1. Use only information present in the text. Do not add facts, opinions or examples.
2. Write plain prose sentences: no headings, lists, markdown or preamble.
3. Respect the requested length range."#;

/// User message asking for a summary of `chunk` between `min_words` and
/// `max_words` words.
pub fn summary_request(chunk: &str, min_words: usize, max_words: usize) -> String {
    format!(
        "Summarise the following text in {min_words} to {max_words} words:\n\n{chunk}"
    )
}
