//! Prose extraction and sentence segmentation.
//!
//! [`extract_paragraphs`] turns one chapter's markup into plain-text
//! paragraphs; [`tokenize_sentences`] splits a paragraph into the units the
//! playback engine hands to the speech capability.

mod extract;
mod sentence;

pub use extract::extract_paragraphs;
pub use sentence::{ABBREVIATIONS, tokenize_sentences};

/// Extract and tokenize a whole chapter into one flat sentence list.
pub fn chapter_sentences(markup: &str) -> Vec<String> {
    extract_paragraphs(markup)
        .iter()
        .flat_map(|paragraph| tokenize_sentences(paragraph))
        .collect()
}
