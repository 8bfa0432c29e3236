//! Post text composition
//!
//! Pure formatting: no I/O and no failure modes. Length is counted in Unicode
//! scalar values, matching how the platform weighs plain Latin text.

use tracing::warn;

use super::artwork::{ArtworkRecord, UNKNOWN_ARTIST};

/// Maximum post length on the platform
pub const MAX_POST_CHARS: usize = 280;

const ELLIPSIS: &str = "...";

/// Per-source opening clause and detail policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostTemplate {
    /// Named in the opening clause, e.g. "Metropolitan Museum of Art"
    pub source_name: &'static str,
    /// Append classification, artist and date clauses when they carry information
    pub include_details: bool,
}

/// Composed post text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPost {
    pub text: String,
    /// The text was cut to fit [MAX_POST_CHARS]
    pub truncated: bool,
}

impl PostTemplate {
    pub fn compose(&self, record: &ArtworkRecord) -> ComposedPost {
        let mut text = format!(
            "Check out this artwork from the {}! It's titled '{}' ({})",
            self.source_name, record.title, record.web_url
        );

        if self.include_details {
            if !record.classification.is_empty() {
                text.push_str(&format!(", classified as {}", record.classification));
            }
            if has_artist(&record.artist) {
                text.push_str(&format!(", created by {}", record.artist));
            }
            if has_date(&record.date) {
                text.push_str(&format!(", dated {}", record.date));
            }
        }

        let (text, truncated) = truncate_post(text);
        if truncated {
            warn!(max = MAX_POST_CHARS, "Post text was truncated");
        }

        ComposedPost { text, truncated }
    }
}

fn has_artist(artist: &str) -> bool {
    !artist.is_empty() && artist != UNKNOWN_ARTIST && artist.chars().count() > 3
}

fn has_date(date: &str) -> bool {
    date != "unknown" && date.chars().count() > 3
}

/// Cut `text` to `MAX_POST_CHARS - 4` characters plus an ellipsis when it is over the limit
fn truncate_post(text: String) -> (String, bool) {
    if text.chars().count() <= MAX_POST_CHARS {
        return (text, false);
    }
    let mut cut: String = text.chars().take(MAX_POST_CHARS - 4).collect();
    cut.push_str(ELLIPSIS);
    (cut, true)
}
