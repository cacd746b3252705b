//! Provider client trait and shared reply handling.

use async_trait::async_trait;
use parley_core::ProviderKind;

use crate::error::ProviderError;

/// One configured API key for an upstream provider.
#[derive(Debug, Clone)]
pub struct ProviderKey {
    pub kind: ProviderKind,
    pub key: String,
}

impl ProviderKey {
    pub fn new(kind: ProviderKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}

/// A client for one provider kind.
///
/// Implementations must be thread-safe; the dispatcher calls them
/// concurrently across requests.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Which provider this client talks to.
    fn kind(&self) -> ProviderKind;

    /// Run one completion with the given API key.
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, ProviderError>;
}

/// Strip markup from a provider reply and bound its length.
///
/// Removes `<script>...</script>` blocks (content included), then any
/// remaining tags, then truncates to `max_chars` characters.
pub fn sanitize_reply(raw: &str, max_chars: usize) -> String {
    let no_scripts = strip_script_blocks(raw);
    let mut out = String::with_capacity(no_scripts.len().min(max_chars));
    let mut in_tag = false;
    let mut pushed = 0;
    for ch in no_scripts.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => {
                out.push(c);
                pushed += 1;
                if pushed >= max_chars {
                    break;
                }
            }
            _ => {}
        }
    }
    out
}

/// Remove `<script ...> ... </script>` spans, case-insensitively.
fn strip_script_blocks(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pos = 0;

    while let Some(open) = find_ascii_ci(input, "<script", pos) {
        out.push_str(&input[pos..open]);
        match find_ascii_ci(input, "</script>", open) {
            Some(close) => {
                pos = close + "</script>".len();
            }
            None => {
                // Unterminated script block: drop the rest.
                return out;
            }
        }
    }
    out.push_str(&input[pos..]);
    out
}

/// Byte offset of an ASCII needle in `haystack` at or after `from`,
/// ignoring ASCII case. Returned offsets are valid char boundaries because
/// the needle is pure ASCII.
fn find_ascii_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || hay.len() < from + needle.len() {
        return None;
    }
    (from..=hay.len() - needle.len())
        .find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(sanitize_reply("hello there", 500), "hello there");
    }

    #[test]
    fn script_blocks_are_removed_with_content() {
        let raw = "before<script>alert('x')</script>after";
        assert_eq!(sanitize_reply(raw, 500), "beforeafter");

        let raw = "a<SCRIPT type=\"text/javascript\">bad()</SCRIPT>b";
        assert_eq!(sanitize_reply(raw, 500), "ab");
    }

    #[test]
    fn unterminated_script_drops_tail() {
        assert_eq!(sanitize_reply("ok<script>evil", 500), "ok");
    }

    #[test]
    fn stray_tags_are_stripped() {
        assert_eq!(sanitize_reply("<b>bold</b> and <i>italic</i>", 500), "bold and italic");
    }

    #[test]
    fn reply_is_truncated() {
        let long = "x".repeat(1000);
        assert_eq!(sanitize_reply(&long, 500).len(), 500);
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let raw = "é".repeat(10);
        let out = sanitize_reply(&raw, 5);
        assert_eq!(out.chars().count(), 5);
    }
}
