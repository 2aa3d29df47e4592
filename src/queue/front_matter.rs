//! Front-matter document parsing.
//!
//! Work-item files may start with a YAML header block fenced by `---`
//! lines. Parsing is deliberately forgiving: a malformed header or a
//! missing closing delimiter degrades to "no header, whole file is body"
//! instead of surfacing an error to the caller.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_yaml::Mapping;
use tracing::warn;

use crate::telegram::UrlButton;

/// Header block delimiter.
const DELIMITER: &str = "---";

/// A parsed work-item document: structured header plus body text.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Key/value header; empty when the file has none.
    pub header: Mapping,

    /// Body content, trimmed.
    pub body: String,
}

impl Document {
    /// Parses a document, never failing.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if text.starts_with(DELIMITER) {
            let mut parts = text.splitn(3, DELIMITER);
            // Empty segment before the leading delimiter.
            let _ = parts.next();

            if let (Some(raw_header), Some(rest)) = (parts.next(), parts.next()) {
                match serde_yaml::from_str::<Mapping>(raw_header) {
                    Ok(header) => {
                        return Self {
                            header,
                            body: rest.trim().to_owned(),
                        };
                    }
                    Err(e) => warn!("Malformed front-matter header, treating as body: {}", e),
                }
            }
        }

        Self {
            header: Mapping::new(),
            body: text.trim().to_owned(),
        }
    }

    /// Decodes the header into a typed view, falling back to defaults on
    /// shape mismatches.
    #[must_use]
    pub fn decode_header<T>(&self) -> T
    where
        T: DeserializeOwned + Default,
    {
        serde_yaml::from_value(serde_yaml::Value::Mapping(self.header.clone())).unwrap_or_else(
            |e| {
                warn!("Front-matter header did not match expected shape: {}", e);
                T::default()
            },
        )
    }
}

/// Typed header view for scheduled posts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostMeta {
    /// Pin the message after sending.
    #[serde(default)]
    pub pin: bool,

    /// Queue the post's content as a story as well.
    #[serde(default)]
    pub story: bool,

    /// Inline URL buttons attached to the message.
    #[serde(default)]
    pub buttons: Vec<UrlButton>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_header() {
        let text = "---\npin: true\nbuttons:\n  - { text: \"Start Bot\", url: \"https://t.me/bot?start=go\" }\n---\n👋 Welcome!\n\nClaim your bonus.";

        let doc = Document::parse(text);
        assert!(!doc.header.is_empty());
        assert!(doc.body.starts_with("👋 Welcome!"));
        assert!(doc.body.ends_with("bonus."));

        let meta: PostMeta = doc.decode_header();
        assert!(meta.pin);
        assert!(!meta.story);
        assert_eq!(meta.buttons.len(), 1);
        assert_eq!(meta.buttons[0].text, "Start Bot");
        assert_eq!(meta.buttons[0].url, "https://t.me/bot?start=go");
    }

    #[test]
    fn test_parse_without_header() {
        let text = "Just some markdown content without front-matter.\n";

        let doc = Document::parse(text);
        assert!(doc.header.is_empty());
        assert_eq!(doc.body, "Just some markdown content without front-matter.");

        let meta: PostMeta = doc.decode_header();
        assert!(!meta.pin);
        assert!(meta.buttons.is_empty());
    }

    #[test]
    fn test_parse_malformed_header_falls_back() {
        let text = "---\npin: [unclosed\n---\nBody text";

        let doc = Document::parse(text);
        assert!(doc.header.is_empty());
        assert_eq!(doc.body, text.trim());
    }

    #[test]
    fn test_parse_unclosed_header_falls_back() {
        let text = "---\npin: true\nno closing delimiter";

        let doc = Document::parse(text);
        assert!(doc.header.is_empty());
        assert_eq!(doc.body, text.trim());
    }

    #[test]
    fn test_delimiter_inside_body_kept() {
        let text = "---\npin: false\n---\nfirst\n---\nsecond";

        let doc = Document::parse(text);
        assert_eq!(doc.body, "first\n---\nsecond");
    }
}
