//! Review keys: the identifier embedded in every marker.
//!
//! The engine treats keys as opaque strings. Composition lives here so callers
//! that build keys from review metadata get the marker restrictions checked
//! before anything touches a buffer.

use std::fmt;

use crate::error::Error;

/// Identity of one review comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReviewKey {
    /// Author of the comment.
    pub author: String,
    /// Comment id, unique within the review.
    pub comment_id: String,
    /// Review the comment belongs to.
    pub review_id: String,
}

impl ReviewKey {
    /// Join the components as `review_id + separator + author + separator + comment_id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidKey` if a component is empty, contains the
    /// separator, or contains a character markers cannot carry.
    pub fn compose(&self, separator: &str) -> Result<String, Error> {
        for component in [&self.review_id, &self.author, &self.comment_id] {
            validate_marker_text(component)?;
            if component.contains(separator) {
                return Err(Error::InvalidKey {
                    key: component.clone(),
                    reason: format!("contains the key separator `{separator}`"),
                });
            }
        }
        return Ok(format!(
            "{}{separator}{}{separator}{}",
            self.review_id, self.author, self.comment_id
        ));
    }

    /// Build a key from its three components.
    pub fn new(review_id: impl Into<String>, author: impl Into<String>, comment_id: impl Into<String>) -> Self {
        return Self {
            author: author.into(),
            comment_id: comment_id.into(),
            review_id: review_id.into(),
        };
    }

    /// Split a composed key back into its components.
    /// Returns `None` unless the key holds exactly three separated parts.
    pub fn split(key: &str, separator: &str) -> Option<Self> {
        if separator.is_empty() {
            return None;
        }
        let mut parts = key.split(separator);
        let review_id = parts.next()?;
        let author = parts.next()?;
        let comment_id = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        return Some(Self::new(review_id, author, comment_id));
    }
}

impl fmt::Display for ReviewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}/{}/{}", self.review_id, self.author, self.comment_id);
    }
}

/// Check that `text` can sit between marker delimiters and survive a rescan.
///
/// # Errors
///
/// Returns `Error::InvalidKey` if `text` is blank, has surrounding whitespace
/// (the scanner trims keys), or contains `?`, `*`, `\r` or `\n`.
pub fn validate_marker_text(text: &str) -> Result<(), Error> {
    let reason = if text.trim().is_empty() {
        Some("is empty".to_string())
    } else if text.trim() != text {
        Some("has leading or trailing whitespace".to_string())
    } else {
        text.chars()
            .find(|&c| return matches!(c, '?' | '*' | '\r' | '\n'))
            .map(|c| return format!("contains forbidden character {c:?}"))
    };

    return match reason {
        None => Ok(()),
        Some(reason) => Err(Error::InvalidKey { key: text.to_string(), reason }),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_and_splits() {
        let key = ReviewKey::new("r1", "alice", "c7");
        let composed = key.compose("|").unwrap();
        assert_eq!(composed, "r1|alice|c7", "components joined by separator");
        assert_eq!(ReviewKey::split(&composed, "|"), Some(key), "split inverts compose");
    }

    #[test]
    fn rejects_components_containing_separator() {
        let err = ReviewKey::new("r|1", "alice", "c7").compose("|").unwrap_err();
        assert!(matches!(err, Error::InvalidKey { .. }), "separator inside component: {err}");
    }

    #[test]
    fn rejects_marker_breaking_characters() {
        for bad in ["a?b", "a*b", "a\nb", "", "  ", " padded"] {
            assert!(validate_marker_text(bad).is_err(), "{bad:?} must be rejected");
        }
        assert!(validate_marker_text("r1|bob|c 2").is_ok(), "inner spaces are fine");
    }

    #[test]
    fn split_requires_exactly_three_parts() {
        assert_eq!(ReviewKey::split("a|b", "|"), None, "too few parts");
        assert_eq!(ReviewKey::split("a|b|c|d", "|"), None, "too many parts");
    }
}
