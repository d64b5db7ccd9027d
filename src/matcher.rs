//! Message pattern matching.
//!
//! The pattern identifies intent (an approval phrase); references are pulled
//! from the whole message, so they may sit outside the matched span.

use regex::Regex;

use crate::core::config::DEFAULT_MESSAGE_PATTERN;
use crate::core::models::{InboundMessage, MatchResult};
use crate::errors::InvalidPatternError;
use crate::utils::references::extract_references;

#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: Regex,
}

impl PatternMatcher {
    /// Compile `pattern`. An empty pattern matches every message.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPatternError` if the pattern is not a valid regular expression.
    pub fn new(pattern: &str) -> Result<Self, InvalidPatternError> {
        let pattern = if pattern.is_empty() {
            DEFAULT_MESSAGE_PATTERN
        } else {
            pattern
        };

        let compiled = Regex::new(pattern).map_err(|source| InvalidPatternError {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self { pattern: compiled })
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Test `text` against the pattern. `None` means no match; callers must
    /// not extract references or react in that case.
    #[must_use]
    pub fn match_text(&self, text: &str) -> Option<MatchResult> {
        let matched = self.pattern.find(text)?;

        Some(MatchResult {
            pattern: self.pattern.as_str().to_string(),
            matched_text: matched.as_str().to_string(),
            references: extract_references(text),
            source_message: None,
        })
    }

    /// Like [`Self::match_text`], keeping the originating message on the result.
    #[must_use]
    pub fn match_message(&self, message: &InboundMessage) -> Option<MatchResult> {
        let mut result = self.match_text(&message.text)?;
        result.source_message = Some(message.clone());
        Some(result)
    }
}
