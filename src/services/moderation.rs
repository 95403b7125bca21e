//! Comment moderation
//!
//! A comment is rejected when any banned word occurs anywhere in its text.
//! Matching is plain substring containment, so "редиска" also catches
//! "редисками". Whether case matters is configurable.

use regex::{Regex, RegexBuilder};

use crate::config::ModerationConfig;

/// Form field a rejection is attached to
pub const TEXT_FIELD: &str = "text";

/// Outcome of a failed check
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Rejected {
    /// Field the warning belongs to
    pub field: &'static str,
    /// Warning shown to the user
    pub message: String,
    /// The banned word as it occurred in the text
    pub matched: String,
}

/// Banned-word filter built once from configuration
#[derive(Debug, Clone)]
pub struct ModerationFilter {
    pattern: Option<Regex>,
    warning: String,
}

impl ModerationFilter {
    /// Build the filter. Blank entries in `banned_words` are ignored; with no
    /// words left every text is accepted.
    pub fn from_config(config: &ModerationConfig) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = config
            .banned_words
            .iter()
            .map(|word| word.trim())
            .filter(|word| !word.is_empty())
            .map(regex::escape)
            .collect();

        let pattern = if alternatives.is_empty() {
            None
        } else {
            Some(
                RegexBuilder::new(&alternatives.join("|"))
                    .case_insensitive(!config.case_sensitive)
                    .build()?,
            )
        };

        Ok(Self {
            pattern,
            warning: config.warning.clone(),
        })
    }

    /// Check submitted comment text.
    pub fn validate(&self, text: &str) -> Result<(), Rejected> {
        let Some(found) = self.pattern.as_ref().and_then(|p| p.find(text)) else {
            return Ok(());
        };

        tracing::debug!(word = found.as_str(), "Comment rejected by moderation");
        Err(Rejected {
            field: TEXT_FIELD,
            message: self.warning.clone(),
            matched: found.as_str().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn default_filter() -> ModerationFilter {
        ModerationFilter::from_config(&ModerationConfig::default()).expect("valid config")
    }

    #[test]
    fn test_clean_text_is_accepted() {
        assert_eq!(default_filter().validate("Хорошая новость, спасибо"), Ok(()));
    }

    #[test]
    fn test_banned_word_is_rejected_with_warning() {
        let rejected = default_filter()
            .validate("Какой-то текст, редиска, еще текст")
            .unwrap_err();

        assert_eq!(rejected.field, "text");
        assert_eq!(rejected.message, "Не ругайтесь!");
        assert_eq!(rejected.matched, "редиска");
    }

    #[test]
    fn test_substring_inside_longer_word_is_rejected() {
        assert!(default_filter().validate("ты негодяйка").is_err());
    }

    #[test]
    fn test_case_insensitive_by_default() {
        let rejected = default_filter().validate("РЕДИСКА!").unwrap_err();
        assert_eq!(rejected.matched, "РЕДИСКА");
    }

    #[test]
    fn test_case_sensitive_when_configured() {
        let config = ModerationConfig {
            case_sensitive: true,
            ..ModerationConfig::default()
        };
        let filter = ModerationFilter::from_config(&config).unwrap();

        assert!(filter.validate("РЕДИСКА").is_ok());
        assert!(filter.validate("редиска").is_err());
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let config = ModerationConfig {
            banned_words: vec!["a.b".to_string(), "  ".to_string()],
            ..ModerationConfig::default()
        };
        let filter = ModerationFilter::from_config(&config).unwrap();

        assert!(filter.validate("axb").is_ok());
        assert!(filter.validate("xx a.b xx").is_err());
    }

    #[test]
    fn test_empty_word_list_accepts_everything() {
        let config = ModerationConfig {
            banned_words: Vec::new(),
            ..ModerationConfig::default()
        };
        let filter = ModerationFilter::from_config(&config).unwrap();

        assert!(filter.validate("редиска").is_ok());
    }

    proptest! {
        #[test]
        fn prop_any_text_containing_banned_word_is_rejected(
            prefix in "\\PC{0,20}",
            suffix in "\\PC{0,20}",
            idx in 0usize..2,
        ) {
            let filter = default_filter();
            let word = ["редиска", "негодяй"][idx];
            let text = format!("{}{}{}", prefix, word, suffix);

            prop_assert!(filter.validate(&text).is_err());
        }

        #[test]
        fn prop_ascii_text_is_accepted(text in "[a-zA-Z0-9 .,!?]{0,60}") {
            prop_assert!(default_filter().validate(&text).is_ok());
        }
    }
}
