// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

use regex::{Regex, RegexBuilder};

use crate::configuration::Config;
use crate::constants::DEFAULT_SCRUB_PATTERNS;
use crate::lumigo_warn;

/// Compiled, case-insensitive key-matching patterns for secret masking.
///
/// A configured empty pattern list is a valid state: it disables scrubbing
/// entirely.
#[derive(Debug, Default)]
pub struct Scrubber {
    patterns: Vec<Regex>,
}

impl Scrubber {
    /// Compile the given patterns. Invalid patterns are logged and skipped,
    /// never failing the build.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|pattern| {
                match RegexBuilder::new(pattern.as_ref())
                    .case_insensitive(true)
                    .build()
                {
                    Ok(regex) => Some(regex),
                    Err(e) => {
                        lumigo_warn!(
                            "Ignoring invalid secret masking pattern {:?}: {e}",
                            pattern.as_ref()
                        );
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn with_default_patterns() -> Self {
        Self::from_patterns(DEFAULT_SCRUB_PATTERNS)
    }

    pub fn from_config(config: &Config) -> Self {
        match config.secret_masking_regex() {
            Some(patterns) => Self::from_patterns(patterns),
            None => Self::with_default_patterns(),
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns_match_substrings() {
        let scrubber = Scrubber::with_default_patterns();
        for key in [
            "password",
            "PASSWORD",
            "api_key",
            "client-secret",
            "AwsCredentials",
            "SessionToken",
            "x-amz-security-token",
            "Signature",
            "Authorization",
            "authorization",
        ] {
            assert!(scrubber.matches(key), "{key} should be scrubbed");
        }
        for key in ["username", "body", "query"] {
            assert!(!scrubber.matches(key), "{key} should not be scrubbed");
        }
    }

    #[test]
    fn test_empty_pattern_list_disables_scrubbing() {
        let scrubber = Scrubber::from_patterns::<&str>(&[]);
        assert!(!scrubber.matches("password"));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let scrubber = Scrubber::from_patterns(&["([unclosed", "token"]);
        assert!(scrubber.matches("token"));
        assert!(!scrubber.matches("([unclosed"));
    }
}
