//! Dash detection within a text unit

use regex::Regex;

use crate::config::PatternConfig;

const EM_DASH: &str = "\u{2014}";
const EN_DASH: &str = "\u{2013}";
const DOUBLE_HYPHEN: &str = "--";

/// One dash occurrence as a half-open range of character (not byte) offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub end: usize,
}

impl Match {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Compiled set of dash-like sequences
#[derive(Debug, Clone)]
pub struct DashPattern {
    regex: Option<Regex>,
}

impl DashPattern {
    /// Build a pattern from the enabled sequences. Nothing enabled matches nothing.
    pub fn new(config: &PatternConfig) -> Result<Self, regex::Error> {
        let mut alternatives = Vec::new();
        if config.double_hyphen {
            alternatives.push(regex::escape(DOUBLE_HYPHEN));
        }
        if config.em_dash {
            alternatives.push(regex::escape(EM_DASH));
        }
        if config.en_dash {
            alternatives.push(regex::escape(EN_DASH));
        }

        if alternatives.is_empty() {
            return Ok(Self { regex: None });
        }
        let regex = Regex::new(&alternatives.join("|"))?;
        Ok(Self { regex: Some(regex) })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(text))
    }

    /// All non-overlapping occurrences in ascending order
    pub fn find(&self, text: &str) -> Vec<Match> {
        let Some(regex) = &self.regex else {
            return Vec::new();
        };

        let mut matches = Vec::new();
        // Running byte/char cursor so each prefix is only counted once
        let mut byte_pos = 0;
        let mut char_pos = 0;
        for m in regex.find_iter(text) {
            char_pos += text[byte_pos..m.start()].chars().count();
            let start = char_pos;
            char_pos += m.as_str().chars().count();
            byte_pos = m.end();
            matches.push(Match {
                start,
                end: char_pos,
            });
        }
        matches
    }
}
