//! Prompt pattern sets.
//!
//! Patterns are ordered regex alternatives evaluated against the whole
//! unconsumed buffer, so an unanchored `$` means "at the current end of
//! output", the way expect tools treat it.

use regex::bytes::Regex;

/// An ordered set of candidate prompts for one expect step.
#[derive(Debug, Clone)]
pub struct PromptSet {
    patterns: Vec<Regex>,
}

impl PromptSet {
    /// Compile a prompt set from pattern strings.
    pub fn new(patterns: &[&str]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Build a prompt set from already compiled regexes.
    pub fn from_regexes(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    /// Number of candidate patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the set has no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Get a pattern by ordinal.
    pub fn get(&self, ordinal: usize) -> Option<&Regex> {
        self.patterns.get(ordinal)
    }

    /// Find the match that starts earliest in `data`.
    ///
    /// Returns `(ordinal, start, end)`. Ties go to the lower ordinal.
    pub fn earliest(&self, data: &[u8]) -> Option<(usize, usize, usize)> {
        let mut best: Option<(usize, usize, usize)> = None;
        for (ordinal, pattern) in self.patterns.iter().enumerate() {
            if let Some(m) = pattern.find(data) {
                match best {
                    Some((_, start, _)) if start <= m.start() => {}
                    _ => best = Some((ordinal, m.start(), m.end())),
                }
            }
        }
        best
    }
}
