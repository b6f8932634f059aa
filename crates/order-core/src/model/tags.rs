use globset::Glob;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::{OrderError, Result};

/// How multiple patterns combine in [`TagSet::matches`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagMatchMode {
    /// At least one pattern must match a tag
    #[default]
    Any,
    /// Every pattern must match a tag
    All,
}

/// Pattern language accepted by [`TagSet::matches_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternSyntax {
    /// Shell-style globs matched against the whole tag
    #[default]
    Glob,
    /// Regular expressions anchored at the start of the tag
    Regex,
}

/// Set of string tags, iterated in sorted order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet {
    tags: BTreeSet<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag, returning `true` if it was not present
    pub fn add(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(tag.into())
    }

    /// Remove a tag, returning `true` if it was present
    pub fn remove(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    /// Exact membership test
    pub fn has(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Glob-pattern membership test (`*`, `?`, `[...]`)
    ///
    /// A pattern matches when at least one tag matches it. `mode` decides
    /// whether one or all patterns have to match.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTagPattern` if a pattern does not compile.
    pub fn matches<S: AsRef<str>>(&self, patterns: &[S], mode: TagMatchMode) -> Result<bool> {
        self.matches_with(patterns, mode, PatternSyntax::Glob)
    }

    /// Pattern membership test in the given `syntax`
    ///
    /// Regex patterns only need to match a prefix of the tag, so `"sig"`
    /// matches `"signal"` while `"nal"` does not. Anchor with `$` for a full
    /// match.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTagPattern` if a pattern does not compile.
    pub fn matches_with<S: AsRef<str>>(
        &self,
        patterns: &[S],
        mode: TagMatchMode,
        syntax: PatternSyntax,
    ) -> Result<bool> {
        let mut hits = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let invalid = |reason: String| OrderError::InvalidTagPattern {
                pattern: pattern.to_string(),
                reason,
            };
            let hit = match syntax {
                PatternSyntax::Glob => {
                    let matcher = Glob::new(pattern)
                        .map_err(|e| invalid(e.to_string()))?
                        .compile_matcher();
                    self.tags.iter().any(|tag| matcher.is_match(tag))
                }
                PatternSyntax::Regex => {
                    let matcher = Regex::new(&format!("^(?:{pattern})"))
                        .map_err(|e| invalid(e.to_string()))?;
                    self.tags.iter().any(|tag| matcher.is_match(tag))
                }
            };
            hits.push(hit);
        }

        Ok(match mode {
            TagMatchMode::Any => hits.iter().any(|hit| *hit),
            TagMatchMode::All => hits.iter().all(|hit| *hit),
        })
    }

    pub fn clear(&mut self) {
        self.tags.clear();
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Tags in `self` or in `other`
    pub fn union(&self, other: impl IntoIterator<Item = impl AsRef<str>>) -> TagSet {
        let mut tags = self.tags.clone();
        tags.extend(other.into_iter().map(|tag| tag.as_ref().to_string()));
        TagSet { tags }
    }

    /// Tags in both `self` and `other`
    pub fn intersection(&self, other: impl IntoIterator<Item = impl AsRef<str>>) -> TagSet {
        other
            .into_iter()
            .filter(|tag| self.has(tag.as_ref()))
            .map(|tag| tag.as_ref().to_string())
            .collect()
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a str;
    type IntoIter = std::iter::Map<std::collections::btree_set::Iter<'a, String>, fn(&String) -> &str>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter().map(String::as_str as fn(&String) -> &str)
    }
}

impl<S: Into<String>> Extend<S> for TagSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.tags.extend(iter.into_iter().map(Into::into));
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TagSet::new();
        set.extend(iter);
        set
    }
}
