//! Include/exclude wildcard filtering over package identifying codes.
//!
//! Patterns follow SQL `LIKE` semantics restricted to a single wildcard:
//! `%` matches any run of characters, including none. Comparison ignores
//! case and no other character is special. A pattern string holds several
//! tokens separated by `,` or `;`.
//!
//! # Example
//!
//! ```rust
//! use msi_fleet::{filter_packages, PackageRecord};
//!
//! let packages = vec![
//!     PackageRecord::new("26A24AE4-039D-4CA4-87B4-2F86418065F0", "Java 8", "8.0.2510.8"),
//!     PackageRecord::new("90160000-008C-0000-0000-0000000FF1CE", "Office", "16.0.4266.1001"),
//! ];
//! let shown = filter_packages(&packages, "26A24AE4%", "");
//! assert_eq!(shown.len(), 1);
//! assert_eq!(shown[0].name, "Java 8");
//! ```

use crate::PackageRecord;

/// Matches any run of characters.
pub const WILDCARD: char = '%';

/// Characters separating tokens in a pattern string.
pub const DELIMITERS: [char; 2] = [',', ';'];

/// Include and exclude pattern strings as typed by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSet {
    include: String,
    exclude: String,
}

impl PatternSet {
    pub fn new(include: impl Into<String>, exclude: impl Into<String>) -> Self {
        Self {
            include: include.into(),
            exclude: exclude.into(),
        }
    }

    pub fn include(&self) -> &str {
        &self.include
    }

    pub fn exclude(&self) -> &str {
        &self.exclude
    }

    /// Include tokens; a pattern with no tokens includes everything.
    pub fn include_tokens(&self) -> Vec<&str> {
        let tokens = split_codes(&self.include);
        if tokens.is_empty() {
            vec!["%"]
        } else {
            tokens
        }
    }

    pub fn exclude_tokens(&self) -> Vec<&str> {
        split_codes(&self.exclude)
    }

    /// Whether a package passes the filter.
    pub fn matches(&self, package: &PackageRecord) -> bool {
        let exclude = self.exclude_tokens();
        admits(&package.identifying_code, &self.include_tokens(), &exclude)
    }

    /// Keep the packages that pass, in their original order.
    pub fn apply<'a>(&self, packages: &'a [PackageRecord]) -> Vec<&'a PackageRecord> {
        let include = self.include_tokens();
        let exclude = self.exclude_tokens();
        packages
            .iter()
            .filter(|package| admits(&package.identifying_code, &include, &exclude))
            .collect()
    }
}

fn admits(code: &str, include: &[&str], exclude: &[&str]) -> bool {
    // First include hit decides; exclusions then veto it.
    include
        .iter()
        .find(|token| matches_pattern(code, token))
        .is_some_and(|_| !exclude.iter().any(|token| matches_pattern(code, token)))
}

/// Filter packages by include and exclude pattern strings.
///
/// A package is kept when its identifying code matches at least one include
/// token and no exclude token. An include string without tokens acts as
/// `%`. Output keeps the input order and never repeats a package.
pub fn filter_packages<'a>(
    packages: &'a [PackageRecord],
    include: &str,
    exclude: &str,
) -> Vec<&'a PackageRecord> {
    PatternSet::new(include, exclude).apply(packages)
}

/// Split a pattern string into its non-empty, trimmed tokens.
pub fn split_codes(input: &str) -> Vec<&str> {
    input
        .split(&DELIMITERS[..])
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Match a code against one pattern token, ignoring case.
///
/// ```rust
/// use msi_fleet::matches_pattern;
///
/// assert!(matches_pattern("26A24AE4-039D-4CA4-87B4-2F86418065F0", "26a24ae4%"));
/// assert!(!matches_pattern("26A24AE4-039D-4CA4-87B4-2F86418065F0", "99%"));
/// ```
pub fn matches_pattern(code: &str, pattern: &str) -> bool {
    let text: Vec<char> = code.to_lowercase().chars().collect();
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();

    let (mut t, mut p) = (0, 0);
    // Position of the last wildcard seen and the text index it resumed from.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == WILDCARD {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            t += 1;
            p += 1;
        } else if let Some((star, resume)) = backtrack {
            p = star + 1;
            t = resume + 1;
            backtrack = Some((star, resume + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == WILDCARD)
}

/// Whether a character may appear in a pattern string.
pub fn is_pattern_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == WILDCARD || DELIMITERS.contains(&c)
}

/// Remove every character that cannot appear in a pattern string.
///
/// Idempotent: sanitizing sanitized text returns it unchanged.
pub fn sanitize_pattern(text: &str) -> String {
    text.chars().filter(|&c| is_pattern_char(c)).collect()
}

/// Sanitize text being edited and move the caret accordingly.
///
/// The caret (a character index) moves back by the number of removed
/// characters and is clamped to the new length, so on already-valid text it
/// stays where it was.
///
/// ```rust
/// use msi_fleet::sanitize_with_caret;
///
/// assert_eq!(sanitize_with_caret("26A2 4AE4", 9), ("26A24AE4".to_string(), 8));
/// assert_eq!(sanitize_with_caret("26A24AE4", 3), ("26A24AE4".to_string(), 3));
/// ```
pub fn sanitize_with_caret(text: &str, caret: usize) -> (String, usize) {
    let sanitized = sanitize_pattern(text);
    let before = text.chars().count();
    let after = sanitized.chars().count();
    let caret = caret.saturating_sub(before - after).min(after);
    (sanitized, caret)
}

/// Join the codes of selected records into a `;`-separated pattern string.
pub fn join_codes<'a>(records: impl IntoIterator<Item = &'a PackageRecord>) -> String {
    records
        .into_iter()
        .map(|record| record.identifying_code.as_str())
        .collect::<Vec<_>>()
        .join(";")
}
