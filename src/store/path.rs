use std::fmt;
use thiserror::Error;

/// Default separator between path levels.
pub const LEVEL_SEP: char = '/';
/// Default separator between a property name and an array index.
pub const INDEX_SEP: char = '#';

/// Errors produced while parsing a path string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("level {level}: empty selector")]
    EmptySelector { level: usize },
}

/// One level of a [`Path`]: a property name, optionally addressing a single
/// element of the array stored under that name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub key: String,
    pub index: Option<usize>,
}

impl Selector {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            index: None,
        }
    }

    pub fn indexed(key: impl Into<String>, index: usize) -> Self {
        Self {
            key: key.into(),
            index: Some(index),
        }
    }

    /// Parse one raw selector. A suffix that is not a plain run of digits
    /// leaves the whole text as the key.
    fn parse(raw: &str, index_sep: char) -> Self {
        if let Some((name, suffix)) = raw.rsplit_once(index_sep) {
            let digits = !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit());
            if digits && !name.is_empty() {
                if let Ok(index) = suffix.parse::<usize>() {
                    return Self::indexed(name, index);
                }
            }
        }
        Self::key(raw)
    }

    fn write(&self, out: &mut String, index_sep: char) {
        out.push_str(&self.key);
        if let Some(index) = self.index {
            out.push(index_sep);
            out.push_str(&index.to_string());
        }
    }
}

/// An ordered list of selectors addressing a node inside a JSON tree.
///
/// Recursive walks extend paths segment by segment with [`Path::child`] and
/// [`Path::child_indexed`]; the string form is only produced for display.
///
/// ```rust
/// use ipmd_check::store::Path;
///
/// let path = Path::parse("locationShown#1/city").unwrap();
/// assert_eq!(path.len(), 2);
/// assert_eq!(path.to_string(), "locationShown#1/city");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    selectors: Vec<Selector>,
}

impl Path {
    /// A single-level path naming `key`.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            selectors: vec![Selector::key(key)],
        }
    }

    pub fn from_selectors(selectors: Vec<Selector>) -> Self {
        Self { selectors }
    }

    /// Parse with the default separators (`/` and `#`).
    pub fn parse(path: &str) -> Result<Self, PathError> {
        Self::parse_with(path, LEVEL_SEP, INDEX_SEP)
    }

    pub fn parse_with(path: &str, level_sep: char, index_sep: char) -> Result<Self, PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        let mut selectors = Vec::new();
        for (i, raw) in path.split(level_sep).enumerate() {
            if raw.is_empty() {
                return Err(PathError::EmptySelector { level: i + 1 });
            }
            selectors.push(Selector::parse(raw, index_sep));
        }
        Ok(Self { selectors })
    }

    /// A copy of this path extended by a plain key.
    pub fn child(&self, key: impl Into<String>) -> Self {
        self.with(Selector::key(key))
    }

    /// A copy of this path extended by an indexed key.
    pub fn child_indexed(&self, key: impl Into<String>, index: usize) -> Self {
        self.with(Selector::indexed(key, index))
    }

    fn with(&self, selector: Selector) -> Self {
        let mut selectors = Vec::with_capacity(self.selectors.len() + 1);
        selectors.extend(self.selectors.iter().cloned());
        selectors.push(selector);
        Self { selectors }
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Render the first `levels` selectors with the given separators.
    pub fn render_prefix(&self, levels: usize, level_sep: char, index_sep: char) -> String {
        let mut out = String::new();
        for (i, selector) in self.selectors.iter().take(levels).enumerate() {
            if i > 0 {
                out.push(level_sep);
            }
            selector.write(&mut out, index_sep);
        }
        out
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_prefix(self.selectors.len(), LEVEL_SEP, INDEX_SEP))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_levels() {
        let path = Path::parse("a/b/c").unwrap();
        assert_eq!(
            path.selectors(),
            &[Selector::key("a"), Selector::key("b"), Selector::key("c")]
        );
    }

    #[test]
    fn parse_indexed_level() {
        let path = Path::parse("creator#2/name").unwrap();
        assert_eq!(path.selectors()[0], Selector::indexed("creator", 2));
        assert_eq!(path.selectors()[1], Selector::key("name"));
    }

    #[test]
    fn parse_invalid_index_degrades_to_key() {
        for raw in ["a#x", "a#-1", "a#", "a#+1", "#3"] {
            let path = Path::parse(raw).unwrap();
            assert_eq!(path.selectors(), &[Selector::key(raw)], "raw selector {raw}");
        }
    }

    #[test]
    fn parse_splits_at_last_index_separator() {
        let path = Path::parse("a#b#4").unwrap();
        assert_eq!(path.selectors(), &[Selector::indexed("a#b", 4)]);
    }

    #[test]
    fn parse_empty_path_fails() {
        assert_eq!(Path::parse(""), Err(PathError::Empty));
    }

    #[test]
    fn parse_empty_selector_reports_level() {
        assert_eq!(
            Path::parse("a//b"),
            Err(PathError::EmptySelector { level: 2 })
        );
        assert_eq!(
            Path::parse("a/"),
            Err(PathError::EmptySelector { level: 2 })
        );
    }

    #[test]
    fn parse_custom_separators() {
        let path = Path::parse_with("a.b@1", '.', '@').unwrap();
        assert_eq!(
            path.selectors(),
            &[Selector::key("a"), Selector::indexed("b", 1)]
        );
        // The default separators are plain text under custom ones
        let path = Path::parse_with("x/y#1", '.', '@').unwrap();
        assert_eq!(path.selectors(), &[Selector::key("x/y#1")]);
    }

    #[test]
    fn builders_and_display() {
        let path = Path::key("locationShown")
            .child_indexed("struct", 0)
            .child("city");
        assert_eq!(path.to_string(), "locationShown/struct#0/city");
        assert_eq!(path.render_prefix(2, '/', '#'), "locationShown/struct#0");
    }
}
