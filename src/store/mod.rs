//! Path-addressed access to nested JSON trees.
//!
//! A [`PathStore`] wraps one `serde_json::Value` tree and reads or overwrites
//! nodes addressed by a [`Path`] such as `"locationShown/struct#1/city"`.
//! The store never creates keys, so writes preserve the shape of the tree it
//! was built from (the checker relies on this to keep state trees aligned
//! with the state template).
//!
//! Two modes exist:
//!
//! - **mutable**: [`PathStore::new`] takes a deep copy, [`PathStore::from_owned`]
//!   takes ownership; the store never aliases caller memory.
//! - **read-only**: [`PathStore::read_only`] borrows the tree; every write
//!   returns [`Lookup::ReadOnly`].

mod path;

pub use path::{INDEX_SEP, LEVEL_SEP, Path, PathError, Selector};

use serde_json::Value;
use std::borrow::Cow;

/// Outcome of a [`PathStore`] read or write.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<'a> {
    /// The value found at the path.
    Found(&'a Value),
    /// The value now stored at the path.
    Set(&'a Value),
    /// A structural problem with the path, naming the failing level.
    Error(String),
    /// A write was attempted on a read-only store.
    ReadOnly,
}

impl<'a> Lookup<'a> {
    /// The value carried by `Found` or `Set`.
    pub fn value(&self) -> Option<&'a Value> {
        match self {
            Lookup::Found(v) | Lookup::Set(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Lookup::Error(_))
    }
}

/// Separators used to render error messages in the caller's own syntax.
#[derive(Clone, Copy)]
struct Seps {
    level: char,
    index: char,
}

const DEFAULT_SEPS: Seps = Seps {
    level: LEVEL_SEP,
    index: INDEX_SEP,
};

/// A JSON tree addressed by slash-separated, optionally indexed paths.
///
/// # Example
///
/// ```rust
/// use ipmd_check::store::{Lookup, PathStore};
/// use serde_json::json;
///
/// let tree = json!({ "creator": { "names": ["Ann", "Bob"] } });
/// let mut store = PathStore::new(&tree);
///
/// assert_eq!(store.get("creator/names#1"), Lookup::Found(&json!("Bob")));
/// assert_eq!(store.set(json!("Cid"), "creator/names#1"), Lookup::Set(&json!("Cid")));
///
/// // Keys are never created
/// assert!(store.set(json!(1), "creator/age").is_error());
///
/// // The caller's tree is untouched
/// assert_eq!(tree["creator"]["names"][1], "Bob");
/// ```
#[derive(Debug, Clone)]
pub struct PathStore<'a> {
    tree: Cow<'a, Value>,
}

impl PathStore<'static> {
    /// A mutable store over a deep copy of `tree`.
    pub fn new(tree: &Value) -> Self {
        Self {
            tree: Cow::Owned(tree.clone()),
        }
    }

    /// A mutable store that takes ownership of `tree`.
    pub fn from_owned(tree: Value) -> Self {
        Self {
            tree: Cow::Owned(tree),
        }
    }
}

impl<'a> PathStore<'a> {
    /// A read-only view over a tree owned elsewhere.
    pub fn read_only(tree: &'a Value) -> Self {
        Self {
            tree: Cow::Borrowed(tree),
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self.tree, Cow::Borrowed(_))
    }

    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// Consume the store, returning its tree (copied if it was borrowed).
    pub fn into_value(self) -> Value {
        self.tree.into_owned()
    }

    /// Read the node at `path` using the default separators.
    pub fn get(&self, path: &str) -> Lookup<'_> {
        self.get_with(path, LEVEL_SEP, INDEX_SEP)
    }

    pub fn get_with(&self, path: &str, level_sep: char, index_sep: char) -> Lookup<'_> {
        match Path::parse_with(path, level_sep, index_sep) {
            Ok(parsed) => self.lookup(&parsed, Seps { level: level_sep, index: index_sep }),
            Err(e) => Lookup::Error(e.to_string()),
        }
    }

    pub fn get_path(&self, path: &Path) -> Lookup<'_> {
        self.lookup(path, DEFAULT_SEPS)
    }

    /// Overwrite the existing node at `path` using the default separators.
    pub fn set(&mut self, value: Value, path: &str) -> Lookup<'_> {
        self.set_with(value, path, LEVEL_SEP, INDEX_SEP)
    }

    pub fn set_with(&mut self, value: Value, path: &str, level_sep: char, index_sep: char) -> Lookup<'_> {
        if self.is_read_only() {
            return Lookup::ReadOnly;
        }
        match Path::parse_with(path, level_sep, index_sep) {
            Ok(parsed) => self.store(value, &parsed, Seps { level: level_sep, index: index_sep }),
            Err(e) => Lookup::Error(e.to_string()),
        }
    }

    pub fn set_path(&mut self, value: Value, path: &Path) -> Lookup<'_> {
        self.store(value, path, DEFAULT_SEPS)
    }

    fn lookup(&self, path: &Path, seps: Seps) -> Lookup<'_> {
        if path.is_empty() {
            return Lookup::Error(PathError::Empty.to_string());
        }
        let mut node: &Value = &self.tree;
        for (i, selector) in path.selectors().iter().enumerate() {
            node = match step(node, selector) {
                Ok(next) => next,
                Err(reason) => return Lookup::Error(level_error(path, i, seps, &reason)),
            };
        }
        Lookup::Found(node)
    }

    fn store(&mut self, value: Value, path: &Path, seps: Seps) -> Lookup<'_> {
        let mut node = match &mut self.tree {
            Cow::Owned(tree) => tree,
            Cow::Borrowed(_) => return Lookup::ReadOnly,
        };
        if path.is_empty() {
            return Lookup::Error(PathError::Empty.to_string());
        }
        for (i, selector) in path.selectors().iter().enumerate() {
            node = match step_mut(node, selector) {
                Ok(next) => next,
                Err(reason) => return Lookup::Error(level_error(path, i, seps, &reason)),
            };
        }
        *node = value;
        Lookup::Set(node)
    }
}

fn level_error(path: &Path, level: usize, seps: Seps, reason: &str) -> String {
    format!(
        "level {} ({}): {reason}",
        level + 1,
        path.render_prefix(level + 1, seps.level, seps.index)
    )
}

fn step<'v>(node: &'v Value, selector: &Selector) -> Result<&'v Value, String> {
    let map = node
        .as_object()
        .ok_or_else(|| format!("cannot select '{}' in a non-object node", selector.key))?;
    let child = map
        .get(&selector.key)
        .ok_or_else(|| format!("unknown key '{}'", selector.key))?;
    match selector.index {
        None => Ok(child),
        Some(index) => {
            let items = child
                .as_array()
                .ok_or_else(|| format!("'{}' is not an array", selector.key))?;
            items
                .get(index)
                .ok_or_else(|| format!("index {index} out of range (length {})", items.len()))
        }
    }
}

fn step_mut<'v>(node: &'v mut Value, selector: &Selector) -> Result<&'v mut Value, String> {
    let map = node
        .as_object_mut()
        .ok_or_else(|| format!("cannot select '{}' in a non-object node", selector.key))?;
    let child = map
        .get_mut(&selector.key)
        .ok_or_else(|| format!("unknown key '{}'", selector.key))?;
    match selector.index {
        None => Ok(child),
        Some(index) => {
            let items = child
                .as_array_mut()
                .ok_or_else(|| format!("'{}' is not an array", selector.key))?;
            let len = items.len();
            items
                .get_mut(index)
                .ok_or_else(|| format!("index {index} out of range (length {len})"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn fixture() -> Value {
        json!({
            "title": "Sunset",
            "people": [
                { "name": "Ann", "roles": ["photographer"] },
                { "name": "Bob", "roles": [] },
                { "name": "Cid", "roles": ["editor", "writer"] }
            ],
            "contact": { "city": "Berlin", "phones": ["1", "2"] }
        })
    }

    // ── get ──────────────────────────────────────────────────────────

    #[test]
    fn get_top_level_key() {
        let tree = fixture();
        let store = PathStore::read_only(&tree);
        assert_eq!(store.get("title"), Lookup::Found(&json!("Sunset")));
    }

    #[test]
    fn get_nested_indexed() {
        let tree = fixture();
        let store = PathStore::read_only(&tree);
        assert_eq!(store.get("people#2/roles#1"), Lookup::Found(&json!("writer")));
        assert_eq!(store.get("contact/phones"), Lookup::Found(&json!(["1", "2"])));
    }

    #[test]
    fn get_empty_path_is_error() {
        let tree = fixture();
        let store = PathStore::read_only(&tree);
        assert_eq!(store.get(""), Lookup::Error("empty path".into()));
        assert!(store.get_path(&Path::default()).is_error());
    }

    #[test]
    fn get_empty_selector_is_error() {
        let tree = fixture();
        let store = PathStore::read_only(&tree);
        assert_eq!(
            store.get("contact//city"),
            Lookup::Error("level 2: empty selector".into())
        );
    }

    #[test]
    fn get_unknown_key_names_level() {
        let tree = fixture();
        let store = PathStore::read_only(&tree);
        assert_eq!(
            store.get("contact/country"),
            Lookup::Error("level 2 (contact/country): unknown key 'country'".into())
        );
    }

    #[test]
    fn get_index_on_non_array_is_error() {
        let tree = fixture();
        let store = PathStore::read_only(&tree);
        assert_eq!(
            store.get("title#0"),
            Lookup::Error("level 1 (title#0): 'title' is not an array".into())
        );
    }

    #[test]
    fn get_out_of_range_index_is_error() {
        let tree = fixture();
        let store = PathStore::read_only(&tree);
        assert_eq!(
            store.get("people#3/name"),
            Lookup::Error("level 1 (people#3): index 3 out of range (length 3)".into())
        );
    }

    #[test]
    fn get_through_scalar_is_error() {
        let tree = fixture();
        let store = PathStore::read_only(&tree);
        assert!(store.get("title/length").is_error());
    }

    #[test]
    fn get_invalid_index_falls_back_to_literal_key() {
        let tree = json!({ "a#x": 1, "b": [1] });
        let store = PathStore::read_only(&tree);
        assert_eq!(store.get("a#x"), Lookup::Found(&json!(1)));
        assert!(store.get("b#x").is_error());
    }

    #[test]
    fn get_with_custom_separators_reports_in_same_syntax() {
        let tree = fixture();
        let store = PathStore::read_only(&tree);
        assert_eq!(store.get_with("people@0.name", '.', '@'), Lookup::Found(&json!("Ann")));
        assert_eq!(
            store.get_with("people@9.name", '.', '@'),
            Lookup::Error("level 1 (people@9): index 9 out of range (length 3)".into())
        );
    }

    #[test]
    fn out_of_range_index_errors_for_every_array_prefix() {
        let tree = fixture();
        let mut store = PathStore::new(&tree);
        for path in ["people#3", "people#0/roles#1", "people#1/roles#0", "contact/phones#2"] {
            assert!(store.get(path).is_error(), "get {path}");
            assert!(store.set(json!(0), path).is_error(), "set {path}");
        }
    }

    // ── set ──────────────────────────────────────────────────────────

    #[test]
    fn set_overwrites_existing_key() {
        let mut store = PathStore::new(&fixture());
        assert_eq!(store.set(json!("Paris"), "contact/city"), Lookup::Set(&json!("Paris")));
        assert_eq!(store.get("contact/city"), Lookup::Found(&json!("Paris")));
    }

    #[test]
    fn set_indexed_element() {
        let mut store = PathStore::new(&fixture());
        assert!(matches!(store.set(json!("Dan"), "people#1/name"), Lookup::Set(_)));
        assert_eq!(store.tree()["people"][1]["name"], "Dan");
    }

    #[test]
    fn set_never_creates_keys() {
        let mut store = PathStore::new(&fixture());
        assert_eq!(
            store.set(json!("DE"), "contact/country"),
            Lookup::Error("level 2 (contact/country): unknown key 'country'".into())
        );
        assert!(store.tree()["contact"].get("country").is_none());
    }

    #[test]
    fn set_does_not_alias_caller_tree() {
        let tree = fixture();
        let mut store = PathStore::new(&tree);
        let _ = store.set(json!("changed"), "title");
        assert_eq!(tree["title"], "Sunset");
        assert_eq!(store.into_value()["title"], "changed");
    }

    #[test]
    fn set_on_read_only_store_is_rejected() {
        let tree = fixture();
        let mut store = PathStore::read_only(&tree);
        assert!(store.is_read_only());
        // Valid, invalid and empty paths alike
        for path in ["title", "nope/nope", "", "people#99"] {
            assert_eq!(store.set(json!(1), path), Lookup::ReadOnly, "path {path:?}");
        }
        assert_eq!(store.set_path(json!(1), &Path::key("title")), Lookup::ReadOnly);
        assert_eq!(tree["title"], "Sunset");
    }

    #[test]
    fn owned_store_is_mutable() {
        let mut store = PathStore::from_owned(json!({ "a": 1 }));
        assert!(!store.is_read_only());
        assert_eq!(store.set(json!(2), "a"), Lookup::Set(&json!(2)));
    }

    #[test]
    fn lookup_value_accessor() {
        let v = json!(3);
        assert_eq!(Lookup::Found(&v).value(), Some(&v));
        assert_eq!(Lookup::Set(&v).value(), Some(&v));
        assert_eq!(Lookup::ReadOnly.value(), None);
        assert_eq!(Lookup::Error("x".into()).value(), None);
    }

    // ── properties ───────────────────────────────────────────────────

    proptest! {
        #[test]
        fn set_then_get_round_trips(
            person in 0usize..3,
            number in any::<i64>(),
            text in "[a-zA-Z ]{0,12}",
            use_text in any::<bool>(),
        ) {
            let mut store = PathStore::new(&fixture());
            let value = if use_text { json!(text) } else { json!(number) };
            let path = format!("people#{person}/name");
            prop_assert_eq!(store.set(value.clone(), &path), Lookup::Set(&value));
            prop_assert_eq!(store.get(&path), Lookup::Found(&value));
        }

        #[test]
        fn out_of_range_is_always_error(extra in 0usize..50) {
            let mut store = PathStore::new(&fixture());
            let path = format!("people#{}", 3 + extra);
            prop_assert!(store.get(&path).is_error());
            prop_assert!(store.set(json!(null), &path).is_error());
        }
    }
}
