//! Tags attached to every submission
//!
use parking_lot::RwLock;
use std::collections::HashMap;

/// Thread-safe collection of tag name/value pairs.
///
/// Readers take a shared lock, so rendering the tag string for an in-flight
/// submission never observes a half-applied mutation.
#[derive(Debug, Default)]
pub struct TagStore {
    tags: RwLock<HashMap<String, String>>,
}

impl TagStore {
    /// Constructs an empty tag store
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a tag. Does nothing if either the name or the value is empty.
    pub fn add_tag(&self, name: &str, value: &str) {
        if name.is_empty() || value.is_empty() {
            return;
        }
        self.tags.write().insert(name.to_string(), value.to_string());
    }

    /// Merges all pairs into the store, overwriting on name collision.
    ///
    /// Unlike [add_tag](TagStore::add_tag), entries are not checked for emptiness.
    pub fn add_tags<I, K, V>(&self, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut tags = tags.into_iter().peekable();
        if tags.peek().is_none() {
            return;
        }
        let mut store = self.tags.write();
        for (name, value) in tags {
            store.insert(name.into(), value.into());
        }
    }

    /// Removes a tag. Does nothing if the name is empty or not present.
    pub fn remove_tag(&self, name: &str) {
        if name.is_empty() {
            return;
        }
        self.tags.write().remove(name);
    }

    /// Returns the value of a tag
    pub fn get(&self, name: &str) -> Option<String> {
        self.tags.read().get(name).cloned()
    }

    /// Number of tags in the store
    pub fn len(&self) -> usize {
        self.tags.read().len()
    }

    /// Returns true if the store holds no tags
    pub fn is_empty(&self) -> bool {
        self.tags.read().is_empty()
    }

    /// Removes all tags
    pub fn clear(&self) {
        self.tags.write().clear();
    }

    /// Renders the tags as `name-value` entries joined by commas.
    /// Entry order is unspecified. Returns an empty string if there are no tags.
    pub fn render(&self) -> String {
        let tags = self.tags.read();
        let mut buf = String::with_capacity(tags.len() * 16);
        for (name, value) in tags.iter() {
            if !buf.is_empty() {
                buf.push(',');
            }
            buf.push_str(name);
            buf.push('-');
            buf.push_str(value);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty() {
        let store = TagStore::new();
        assert_eq!(store.render(), "");
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_and_render() {
        let store = TagStore::new();
        store.add_tag("env", "prod");
        store.add_tag("app", "web");

        let rendered = store.render();
        let mut entries: Vec<&str> = rendered.split(',').collect();
        entries.sort_unstable();
        assert_eq!(entries, vec!["app-web", "env-prod"]);
    }

    #[test]
    fn test_add_tag_overwrites() {
        let store = TagStore::new();
        store.add_tag("env", "dev");
        store.add_tag("env", "prod");
        assert_eq!(store.len(), 1);
        assert_eq!(store.render(), "env-prod");
    }

    #[test]
    fn test_add_tag_rejects_empty() {
        let store = TagStore::new();
        store.add_tag("env", "prod");
        store.add_tag("", "x");
        store.add_tag("x", "");
        assert_eq!(store.render(), "env-prod");
    }

    #[test]
    fn test_remove_tag() {
        let store = TagStore::new();
        store.add_tag("env", "prod");
        store.add_tag("app", "web");

        store.remove_tag("");
        store.remove_tag("missing");
        assert_eq!(store.len(), 2);

        store.remove_tag("env");
        assert_eq!(store.render(), "app-web");
        assert_eq!(store.get("env"), None);
    }

    #[test]
    fn test_add_tags_merges_without_validation() {
        let store = TagStore::new();
        store.add_tag("a", "0");
        store.add_tags(vec![("a", "1"), ("", "blank-name"), ("b", "")]);

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("a").as_deref(), Some("1"));
        assert_eq!(store.get("").as_deref(), Some("blank-name"));
        assert_eq!(store.get("b").as_deref(), Some(""));
    }

    #[test]
    fn test_add_tags_empty_batch() {
        let store = TagStore::new();
        store.add_tag("env", "prod");
        store.add_tags(HashMap::<String, String>::new());
        assert_eq!(store.render(), "env-prod");
    }

    #[test]
    fn test_clear() {
        let store = TagStore::new();
        store.add_tags([("a", "1"), ("b", "2")]);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.render(), "");
    }
}
