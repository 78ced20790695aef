//! Shared utilities and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use rcommon::{Registry, text};
//!
//! let mut registry = Registry::new();
//! registry.insert("default".to_string(), 1_u32);
//!
//! assert!(registry.contains_key("default"));
//! assert_eq!(text::truncate_with_ellipsis("new chat", 50, "..."), "new chat");
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use rcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod text {
    //! Text helpers shared by conversation naming and reply rendering.
    //!
    //! ```rust
    //! use rcommon::text::{image_markdown, truncate_with_ellipsis};
    //!
    //! assert_eq!(truncate_with_ellipsis("short", 50, "..."), "short");
    //! assert_eq!(image_markdown("https://cdn.example/img.png"), "![image](https://cdn.example/img.png)");
    //! ```

    /// Truncates `value` to at most `max_chars` characters, appending `tail`
    /// when anything was cut. Operates on characters, not bytes, so multibyte
    /// input never splits mid-codepoint.
    pub fn truncate_with_ellipsis(value: &str, max_chars: usize, tail: &str) -> String {
        if value.chars().count() <= max_chars {
            return value.to_string();
        }

        let mut truncated = value.chars().take(max_chars).collect::<String>();
        truncated.push_str(tail);
        truncated
    }

    /// Renders an image URL as inline markdown for assistant replies.
    pub fn image_markdown(url: &str) -> String {
        format!("![image]({url})")
    }
}

pub mod registry {
    //! Generic registry map wrapper used by runtime registries.
    //!
    //! ```rust
    //! use rcommon::Registry;
    //!
    //! let mut registry = Registry::new();
    //! registry.insert("alpha".to_string(), 1_u32);
    //!
    //! assert_eq!(registry.get("alpha"), Some(&1));
    //! assert!(registry.contains_key("alpha"));
    //! ```

    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        items: HashMap<K, V>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                items: HashMap::new(),
            }
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash,
    {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            self.items.insert(key, value)
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.get(key)
        }

        pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.remove(key)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.contains_key(key)
        }

        pub fn values(&self) -> impl Iterator<Item = &V> {
            self.items.values()
        }

        pub fn len(&self) -> usize {
            self.items.len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }
}

pub use future::BoxFuture;
pub use registry::Registry;
