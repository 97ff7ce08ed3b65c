//! Filter registry.
//!
//! Maps a filter name (`:ruby`, `:plain`, ...) to a transform from the raw
//! body text of a filter block to a [`Fragment`]. A registry is built once,
//! typically at startup, and then only read; parses borrow it immutably, so
//! independent parses may share one across threads.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::ast::Fragment;

/// A transform from a filter body to generated output.
pub trait Filter: Send + Sync {
    fn compile(&self, text: &str) -> Fragment;
}

impl<F> Filter for F
where
    F: Fn(&str) -> Fragment + Send + Sync,
{
    fn compile(&self, text: &str) -> Fragment {
        self(text)
    }
}

/// Name to transform mapping consulted when a filter block closes.
#[derive(Default)]
pub struct FilterRegistry {
    filters: HashMap<String, Box<dyn Filter>>,
}

impl FilterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in filters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register("plain", plain)
            .register("ruby", ruby)
            .register("javascript", javascript)
            .register("css", css);
        registry
    }

    /// Register `filter` under `name`, replacing any previous registration.
    pub fn register(&mut self, name: impl Into<String>, filter: impl Filter + 'static) -> &mut Self {
        let name = name.into();
        if self.filters.insert(name.clone(), Box::new(filter)).is_some() {
            log::debug!("filter `{name}` re-registered, replacing the previous transform");
        }
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn Filter> {
        self.filters.get(name).map(|f| f.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("FilterRegistry").field("filters", &names).finish()
    }
}

/// Process-wide registry of the built-in filters, created on first use.
pub fn builtins() -> &'static FilterRegistry {
    static BUILTINS: LazyLock<FilterRegistry> = LazyLock::new(FilterRegistry::with_builtins);
    &BUILTINS
}

// =========================================================================
// Built-in filters
// =========================================================================

fn plain(text: &str) -> Fragment {
    Fragment::Static(format!("{text}\n"))
}

fn ruby(text: &str) -> Fragment {
    Fragment::Multi(vec![Fragment::Code(text.to_string()), Fragment::Newline])
}

fn javascript(text: &str) -> Fragment {
    Fragment::Static(format!("<script>\n{text}\n</script>\n"))
}

fn css(text: &str) -> Fragment {
    Fragment::Static(format!("<style>\n{text}\n</style>\n"))
}
