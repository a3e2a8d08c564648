//! The token abstraction: the input alphabet of the engine.

use std::collections::HashMap;
use std::fmt;

/// A single element of an input sequence: a read-only mapping from string
/// keys to optional string values.
///
/// Absence is first-class: `get` returning `None` is a normal, matchable
/// condition (see the `[{!key}]` pattern form), not an error.
pub trait Token {
    /// Look up the value stored under `key`, if any.
    ///
    /// Complex patterns may call this many times per key on a token; any
    /// caching is the implementer's responsibility.
    fn get(&self, key: &str) -> Option<&str>;
}

/// A token backed by a plain `HashMap`.
///
/// Useful to run a pattern over a list of maps, where each map holds the
/// annotations of one token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapToken {
    values: HashMap<String, String>,
}

impl MapToken {
    pub fn new() -> MapToken {
        MapToken {
            values: HashMap::new(),
        }
    }

    /// Builder-style insertion: returns the token with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> MapToken {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl Token for MapToken {
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl Token for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(String::as_str)
    }
}

impl From<HashMap<String, String>> for MapToken {
    fn from(values: HashMap<String, String>) -> MapToken {
        MapToken { values }
    }
}

impl fmt::Display for MapToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.values)
    }
}
