//! Blacklist of name fragments.
//!
//! A name is blocked when any fragment occurs anywhere inside it. A fragment
//! such as `ads.example.com` therefore blocks that domain and all of its
//! subdomains, and also any unrelated name that happens to contain it.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// An immutable, ordered set of blocked name fragments.
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    fragments: Vec<String>,
}

impl Blocklist {
    /// Create a blocklist from already-loaded fragments, kept as given.
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a blacklist file body: one fragment per line, `#` starts a
    /// comment line, and a fragment ends at its first control character.
    pub fn parse(text: &str) -> Self {
        let fragments = text
            .lines()
            .filter(|line| !line.starts_with('#'))
            .filter_map(|line| {
                let fragment = line.split(char::is_control).next()?.trim();
                (!fragment.is_empty()).then(|| fragment.to_string())
            })
            .collect();

        Self { fragments }
    }

    /// Read and parse a blacklist file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Blocklist {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::parse(&text))
    }

    /// Check if a name contains any blacklisted fragment.
    ///
    /// Matching is case-sensitive and byte-wise.
    pub fn is_blocked(&self, name: &str) -> bool {
        self.fragments
            .iter()
            .any(|fragment| name.contains(fragment.as_str()))
    }

    /// Returns the number of fragments in the blocklist.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
