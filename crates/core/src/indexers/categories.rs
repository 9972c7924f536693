//! Canonical category taxonomy and per-indexer category mapping.
//!
//! All indexers report releases in their own native category scheme. Each
//! indexer declares a `CategoryMapping` describing which part of the
//! canonical (newznab-numbered) taxonomy it covers and how its native
//! codes translate into it. The search core only ever filters on
//! canonical ids.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Canonical category ids, newznab numbering. Thousands are top-level
/// groups, the remainder selects a subcategory within the group.
pub mod canonical {
    pub const CONSOLE: u32 = 1000;
    pub const MOVIES: u32 = 2000;
    pub const MOVIES_SD: u32 = 2030;
    pub const MOVIES_HD: u32 = 2040;
    pub const MOVIES_UHD: u32 = 2045;
    pub const AUDIO: u32 = 3000;
    pub const AUDIO_MP3: u32 = 3010;
    pub const AUDIO_LOSSLESS: u32 = 3040;
    pub const PC: u32 = 4000;
    pub const TV: u32 = 5000;
    pub const TV_SD: u32 = 5030;
    pub const TV_HD: u32 = 5040;
    pub const TV_UHD: u32 = 5045;
    pub const BOOKS: u32 = 7000;
    pub const BOOKS_EBOOK: u32 = 7020;
    pub const OTHER: u32 = 8000;
}

/// One node of the canonical category tree an indexer declares support for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerCategory {
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<IndexerCategory>,
}

impl IndexerCategory {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            subcategories: Vec::new(),
        }
    }

    pub fn with_subcategories(mut self, subcategories: Vec<IndexerCategory>) -> Self {
        self.subcategories = subcategories;
        self
    }
}

/// Category capabilities of a single indexer: the canonical tree it
/// covers plus the translation table from its native category codes.
#[derive(Debug, Clone, Default)]
pub struct CategoryMapping {
    categories: Vec<IndexerCategory>,
    native: HashMap<String, u32>,
}

impl CategoryMapping {
    pub fn new(categories: Vec<IndexerCategory>) -> Self {
        Self {
            categories,
            native: HashMap::new(),
        }
    }

    /// Register a native category code (or description) as mapping to a
    /// canonical id. Builder-style, used when declaring capabilities.
    pub fn map_native(mut self, native: impl Into<String>, canonical_id: u32) -> Self {
        self.native.insert(native.into(), canonical_id);
        self
    }

    pub fn categories(&self) -> &[IndexerCategory] {
        &self.categories
    }

    /// Expand the canonical ids requested by a search to every canonical
    /// id this indexer can return for them: each requested id itself,
    /// the subcategories the indexer declares under it, and any
    /// native-mapped id that falls within a requested top-level group.
    pub fn expand_query_categories(&self, requested: &[u32]) -> HashSet<u32> {
        let mut expanded: HashSet<u32> = requested.iter().copied().collect();

        for category in &self.categories {
            if requested.contains(&category.id) {
                for sub in &category.subcategories {
                    expanded.insert(sub.id);
                }
            }
        }

        for &id in self.native.values() {
            if expanded.contains(&parent_of(id)) {
                expanded.insert(id);
            }
        }

        expanded
    }

    /// Translate a native category code to canonical ids. A mapped
    /// subcategory also yields its top-level group. Unknown codes map to
    /// nothing, leaving the release uncategorized.
    pub fn map_native_category(&self, native: &str) -> Vec<u32> {
        match self.native.get(native) {
            Some(&id) => {
                let parent = parent_of(id);
                if parent != id {
                    vec![parent, id]
                } else {
                    vec![id]
                }
            }
            None => Vec::new(),
        }
    }
}

/// Top-level group of a canonical id (2040 -> 2000).
fn parent_of(id: u32) -> u32 {
    id / 1000 * 1000
}
