//! Document filters applied by import and export.

use folio_core::DocumentKey;
use std::collections::BTreeSet;

/// Decides whether a document-translation takes part in an import or export.
pub trait DocumentFilter: Send + Sync {
    fn accepts(&self, key: &DocumentKey) -> bool;
}

impl<F> DocumentFilter for F
where
    F: Fn(&DocumentKey) -> bool + Send + Sync,
{
    fn accepts(&self, key: &DocumentKey) -> bool {
        self(key)
    }
}

/// Keeps or drops whole spaces.
#[derive(Debug, Clone)]
pub struct SpaceFilter {
    spaces: BTreeSet<String>,
    include: bool,
}

impl SpaceFilter {
    /// Accept only documents in `spaces`.
    pub fn include<I, S>(spaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            spaces: spaces.into_iter().map(Into::into).collect(),
            include: true,
        }
    }

    /// Accept everything outside `spaces`.
    pub fn exclude<I, S>(spaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            spaces: spaces.into_iter().map(Into::into).collect(),
            include: false,
        }
    }
}

impl DocumentFilter for SpaceFilter {
    fn accepts(&self, key: &DocumentKey) -> bool {
        self.spaces.contains(&key.space) == self.include
    }
}

pub(crate) fn accepted(filters: &[Box<dyn DocumentFilter>], key: &DocumentKey) -> bool {
    filters.iter().all(|f| f.accepts(key))
}
