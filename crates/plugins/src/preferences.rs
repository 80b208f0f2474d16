//! Plugin-scoped preference documents.
//!
//! Every document has three layers: the provider's defaults, the last committed
//! copy, and a pending copy that receives updates until the next commit.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use protocol::{merge_document, Document, PrefId};
use worker::PluginHostError;

#[derive(Debug)]
struct Entry {
    defaults: Document,
    committed: Document,
    pending: Document,
}

/// The set of plugin preference documents, keyed by pref id.
#[derive(Debug, Default)]
pub(crate) struct PreferenceBook {
    entries: Mutex<BTreeMap<PrefId, Entry>>,
}

impl PreferenceBook {
    /// Adds a document initialised to `defaults`, replacing any previous one.
    pub(crate) fn insert(&self, id: PrefId, defaults: Document) {
        self.lock().insert(
            id,
            Entry {
                committed: defaults.clone(),
                pending: defaults.clone(),
                defaults,
            },
        );
    }

    /// Sorted pref ids.
    pub(crate) fn ids(&self) -> Vec<PrefId> {
        self.lock().keys().cloned().collect()
    }

    /// The pending document, uncommitted changes included.
    pub(crate) fn get(&self, id: &PrefId) -> Result<Document, PluginHostError> {
        self.with_entry(id, |entry| entry.pending.clone())
    }

    pub(crate) fn update(&self, id: &PrefId, model: Document) -> Result<(), PluginHostError> {
        self.with_entry(id, |entry| merge_document(&mut entry.pending, model))
    }

    pub(crate) fn reset(&self, id: &PrefId) -> Result<(), PluginHostError> {
        self.with_entry(id, |entry| entry.pending = entry.defaults.clone())
    }

    /// Pending copies that differ from their committed copy. Nothing is
    /// promoted until the owner [accepts](Self::accept) it.
    pub(crate) fn pending_changes(&self) -> Vec<(PrefId, Document)> {
        self.lock()
            .iter()
            .filter(|(_, entry)| entry.pending != entry.committed)
            .map(|(id, entry)| (id.clone(), entry.pending.clone()))
            .collect()
    }

    /// Records `document` as the committed copy.
    pub(crate) fn accept(&self, id: &PrefId, document: Document) -> Result<(), PluginHostError> {
        self.with_entry(id, |entry| entry.committed = document)
    }

    /// Rolls the pending copy back to the committed one, unless it was updated
    /// again after `document` was taken.
    pub(crate) fn reject(&self, id: &PrefId, document: &Document) -> Result<(), PluginHostError> {
        self.with_entry(id, |entry| {
            if entry.pending == *document {
                entry.pending = entry.committed.clone();
            }
        })
    }

    fn with_entry<T>(
        &self,
        id: &PrefId,
        f: impl FnOnce(&mut Entry) -> T,
    ) -> Result<T, PluginHostError> {
        let mut entries = self.lock();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| PluginHostError::UnknownPreferences {
                pref_id: id.clone(),
            })?;
        Ok(f(entry))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PrefId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
