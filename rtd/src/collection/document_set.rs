use crate::collection::{Document, DocumentId};
use crate::errors::{ErrorKind, RtdError, RtdResult};
use im::{HashMap, OrdMap};
use serde::{Serialize, Serializer};

/// The contents of one collection: documents keyed by id, iterated in
/// insertion order.
///
/// Store providers receive a `DocumentSet` as the committed state to persist.
///
/// Both indexes are persistent `im` structures, so a clone is O(1). Readers
/// take a clone as their snapshot and writers stage changes on a clone before
/// publishing it, which keeps every reader on a complete, committed state.
#[derive(Clone, Default)]
pub struct DocumentSet {
    order: OrdMap<u64, DocumentId>,
    entries: HashMap<DocumentId, (u64, Document)>,
    next_seq: u64,
}

impl DocumentSet {
    pub(crate) fn new() -> Self {
        DocumentSet::default()
    }

    /// Rebuilds a set from persisted documents, keeping their order.
    pub(crate) fn from_documents(documents: Vec<Document>) -> RtdResult<Self> {
        let mut set = DocumentSet::new();
        for document in documents {
            let id = match document.id()? {
                Some(id) => id,
                None => {
                    log::error!("Stored document has no id: {}", document);
                    return Err(RtdError::new(
                        "Stored document has no id",
                        ErrorKind::InvalidDocument,
                    ));
                }
            };
            if set.contains(id.as_str()) {
                log::error!("Stored documents contain duplicate id {}", id);
                return Err(RtdError::new(
                    &format!("Stored documents contain duplicate id {}", id),
                    ErrorKind::DuplicateId,
                ));
            }
            set.insert(id, document);
        }
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.entries.get(id).map(|(_, document)| document)
    }

    /// Appends a document. The caller guarantees `id` is not present yet.
    pub(crate) fn insert(&mut self, id: DocumentId, document: Document) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, id.clone());
        self.entries.insert(id, (seq, document));
    }

    /// Replaces an existing document in place. Returns `false` if `id` is absent.
    pub(crate) fn replace(&mut self, id: &DocumentId, document: Document) -> bool {
        let seq = match self.entries.get(id.as_str()) {
            Some((seq, _)) => *seq,
            None => return false,
        };
        self.entries.insert(id.clone(), (seq, document));
        true
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<Document> {
        let (seq, document) = self.entries.remove(id)?;
        self.order.remove(&seq);
        Some(document)
    }

    /// Iterates `(id, document)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&DocumentId, &Document)> {
        self.order.values().filter_map(move |id| {
            self.entries
                .get(id.as_str())
                .map(|(_, document)| (id, document))
        })
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.iter().map(|(_, document)| document)
    }

    pub fn to_vec(&self) -> Vec<Document> {
        self.documents().cloned().collect()
    }
}

impl Serialize for DocumentSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.documents())
    }
}
