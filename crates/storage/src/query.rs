//! Queries over committed segments
//!
//! Queries are unranked: they select documents and return them in native
//! (segment, ordinal) order.

use crate::document::{term_key, StoredDocument, Term};
use crate::error::Result;
use crate::segment::Segment;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Predicate evaluated against a document's stored fields
///
/// Used to verify candidates selected through postings.
pub trait DocFilter: fmt::Debug + Send + Sync {
    /// Check if the document matches
    fn matches(&self, doc: &StoredDocument) -> bool;
}

/// Document selection
#[derive(Debug, Clone)]
pub enum Query {
    /// Every live document
    MatchAll,
    /// Documents holding the term
    Term(Term),
    /// Documents holding at least one of the field's tokens
    AnyTerm {
        /// Field name
        field: String,
        /// Tokens, any of which selects a document
        texts: Vec<String>,
    },
    /// Documents selected by `query` and accepted by `filter`
    Filtered {
        /// Candidate selection
        query: Box<Query>,
        /// Verification against stored fields
        filter: Arc<dyn DocFilter>,
    },
}

impl Query {
    /// Wrap a query with a stored-field filter
    pub fn filtered(query: Query, filter: impl DocFilter + 'static) -> Self {
        Query::Filtered {
            query: Box::new(query),
            filter: Arc::new(filter),
        }
    }

    /// Live ordinals of `segment` matching this query, ascending
    pub(crate) fn matching(&self, segment: &Segment, deleted: &BTreeSet<u32>) -> Result<Vec<u32>> {
        let live = |ord: &u32| !deleted.contains(ord);
        match self {
            Query::MatchAll => Ok((0..segment.doc_count()).filter(live).collect()),
            Query::Term(term) => Ok(segment.postings(term).iter().copied().filter(live).collect()),
            Query::AnyTerm { field, texts } => {
                let mut ords = BTreeSet::new();
                for text in texts {
                    ords.extend(segment.postings_by_key(&term_key(field, text)).iter().copied());
                }
                Ok(ords.into_iter().filter(live).collect())
            }
            Query::Filtered { query, filter } => {
                let mut ords = Vec::new();
                for ord in query.matching(segment, deleted)? {
                    if filter.matches(&segment.document(ord)?) {
                        ords.push(ord);
                    }
                }
                Ok(ords)
            }
        }
    }
}
