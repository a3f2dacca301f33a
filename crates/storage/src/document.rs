//! Documents, fields and terms
//!
//! A [`Document`] is a bag of fields. Indexed fields contribute exact-match
//! terms to the segment's postings; stored fields are kept verbatim and come
//! back in the [`StoredDocument`] returned by a reader. Keyword fields are
//! both.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Term
// ============================================================================

/// Exact-match term: a field name and a token
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term {
    field: String,
    text: String,
}

impl Term {
    /// Create a term
    pub fn new(field: impl Into<String>, text: impl Into<String>) -> Self {
        Term {
            field: field.into(),
            text: text.into(),
        }
    }

    /// Field name
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Token
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Key under which the term is stored in segment postings
    pub(crate) fn key(&self) -> String {
        term_key(&self.field, &self.text)
    }

    /// Term stored under a postings key
    pub(crate) fn from_key(key: &str) -> Option<Self> {
        key.split_once('\0').map(|(field, text)| Term::new(field, text))
    }
}

pub(crate) fn term_key(field: &str, text: &str) -> String {
    let mut key = String::with_capacity(field.len() + text.len() + 1);
    key.push_str(field);
    key.push('\0');
    key.push_str(text);
    key
}

// ============================================================================
// Fields
// ============================================================================

/// Value kept in a stored field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    /// Single string
    Text(String),
    /// List of strings
    Texts(Vec<String>),
    /// List of numbers
    Doubles(Vec<f64>),
}

/// How a field is treated by the index
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Searchable tokens, not stored
    Indexed(Vec<String>),
    /// Stored value, not searchable
    Stored(StoredValue),
    /// Single token, searchable and stored as text
    Keyword(String),
}

/// Named field of a document
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    kind: FieldKind,
}

impl Field {
    /// Searchable tokens
    pub fn indexed(name: impl Into<String>, tokens: Vec<String>) -> Self {
        Field {
            name: name.into(),
            kind: FieldKind::Indexed(tokens),
        }
    }

    /// Stored, non-searchable value
    pub fn stored(name: impl Into<String>, value: StoredValue) -> Self {
        Field {
            name: name.into(),
            kind: FieldKind::Stored(value),
        }
    }

    /// Searchable and stored single token
    pub fn keyword(name: impl Into<String>, text: impl Into<String>) -> Self {
        Field {
            name: name.into(),
            kind: FieldKind::Keyword(text.into()),
        }
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field kind
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }
}

// ============================================================================
// Document
// ============================================================================

/// Document to be added to an index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<Field>,
}

impl Document {
    /// Empty document
    pub fn new() -> Self {
        Document::default()
    }

    /// Append a field
    pub fn add(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Append several fields
    pub fn extend(&mut self, fields: impl IntoIterator<Item = Field>) {
        self.fields.extend(fields);
    }

    /// Fields in insertion order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Check if the document has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Split into the terms to index and the stored part
    pub(crate) fn into_parts(self) -> (Vec<Term>, StoredDocument) {
        let mut terms = Vec::new();
        let mut stored = StoredDocument::default();
        for field in self.fields {
            match field.kind {
                FieldKind::Indexed(tokens) => {
                    terms.extend(tokens.into_iter().map(|t| Term::new(field.name.clone(), t)));
                }
                FieldKind::Stored(value) => {
                    stored.fields.insert(field.name, value);
                }
                FieldKind::Keyword(text) => {
                    terms.push(Term::new(field.name.clone(), text.clone()));
                    stored.fields.insert(field.name, StoredValue::Text(text));
                }
            }
        }
        terms.sort();
        terms.dedup();
        (terms, stored)
    }
}

/// Stored fields of a document as read back from an index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    fields: BTreeMap<String, StoredValue>,
}

impl StoredDocument {
    /// Stored value of a field
    pub fn get(&self, name: &str) -> Option<&StoredValue> {
        self.fields.get(name)
    }

    /// Stored text of a field
    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            StoredValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Stored string list of a field
    pub fn get_texts(&self, name: &str) -> Option<&[String]> {
        match self.fields.get(name)? {
            StoredValue::Texts(v) => Some(v),
            _ => None,
        }
    }

    /// Stored number list of a field
    pub fn get_doubles(&self, name: &str) -> Option<&[f64]> {
        match self.fields.get(name)? {
            StoredValue::Doubles(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_parts_splits_terms_and_stored() {
        let mut doc = Document::new();
        doc.add(Field::indexed("geo", vec!["ab".into(), "a".into(), "ab".into()]));
        doc.add(Field::stored("geo__bbox", StoredValue::Doubles(vec![0.0, 1.0, 2.0, 3.0])));
        doc.add(Field::keyword("ID_VERSION", "u1_1"));

        let (terms, stored) = doc.into_parts();
        assert_eq!(
            terms,
            vec![
                Term::new("ID_VERSION", "u1_1"),
                Term::new("geo", "a"),
                Term::new("geo", "ab"),
            ]
        );
        assert_eq!(stored.get_text("ID_VERSION"), Some("u1_1"));
        assert_eq!(stored.get_doubles("geo__bbox"), Some(&[0.0, 1.0, 2.0, 3.0][..]));
        assert!(stored.get("geo").is_none());
    }

    #[test]
    fn test_term_key_separates_field_and_text() {
        assert_ne!(Term::new("ab", "c").key(), Term::new("a", "bc").key());
        let term = Term::new("geo", "s0+");
        assert_eq!(Term::from_key(&term.key()), Some(term));
        assert_eq!(Term::from_key("no separator"), None);
    }

    #[test]
    fn test_typed_getters_reject_other_kinds() {
        let mut doc = Document::new();
        doc.add(Field::stored("names", StoredValue::Texts(vec!["x".into()])));
        let (_, stored) = doc.into_parts();
        assert!(stored.get_text("names").is_none());
        assert_eq!(stored.get_texts("names"), Some(&["x".to_string()][..]));
    }
}
