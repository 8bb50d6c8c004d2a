//! Metadata constraints over archive documents.
//!
//! Constraints are a conjunction. The same constraint set renders to the
//! index's native filter expression, minus the title which the index cannot
//! substring-match and is therefore reapplied client-side.

use serde_json::{Map, Value, json};

use crate::types::{ArchiveMetadata, Query};

/// Minimum per-engine fetch when a client-side title filter will discard hits.
pub const TITLE_OVERFETCH_FLOOR: usize = 50;
pub const TITLE_OVERFETCH_FACTOR: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
   pub author:   Option<String>,
   pub year:     Option<i32>,
   pub month:    Option<i32>,
   pub day:      Option<i32>,
   pub keywords: Vec<String>,
   pub title:    Option<String>,
}

impl MetadataFilter {
   pub fn from_query(query: &Query) -> Self {
      Self {
         author:   query.author.clone().filter(|a| !a.trim().is_empty()),
         year:     query.year,
         month:    query.month,
         day:      query.day,
         keywords: query
            .keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .cloned()
            .collect(),
         title:    query.title.clone().filter(|t| !t.trim().is_empty()),
      }
   }

   pub fn is_empty(&self) -> bool {
      self.author.is_none()
         && self.year.is_none()
         && self.month.is_none()
         && self.day.is_none()
         && self.keywords.is_empty()
         && self.title.is_none()
   }

   pub const fn has_title(&self) -> bool {
      self.title.is_some()
   }

   /// True when every active constraint holds. Missing fields fail.
   pub fn matches(&self, metadata: &ArchiveMetadata) -> bool {
      if let Some(author) = &self.author
         && metadata.author.as_ref() != Some(author)
      {
         return false;
      }

      if !date_part_matches(self.year, metadata.year)
         || !date_part_matches(self.month, metadata.month)
         || !date_part_matches(self.day, metadata.day)
      {
         return false;
      }

      if !self
         .keywords
         .iter()
         .all(|k| metadata.keywords.iter().any(|have| have == k))
      {
         return false;
      }

      if let Some(title) = &self.title {
         let Some(doc_title) = &metadata.title else {
            return false;
         };
         if !doc_title.to_lowercase().contains(&title.to_lowercase()) {
            return false;
         }
      }

      true
   }

   /// Index-native filter expression, or `None` when nothing is enforceable
   /// server-side.
   pub fn to_index_filter(&self) -> Option<Value> {
      let mut clauses = Map::new();

      if let Some(author) = &self.author {
         clauses.insert("author".into(), json!({ "$eq": author }));
      }
      for (field, value) in [("year", self.year), ("month", self.month), ("day", self.day)] {
         if let Some(value) = value {
            clauses.insert(field.into(), json!({ "$eq": value }));
         }
      }

      match self.keywords.as_slice() {
         [] => {},
         [single] => {
            clauses.insert("keywords".into(), json!({ "$in": [single] }));
         },
         many => {
            let all: Vec<Value> = many
               .iter()
               .map(|k| json!({ "keywords": { "$in": [k] } }))
               .collect();
            clauses.insert("$and".into(), Value::Array(all));
         },
      }

      (!clauses.is_empty()).then_some(Value::Object(clauses))
   }

   /// Per-engine fetch size: widened when the title is filtered client-side.
   pub fn fetch_count(&self, top_k: usize) -> usize {
      if self.has_title() {
         top_k.saturating_mul(TITLE_OVERFETCH_FACTOR).max(TITLE_OVERFETCH_FLOOR)
      } else {
         top_k
      }
   }
}

fn date_part_matches(wanted: Option<i32>, have: Option<i32>) -> bool {
   wanted.is_none_or(|w| have == Some(w))
}
