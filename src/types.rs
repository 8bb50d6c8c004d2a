use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::error::Error;

/// Wildcard query text marking a pure metadata lookup.
pub const WILDCARD: &str = "*";
pub const MAX_QUERY_LEN: usize = 1000;
/// Largest result count the hosted indices accept.
pub const MAX_TOP_K: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
   #[default]
   Dense,
   Sparse,
   Hybrid,
}

impl SearchMode {
   pub const fn as_str(self) -> &'static str {
      match self {
         Self::Dense => "dense",
         Self::Sparse => "sparse",
         Self::Hybrid => "hybrid",
      }
   }
}

impl fmt::Display for SearchMode {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

impl FromStr for SearchMode {
   type Err = Error;

   fn from_str(s: &str) -> Result<Self, Self::Err> {
      match s.trim().to_ascii_lowercase().as_str() {
         "dense" => Ok(Self::Dense),
         "sparse" => Ok(Self::Sparse),
         "hybrid" => Ok(Self::Hybrid),
         other => Err(Error::validation(format!(
            "Invalid search type '{other}': expected one of dense, sparse, hybrid"
         ))),
      }
   }
}

/// Which engine(s) contributed a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
   Dense,
   Sparse,
   Hybrid,
}

impl MatchSource {
   pub const fn as_str(self) -> &'static str {
      match self {
         Self::Dense => "dense",
         Self::Sparse => "sparse",
         Self::Hybrid => "hybrid",
      }
   }
}

impl fmt::Display for MatchSource {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

/// A search request as supplied by the query surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
   pub query:       String,
   pub author:      Option<String>,
   pub year:        Option<i32>,
   pub month:       Option<i32>,
   pub day:         Option<i32>,
   pub keywords:    Vec<String>,
   pub title:       Option<String>,
   pub min_score:   Option<f32>,
   pub top_k:       usize,
   /// Explicit mode name; takes precedence over the boolean flags below.
   pub search_type: Option<String>,
   pub use_sparse:  bool,
   pub use_hybrid:  bool,
   /// Forces `min_score` to 0.0.
   pub no_filter:   bool,
}

impl Default for Query {
   fn default() -> Self {
      Self {
         query:       String::new(),
         author:      None,
         year:        None,
         month:       None,
         day:         None,
         keywords:    Vec::new(),
         title:       None,
         min_score:   None,
         top_k:       crate::config::DEFAULT_TOP_K,
         search_type: None,
         use_sparse:  false,
         use_hybrid:  false,
         no_filter:   false,
      }
   }
}

impl Query {
   pub fn new(text: impl Into<String>) -> Self {
      Self { query: text.into(), ..Self::default() }
   }

   pub fn with_mode(mut self, mode: SearchMode) -> Self {
      self.search_type = Some(mode.as_str().to_string());
      self
   }

   pub const fn with_top_k(mut self, top_k: usize) -> Self {
      self.top_k = top_k;
      self
   }

   pub const fn with_min_score(mut self, min_score: f32) -> Self {
      self.min_score = Some(min_score);
      self
   }

   pub fn is_wildcard(&self) -> bool {
      self.query.trim() == WILDCARD
   }
}

/// Structured attributes of an archived message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveMetadata {
   pub author:   Option<String>,
   pub title:    Option<String>,
   #[serde(deserialize_with = "de_keywords")]
   pub keywords: Vec<String>,
   #[serde(deserialize_with = "de_opt_int")]
   pub year:     Option<i32>,
   #[serde(deserialize_with = "de_opt_int")]
   pub month:    Option<i32>,
   #[serde(deserialize_with = "de_opt_int")]
   pub day:      Option<i32>,
   pub date:     Option<String>,
   pub has_url:  Option<bool>,
}

impl ArchiveMetadata {
   /// Renders the message date as `YYYY-MM-DD`, preferring the free-text date.
   pub fn display_date(&self) -> String {
      if let Some(date) = self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
         if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
            return parsed.format("%Y-%m-%d").to_string();
         }
         if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            return parsed.format("%Y-%m-%d").to_string();
         }
         return date.to_string();
      }

      match (self.year, self.month, self.day) {
         (Some(y), Some(m), Some(d)) => format!("{y:04}-{m:02}-{d:02}"),
         (Some(y), Some(m), None) => format!("{y:04}-{m:02}"),
         (Some(y), None, _) => format!("{y:04}"),
         _ => "Unknown".to_string(),
      }
   }
}

/// A single engine hit, normalized by the engine adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
   pub id:           String,
   pub score:        f32,
   pub metadata:     ArchiveMetadata,
   /// Stored preview, if the index keeps one.
   pub text_excerpt: Option<String>,
   /// Full message body, if the index keeps one.
   pub text:         Option<String>,
}

impl ScoredMatch {
   pub fn new(id: impl Into<String>, score: f32) -> Self {
      Self {
         id: id.into(),
         score,
         metadata: ArchiveMetadata::default(),
         text_excerpt: None,
         text: None,
      }
   }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveDocument {
   pub id:           String,
   pub text_excerpt: String,
   pub metadata:     ArchiveMetadata,
   pub score:        f32,
   pub source:       MatchSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
   pub results:      Vec<ArchiveDocument>,
   pub total:        usize,
   pub query:        String,
   pub search_type:  SearchMode,
   /// Wall-clock seconds.
   pub elapsed_time: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{error}")]
pub struct SearchError {
   pub error: String,
}

impl SearchError {
   pub fn new(error: impl Into<String>) -> Self {
      Self { error: error.into() }
   }
}

impl From<Error> for SearchError {
   fn from(err: Error) -> Self {
      if err.is_validation() {
         Self::new(err.to_string())
      } else {
         Self::new(format!("Search failed: {err}"))
      }
   }
}

/// Index metadata stores integers as floats and sometimes as strings.
fn de_opt_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
   D: Deserializer<'de>,
{
   #[derive(Deserialize)]
   #[serde(untagged)]
   enum Raw {
      Int(i64),
      Float(f64),
      Text(String),
   }

   Ok(match Option::<Raw>::deserialize(deserializer)? {
      Some(Raw::Int(v)) => i32::try_from(v).ok(),
      Some(Raw::Float(v)) if v.fract() == 0.0 => Some(v as i32),
      Some(Raw::Text(s)) => s.trim().parse().ok(),
      _ => None,
   })
}

fn de_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
   D: Deserializer<'de>,
{
   #[derive(Deserialize)]
   #[serde(untagged)]
   enum Raw {
      List(Vec<String>),
      Joined(String),
   }

   Ok(match Option::<Raw>::deserialize(deserializer)? {
      Some(Raw::List(list)) => list,
      Some(Raw::Joined(joined)) => joined
         .split(',')
         .map(str::trim)
         .filter(|k| !k.is_empty())
         .map(String::from)
         .collect(),
      None => Vec::new(),
   })
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn search_mode_parses_case_insensitively() {
      assert_eq!("Hybrid".parse::<SearchMode>().unwrap(), SearchMode::Hybrid);
      assert_eq!(" sparse ".parse::<SearchMode>().unwrap(), SearchMode::Sparse);
      let err = "fuzzy".parse::<SearchMode>().unwrap_err();
      assert!(err.is_validation());
      assert!(err.to_string().contains("fuzzy"));
   }

   #[test]
   fn metadata_tolerates_index_number_encodings() {
      let metadata: ArchiveMetadata = serde_json::from_value(serde_json::json!({
         "author": "dpa",
         "year": 2005.0,
         "month": "3",
         "day": 14,
         "keywords": "robot, PID ,  ",
         "unrelated": true,
      }))
      .unwrap();

      assert_eq!(metadata.author.as_deref(), Some("dpa"));
      assert_eq!(metadata.year, Some(2005));
      assert_eq!(metadata.month, Some(3));
      assert_eq!(metadata.day, Some(14));
      assert_eq!(metadata.keywords, vec!["robot", "PID"]);
      assert_eq!(metadata.title, None);
   }

   #[test]
   fn display_date_prefers_free_text_date() {
      let mut metadata = ArchiveMetadata {
         year: Some(2001),
         month: Some(2),
         day: Some(3),
         ..ArchiveMetadata::default()
      };
      assert_eq!(metadata.display_date(), "2001-02-03");

      metadata.date = Some("2004-07-09T12:30:00Z".to_string());
      assert_eq!(metadata.display_date(), "2004-07-09");

      assert_eq!(ArchiveMetadata::default().display_date(), "Unknown");
   }

   #[test]
   fn internal_errors_are_prefixed_validation_errors_are_not() {
      let validation: SearchError = Error::validation("Query cannot be empty").into();
      assert_eq!(validation.error, "Query cannot be empty");

      let engine: SearchError = Error::Engine { engine: "dense", reason: "boom".into() }.into();
      assert_eq!(engine.error, "Search failed: dense search failed: boom");
   }
}
