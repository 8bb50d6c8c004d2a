//! Lexical tokenization and hashed sparse term vectors.
//!
//! Tokens keep their case so acronyms and project names ("PDXbot" vs
//! "pdxbot") stay distinct. Each distinct token is hashed into one of
//! [`NUM_BUCKETS`] buckets and weighted `1 + ln(tf)`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const NUM_BUCKETS: u32 = 1000;

static STOPWORDS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
   [
      "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
      "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
      "by", "can", "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from",
      "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself", "him",
      "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just", "me",
      "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "only",
      "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she", "should",
      "so", "some", "such", "than", "that", "the", "their", "theirs", "them", "themselves", "then",
      "there", "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
      "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why",
      "will", "with", "you", "your", "yours", "yourself", "yourselves",
   ]
   .into_iter()
   .collect()
});

/// Sparse term-weight vector with sorted, unique indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
   pub indices: Vec<u32>,
   pub values:  Vec<f32>,
}

impl SparseVector {
   pub fn len(&self) -> usize {
      self.indices.len()
   }

   pub fn is_empty(&self) -> bool {
      self.indices.is_empty()
   }

   /// Merges duplicate indices by summing and sorts by index.
   pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, f32)>) -> Self {
      let mut buckets: BTreeMap<u32, f32> = BTreeMap::new();
      for (idx, val) in pairs {
         *buckets.entry(idx).or_insert(0.0) += val;
      }
      let (indices, values) = buckets.into_iter().unzip();
      Self { indices, values }
   }
}

pub fn is_stopword(token: &str) -> bool {
   STOPWORDS.contains(token.to_lowercase().as_str())
}

/// Splits on whitespace and drops stopwords, preserving case and order.
pub fn tokenize(text: &str) -> Vec<&str> {
   text.split_whitespace().filter(|t| !is_stopword(t)).collect()
}

/// Maps a token to its bucket using the first four bytes of its SHA-256.
pub fn bucket_index(token: &str) -> u32 {
   let digest = Sha256::digest(token.as_bytes());
   let prefix = [digest[0], digest[1], digest[2], digest[3]];
   u32::from_be_bytes(prefix) % NUM_BUCKETS
}

pub fn sparse_vector(text: &str) -> SparseVector {
   let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
   for token in tokenize(text) {
      *counts.entry(token).or_insert(0) += 1;
   }

   SparseVector::from_pairs(
      counts
         .into_iter()
         .map(|(token, tf)| (bucket_index(token), 1.0 + (tf as f32).ln())),
   )
}

/// Smoothed inverse document frequency: `ln((N + 1) / (df + 1)) + 1`.
pub fn compute_idf<S: AsRef<str>>(corpus: &[Vec<S>]) -> HashMap<String, f32> {
   let n = corpus.len() as f32;
   let mut doc_freq: HashMap<&str, u32> = HashMap::new();

   for doc in corpus {
      let distinct: BTreeSet<&str> = doc.iter().map(|t| t.as_ref()).collect();
      for token in distinct {
         *doc_freq.entry(token).or_insert(0) += 1;
      }
   }

   doc_freq
      .into_iter()
      .map(|(token, df)| (token.to_string(), ((n + 1.0) / (df as f32 + 1.0)).ln() + 1.0))
      .collect()
}
