//! Weighted-sum fusion of dense and sparse result lists.
//!
//! Scores are not renormalized: the combined score is
//! `dense_score * dense_weight + sparse_score * sparse_weight`, so the weights
//! directly set each engine's influence. Defaults are 0.7 dense and 0.3 sparse.

use std::collections::HashMap;

use crate::{
   error::{Error, Result},
   types::{MatchSource, ScoredMatch},
};

/// Per-engine multipliers applied before summation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
   pub dense:  f32,
   pub sparse: f32,
}

impl Default for FusionWeights {
   fn default() -> Self {
      Self { dense: crate::config::DENSE_WEIGHT, sparse: crate::config::SPARSE_WEIGHT }
   }
}

impl FusionWeights {
   /// Scales the weights to sum to 1.
   pub fn normalized(self) -> Result<Self> {
      let total = self.dense + self.sparse;
      if self.dense < 0.0 || self.sparse < 0.0 || !total.is_finite() || total <= 0.0 {
         return Err(Error::validation(format!(
            "Invalid fusion weights: dense={}, sparse={} (must be non-negative with a positive sum)",
            self.dense, self.sparse
         )));
      }
      Ok(Self { dense: self.dense / total, sparse: self.sparse / total })
   }
}

/// One identifier after fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
   pub score:  f32,
   pub source: MatchSource,
   /// Payload of the first engine hit seen for this identifier.
   pub hit:    ScoredMatch,
}

impl FusedResult {
   pub fn id(&self) -> &str {
      &self.hit.id
   }
}

/// Merges both lists by identifier, sums weighted scores, then sorts,
/// thresholds, and truncates.
///
/// Ties keep first-insertion order (dense entries before sparse-only ones).
pub fn fuse(
   dense: Vec<ScoredMatch>,
   sparse: Vec<ScoredMatch>,
   weights: FusionWeights,
   min_score: f32,
   top_k: usize,
) -> Vec<FusedResult> {
   let mut order: Vec<FusedResult> = Vec::with_capacity(dense.len() + sparse.len());
   let mut slots: HashMap<String, usize> = HashMap::with_capacity(order.capacity());

   for hit in dense {
      let weighted = hit.score * weights.dense;
      if let Some(&slot) = slots.get(&hit.id) {
         // Repeated id within one engine: keep a single entry, best score.
         let entry = &mut order[slot];
         entry.score = entry.score.max(weighted);
         continue;
      }
      slots.insert(hit.id.clone(), order.len());
      order.push(FusedResult { score: weighted, source: MatchSource::Dense, hit });
   }

   let mut seen_sparse: HashMap<String, f32> = HashMap::new();
   for hit in sparse {
      let weighted = hit.score * weights.sparse;
      match slots.get(&hit.id) {
         Some(&slot) => {
            let entry = &mut order[slot];
            let previous = seen_sparse.entry(hit.id.clone()).or_insert(0.0);
            if weighted > *previous {
               entry.score += weighted - *previous;
               *previous = weighted;
            }
            if entry.source == MatchSource::Dense {
               entry.source = MatchSource::Hybrid;
            }
         },
         None => {
            seen_sparse.insert(hit.id.clone(), weighted);
            slots.insert(hit.id.clone(), order.len());
            order.push(FusedResult { score: weighted, source: MatchSource::Sparse, hit });
         },
      }
   }

   rank(order, min_score, top_k)
}

/// Single-engine path: same threshold and truncation as [`fuse`], scores
/// taken as-is.
pub fn rank_single(
   hits: Vec<ScoredMatch>,
   source: MatchSource,
   min_score: f32,
   top_k: usize,
) -> Vec<FusedResult> {
   let mut slots: HashMap<String, usize> = HashMap::with_capacity(hits.len());
   let mut order: Vec<FusedResult> = Vec::with_capacity(hits.len());

   for hit in hits {
      if let Some(&slot) = slots.get(&hit.id) {
         let entry = &mut order[slot];
         entry.score = entry.score.max(hit.score);
         continue;
      }
      slots.insert(hit.id.clone(), order.len());
      order.push(FusedResult { score: hit.score, source, hit });
   }

   rank(order, min_score, top_k)
}

fn rank(mut results: Vec<FusedResult>, min_score: f32, top_k: usize) -> Vec<FusedResult> {
   // `sort_by` is stable, so equal scores keep insertion order.
   results.sort_by(|a, b| b.score.total_cmp(&a.score));
   results.retain(|r| r.score >= min_score);
   results.truncate(top_k);
   results
}
