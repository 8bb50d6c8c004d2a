pub mod excerpt;
pub mod fusion;

use std::{
   sync::Arc,
   time::{Duration, Instant},
};

use futures::join;

use self::{
   excerpt::Highlighter,
   fusion::{FusedResult, FusionWeights, fuse, rank_single},
};
use crate::{
   config::{self, Config},
   embed::{OpenAiEmbedder, sparse::is_stopword},
   error::{Error, Result},
   filter::MetadataFilter,
   store::{DenseIndex, SearchParams, SparseIndex, VectorIndex},
   types::{
      ArchiveDocument, MAX_QUERY_LEN, MAX_TOP_K, MatchSource, Query, ScoredMatch, SearchError,
      SearchMode, SearchResponse, WILDCARD,
   },
};

/// Per-engine over-fetch applied in hybrid mode before fusion.
const HYBRID_FETCH_FACTOR: usize = 2;

const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2100;
const MONTH_RANGE: std::ops::RangeInclusive<i32> = 1..=12;
const DAY_RANGE: std::ops::RangeInclusive<i32> = 1..=31;

/// Query orchestrator: validates, dispatches to the engines, fuses,
/// filters, and attaches excerpts.
///
/// Engine failures and timeouts never fail a query; the engine simply
/// contributes no hits.
pub struct SearchEngine {
   dense:             Arc<dyn VectorIndex>,
   sparse:            Arc<dyn VectorIndex>,
   weights:           FusionWeights,
   timeout:           Duration,
   excerpt_length:    usize,
   default_min_score: f32,
}

impl SearchEngine {
   pub fn new(dense: Arc<dyn VectorIndex>, sparse: Arc<dyn VectorIndex>) -> Self {
      let defaults = Config::default();
      Self {
         dense,
         sparse,
         weights: FusionWeights::default(),
         timeout: defaults.engine_timeout(),
         excerpt_length: config::EXCERPT_LENGTH,
         default_min_score: config::MIN_SCORE_THRESHOLD,
      }
   }

   /// Wires the Pinecone indices and the OpenAI embedder from `config`.
   pub fn from_config(config: &Config) -> Result<Self> {
      let embedder = Arc::new(OpenAiEmbedder::new(config)?);
      let dense = Arc::new(DenseIndex::new(config, embedder)?);
      let sparse = Arc::new(SparseIndex::new(config)?);

      Ok(Self::new(dense, sparse)
         .with_weights(FusionWeights { dense: config.dense_weight, sparse: config.sparse_weight })
         .with_timeout(config.engine_timeout())
         .with_excerpt_length(config.excerpt_length)
         .with_default_min_score(config.min_score))
   }

   pub const fn with_weights(mut self, weights: FusionWeights) -> Self {
      self.weights = weights;
      self
   }

   pub const fn with_timeout(mut self, timeout: Duration) -> Self {
      self.timeout = timeout;
      self
   }

   pub const fn with_excerpt_length(mut self, excerpt_length: usize) -> Self {
      self.excerpt_length = excerpt_length;
      self
   }

   pub const fn with_default_min_score(mut self, min_score: f32) -> Self {
      self.default_min_score = min_score;
      self
   }

   /// Runs one query end to end. Every failure comes back as a
   /// [`SearchError`]; validation failures happen before any engine call.
   pub async fn execute(&self, query: &Query) -> Result<SearchResponse, SearchError> {
      let start = Instant::now();
      self.run(query, start).await.map_err(|err| {
         if err.is_validation() {
            tracing::debug!("rejected query: {err}");
         } else {
            tracing::error!("Error during search: {err}");
         }
         SearchError::from(err)
      })
   }

   pub async fn search_dense(&self, query: Query) -> Result<SearchResponse, SearchError> {
      self.execute(&query.with_mode(SearchMode::Dense)).await
   }

   pub async fn search_sparse(&self, query: Query) -> Result<SearchResponse, SearchError> {
      self.execute(&query.with_mode(SearchMode::Sparse)).await
   }

   pub async fn search_hybrid(&self, query: Query) -> Result<SearchResponse, SearchError> {
      self.execute(&query.with_mode(SearchMode::Hybrid)).await
   }

   /// Metadata-only lookup: the query text is replaced by the wildcard and
   /// relevance thresholding is off unless `min_score` is given.
   pub async fn search_by_metadata(
      &self,
      mut query: Query,
   ) -> Result<SearchResponse, SearchError> {
      if !MetadataFilter::from_query(&query).is_empty() {
         query.query = WILDCARD.to_string();
         tracing::info!("Metadata search");
         return self.execute(&query).await;
      }
      Err(SearchError::new("At least one metadata filter must be provided"))
   }

   async fn run(&self, query: &Query, start: Instant) -> Result<SearchResponse> {
      let mode = validate(query)?;
      let weights = match mode {
         SearchMode::Hybrid => self.weights.normalized()?,
         _ => self.weights,
      };

      let filter = MetadataFilter::from_query(query);
      let min_score = self.effective_min_score(query);
      let fetch_k = filter.fetch_count(query.top_k);
      let index_filter = filter.to_index_filter();

      tracing::info!(
         "Search query: '{}', mode: {mode}, top_k: {}, min_score: {min_score}",
         query.query,
         query.top_k
      );
      if !filter.is_empty() {
         tracing::info!("Metadata filters: {filter:?}");
      }

      let params = SearchParams {
         query_text: &query.query,
         top_k:      fetch_k,
         filter:     index_filter.as_ref(),
      };

      let ranked = match mode {
         SearchMode::Dense => {
            let hits = self.fetch(&*self.dense, params).await;
            rank_single(hits, MatchSource::Dense, min_score, fetch_k)
         },
         SearchMode::Sparse => {
            let hits = self.fetch(&*self.sparse, params).await;
            rank_single(hits, MatchSource::Sparse, min_score, fetch_k)
         },
         SearchMode::Hybrid => self.hybrid(params, weights, min_score).await,
      };

      let survivors: Vec<FusedResult> = ranked
         .into_iter()
         .filter(|r| filter.matches(&r.hit.metadata))
         .take(query.top_k)
         .collect();

      let highlighter = Highlighter::new(&highlight_terms(query, &filter))?;
      let results: Vec<ArchiveDocument> = survivors
         .into_iter()
         .map(|r| self.to_document(r, &highlighter))
         .collect();

      let elapsed = start.elapsed().as_secs_f64();
      tracing::info!("Search returned {} results in {elapsed:.2}s", results.len());

      Ok(SearchResponse {
         total: results.len(),
         results,
         query: query.query.clone(),
         search_type: mode,
         elapsed_time: elapsed,
      })
   }

   async fn hybrid(
      &self,
      params: SearchParams<'_>,
      weights: FusionWeights,
      min_score: f32,
   ) -> Vec<FusedResult> {
      let widened =
         SearchParams { top_k: params.top_k.saturating_mul(HYBRID_FETCH_FACTOR), ..params };
      let (dense, sparse) = join!(
         self.fetch(&*self.dense, widened),
         self.fetch(&*self.sparse, widened)
      );

      tracing::debug!("fusing {} dense and {} sparse hits", dense.len(), sparse.len());
      fuse(dense, sparse, weights, min_score, params.top_k)
   }

   /// Queries one engine under the engine timeout. Failures degrade to no hits.
   async fn fetch(&self, engine: &dyn VectorIndex, params: SearchParams<'_>) -> Vec<ScoredMatch> {
      let name = engine.name();
      let outcome = match tokio::time::timeout(self.timeout, engine.search(params)).await {
         Ok(result) => result,
         Err(_) => Err(Error::Timeout {
            engine:   name,
            after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
         }),
      };

      match outcome {
         Ok(hits) => hits,
         Err(err) => {
            tracing::warn!("{err}; continuing without {name} results");
            Vec::new()
         },
      }
   }

   fn effective_min_score(&self, query: &Query) -> f32 {
      if query.no_filter {
         0.0
      } else if let Some(min_score) = query.min_score {
         min_score
      } else if query.is_wildcard() {
         0.0
      } else {
         self.default_min_score
      }
   }

   fn to_document(&self, result: FusedResult, highlighter: &Highlighter) -> ArchiveDocument {
      let FusedResult { score, source, hit } = result;
      let body = hit
         .text
         .as_deref()
         .or(hit.text_excerpt.as_deref())
         .unwrap_or_default();

      ArchiveDocument {
         text_excerpt: highlighter.select(body, self.excerpt_length),
         id: hit.id,
         metadata: hit.metadata,
         score,
         source,
      }
   }
}

/// Checks query shape and resolves the search mode. No I/O.
fn validate(query: &Query) -> Result<SearchMode> {
   let text = query.query.trim();
   if text.is_empty() {
      return Err(Error::validation("Query cannot be empty"));
   }
   if query.query.chars().count() > MAX_QUERY_LEN {
      return Err(Error::validation(format!(
         "Query too long: maximum is {MAX_QUERY_LEN} characters"
      )));
   }

   if !(1..=MAX_TOP_K).contains(&query.top_k) {
      return Err(Error::validation(format!(
         "Invalid top_k {}: expected 1-{MAX_TOP_K}",
         query.top_k
      )));
   }

   for (field, value, range) in [
      ("year", query.year, YEAR_RANGE),
      ("month", query.month, MONTH_RANGE),
      ("day", query.day, DAY_RANGE),
   ] {
      if let Some(value) = value
         && !range.contains(&value)
      {
         return Err(Error::validation(format!(
            "Invalid {field} {value}: expected {}-{}",
            range.start(),
            range.end()
         )));
      }
   }

   if let Some(min_score) = query.min_score
      && !min_score.is_finite()
   {
      return Err(Error::validation("min_score must be a finite number"));
   }

   resolve_mode(query)
}

/// An explicit mode name wins; otherwise the flags, hybrid over sparse over dense.
fn resolve_mode(query: &Query) -> Result<SearchMode> {
   if let Some(name) = query.search_type.as_deref().filter(|n| !n.trim().is_empty()) {
      return name.parse();
   }

   Ok(if query.use_hybrid {
      SearchMode::Hybrid
   } else if query.use_sparse {
      SearchMode::Sparse
   } else {
      SearchMode::Dense
   })
}

/// Query words (minus stopwords and punctuation) plus keyword constraints.
fn highlight_terms(query: &Query, filter: &MetadataFilter) -> Vec<String> {
   query
      .query
      .split_whitespace()
      .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
      .filter(|t| !t.is_empty() && !is_stopword(t))
      .map(String::from)
      .chain(filter.keywords.iter().cloned())
      .collect()
}

#[cfg(test)]
mod tests {
   use std::sync::{
      Mutex,
      atomic::{AtomicUsize, Ordering},
   };

   use serde_json::Value;

   use super::*;
   use crate::types::ArchiveMetadata;

   #[derive(Default)]
   struct FakeIndex {
      name:       &'static str,
      hits:       Vec<ScoredMatch>,
      fail:       bool,
      delay:      Option<Duration>,
      calls:      AtomicUsize,
      last_top_k: AtomicUsize,
      last_query: Mutex<Option<(String, Option<Value>)>>,
   }

   impl FakeIndex {
      fn dense(hits: Vec<ScoredMatch>) -> Arc<Self> {
         Arc::new(Self { name: "dense", hits, ..Self::default() })
      }

      fn sparse(hits: Vec<ScoredMatch>) -> Arc<Self> {
         Arc::new(Self { name: "sparse", hits, ..Self::default() })
      }

      fn calls(&self) -> usize {
         self.calls.load(Ordering::SeqCst)
      }

      fn last_filter(&self) -> Option<Value> {
         self.last_query.lock().unwrap().as_ref().and_then(|(_, f)| f.clone())
      }
   }

   #[async_trait::async_trait]
   impl VectorIndex for FakeIndex {
      fn name(&self) -> &'static str {
         self.name
      }

      async fn search(&self, params: SearchParams<'_>) -> Result<Vec<ScoredMatch>> {
         self.calls.fetch_add(1, Ordering::SeqCst);
         self.last_top_k.store(params.top_k, Ordering::SeqCst);
         *self.last_query.lock().unwrap() =
            Some((params.query_text.to_string(), params.filter.cloned()));

         if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
         }
         if self.fail {
            return Err(Error::Engine { engine: self.name, reason: "503 unavailable".into() });
         }
         Ok(self.hits.clone())
      }
   }

   fn doc(id: &str, score: f32, body: &str) -> ScoredMatch {
      ScoredMatch {
         text: Some(body.to_string()),
         metadata: ArchiveMetadata {
            author: Some("dpa".to_string()),
            title: Some(format!("[DPRG] {id}")),
            ..ArchiveMetadata::default()
         },
         ..ScoredMatch::new(id, score)
      }
   }

   fn engine(dense: &Arc<FakeIndex>, sparse: &Arc<FakeIndex>) -> SearchEngine {
      SearchEngine::new(dense.clone(), sparse.clone())
   }

   fn ids(response: &SearchResponse) -> Vec<&str> {
      response.results.iter().map(|d| d.id.as_str()).collect()
   }

   #[tokio::test]
   async fn dense_query_returns_documents_with_excerpts() {
      let dense = FakeIndex::dense(vec![
         doc("msg-1", 0.82, "PDXbot is a differential drive robot built by the club."),
         doc("msg-2", 0.41, "A long thread that eventually mentions PDXbot odometry."),
      ]);
      let sparse = FakeIndex::sparse(vec![]);

      let query = Query::new("PDXbot").with_mode(SearchMode::Dense).with_min_score(0.0);
      let response = engine(&dense, &sparse).execute(&query).await.unwrap();

      assert_eq!(response.search_type, SearchMode::Dense);
      assert_eq!(response.total, 2);
      assert_eq!(ids(&response), vec!["msg-1", "msg-2"]);
      for document in &response.results {
         assert!(document.text_excerpt.contains("PDXbot"));
         assert!(document.metadata.author.is_some());
         assert!(document.score > 0.0);
         assert_eq!(document.source, MatchSource::Dense);
      }
      assert_eq!(sparse.calls(), 0);
   }

   #[tokio::test]
   async fn hybrid_query_fuses_weighted_scores() {
      let dense = FakeIndex::dense(vec![doc("A", 0.9, "a"), doc("B", 0.6, "b")]);
      let sparse = FakeIndex::sparse(vec![doc("B", 0.8, "b"), doc("C", 0.5, "c")]);

      let query = Query::new("encoders").with_mode(SearchMode::Hybrid).with_min_score(0.5);
      let response = engine(&dense, &sparse).execute(&query).await.unwrap();

      assert_eq!(ids(&response), vec!["B", "A"]);
      assert!((response.results[0].score - 0.66).abs() < 1e-5);
      assert!((response.results[1].score - 0.63).abs() < 1e-5);
      assert_eq!(response.results[0].source, MatchSource::Hybrid);
      assert_eq!(dense.calls(), 1);
      assert_eq!(sparse.calls(), 1);
      assert_eq!(dense.last_top_k.load(Ordering::SeqCst), 20);
      assert_eq!(sparse.last_top_k.load(Ordering::SeqCst), 20);
   }

   #[tokio::test]
   async fn empty_query_fails_before_any_engine_call() {
      let dense = FakeIndex::dense(vec![doc("A", 0.9, "a")]);
      let sparse = FakeIndex::sparse(vec![doc("A", 0.9, "a")]);
      let engine = engine(&dense, &sparse);

      for text in ["", "   "] {
         let err = engine.execute(&Query::new(text)).await.unwrap_err();
         assert_eq!(err.error, "Query cannot be empty");
      }
      assert_eq!(dense.calls(), 0);
      assert_eq!(sparse.calls(), 0);
   }

   #[tokio::test]
   async fn zero_results_is_a_success() {
      let dense = FakeIndex::dense(vec![]);
      let sparse = FakeIndex::sparse(vec![]);

      let response = engine(&dense, &sparse)
         .execute(&Query::new("nothing matches this").with_mode(SearchMode::Hybrid))
         .await
         .unwrap();

      assert!(response.results.is_empty());
      assert_eq!(response.total, 0);
      assert_eq!(response.query, "nothing matches this");
   }

   #[tokio::test]
   async fn invalid_input_is_rejected_without_network_calls() {
      let dense = FakeIndex::dense(vec![]);
      let sparse = FakeIndex::sparse(vec![]);
      let engine = engine(&dense, &sparse);

      let bad_mode = Query { search_type: Some("fuzzy".into()), ..Query::new("robots") };
      let err = engine.execute(&bad_mode).await.unwrap_err();
      assert!(err.error.contains("Invalid search type"), "{err}");

      let bad_month = Query { month: Some(13), ..Query::new("robots") };
      assert!(engine.execute(&bad_month).await.unwrap_err().error.contains("month"));

      let bad_year = Query { year: Some(1850), ..Query::new("robots") };
      assert!(engine.execute(&bad_year).await.unwrap_err().error.contains("year"));

      let bad_day = Query { day: Some(0), ..Query::new("robots") };
      assert!(engine.execute(&bad_day).await.is_err());

      let too_long = Query::new("x".repeat(MAX_QUERY_LEN + 1));
      assert!(engine.execute(&too_long).await.unwrap_err().error.contains("too long"));

      let nan = Query::new("robots").with_min_score(f32::NAN);
      assert!(engine.execute(&nan).await.is_err());

      assert_eq!(dense.calls() + sparse.calls(), 0);
   }

   #[tokio::test]
   async fn out_of_range_top_k_is_rejected_without_network_calls() {
      let dense = FakeIndex::dense(vec![doc("A", 0.9, "a")]);
      let sparse = FakeIndex::sparse(vec![doc("A", 0.9, "a")]);
      let engine = engine(&dense, &sparse);

      for top_k in [0, MAX_TOP_K + 1, usize::MAX / 2, usize::MAX] {
         let hybrid = Query::new("robots").with_mode(SearchMode::Hybrid).with_top_k(top_k);
         let err = engine.execute(&hybrid).await.unwrap_err();
         assert!(err.error.contains("top_k"), "{err}");

         let titled =
            Query { title: Some("sonar".into()), ..Query::new("robots").with_top_k(top_k) };
         assert!(engine.execute(&titled).await.is_err());
      }
      assert_eq!(dense.calls() + sparse.calls(), 0);

      let widest = Query::new("robots").with_mode(SearchMode::Hybrid).with_top_k(MAX_TOP_K);
      assert!(engine.execute(&widest).await.is_ok());
      assert_eq!(dense.last_top_k.load(Ordering::SeqCst), MAX_TOP_K * HYBRID_FETCH_FACTOR);
   }

   #[tokio::test]
   async fn invalid_weights_fail_hybrid_queries_only() {
      let dense = FakeIndex::dense(vec![doc("A", 0.9, "a")]);
      let sparse = FakeIndex::sparse(vec![]);
      let engine = engine(&dense, &sparse).with_weights(FusionWeights { dense: 0.0, sparse: 0.0 });

      let err = engine
         .execute(&Query::new("robots").with_mode(SearchMode::Hybrid))
         .await
         .unwrap_err();
      assert!(err.error.contains("fusion weights"), "{err}");
      assert_eq!(dense.calls(), 0);

      assert!(engine.execute(&Query::new("robots")).await.is_ok());
   }

   #[tokio::test]
   async fn failed_engine_contributes_nothing() {
      let dense = Arc::new(FakeIndex {
         name: "dense",
         hits: vec![doc("A", 0.9, "a")],
         fail: true,
         ..FakeIndex::default()
      });
      let sparse = FakeIndex::sparse(vec![doc("S", 1.0, "s")]);
      let engine = engine(&dense, &sparse);

      let hybrid = Query::new("robots").with_mode(SearchMode::Hybrid).with_min_score(0.0);
      let response = engine.execute(&hybrid).await.unwrap();
      assert_eq!(ids(&response), vec!["S"]);
      assert!((response.results[0].score - 0.3).abs() < 1e-6);

      let dense_only = engine.execute(&Query::new("robots")).await.unwrap();
      assert_eq!(dense_only.total, 0);
   }

   #[tokio::test]
   async fn slow_engine_is_cut_off_by_timeout() {
      let dense = FakeIndex::dense(vec![doc("A", 0.9, "a")]);
      let sparse = Arc::new(FakeIndex {
         name: "sparse",
         hits: vec![doc("S", 1.0, "s")],
         delay: Some(Duration::from_secs(5)),
         ..FakeIndex::default()
      });
      let engine = engine(&dense, &sparse).with_timeout(Duration::from_millis(50));

      let query = Query::new("robots").with_mode(SearchMode::Hybrid).with_min_score(0.0);
      let response = engine.execute(&query).await.unwrap();
      assert_eq!(ids(&response), vec!["A"]);
      assert_eq!(sparse.calls(), 1);
   }

   #[tokio::test]
   async fn default_threshold_drops_weak_semantic_matches() {
      let dense = FakeIndex::dense(vec![doc("strong", 0.75, "x"), doc("weak", 0.6, "y")]);
      let sparse = FakeIndex::sparse(vec![]);

      let response = engine(&dense, &sparse).execute(&Query::new("robots")).await.unwrap();
      assert_eq!(ids(&response), vec!["strong"]);
   }

   #[tokio::test]
   async fn no_filter_overrides_explicit_threshold() {
      let dense = FakeIndex::dense(vec![doc("a", 0.2, "x"), doc("b", 0.1, "y")]);
      let sparse = FakeIndex::sparse(vec![]);

      let query = Query { no_filter: true, ..Query::new("robots").with_min_score(0.9) };
      let response = engine(&dense, &sparse).execute(&query).await.unwrap();
      assert_eq!(response.total, 2);
   }

   #[tokio::test]
   async fn flags_select_mode_unless_named_explicitly() {
      let dense = FakeIndex::dense(vec![]);
      let sparse = FakeIndex::sparse(vec![]);
      let engine = engine(&dense, &sparse);

      let flagged = Query { use_sparse: true, ..Query::new("robots") };
      let response = engine.execute(&flagged).await.unwrap();
      assert_eq!(response.search_type, SearchMode::Sparse);
      assert_eq!((dense.calls(), sparse.calls()), (0, 1));

      let both = Query { use_sparse: true, use_hybrid: true, ..Query::new("robots") };
      assert_eq!(engine.execute(&both).await.unwrap().search_type, SearchMode::Hybrid);

      let named = Query { use_hybrid: true, ..Query::new("robots").with_mode(SearchMode::Dense) };
      assert_eq!(engine.execute(&named).await.unwrap().search_type, SearchMode::Dense);
   }

   #[tokio::test]
   async fn title_constraint_overfetches_and_filters_client_side() {
      let mut hits: Vec<ScoredMatch> =
         (0..30).map(|i| doc(&format!("other-{i}"), 0.9, "sonar")).collect();
      let mut wanted = doc("wanted", 0.8, "PID tuning notes");
      wanted.metadata.title = Some("Re: PID Tuning for PDXbot".into());
      hits.push(wanted);

      let dense = FakeIndex::dense(hits);
      let sparse = FakeIndex::sparse(vec![]);

      let query = Query { title: Some("pid tuning".into()), ..Query::new("PID").with_top_k(5) };
      let response = engine(&dense, &sparse).execute(&query).await.unwrap();

      assert_eq!(ids(&response), vec!["wanted"]);
      assert_eq!(dense.last_top_k.load(Ordering::SeqCst), 50);
      assert_eq!(dense.last_filter(), None);
   }

   #[tokio::test]
   async fn metadata_lookup_uses_wildcard_and_no_threshold() {
      let dense = FakeIndex::dense(vec![doc("a", 0.05, "x"), doc("b", 0.01, "y")]);
      let sparse = FakeIndex::sparse(vec![]);
      let engine = engine(&dense, &sparse);

      let query = Query { author: Some("dpa".into()), ..Query::new("ignored") };
      let response = engine.search_by_metadata(query).await.unwrap();

      assert_eq!(response.query, WILDCARD);
      assert_eq!(response.total, 2);
      assert_eq!(dense.last_filter(), Some(serde_json::json!({ "author": { "$eq": "dpa" } })));

      let err = engine.search_by_metadata(Query::new("anything")).await.unwrap_err();
      assert!(err.error.contains("metadata filter"));

      let blank =
         Query { author: Some(" ".into()), title: Some(String::new()), ..Query::default() };
      assert!(engine.search_by_metadata(blank).await.is_err());
      assert_eq!(dense.calls(), 1);
   }

   #[tokio::test]
   async fn client_side_filter_enforces_every_constraint() {
      let mut match_2005 = doc("keep", 0.9, "body");
      match_2005.metadata.year = Some(2005);
      let mut match_2006 = doc("drop", 0.95, "body");
      match_2006.metadata.year = Some(2006);

      let dense = FakeIndex::dense(vec![match_2006, match_2005]);
      let sparse = FakeIndex::sparse(vec![]);

      let query = Query { year: Some(2005), ..Query::new("robots") };
      let response = engine(&dense, &sparse).execute(&query).await.unwrap();
      assert_eq!(ids(&response), vec!["keep"]);
   }

   #[tokio::test]
   async fn excerpts_highlight_keyword_constraints() {
      let body = format!(
         "{} the sonar array worked well {}",
         "lorem ipsum ".repeat(80),
         "dolor sit ".repeat(80)
      );
      let mut hit = doc("a", 0.9, &body);
      hit.metadata.keywords = vec!["sonar".into()];

      let dense = FakeIndex::dense(vec![hit]);
      let sparse = FakeIndex::sparse(vec![]);

      let query = Query { keywords: vec!["sonar".into()], ..Query::new("what about it?") };
      let response = engine(&dense, &sparse)
         .with_excerpt_length(60)
         .execute(&query)
         .await
         .unwrap();

      let excerpt = &response.results[0].text_excerpt;
      assert!(excerpt.contains("sonar"), "{excerpt}");
      assert!(excerpt.starts_with(excerpt::ELLIPSIS));
   }

   #[test]
   fn highlight_terms_drop_stopwords_and_punctuation() {
      let query = Query { keywords: vec!["PID".into()], ..Query::new("What is the UMBMark test?") };
      let filter = MetadataFilter::from_query(&query);
      assert_eq!(highlight_terms(&query, &filter), vec!["UMBMark", "test", "PID"]);
   }
}
