//! Pinecone REST adapters for the dense and sparse archive indices.

use std::{sync::Arc, time::Instant};

use reqwest::{
   Client,
   header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
   config::Config,
   embed::{Embedder, SparseVector, sparse_vector},
   error::{Error, Result},
   store::{SearchParams, VectorIndex},
   types::{ArchiveMetadata, MAX_TOP_K, ScoredMatch},
};

const API_VERSION: &str = "2025-01";

struct IndexHttp {
   client:    Client,
   endpoint:  String,
   namespace: String,
}

impl IndexHttp {
   fn new(config: &Config, host: &str) -> Result<Self> {
      let mut headers = HeaderMap::new();
      headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
      headers.insert(
         HeaderName::from_static("x-pinecone-api-version"),
         HeaderValue::from_static(API_VERSION),
      );
      if config.pinecone_api_key.is_empty() {
         tracing::warn!("no Pinecone API key configured");
      } else {
         let key = HeaderValue::from_str(&config.pinecone_api_key)
            .map_err(|e| Error::validation(format!("invalid Pinecone API key format: {e}")))?;
         headers.insert(HeaderName::from_static("api-key"), key);
      }

      let client = Client::builder()
         .timeout(config.engine_timeout())
         .default_headers(headers)
         .build()?;

      Ok(Self {
         client,
         endpoint: format!("{}/query", host.trim_end_matches('/')),
         namespace: config.namespace.clone(),
      })
   }

   async fn query(
      &self,
      engine: &'static str,
      body: &QueryRequest<'_>,
   ) -> Result<Vec<ScoredMatch>> {
      let start = Instant::now();
      let response = self.client.post(&self.endpoint).json(body).send().await?;

      let status = response.status();
      if !status.is_success() {
         let body = response.text().await.unwrap_or_default();
         return Err(Error::Engine { engine, reason: format!("{status}: {body}") });
      }

      let payload: QueryResponse = response.json().await?;
      let matches: Vec<ScoredMatch> = payload.matches.into_iter().map(Into::into).collect();

      tracing::info!(
         "{engine} search completed in {:.2}s. Found {} results.",
         start.elapsed().as_secs_f64(),
         matches.len()
      );
      Ok(matches)
   }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
   #[serde(skip_serializing_if = "Option::is_none")]
   vector:           Option<&'a [f32]>,
   #[serde(skip_serializing_if = "Option::is_none")]
   sparse_vector:    Option<&'a SparseVector>,
   top_k:            usize,
   namespace:        &'a str,
   #[serde(skip_serializing_if = "Option::is_none")]
   filter:           Option<&'a Value>,
   include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
   #[serde(default)]
   matches: Vec<RawMatch>,
}

#[derive(Deserialize)]
struct RawMatch {
   id:       String,
   #[serde(default)]
   score:    f32,
   #[serde(default)]
   metadata: Option<RawMetadata>,
}

#[derive(Deserialize)]
struct RawMetadata {
   #[serde(flatten)]
   archive:      ArchiveMetadata,
   #[serde(default)]
   text_excerpt: Option<String>,
   #[serde(default, alias = "content")]
   text:         Option<String>,
}

impl From<RawMatch> for ScoredMatch {
   fn from(raw: RawMatch) -> Self {
      let (metadata, text_excerpt, text) = match raw.metadata {
         Some(m) => (m.archive, m.text_excerpt, m.text),
         None => (ArchiveMetadata::default(), None, None),
      };
      Self { id: raw.id, score: raw.score, metadata, text_excerpt, text }
   }
}

/// Semantic index queried with an embedding of the query text.
pub struct DenseIndex {
   http:     IndexHttp,
   embedder: Arc<dyn Embedder>,
}

impl DenseIndex {
   pub fn new(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
      Ok(Self { http: IndexHttp::new(config, &config.dense_index_url)?, embedder })
   }
}

#[async_trait::async_trait]
impl VectorIndex for DenseIndex {
   fn name(&self) -> &'static str {
      "dense"
   }

   async fn search(&self, params: SearchParams<'_>) -> Result<Vec<ScoredMatch>> {
      let vector = self.embedder.embed(params.query_text).await?;
      let body = QueryRequest {
         vector:           Some(&vector),
         sparse_vector:    None,
         top_k:            capped_top_k(params.top_k),
         namespace:        &self.http.namespace,
         filter:           params.filter,
         include_metadata: true,
      };
      self.http.query(self.name(), &body).await
   }
}

/// Lexical index queried with a hashed term vector of the query text.
pub struct SparseIndex {
   http: IndexHttp,
}

impl SparseIndex {
   pub fn new(config: &Config) -> Result<Self> {
      Ok(Self { http: IndexHttp::new(config, &config.sparse_index_url)? })
   }
}

#[async_trait::async_trait]
impl VectorIndex for SparseIndex {
   fn name(&self) -> &'static str {
      "sparse"
   }

   async fn search(&self, params: SearchParams<'_>) -> Result<Vec<ScoredMatch>> {
      let sparse = sparse_vector(params.query_text);
      if sparse.is_empty() {
         tracing::debug!("sparse query has no terms after stopword removal");
         return Ok(Vec::new());
      }

      let body = QueryRequest {
         vector:           None,
         sparse_vector:    Some(&sparse),
         top_k:            capped_top_k(params.top_k),
         namespace:        &self.http.namespace,
         filter:           params.filter,
         include_metadata: true,
      };
      self.http.query(self.name(), &body).await
   }
}

/// Over-fetched sizes are capped at what the index serves in one query.
fn capped_top_k(top_k: usize) -> usize {
   top_k.min(MAX_TOP_K)
}
