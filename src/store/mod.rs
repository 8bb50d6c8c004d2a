pub mod pinecone;

use std::sync::Arc;

use serde_json::Value;

use crate::{error::Result, types::ScoredMatch};

#[derive(Debug, Clone, Copy)]
pub struct SearchParams<'a> {
   pub query_text: &'a str,
   pub top_k:      usize,
   pub filter:     Option<&'a Value>,
}

/// A remote retrieval engine. Adapters normalize every response into
/// [`ScoredMatch`] so nothing downstream inspects engine-specific shapes.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
   /// Short engine label used in logs and errors.
   fn name(&self) -> &'static str;

   async fn search(&self, params: SearchParams<'_>) -> Result<Vec<ScoredMatch>>;
}

#[async_trait::async_trait]
impl<T: VectorIndex + ?Sized> VectorIndex for Arc<T> {
   fn name(&self) -> &'static str {
      (**self).name()
   }

   async fn search(&self, params: SearchParams<'_>) -> Result<Vec<ScoredMatch>> {
      (**self).search(params).await
   }
}

pub use pinecone::{DenseIndex, SparseIndex};
