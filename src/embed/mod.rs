//! Query encoding for the two retrieval engines.
//!
//! Dense queries are embedded remotely through an [`Embedder`]; sparse
//! queries are encoded locally by [`sparse::sparse_vector`].

pub mod openai;
pub mod sparse;

use std::sync::Arc;

pub use openai::OpenAiEmbedder;
pub use sparse::{SparseVector, sparse_vector, tokenize};

use crate::error::Result;

/// Upper bound on characters sent for embedding; longer input is truncated.
pub const MAX_EMBED_CHARS: usize = 32_000;

/// Dense text embedding trait
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
   /// Embeds a single query text into a dense vector
   async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[async_trait::async_trait]
impl<T: Embedder + ?Sized> Embedder for Arc<T> {
   async fn embed(&self, text: &str) -> Result<Vec<f32>> {
      (**self).embed(text).await
   }
}

/// Truncates `text` to at most [`MAX_EMBED_CHARS`] characters.
pub fn clamp_input(text: &str) -> &str {
   match text.char_indices().nth(MAX_EMBED_CHARS) {
      Some((byte_idx, _)) => &text[..byte_idx],
      None => text,
   }
}
