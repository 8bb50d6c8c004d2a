//! OpenAI-compatible `/embeddings` client.

use std::time::{Duration, Instant};

use reqwest::{
   Client, StatusCode,
   header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize};

use crate::{
   config::Config,
   embed::{Embedder, clamp_input},
   error::{Error, Result},
};

pub struct OpenAiEmbedder {
   client:   Client,
   endpoint: String,
   model:    String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
   model:           &'a str,
   input:           &'a str,
   encoding_format: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
   data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
   embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
   error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
   message: String,
}

impl OpenAiEmbedder {
   pub fn new(config: &Config) -> Result<Self> {
      let client = authorized_client(&config.openai_api_key, config.engine_timeout())?;
      Ok(Self {
         client,
         endpoint: format!("{}/embeddings", config.openai_base_url.trim_end_matches('/')),
         model: config.embedding_model.clone(),
      })
   }
}

#[async_trait::async_trait]
impl Embedder for OpenAiEmbedder {
   async fn embed(&self, text: &str) -> Result<Vec<f32>> {
      if text.trim().is_empty() {
         return Err(Error::Embedding("cannot embed empty text".to_string()));
      }

      let start = Instant::now();
      let response = self
         .client
         .post(&self.endpoint)
         .json(&EmbeddingRequest {
            model:           &self.model,
            input:           clamp_input(text),
            encoding_format: "float",
         })
         .send()
         .await?;

      let status = response.status();
      if !status.is_success() {
         let body = response.text().await.unwrap_or_default();
         return Err(Error::Embedding(api_error_message(status, &body)));
      }

      let payload: EmbeddingResponse = response.json().await?;
      let embedding = payload
         .data
         .into_iter()
         .next()
         .map(|d| d.embedding)
         .ok_or_else(|| Error::Embedding("response contained no embedding".to_string()))?;

      tracing::debug!(
         "embedded query with {} ({} dims) in {:?}",
         self.model,
         embedding.len(),
         start.elapsed()
      );
      Ok(embedding)
   }
}

/// Builds a client that sends `Authorization: Bearer <key>` on every request.
pub(crate) fn authorized_client(api_key: &str, timeout: Duration) -> Result<Client> {
   let mut headers = HeaderMap::new();
   headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

   if api_key.is_empty() {
      tracing::warn!("no OpenAI API key configured");
   } else {
      let value = HeaderValue::from_str(&format!("Bearer {api_key}"))
         .map_err(|e| Error::validation(format!("invalid API key format: {e}")))?;
      headers.insert(AUTHORIZATION, value);
   }

   Ok(Client::builder()
      .timeout(timeout)
      .default_headers(headers)
      .build()?)
}

/// Extracts the provider's error message, falling back to the raw body.
pub(crate) fn api_error_message(status: StatusCode, body: &str) -> String {
   match serde_json::from_str::<ErrorResponse>(body) {
      Ok(parsed) => format!("{status}: {}", parsed.error.message),
      Err(_) if body.is_empty() => status.to_string(),
      Err(_) => format!("{status}: {body}"),
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn api_error_message_prefers_structured_error() {
      let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
      let msg = api_error_message(StatusCode::UNAUTHORIZED, body);
      assert_eq!(msg, "401 Unauthorized: Incorrect API key provided");
   }

   #[test]
   fn api_error_message_falls_back_to_body() {
      let msg = api_error_message(StatusCode::BAD_GATEWAY, "upstream down");
      assert_eq!(msg, "502 Bad Gateway: upstream down");
      assert_eq!(api_error_message(StatusCode::BAD_GATEWAY, ""), "502 Bad Gateway");
   }

   #[tokio::test]
   async fn empty_text_is_rejected_without_network() {
      let embedder = OpenAiEmbedder::new(&Config::default()).unwrap();
      let err = embedder.embed("   ").await.unwrap_err();
      assert!(matches!(err, Error::Embedding(_)));
   }
}
