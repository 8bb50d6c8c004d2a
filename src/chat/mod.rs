//! Retrieval-augmented chat over the archive.

pub mod context;
pub mod openai;

use std::{sync::Arc, time::Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::{
   context::{ContextBranch, build_context, with_context},
   openai::OpenAiChat,
};
use crate::{
   config::Config,
   error::{Error, Result},
   search::SearchEngine,
   types::{ArchiveDocument, MAX_QUERY_LEN, Query, SearchMode},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
   System,
   User,
   Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
   pub role:    Role,
   pub content: String,
}

impl Message {
   pub fn system(content: impl Into<String>) -> Self {
      Self { role: Role::System, content: content.into() }
   }

   pub fn user(content: impl Into<String>) -> Self {
      Self { role: Role::User, content: content.into() }
   }

   pub fn assistant(content: impl Into<String>) -> Self {
      Self { role: Role::Assistant, content: content.into() }
   }
}

/// Hosted chat-completion model.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
   async fn complete(
      &self,
      messages: &[Message],
      model: &str,
      max_tokens: u32,
      temperature: f32,
   ) -> Result<String>;
}

#[async_trait::async_trait]
impl<T: ChatModel + ?Sized> ChatModel for Arc<T> {
   async fn complete(
      &self,
      messages: &[Message],
      model: &str,
      max_tokens: u32,
      temperature: f32,
   ) -> Result<String> {
      (**self).complete(messages, model, max_tokens, temperature).await
   }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
   pub model:          String,
   pub fallback_model: Option<String>,
   pub max_tokens:     u32,
   pub temperature:    f32,
}

impl ChatSettings {
   pub fn from_config(config: &Config) -> Self {
      Self {
         model:          config.chat_model.clone(),
         fallback_model: Some(config.fallback_model.clone()).filter(|m| !m.is_empty()),
         max_tokens:     config.chat_max_tokens,
         temperature:    config.chat_temperature,
      }
   }
}

/// How documents are retrieved for a chat turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalSettings {
   pub mode:                 SearchMode,
   pub top_k:                usize,
   pub min_score:            f32,
   pub confidence_threshold: f32,
}

impl RetrievalSettings {
   pub const fn from_config(config: &Config) -> Self {
      Self {
         mode:                 config.chat_search_mode,
         top_k:                config.chat_search_top_k,
         min_score:            config.chat_min_score,
         confidence_threshold: config.confidence_threshold,
      }
   }
}

/// Completion text and the model that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
   pub content: String,
   pub model:   String,
}

/// Calls the primary model, retrying once on the fallback model when one is
/// configured and differs from the primary.
pub async fn complete_with_fallback(
   chat: &dyn ChatModel,
   messages: &[Message],
   settings: &ChatSettings,
) -> Result<Completion> {
   let primary = &settings.model;
   let primary_err =
      match chat.complete(messages, primary, settings.max_tokens, settings.temperature).await {
         Ok(content) => return Ok(Completion { content, model: primary.clone() }),
         Err(e) => e,
      };
   tracing::warn!("Error with primary model {primary}: {primary_err}");

   let Some(fallback) = settings.fallback_model.as_ref().filter(|f| *f != primary) else {
      return Err(primary_err);
   };

   tracing::info!("Trying fallback model: {fallback}");
   let content = chat
      .complete(messages, fallback, settings.max_tokens, settings.temperature)
      .await?;
   Ok(Completion { content, model: fallback.clone() })
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
   pub message:              Message,
   pub model:                String,
   /// Wall-clock seconds.
   pub elapsed_time:         f64,
   pub referenced_documents: Vec<ArchiveDocument>,
}

#[derive(Debug, Error)]
pub enum ChatError {
   #[error("conversation has no user message")]
   NoUserMessage,

   #[error("Error processing chat request: {0}")]
   Completion(#[source] Error),
}

pub struct ChatEngine {
   search:    Arc<SearchEngine>,
   model:     Arc<dyn ChatModel>,
   settings:  ChatSettings,
   retrieval: RetrievalSettings,
}

impl ChatEngine {
   pub fn new(
      search: Arc<SearchEngine>,
      model: Arc<dyn ChatModel>,
      settings: ChatSettings,
      retrieval: RetrievalSettings,
   ) -> Self {
      Self { search, model, settings, retrieval }
   }

   pub fn from_config(config: &Config) -> Result<Self> {
      Ok(Self::new(
         Arc::new(SearchEngine::from_config(config)?),
         Arc::new(OpenAiChat::new(config)?),
         ChatSettings::from_config(config),
         RetrievalSettings::from_config(config),
      ))
   }

   pub const fn settings_mut(&mut self) -> &mut ChatSettings {
      &mut self.settings
   }

   /// Answers the last user message of `history`, grounded in archive
   /// documents retrieved for it. `history` is left untouched.
   pub async fn chat(&self, history: &[Message]) -> Result<ChatResponse, ChatError> {
      let start = Instant::now();
      let question = history
         .iter()
         .rev()
         .find(|m| m.role == Role::User)
         .map(|m| m.content.as_str())
         .ok_or(ChatError::NoUserMessage)?;

      tracing::info!("Processing chat request with {} messages", history.len());

      let documents = self.retrieve(question).await;
      let context =
         build_context(&documents, question, self.retrieval.confidence_threshold);
      let messages = with_context(history, context);

      let completion = complete_with_fallback(&*self.model, &messages, &self.settings)
         .await
         .map_err(|e| {
            tracing::error!("Error getting chat completion: {e}");
            ChatError::Completion(e)
         })?;

      let elapsed = start.elapsed().as_secs_f64();
      tracing::info!("Chat completed in {elapsed:.2}s");

      Ok(ChatResponse {
         message: Message::assistant(completion.content),
         model: completion.model,
         elapsed_time: elapsed,
         referenced_documents: documents,
      })
   }

   /// Retrieval failures leave the model without context rather than
   /// failing the turn. Long questions are searched by their leading
   /// `MAX_QUERY_LEN` characters.
   async fn retrieve(&self, question: &str) -> Vec<ArchiveDocument> {
      let text: String = question.chars().take(MAX_QUERY_LEN).collect();
      let query = Query::new(text)
         .with_mode(self.retrieval.mode)
         .with_top_k(self.retrieval.top_k)
         .with_min_score(self.retrieval.min_score);

      match self.search.execute(&query).await {
         Ok(response) => {
            tracing::debug!("retrieved {} documents for chat context", response.total);
            response.results
         },
         Err(err) => {
            tracing::warn!("archive retrieval failed, answering without context: {err}");
            Vec::new()
         },
      }
   }
}
