//! OpenAI-compatible `/chat/completions` client.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
   chat::{ChatModel, Message},
   config::Config,
   embed::openai::{api_error_message, authorized_client},
   error::{Error, Result},
};

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiChat {
   client:   Client,
   endpoint: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
   model:       &'a str,
   messages:    &'a [Message],
   max_tokens:  u32,
   temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
   choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
   message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
   #[serde(default)]
   content: Option<String>,
}

impl OpenAiChat {
   pub fn new(config: &Config) -> Result<Self> {
      Ok(Self {
         client:   authorized_client(&config.openai_api_key, COMPLETION_TIMEOUT)?,
         endpoint: format!("{}/chat/completions", config.openai_base_url.trim_end_matches('/')),
      })
   }
}

#[async_trait::async_trait]
impl ChatModel for OpenAiChat {
   async fn complete(
      &self,
      messages: &[Message],
      model: &str,
      max_tokens: u32,
      temperature: f32,
   ) -> Result<String> {
      tracing::info!(
         "Getting chat completion with model={model}, max_tokens={max_tokens}, \
          temperature={temperature}"
      );
      let start = Instant::now();

      let response = self
         .client
         .post(&self.endpoint)
         .json(&CompletionRequest { model, messages, max_tokens, temperature })
         .send()
         .await?;

      let status = response.status();
      if !status.is_success() {
         let body = response.text().await.unwrap_or_default();
         return Err(Error::Generation {
            model:  model.to_string(),
            reason: api_error_message(status, &body),
         });
      }

      let payload: CompletionResponse = response.json().await?;
      let content = payload
         .choices
         .into_iter()
         .next()
         .and_then(|c| c.message.content)
         .ok_or_else(|| Error::Generation {
            model:  model.to_string(),
            reason: "response contained no message".to_string(),
         })?;

      tracing::info!("Chat completion completed in {:.2}s", start.elapsed().as_secs_f64());
      Ok(content)
   }
}
