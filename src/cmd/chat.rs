use std::process::ExitCode;

use anyhow::{Context, Result};
use archive_agent::chat::{ChatEngine, Message};
use console::style;
use serde_json::json;

use super::{load_config, search::print_document, with_spinner};

#[derive(Debug, clap::Args)]
pub struct ChatArgs {
   /// Question to ask about the archive
   pub message:        String,
   /// Primary chat model
   #[arg(long)]
   pub model:          Option<String>,
   /// Model tried once if the primary fails
   #[arg(long)]
   pub fallback_model: Option<String>,
   /// Print the response as JSON
   #[arg(long)]
   pub json:           bool,
}

pub async fn execute(args: ChatArgs) -> Result<ExitCode> {
   let config = load_config()?;
   let mut engine = ChatEngine::from_config(&config).context("failed to initialize chat")?;
   if let Some(model) = args.model {
      engine.settings_mut().model = model;
   }
   if let Some(fallback) = args.fallback_model {
      engine.settings_mut().fallback_model = Some(fallback);
   }

   let history = [Message::user(args.message)];
   let outcome = with_spinner(args.json, "Consulting the archive...", engine.chat(&history)).await;

   match outcome {
      Ok(response) if args.json => {
         println!("{}", serde_json::to_string_pretty(&response)?);
         Ok(ExitCode::SUCCESS)
      },
      Ok(response) => {
         println!("\n{}\n", response.message.content);
         println!(
            "{}",
            style(format!("{} in {:.2}s", response.model, response.elapsed_time)).dim()
         );

         if !response.referenced_documents.is_empty() {
            println!("\n{}", style("Referenced messages:").bold());
            for (i, doc) in response.referenced_documents.iter().enumerate() {
               print_document(i + 1, doc);
            }
         }
         Ok(ExitCode::SUCCESS)
      },
      Err(err) => {
         if args.json {
            println!("{}", serde_json::to_string_pretty(&json!({ "error": err.to_string() }))?);
         } else {
            eprintln!("{} {err}", style("error:").red().bold());
         }
         Ok(ExitCode::FAILURE)
      },
   }
}
