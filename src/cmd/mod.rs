pub mod chat;
pub mod config;
pub mod search;

use std::{future::Future, time::Duration};

use anyhow::{Context, Result};
use archive_agent::{config::Config, types::Query};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Metadata constraints shared by `search` and `metadata`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct FilterArgs {
   /// Exact author name
   #[arg(long)]
   pub author:   Option<String>,
   #[arg(long)]
   pub year:     Option<i32>,
   #[arg(long)]
   pub month:    Option<i32>,
   #[arg(long)]
   pub day:      Option<i32>,
   /// Required keyword; repeat or comma-separate for several (all must match)
   #[arg(long = "keyword", value_delimiter = ',')]
   pub keywords: Vec<String>,
   /// Case-insensitive title substring
   #[arg(long)]
   pub title:    Option<String>,
}

impl FilterArgs {
   pub fn apply(self, query: Query) -> Query {
      Query {
         author: self.author,
         year: self.year,
         month: self.month,
         day: self.day,
         keywords: self.keywords,
         title: self.title,
         ..query
      }
   }
}

/// Loads configuration and warns about missing credentials without aborting.
pub fn load_config() -> Result<Config> {
   let config = Config::load().context("failed to load configuration")?;
   for key in config.validate() {
      eprintln!("{} {key} is not set", style("warning:").yellow().bold());
   }
   Ok(config)
}

/// Awaits `fut` behind a spinner on stderr unless `quiet`.
pub async fn with_spinner<F: Future>(quiet: bool, message: &'static str, fut: F) -> F::Output {
   if quiet {
      return fut.await;
   }

   let spinner = ProgressBar::new_spinner();
   spinner.set_style(
      ProgressStyle::default_spinner()
         .template("{spinner:.green} {msg}")
         .unwrap_or_else(|_| ProgressStyle::default_spinner()),
   );
   spinner.enable_steady_tick(Duration::from_millis(100));
   spinner.set_message(message);

   let output = fut.await;
   spinner.finish_and_clear();
   output
}
