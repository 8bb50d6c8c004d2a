use std::process::ExitCode;

use anyhow::{Context, Result};
use archive_agent::{
   search::SearchEngine,
   types::{ArchiveDocument, Query, SearchError, SearchResponse},
};
use console::style;

use super::{FilterArgs, load_config, with_spinner};

#[derive(Debug, clap::Args)]
pub struct SearchArgs {
   /// Free-text query
   pub query:     String,
   #[command(flatten)]
   pub filters:   FilterArgs,
   /// Drop results scoring below this (default 0.7)
   #[arg(long)]
   pub min_score: Option<f32>,
   /// Maximum number of results
   #[arg(short = 'k', long)]
   pub top_k:     Option<usize>,
   /// Retrieval mode: dense, sparse, or hybrid
   #[arg(short, long)]
   pub mode:      Option<String>,
   /// Disable score thresholding
   #[arg(long)]
   pub no_filter: bool,
   /// Print the response as JSON
   #[arg(long)]
   pub json:      bool,
}

#[derive(Debug, clap::Args)]
pub struct MetadataArgs {
   #[command(flatten)]
   pub filters:   FilterArgs,
   #[arg(long)]
   pub min_score: Option<f32>,
   #[arg(short = 'k', long)]
   pub top_k:     Option<usize>,
   #[arg(long)]
   pub json:      bool,
}

pub async fn execute(args: SearchArgs) -> Result<ExitCode> {
   let config = load_config()?;
   let engine = SearchEngine::from_config(&config).context("failed to initialize search")?;

   let query = args.filters.apply(Query {
      query: args.query,
      min_score: args.min_score,
      top_k: args.top_k.unwrap_or(config.top_k),
      search_type: args.mode,
      no_filter: args.no_filter,
      ..Query::default()
   });

   let outcome = with_spinner(args.json, "Searching the archive...", engine.execute(&query)).await;
   report(outcome, args.json)
}

pub async fn metadata(args: MetadataArgs) -> Result<ExitCode> {
   let config = load_config()?;
   let engine = SearchEngine::from_config(&config).context("failed to initialize search")?;

   let query = args.filters.apply(Query {
      min_score: args.min_score,
      top_k: args.top_k.unwrap_or(config.top_k),
      ..Query::default()
   });

   let outcome =
      with_spinner(args.json, "Searching archive metadata...", engine.search_by_metadata(query))
         .await;
   report(outcome, args.json)
}

fn report(outcome: Result<SearchResponse, SearchError>, json: bool) -> Result<ExitCode> {
   match outcome {
      Ok(response) => {
         if json {
            println!("{}", serde_json::to_string_pretty(&response)?);
         } else {
            print_results(&response);
         }
         Ok(ExitCode::SUCCESS)
      },
      Err(err) => {
         if json {
            println!("{}", serde_json::to_string_pretty(&err)?);
         } else {
            eprintln!("{} {err}", style("error:").red().bold());
         }
         Ok(ExitCode::FAILURE)
      },
   }
}

fn print_results(response: &SearchResponse) {
   if response.results.is_empty() {
      println!("No results found for '{}'", response.query);
      return;
   }

   println!("\n{}", style(format!("Search results for: {}", response.query)).bold());
   println!(
      "{}",
      style(format!(
         "{} results ({} search) in {:.2}s\n",
         response.total, response.search_type, response.elapsed_time
      ))
      .dim()
   );

   for (i, doc) in response.results.iter().enumerate() {
      print_document(i + 1, doc);
   }
}

pub(crate) fn print_document(rank: usize, doc: &ArchiveDocument) {
   let meta = &doc.metadata;

   print!("{}", style(format!("{rank}) ")).bold().cyan());
   print!("{}", style(meta.title.as_deref().unwrap_or("Untitled")).green());
   println!(" {}", style(format!("(score: {:.3}, {})", doc.score, doc.source)).dim());

   println!(
      "   {} {} {}",
      meta.author.as_deref().unwrap_or("Unknown"),
      style("|").dim(),
      meta.display_date()
   );
   if !meta.keywords.is_empty() {
      println!("   {}", style(format!("keywords: {}", meta.keywords.join(", "))).dim());
   }

   let excerpt = doc.text_excerpt.split_whitespace().collect::<Vec<_>>().join(" ");
   if !excerpt.is_empty() {
      println!("   {excerpt}");
   }
   println!();
}
