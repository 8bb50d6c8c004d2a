use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(
   name = "archive-agent",
   version,
   about = "Search and chat over the DPRG mailing list archive"
)]
struct Cli {
   /// Log debug output to stderr
   #[arg(short, long, global = true)]
   verbose: bool,

   #[command(subcommand)]
   command: Command,
}

#[derive(Subcommand)]
enum Command {
   /// Search the archive by relevance
   Search(cmd::search::SearchArgs),
   /// List messages matching metadata only
   Metadata(cmd::search::MetadataArgs),
   /// Ask a question answered from archive context
   Chat(cmd::chat::ChatArgs),
   /// Show the effective configuration
   Config,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
   let cli = Cli::parse();
   init_tracing(cli.verbose);

   match cli.command {
      Command::Search(args) => cmd::search::execute(args).await,
      Command::Metadata(args) => cmd::search::metadata(args).await,
      Command::Chat(args) => cmd::chat::execute(args).await,
      Command::Config => cmd::config::execute(),
   }
}

fn init_tracing(verbose: bool) {
   let default = if verbose { "debug" } else { "warn" };
   let filter = EnvFilter::try_from_env("ARCHIVE_LOG").unwrap_or_else(|_| EnvFilter::new(default));

   tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(std::io::stderr)
      .with_target(false)
      .init();
}
