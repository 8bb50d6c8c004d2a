use std::process::ExitCode;

use anyhow::{Context, Result};
use archive_agent::config::{self, Config};
use console::style;

/// Prints the effective configuration with credentials masked.
pub fn execute() -> Result<ExitCode> {
   let config = Config::load().context("failed to load configuration")?;

   match config::config_path() {
      Some(path) if path.exists() => {
         println!("{}", style(format!("# loaded from {}", path.display())).dim());
      },
      Some(path) => {
         println!("{}", style(format!("# no file at {}, using defaults", path.display())).dim());
      },
      None => println!("{}", style("# no home directory, using defaults").dim()),
   }
   print!("{}", config.redacted().to_toml()?);

   let missing = config.validate();
   if missing.is_empty() {
      println!("\n{} all credentials present", style("ok:").green().bold());
      Ok(ExitCode::SUCCESS)
   } else {
      eprintln!(
         "\n{} Missing required configuration: {}",
         style("error:").red().bold(),
         missing.join(", ")
      );
      Ok(ExitCode::FAILURE)
   }
}
