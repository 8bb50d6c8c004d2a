use std::{
   path::{Path, PathBuf},
   time::Duration,
};

use directories::BaseDirs;
use figment::{
   Figment,
   providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{Result, types::SearchMode};

pub const DEFAULT_NAMESPACE: &str = "dprg-archive";
pub const DEFAULT_DENSE_INDEX_URL: &str =
   "https://dprg-list-archive-dense-4p4f7lg.svc.aped-4627-b74a.pinecone.io";
pub const DEFAULT_SPARSE_INDEX_URL: &str =
   "https://dprg-list-archive-sparse-4p4f7lg.svc.aped-4627-b74a.pinecone.io";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub const EMBEDDING_MODEL: &str = "text-embedding-3-large";
pub const CHAT_MODEL: &str = "gpt-4o";
pub const FALLBACK_MODEL: &str = "gpt-3.5-turbo";

pub const DEFAULT_TOP_K: usize = 10;
pub const MIN_SCORE_THRESHOLD: f32 = 0.7;
pub const DENSE_WEIGHT: f32 = 0.7;
pub const SPARSE_WEIGHT: f32 = 0.3;
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const EXCERPT_LENGTH: usize = 500;

const ENV_PREFIX: &str = "ARCHIVE_";
const CREDENTIAL_VARS: [&str; 2] = ["PINECONE_API_KEY", "OPENAI_API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
   pub pinecone_api_key:     String,
   pub openai_api_key:       String,
   pub namespace:            String,
   pub dense_index_url:      String,
   pub sparse_index_url:     String,
   pub openai_base_url:      String,
   pub embedding_model:      String,
   pub chat_model:           String,
   pub fallback_model:       String,
   pub chat_max_tokens:      u32,
   pub chat_temperature:     f32,
   pub top_k:                usize,
   pub min_score:            f32,
   pub dense_weight:         f32,
   pub sparse_weight:        f32,
   /// Best-score cutoff separating confident from low-confidence chat context.
   pub confidence_threshold: f32,
   pub excerpt_length:       usize,
   pub engine_timeout_ms:    u64,
   pub chat_search_top_k:    usize,
   pub chat_min_score:       f32,
   pub chat_search_mode:     SearchMode,
}

impl Default for Config {
   fn default() -> Self {
      Self {
         pinecone_api_key:     String::new(),
         openai_api_key:       String::new(),
         namespace:            DEFAULT_NAMESPACE.to_string(),
         dense_index_url:      DEFAULT_DENSE_INDEX_URL.to_string(),
         sparse_index_url:     DEFAULT_SPARSE_INDEX_URL.to_string(),
         openai_base_url:      DEFAULT_OPENAI_BASE_URL.to_string(),
         embedding_model:      EMBEDDING_MODEL.to_string(),
         chat_model:           CHAT_MODEL.to_string(),
         fallback_model:       FALLBACK_MODEL.to_string(),
         chat_max_tokens:      1000,
         chat_temperature:     0.7,
         top_k:                DEFAULT_TOP_K,
         min_score:            MIN_SCORE_THRESHOLD,
         dense_weight:         DENSE_WEIGHT,
         sparse_weight:        SPARSE_WEIGHT,
         confidence_threshold: CONFIDENCE_THRESHOLD,
         excerpt_length:       EXCERPT_LENGTH,
         engine_timeout_ms:    15_000,
         chat_search_top_k:    5,
         chat_min_score:       0.5,
         chat_search_mode:     SearchMode::Dense,
      }
   }
}

/// Fusion and threshold defaults, exposed so callers can see what they tune.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchSettings {
   pub top_k:         usize,
   pub min_score:     f32,
   pub dense_weight:  f32,
   pub sparse_weight: f32,
}

impl Config {
   /// Loads defaults, then the TOML config file, then `ARCHIVE_*` env vars,
   /// then the bare provider credentials.
   pub fn load() -> Result<Self> {
      Self::load_from(config_path().as_deref())
   }

   pub fn load_from(path: Option<&Path>) -> Result<Self> {
      Ok(Self::figment(path).extract()?)
   }

   pub fn figment(path: Option<&Path>) -> Figment {
      let mut figment = Figment::from(Serialized::defaults(Self::default()));
      if let Some(path) = path {
         figment = figment.merge(Toml::file(path));
      }
      figment
         .merge(Env::prefixed(ENV_PREFIX).ignore(&["config", "log"]))
         .merge(Env::raw().only(&CREDENTIAL_VARS))
   }

   /// Names of required credentials that are unset.
   pub fn validate(&self) -> Vec<&'static str> {
      let mut missing = Vec::new();
      if self.pinecone_api_key.is_empty() {
         missing.push("PINECONE_API_KEY");
      }
      if self.openai_api_key.is_empty() {
         missing.push("OPENAI_API_KEY");
      }
      missing
   }

   pub const fn search_settings(&self) -> SearchSettings {
      SearchSettings {
         top_k:         self.top_k,
         min_score:     self.min_score,
         dense_weight:  self.dense_weight,
         sparse_weight: self.sparse_weight,
      }
   }

   pub const fn engine_timeout(&self) -> Duration {
      Duration::from_millis(self.engine_timeout_ms)
   }

   /// Copy with credentials masked down to their last four characters.
   pub fn redacted(&self) -> Self {
      Self {
         pinecone_api_key: mask(&self.pinecone_api_key),
         openai_api_key: mask(&self.openai_api_key),
         ..self.clone()
      }
   }

   pub fn to_toml(&self) -> Result<String> {
      Ok(toml::to_string_pretty(self)?)
   }
}

fn mask(secret: &str) -> String {
   if secret.is_empty() {
      return String::new();
   }
   let visible: String = secret
      .chars()
      .rev()
      .take(4)
      .collect::<Vec<_>>()
      .into_iter()
      .rev()
      .collect();
   format!("****{visible}")
}

pub fn data_dir() -> Option<PathBuf> {
   BaseDirs::new().map(|dirs| dirs.home_dir().join(".archive-agent"))
}

pub fn config_file() -> Option<PathBuf> {
   data_dir().map(|dir| dir.join("config.toml"))
}

/// `ARCHIVE_CONFIG` if set, else [`config_file`].
pub fn config_path() -> Option<PathBuf> {
   std::env::var_os("ARCHIVE_CONFIG")
      .map(PathBuf::from)
      .or_else(config_file)
}

#[cfg(test)]
mod tests {
   use std::io::Write;

   use figment::Jail;

   use super::*;

   #[test]
   fn defaults_match_documented_contract() {
      let config = Config::default();
      let settings = config.search_settings();
      assert_eq!(settings.top_k, 10);
      assert!((settings.min_score - 0.7).abs() < 1e-6);
      assert!((settings.dense_weight - 0.7).abs() < 1e-6);
      assert!((settings.sparse_weight - 0.3).abs() < 1e-6);
      assert!((config.confidence_threshold - 0.5).abs() < 1e-6);
      assert_eq!(config.namespace, "dprg-archive");
      assert_eq!(config.chat_search_mode, SearchMode::Dense);
   }

   #[test]
   fn toml_file_overrides_defaults() {
      let mut file = tempfile::NamedTempFile::new().unwrap();
      writeln!(file, "top_k = 25\ndense_weight = 0.5\nchat_search_mode = \"hybrid\"").unwrap();

      Jail::expect_with(|_jail| {
         let config = Config::load_from(Some(file.path())).map_err(|e| e.to_string())?;
         assert_eq!(config.top_k, 25);
         assert!((config.dense_weight - 0.5).abs() < 1e-6);
         assert!((config.sparse_weight - 0.3).abs() < 1e-6);
         assert_eq!(config.chat_search_mode, SearchMode::Hybrid);
         Ok(())
      });
   }

   #[test]
   fn env_overrides_file_and_credentials_are_read_bare() {
      Jail::expect_with(|jail| {
         jail.create_file("config.toml", "top_k = 25\nmin_score = 0.4")?;
         jail.set_env("ARCHIVE_TOP_K", "7");
         jail.set_env("PINECONE_API_KEY", "pc-secret");
         jail.set_env("OPENAI_API_KEY", "sk-secret");

         let config =
            Config::load_from(Some(Path::new("config.toml"))).map_err(|e| e.to_string())?;
         assert_eq!(config.top_k, 7);
         assert!((config.min_score - 0.4).abs() < 1e-6);
         assert_eq!(config.pinecone_api_key, "pc-secret");
         assert_eq!(config.openai_api_key, "sk-secret");
         assert!(config.validate().is_empty());
         Ok(())
      });
   }

   #[test]
   fn redacted_toml_hides_credentials() {
      let config = Config {
         pinecone_api_key: "pcsk_abcdef123456".to_string(),
         ..Config::default()
      };
      let rendered = config.redacted().to_toml().unwrap();

      assert!(rendered.contains("pinecone_api_key = \"****3456\""));
      assert!(rendered.contains("openai_api_key = \"\""));
      assert!(rendered.contains("top_k = 10"));
      assert!(rendered.contains("chat_search_mode = \"dense\""));
      assert!(!rendered.contains("abcdef"));
   }

   #[test]
   fn validate_reports_missing_credentials() {
      let config = Config::default();
      assert_eq!(config.validate(), vec!["PINECONE_API_KEY", "OPENAI_API_KEY"]);
   }
}
