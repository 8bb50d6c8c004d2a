use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
   /// Malformed query; raised before any network call.
   #[error("{0}")]
   Validation(String),

   #[error("{engine} search failed: {reason}")]
   Engine { engine: &'static str, reason: String },

   #[error("{engine} search timed out after {after_ms}ms")]
   Timeout { engine: &'static str, after_ms: u64 },

   #[error("embedding failed: {0}")]
   Embedding(String),

   #[error("chat completion with {model} failed: {reason}")]
   Generation { model: String, reason: String },

   #[error("configuration error: {0}")]
   Config(#[from] Box<figment::Error>),

   #[error("http error: {0}")]
   Http(#[from] reqwest::Error),

   #[error("toml error: {0}")]
   Toml(#[from] toml::ser::Error),

   #[error("json error: {0}")]
   Json(#[from] serde_json::Error),

   #[error("io error: {0}")]
   Io(#[from] std::io::Error),

   #[error("invalid highlight pattern: {0}")]
   Regex(#[from] regex::Error),
}

impl Error {
   pub fn validation(msg: impl Into<String>) -> Self {
      Self::Validation(msg.into())
   }

   pub const fn is_validation(&self) -> bool {
      matches!(self, Self::Validation(_))
   }
}

impl From<figment::Error> for Error {
   fn from(err: figment::Error) -> Self {
      Self::Config(Box::new(err))
   }
}
