//! Hybrid dense/sparse retrieval and retrieval-augmented chat over the DPRG
//! mailing list archive.

pub mod chat;
pub mod config;
pub mod embed;
pub mod error;
pub mod filter;
pub mod search;
pub mod store;
pub mod types;

pub use error::{Error, Result};
