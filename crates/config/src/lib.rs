//! Configuration loading for the oauthkeep stores and CLI.
//!
//! Uses figment to layer defaults, a YAML file and `OAUTHKEEP_*` environment
//! variables into a single [`Config`].

pub mod schema;

pub use schema::{ClientTableConfig, Config, GcConfig, LogConfig, TokenTableConfig};
