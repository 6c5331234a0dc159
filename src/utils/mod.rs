//! Utility modules supporting lookups.
//!
//! - [`HttpClient`]: reqwest client configured from [`LookupConfig`](crate::config::LookupConfig)

mod http;

pub use http::HttpClient;
