//! HTTP client for the price-oracle quote API.

mod client;
mod error;
mod types;

#[cfg(test)]
mod client_test;

pub use client::OracleClient;
pub use error::OracleError;
pub use types::QuoteResponse;
