use serde::Deserialize;

/// A quote for one currency symbol.
///
/// `usd` is `null` when the provider has no current quote for the symbol;
/// callers treat that as "skip this observation", not as an error.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteResponse {
    pub symbol: String,
    pub usd: Option<f64>,
}
