//! HTTP client for the IPFS pinning gateway.

mod client;
mod error;
mod types;


pub use client::PinClient;
pub use error::PinError;
pub use types::PinReceipt;
