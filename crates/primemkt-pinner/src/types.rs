use serde::Deserialize;

/// The gateway's answer to a pin request.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PinResponse {
    pub cid: Option<String>,
    pub path: Option<String>,
}

/// A committed pin: the content identifier and gateway path for the media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinReceipt {
    pub content_id: String,
    pub path: String,
}
