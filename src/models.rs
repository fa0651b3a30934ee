use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Standard success envelope: payload plus a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ApiResponse<T> {
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
        }
    }
}

/// Placeholder payload for endpoints whose success carries no data.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EmptyResponse {}
