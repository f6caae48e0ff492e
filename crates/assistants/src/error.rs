//! Assistant error types

use careflow_types::AssistantType;
use thiserror::Error;

/// Errors raised by an assistant adapter
#[derive(Debug, Error)]
pub enum AssistantError {
    /// The injected model failed; wrapped, never swallowed
    #[error("{assistant_type} model call failed: {source}")]
    Model {
        assistant_type: AssistantType,
        #[source]
        source: anyhow::Error,
    },

    /// The request input did not deserialize into the expected shape
    #[error("invalid {assistant_type} input: {reason}")]
    InvalidInput {
        assistant_type: AssistantType,
        reason: String,
    },

    /// A produced suggestion failed to serialize
    #[error("{assistant_type} suggestion encoding failed: {source}")]
    Encoding {
        assistant_type: AssistantType,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;
