use chunkit_vector_store::VectorStoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

/// Shown when retrieval succeeds but finds nothing
pub const NO_RELEVANT_CONTENT: &str = "No relevant content found for this question.";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),

    #[error("Empty query")]
    EmptyQuery,

    #[error("{0}")]
    Other(String),
}

impl SearchError {
    /// Short reason suitable for an end user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyQuery => "Please enter a question.".to_string(),
            Self::VectorStoreError(VectorStoreError::UpstreamUnavailable { service, .. }) => {
                format!("The {service} service is unavailable right now, please try again later.")
            }
            Self::VectorStoreError(VectorStoreError::DimensionMismatch { .. }) => {
                "The embedding model does not match the index; rebuild the index.".to_string()
            }
            Self::VectorStoreError(err) => format!("Retrieval failed: {err}"),
            Self::Other(reason) => format!("Retrieval failed: {reason}"),
        }
    }

    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::VectorStoreError(err) if err.is_upstream())
    }
}
