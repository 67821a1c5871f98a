use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Display(#[from] DisplayError),
}

#[derive(Error, Debug, Eq, PartialEq)]
pub enum DisplayError {
    #[error("display element not found: #{id}")]
    ElementNotFound { id: String },
}
