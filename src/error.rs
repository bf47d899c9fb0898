/// Failures talking to the Naver APIs.
///
/// Every variant is terminal for the operation that produced it; nothing in
/// the crate retries. The rank scanner keeps whatever it found before the
/// error, the keyword pipeline surfaces it to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),
}
