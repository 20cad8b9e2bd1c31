use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error(
        "no CDS credentials: set CDSAPI_URL/CDSAPI_KEY or create {0} (see https://cds.climate.copernicus.eu/api-how-to)"
    )]
    MissingCredentials(String),

    #[error("bad configuration: {0}")]
    Config(String),

    #[error("retrieval task failed: {reason}")]
    TaskFailed { reason: String },

    #[error("unexpected response from CDS: {0}")]
    UnexpectedResponse(String),
}
