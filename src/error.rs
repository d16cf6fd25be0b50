use thiserror::Error;

/// Raised while setting up a listener; never deferred to the first event.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error("Unknown binary parser encoding `{0}`")]
    Encoding(String),

    #[error("Invalid listener settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Failed to compile filter expression `{expression}`: {message}")]
    Compile { expression: String, message: String },

    #[error("Failed to evaluate filter expression: {message}")]
    Evaluate { message: String },
}

/// A failed check of a response against its expectations.
#[derive(Error, Debug)]
pub enum AssertionError {
    #[error("Expected status code {expected}, but got {actual}")]
    Status { expected: u16, actual: u16 },

    #[error("Expected string value for header '{name}', but got '{kind}'")]
    HeaderType { name: String, kind: &'static str },

    #[error("Expected value '{expected}' for header '{name}', but got '{actual}'")]
    HeaderValue {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Value '{actual}' of header '{name}' does not match regex '{pattern}'")]
    HeaderPattern {
        name: String,
        actual: String,
        pattern: String,
    },

    #[error("Value of body '{body}' does not match regex '{pattern}'")]
    BodyPattern { body: String, pattern: String },

    #[error("Expected body '{expected}', but got '{actual}'")]
    BodyText { expected: String, actual: String },

    /// Both sides are hex encoded.
    #[error("Expected body '{expected}', but got '{actual}'")]
    BodyBytes { expected: String, actual: String },

    #[error("body value '{body}' does not match criteria")]
    BodyRejected { body: String },

    #[error("body value '{body}' does not match criteria: {detail}")]
    BodyRejectedWith { body: String, detail: String },

    #[error("Expected object '{expected}', but got '{actual}'")]
    BodyObject { expected: String, actual: String },

    #[error("Body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Type of expected body is not supported")]
    UnsupportedExpectation,
}

/// Why a single test event failed.
#[derive(Error, Debug)]
pub enum TestError {
    #[error(transparent)]
    Assertion(#[from] AssertionError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Invalid request: {0}")]
    Request(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
