//! Client for the text-to-shader generation service.
//!
//! A prompt goes out as `POST {endpoint}/api/generate-shader` with
//! `{"prompt": ...}`; the service answers `{"shader_code": [{"text": ...}]}`
//! and the first block's text is the fragment shader. The response is decoded
//! against a typed schema, the transport is injected, and every request can be
//! cancelled through a [`CancelToken`].

mod cancel;
mod config;
mod generator;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod transport;
mod wire;

pub use cancel::{CancelGuard, CancelToken};
pub use config::{
    ConfigError, GeneratorConfig, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT, ENV_ENDPOINT, GENERATE_PATH,
};
pub use generator::ShaderGenerator;
pub use reqwest::Url;
pub use transport::{HttpResponse, HttpTransport, Transport};
pub use wire::{decode_response, GenerateRequest, GenerateResponse, ShaderCode};

/// Why a generation request produced no shader source.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("shader request failed: {0}")]
    Transport(String),
    #[error("shader service responded with HTTP {0}")]
    Status(u16),
    #[error("malformed shader service response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("shader service response contained no shader code")]
    EmptyResponse,
    #[error("shader request was cancelled")]
    Cancelled,
}

impl GenerateError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GenerateError::Cancelled)
    }
}
