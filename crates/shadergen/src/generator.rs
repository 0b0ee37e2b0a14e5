use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::GeneratorConfig;
use crate::transport::{HttpTransport, Transport};
use crate::wire::{decode_response, GenerateRequest};
use crate::GenerateError;

/// Turns a free-text prompt into fragment shader source via the remote service.
#[derive(Debug, Clone)]
pub struct ShaderGenerator<T> {
    config: GeneratorConfig,
    transport: T,
}

impl ShaderGenerator<HttpTransport> {
    /// Generator backed by a `reqwest` client honouring the configured timeout.
    pub fn http(config: GeneratorConfig) -> Result<Self, GenerateError> {
        let transport = HttpTransport::new(config.timeout())?;
        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> ShaderGenerator<T> {
    pub fn new(config: GeneratorConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issues one request for `prompt` and returns the first shader block.
    ///
    /// The request is abandoned as soon as `cancel` fires. No retries.
    pub async fn generate(
        &self,
        prompt: &str,
        cancel: &CancelToken,
    ) -> Result<String, GenerateError> {
        if prompt.trim().is_empty() {
            return Err(GenerateError::EmptyPrompt);
        }
        if cancel.is_cancelled() {
            return Err(GenerateError::Cancelled);
        }

        let url = self.config.generate_url();
        let request = GenerateRequest {
            prompt: prompt.to_string(),
        };
        debug!(%url, prompt_len = prompt.len(), "requesting generated shader");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("shader generation cancelled");
                return Err(GenerateError::Cancelled);
            }
            response = self.transport.post_json(url, &request) => response.inspect_err(|err| {
                warn!(error = %err, "shader request failed");
            })?,
        };

        if !response.is_success() {
            warn!(status = response.status, "shader service returned an error status");
            return Err(GenerateError::Status(response.status));
        }

        let source = decode_response(&response.body).inspect_err(|err| {
            warn!(error = %err, "shader service returned an unusable body");
        })?;
        info!(bytes = source.len(), "received generated shader");
        Ok(source)
    }
}
