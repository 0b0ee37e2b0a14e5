//! Canned [`Transport`] for tests in this crate and its dependents.

use std::future::Future;
use std::sync::Mutex;

use reqwest::Url;

use crate::transport::{HttpResponse, Transport};
use crate::wire::GenerateRequest;
use crate::GenerateError;

#[derive(Debug, Clone)]
pub enum Reply {
    Respond(HttpResponse),
    Fail(String),
    /// Never completes; only cancellation ends the request.
    Hang,
}

impl Reply {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Reply::Respond(HttpResponse {
            status,
            body: body.into(),
        })
    }

    /// A 200 response carrying a single shader block.
    pub fn shader(text: &str) -> Self {
        let body = serde_json::json!({ "shader_code": [{ "text": text }] });
        Reply::json(200, body.to_string())
    }
}

/// Replies to every request with the same [`Reply`] and records what was sent.
#[derive(Debug)]
pub struct StubTransport {
    reply: Reply,
    requests: Mutex<Vec<(Url, GenerateRequest)>>,
}

impl StubTransport {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(Url, GenerateRequest)> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl Transport for StubTransport {
    fn post_json(
        &self,
        url: &Url,
        body: &GenerateRequest,
    ) -> impl Future<Output = Result<HttpResponse, GenerateError>> + Send {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((url.clone(), body.clone()));
        }
        let reply = self.reply.clone();
        async move {
            match reply {
                Reply::Respond(response) => Ok(response),
                Reply::Fail(reason) => Err(GenerateError::Transport(reason)),
                Reply::Hang => std::future::pending().await,
            }
        }
    }
}
