//! HTTP plumbing behind [`crate::ShaderGenerator`].
//!
//! The generator only needs "POST this JSON, give me status and body", so the
//! transport is a trait: production code plugs in [`HttpTransport`], tests
//! plug in a canned responder.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use tracing::debug;

use crate::wire::GenerateRequest;
use crate::GenerateError;

/// Raw outcome of a request that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport: Send + Sync {
    /// Sends `body` as JSON. Errors are reserved for requests that never
    /// produced a response (DNS, connect, timeout, TLS).
    fn post_json(
        &self,
        url: &Url,
        body: &GenerateRequest,
    ) -> impl Future<Output = Result<HttpResponse, GenerateError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, GenerateError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| GenerateError::Transport(err.to_string()))?;
        Ok(Self { http })
    }

    /// Wraps a preconfigured client (proxies, TLS roots, default headers).
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

impl Transport for HttpTransport {
    fn post_json(
        &self,
        url: &Url,
        body: &GenerateRequest,
    ) -> impl Future<Output = Result<HttpResponse, GenerateError>> + Send {
        async move {
            debug!(%url, "posting shader request");
            let response = self
                .http
                .post(url.clone())
                .json(body)
                .send()
                .await
                .map_err(|err| GenerateError::Transport(format!("requesting {url}: {err}")))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|err| GenerateError::Transport(format!("reading response: {err}")))?;
            Ok(HttpResponse { status, body })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    /// Serves exactly one request and hands back the raw request text.
    fn serve_once(status_line: &'static str, body: &'static str) -> (Url, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = Url::parse(&format!(
            "http://{}/api/generate-shader",
            listener.local_addr().unwrap()
        ))
        .unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let read = stream.read(&mut chunk).unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..read]);
                let text = String::from_utf8_lossy(&request);
                if let Some(split) = text.find("\r\n\r\n") {
                    let expected = text[..split]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= split + 4 + expected {
                        break;
                    }
                }
            }
            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8(request).unwrap()
        });
        (url, handle)
    }

    fn local_transport() -> HttpTransport {
        HttpTransport::with_client(
            Client::builder()
                .no_proxy()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn posts_json_and_returns_body() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"shader_code":[{"text":"void main(){}"}]}"#,
        );
        let transport = local_transport();
        let response = transport
            .post_json(&url, &GenerateRequest { prompt: "red circle".into() })
            .await
            .unwrap();

        assert!(response.is_success());
        assert!(response.body.contains("void main(){}"));

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /api/generate-shader HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(request.ends_with(r#"{"prompt":"red circle"}"#));
    }

    #[tokio::test]
    async fn error_status_is_not_a_transport_error() {
        let (url, server) = serve_once("HTTP/1.1 503 Service Unavailable", "{}");
        let transport = local_transport();
        let response = transport
            .post_json(&url, &GenerateRequest { prompt: "x".into() })
            .await
            .unwrap();
        assert_eq!(response.status, 503);
        assert!(!response.is_success());
        server.join().unwrap();
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = Url::parse(&format!("http://127.0.0.1:{port}/api/generate-shader")).unwrap();
        let transport = local_transport();
        let err = transport
            .post_json(&url, &GenerateRequest { prompt: "x".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Transport(_)));
    }
}
