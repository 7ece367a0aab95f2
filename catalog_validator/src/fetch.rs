// Copyright 2025 Lincoln Institute of Land Policy
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use log::{debug, info};
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::error::{Result, ValidatorError};
use crate::input::{decode_utf8, ReadProgress};
use crate::settings::Settings;
use crate::syntax::RdfSyntax;

/// A retrieved remote document.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: String,
    pub content_type: Option<String>,
}

/// The `Accept` header we send: every syntax the engine reads, Turtle first.
pub fn accept_header() -> String {
    let mut accepted: Vec<String> = Vec::new();
    for (index, syntax) in RdfSyntax::all()
        .into_iter()
        .filter(RdfSyntax::is_supported)
        .enumerate()
    {
        if index == 0 {
            accepted.push(syntax.media_type().to_string());
        } else {
            accepted.push(format!("{};q=0.9", syntax.media_type()));
        }
    }
    accepted.push("*/*;q=0.1".to_string());
    accepted.join(", ")
}

/// GET `url`, streaming the body and reporting progress after each chunk.
pub async fn fetch(
    url: &str,
    settings: &Settings,
    mut on_progress: impl FnMut(ReadProgress),
) -> Result<Fetched> {
    let fetch_error = |message: String| ValidatorError::Fetch {
        url: url.to_string(),
        message,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.fetch_timeout_secs))
        .build()
        .map_err(|e| fetch_error(e.to_string()))?;

    let mut response = client
        .get(url)
        .header(ACCEPT, accept_header())
        .send()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_error(format!("server answered {status}")));
    }
    let total = response.content_length();
    if let Some(size) = total.filter(|size| *size > settings.max_input_bytes) {
        return Err(ValidatorError::InputTooLarge {
            size,
            max: settings.max_input_bytes,
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    debug!("{} answered with content type {:?}", url, content_type);

    let mut body = Vec::with_capacity(total.unwrap_or_default().min(settings.max_input_bytes) as usize);
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| fetch_error(e.to_string()))?
    {
        body.extend_from_slice(&chunk);
        let bytes_read = body.len() as u64;
        if bytes_read > settings.max_input_bytes {
            return Err(ValidatorError::InputTooLarge {
                size: bytes_read,
                max: settings.max_input_bytes,
            });
        }
        on_progress(ReadProgress { bytes_read, total });
    }
    info!("Retrieved {} bytes from {}", body.len(), url);

    Ok(Fetched {
        body: decode_utf8(body)?,
        content_type,
    })
}

/// A loopback HTTP server handing out fixed documents, one connection per
/// request.
#[cfg(test)]
pub(crate) mod test_server {
    use std::sync::{Arc, Mutex};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    pub(crate) struct Route {
        pub path: &'static str,
        pub content_type: &'static str,
        pub body: String,
        /// Send `Content-Length`; without it the body runs to end of stream.
        pub with_length: bool,
    }

    impl Route {
        pub(crate) fn new(path: &'static str, content_type: &'static str, body: impl Into<String>) -> Self {
            Self {
                path,
                content_type,
                body: body.into(),
                with_length: true,
            }
        }

        pub(crate) fn without_length(mut self) -> Self {
            self.with_length = false;
            self
        }

        fn response(&self) -> String {
            let length = if self.with_length {
                format!("Content-Length: {}\r\n", self.body.len())
            } else {
                String::new()
            };
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {}\r\n{length}Connection: close\r\n\r\n{}",
                self.content_type, self.body
            )
        }
    }

    /// Returns the base URL and the log of requested paths.
    pub(crate) async fn serve(routes: Vec<Route>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requested = Arc::new(Mutex::new(Vec::new()));
        let log = requested.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buffer = [0u8; 1024];
                while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                    match socket.read(&mut buffer).await {
                        Ok(0) | Err(_) => break,
                        Ok(read) => request.extend_from_slice(&buffer[..read]),
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                log.lock().unwrap().push(path.clone());

                let response = match routes.iter().find(|route| route.path == path) {
                    Some(route) => route.response(),
                    None => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_string(),
                };
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (base, requested)
    }
}

#[cfg(test)]
mod tests {
    use super::test_server::{serve, Route};
    use super::{accept_header, fetch};
    use crate::error::ValidatorError;
    use crate::input::{load, InputSource};
    use crate::rdf::parse_document;
    use crate::settings::Settings;
    use crate::syntax::RdfSyntax;

    #[test]
    fn accept_header_prefers_turtle() {
        let header = accept_header();
        assert!(header.starts_with("text/turtle, "));
        assert!(header.contains("application/rdf+xml;q=0.9"));
        assert!(header.contains("application/ld+json;q=0.9"));
        assert!(!header.contains("text/n3"));
        assert!(header.ends_with("*/*;q=0.1"));
    }

    #[tokio::test]
    async fn unreachable_hosts_are_reported() {
        let settings = Settings {
            fetch_timeout_secs: 2,
            ..Settings::default()
        };
        // nothing listens on the discard port of the loopback interface
        let err = fetch("http://127.0.0.1:9/catalog.ttl", &settings, |_| {})
            .await
            .unwrap_err();
        match err {
            ValidatorError::Fetch { url, .. } => assert_eq!(url, "http://127.0.0.1:9/catalog.ttl"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[tokio::test]
    async fn content_type_and_base_iri_come_from_the_response() {
        let (base, _) = serve(vec![
            Route::new(
                "/catalog",
                "text/turtle; charset=utf-8",
                "@prefix dcat: <http://www.w3.org/ns/dcat#> .\n<> dcat:dataset <datasets/1> .\n",
            ),
            Route::new(
                "/dump.nt",
                "application/n-quads",
                "<http://ex.org/a> <http://ex.org/p> \"1\" <http://ex.org/g> .\n",
            ),
        ])
        .await;
        let settings = Settings::default();

        let url = format!("{base}/catalog");
        let input = load(&InputSource::Url(url.clone()), None, &settings).await.unwrap();
        assert_eq!(input.syntax, RdfSyntax::Turtle);
        assert_eq!(input.origin, url);
        assert_eq!(input.base_iri.as_deref(), Some(url.as_str()));
        let document =
            parse_document(&input.content, input.syntax, input.base_iri.as_deref(), &input.origin)
                .unwrap();
        let dataset = format!("{base}/datasets/1");
        assert!(document
            .graph
            .iter()
            .any(|triple| triple.object.to_string() == format!("<{dataset}>")));

        // the server's media type beats the extension
        let input = load(&InputSource::Url(format!("{base}/dump.nt")), None, &settings)
            .await
            .unwrap();
        assert_eq!(input.syntax, RdfSyntax::NQuads);
    }

    #[tokio::test]
    async fn error_statuses_are_reported() {
        let (base, _) = serve(Vec::new()).await;
        let url = format!("{base}/missing.ttl");
        match fetch(&url, &Settings::default(), |_| {}).await.unwrap_err() {
            ValidatorError::Fetch { url: failed, message } => {
                assert_eq!(failed, url);
                assert!(message.contains("404"), "{message}");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[tokio::test]
    async fn streamed_bodies_respect_the_limit() {
        let (base, _) = serve(vec![
            Route::new("/big.ttl", "text/turtle", "#".repeat(200)).without_length(),
            Route::new("/small.ttl", "text/turtle", "# ok\n").without_length(),
        ])
        .await;
        let settings = Settings {
            max_input_bytes: 100,
            ..Settings::default()
        };

        let err = fetch(&format!("{base}/big.ttl"), &settings, |_| {}).await.unwrap_err();
        assert!(matches!(err, ValidatorError::InputTooLarge { max: 100, .. }), "{err}");

        let mut progress = Vec::new();
        let fetched = fetch(&format!("{base}/small.ttl"), &settings, |read| progress.push(read))
            .await
            .unwrap();
        assert_eq!(fetched.body, "# ok\n");
        assert_eq!(progress.last().map(|read| read.bytes_read), Some(5));
        assert_eq!(progress.last().and_then(|read| read.total), None);
    }
}
