//! Remote text-understanding collaborator
//!
//! Contract: `POST {endpoint}` with `{ "chats": [...] }`, answered by
//! `{ "symptoms": [...], "medications": [...], "lifestyle": {...},
//! "insights": [...] }`. Every failure is reported as an error so the caller
//! can fall back to local heuristics.

use super::types::Extraction;
use crate::error::{Error, Result};
use crate::session::ChatSession;
use async_trait::async_trait;
use serde::Serialize;

/// A service that extracts a health timeline from sessions
#[async_trait]
pub trait InsightCollaborator: Send + Sync {
    /// Extract symptoms, medications, lifestyle factors and insights
    async fn extract(&self, chats: &[ChatSession]) -> Result<Extraction>;
}

#[derive(Serialize)]
struct ExtractionRequest<'a> {
    chats: &'a [ChatSession],
}

/// JSON-over-HTTP collaborator
pub struct HttpInsightCollaborator {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpInsightCollaborator {
    /// Create a collaborator for an endpoint URL
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InsightCollaborator for HttpInsightCollaborator {
    async fn extract(&self, chats: &[ChatSession]) -> Result<Extraction> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ExtractionRequest { chats })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Collaborator(format!(
                "Insight endpoint returned {}",
                status
            )));
        }

        response
            .json::<Extraction>()
            .await
            .map_err(|e| Error::Collaborator(format!("Malformed insight response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InsightsConfig;
    use crate::crypto::{CryptoStore, EncryptionKey};
    use crate::insights::{InsightEngine, InsightSource};
    use crate::session::Message;
    use crate::storage::{MemoryBackend, RecordStore};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer every request on a local port with a fixed raw HTTP response
    async fn serve(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}/extract", addr)
    }

    /// Consume headers and a `Content-Length` body
    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            request.extend_from_slice(&chunk[..n]);
            let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&request[..end]).to_lowercase();
            let length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= end + 4 + length {
                return;
            }
        }
    }

    fn chats() -> Vec<ChatSession> {
        vec![ChatSession {
            id: "c1".to_string(),
            topic: "Headache".to_string(),
            created_at: chrono::Utc::now(),
            messages: vec![
                Message::user("I have a headache"),
                Message::assistant("Rest and drink water."),
            ],
            pinned: false,
            rating: None,
        }]
    }

    fn engine_for(endpoint: String) -> InsightEngine {
        let store = Arc::new(RecordStore::new(
            CryptoStore::new(Arc::new(MemoryBackend::new()), Some(EncryptionKey::generate())),
            Arc::new(MemoryBackend::new()),
        ));
        let collaborator: Arc<dyn InsightCollaborator> =
            Arc::new(HttpInsightCollaborator::new(endpoint));
        let config = InsightsConfig {
            timeout_ms: 5_000,
            ..Default::default()
        };
        InsightEngine::new(store, Some(collaborator), config)
    }

    #[test]
    fn test_request_shape() {
        let chat = ChatSession {
            id: "c1".to_string(),
            topic: "Headache".to_string(),
            created_at: chrono::Utc::now(),
            messages: vec![Message::user("I have a headache")],
            pinned: false,
            rating: None,
        };
        let chats = vec![chat];
        let body = serde_json::to_value(ExtractionRequest { chats: &chats }).unwrap();
        assert_eq!(body["chats"][0]["id"], "c1");
        assert_eq!(body["chats"][0]["messages"][0]["isUser"], true);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        let collaborator = HttpInsightCollaborator::new("http://127.0.0.1:9/extract");
        assert_eq!(collaborator.endpoint(), "http://127.0.0.1:9/extract");
        assert!(collaborator.extract(&[]).await.is_err());
    }

    #[tokio::test]
    async fn test_error_status_is_collaborator_error() {
        let endpoint = serve("503 Service Unavailable", "{}").await;
        let collaborator = HttpInsightCollaborator::new(endpoint.clone());

        let err = collaborator.extract(&chats()).await.unwrap_err();
        assert!(matches!(&err, Error::Collaborator(msg) if msg.contains("503")));

        let snapshot = engine_for(endpoint).refresh(&chats()).await.unwrap().unwrap();
        assert_eq!(snapshot.source, InsightSource::Heuristic);
    }

    #[tokio::test]
    async fn test_malformed_body_is_collaborator_error() {
        let endpoint = serve("200 OK", r#"{"symptoms":"oops"}"#).await;
        let collaborator = HttpInsightCollaborator::new(endpoint.clone());

        let err = collaborator.extract(&chats()).await.unwrap_err();
        assert!(matches!(&err, Error::Collaborator(msg) if msg.starts_with("Malformed")));

        let snapshot = engine_for(endpoint).refresh(&chats()).await.unwrap().unwrap();
        assert_eq!(snapshot.source, InsightSource::Heuristic);
    }

    #[tokio::test]
    async fn test_well_formed_body_is_used() {
        let endpoint = serve(
            "200 OK",
            r#"{"symptoms":[],"medications":[{"name":"Metformin","startDate":"2024-05-01T08:00:00.000Z","frequency":"daily"}]}"#,
        )
        .await;

        let snapshot = engine_for(endpoint).refresh(&chats()).await.unwrap().unwrap();
        assert_eq!(snapshot.source, InsightSource::Remote);
        assert_eq!(snapshot.medications[0].name, "Metformin");
        assert_eq!(snapshot.health_score, 97);
    }
}
