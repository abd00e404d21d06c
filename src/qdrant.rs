use crate::model::{CollectionSpec, Distance, Point};
use crate::service::{ServiceError, VectorService};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Qdrant REST client.
#[derive(Clone)]
pub struct QdrantClient {
    http: Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionDescription>,
}

#[derive(Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: Distance,
}

#[derive(Serialize)]
struct UpsertPoints<'a> {
    points: &'a [Point],
}

impl QdrantClient {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self, ServiceError> {
        Self::with_base_url(format!("http://{}:{}", host, port), timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        let raw = base_url.into();
        let base_url = Url::parse(&raw)
            .map_err(|e| ServiceError::Transport(format!("invalid base url '{}': {}", raw, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::Transport(format!("invalid base url '{}'", raw)));
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Appends `segments` to the base url, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ServiceError> {
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v["status"]["error"].as_str().map(str::to_string))
            .unwrap_or(body);
        tracing::debug!("Qdrant returned {}: {}", status, message);
        Err(ServiceError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn result<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;
        Ok(envelope.result)
    }
}

#[async_trait]
impl VectorService for QdrantClient {
    async fn list_collections(&self) -> Result<Vec<String>, ServiceError> {
        let response = self.send(self.http.get(self.endpoint(&["collections"]))).await?;
        let result: CollectionsResult = Self::result(response).await?;
        Ok(result.collections.into_iter().map(|c| c.name).collect())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), ServiceError> {
        let url = self.endpoint(&["collections", name]);
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), ServiceError> {
        let body = CreateCollection {
            vectors: VectorParams {
                size: spec.dimensionality,
                distance: spec.distance,
            },
        };
        let url = self.endpoint(&["collections", spec.name.as_str()]);
        self.send(self.http.put(url).json(&body)).await?;
        Ok(())
    }

    async fn upsert_points(&self, collection: &str, points: Vec<Point>) -> Result<(), ServiceError> {
        let url = self.endpoint(&["collections", collection, "points"]);
        let body = UpsertPoints { points: &points };
        // wait=true: the call returns only once the points are searchable.
        let request = self.http.put(url).query(&[("wait", "true")]).json(&body);
        self.send(request).await?;
        Ok(())
    }
}
