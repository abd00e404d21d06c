//! Capability interface of the remote vector-search service.
//!
//! The loader only needs four operations. [`crate::qdrant::QdrantClient`] is the
//! production implementation; tests plug in in-memory doubles.

use crate::model::{CollectionSpec, Point};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("service returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait VectorService: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<String>, ServiceError>;

    async fn delete_collection(&self, name: &str) -> Result<(), ServiceError>;

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), ServiceError>;

    /// Inserts or overwrites `points`. They must be queryable once this returns.
    async fn upsert_points(&self, collection: &str, points: Vec<Point>) -> Result<(), ServiceError>;
}

#[async_trait]
impl<S: VectorService + ?Sized> VectorService for Arc<S> {
    async fn list_collections(&self) -> Result<Vec<String>, ServiceError> {
        (**self).list_collections().await
    }

    async fn delete_collection(&self, name: &str) -> Result<(), ServiceError> {
        (**self).delete_collection(name).await
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), ServiceError> {
        (**self).create_collection(spec).await
    }

    async fn upsert_points(&self, collection: &str, points: Vec<Point>) -> Result<(), ServiceError> {
        (**self).upsert_points(collection, points).await
    }
}
