use crate::model::CollectionSpec;
use crate::progress::{Progress, ProgressObserver};
use crate::service::{ServiceError, VectorService};

#[derive(Debug, thiserror::Error)]
pub enum ProvisionFailure {
    #[error("invalid collection spec: {0}")]
    InvalidSpec(String),

    #[error("failed to list collections")]
    List(#[source] ServiceError),

    #[error("failed to delete existing collection '{name}'")]
    Delete {
        name: String,
        #[source]
        source: ServiceError,
    },

    #[error("failed to create collection '{name}'")]
    Create {
        name: String,
        #[source]
        source: ServiceError,
    },
}

/// Makes `spec.name` exist with exactly `spec`'s parameters.
///
/// A same-named collection is deleted first, together with all of its points.
/// No other collection is touched and nothing is retried.
pub async fn provision<S>(
    session: &S,
    spec: &CollectionSpec,
    observer: &dyn ProgressObserver,
) -> Result<(), ProvisionFailure>
where
    S: VectorService + ?Sized,
{
    if spec.name.trim().is_empty() {
        return Err(ProvisionFailure::InvalidSpec("collection name is empty".into()));
    }
    if spec.dimensionality == 0 {
        return Err(ProvisionFailure::InvalidSpec("dimensionality must be at least 1".into()));
    }

    let existing = session
        .list_collections()
        .await
        .map_err(ProvisionFailure::List)?;

    if existing.iter().any(|c| c == &spec.name) {
        session
            .delete_collection(&spec.name)
            .await
            .map_err(|source| ProvisionFailure::Delete {
                name: spec.name.clone(),
                source,
            })?;
        observer.on_progress(&Progress::CollectionReplaced {
            name: spec.name.clone(),
        });
    }

    session
        .create_collection(spec)
        .await
        .map_err(|source| ProvisionFailure::Create {
            name: spec.name.clone(),
            source,
        })?;
    observer.on_progress(&Progress::created(spec));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Distance, Point};
    use crate::progress::NoopObserver;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        existing: Vec<String>,
        fail_list: bool,
        reject_delete: bool,
        reject_create: bool,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl VectorService for Recorder {
        async fn list_collections(&self) -> Result<Vec<String>, ServiceError> {
            self.calls.lock().unwrap().push("list".into());
            if self.fail_list {
                return Err(ServiceError::Transport("connection reset".into()));
            }
            Ok(self.existing.clone())
        }

        async fn delete_collection(&self, name: &str) -> Result<(), ServiceError> {
            self.calls.lock().unwrap().push(format!("delete {}", name));
            if self.reject_delete {
                return Err(ServiceError::Status {
                    status: 500,
                    message: "storage locked".into(),
                });
            }
            Ok(())
        }

        async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), ServiceError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("create {} {} {}", spec.name, spec.dimensionality, spec.distance));
            if self.reject_create {
                return Err(ServiceError::Status {
                    status: 400,
                    message: "bad name".into(),
                });
            }
            Ok(())
        }

        async fn upsert_points(&self, _c: &str, _p: Vec<Point>) -> Result<(), ServiceError> {
            unreachable!("provisioning never writes points")
        }
    }

    fn spec(name: &str, dim: usize) -> CollectionSpec {
        CollectionSpec {
            name: name.into(),
            dimensionality: dim,
            distance: Distance::Cosine,
        }
    }

    #[tokio::test]
    async fn test_creates_missing_collection() {
        let svc = Recorder {
            existing: vec!["other".into()],
            ..Default::default()
        };
        provision(&svc, &spec("vectors", 4), &NoopObserver).await.unwrap();
        assert_eq!(*svc.calls.lock().unwrap(), vec!["list", "create vectors 4 Cosine"]);
    }

    #[tokio::test]
    async fn test_replaces_existing_collection_only() {
        let svc = Recorder {
            existing: vec!["other".into(), "vectors".into()],
            ..Default::default()
        };
        let events = Mutex::new(Vec::new());
        let observer = |e: &Progress| events.lock().unwrap().push(e.clone());

        provision(&svc, &spec("vectors", 8), &observer).await.unwrap();
        assert_eq!(
            *svc.calls.lock().unwrap(),
            vec!["list", "delete vectors", "create vectors 8 Cosine"]
        );
        assert_eq!(
            events.lock().unwrap()[0],
            Progress::CollectionReplaced {
                name: "vectors".into()
            }
        );
    }

    #[tokio::test]
    async fn test_create_rejection_is_reported() {
        let svc = Recorder {
            reject_create: true,
            ..Default::default()
        };
        let err = provision(&svc, &spec("bad name", 4), &NoopObserver).await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionFailure::Create { ref name, source: ServiceError::Status { status: 400, .. } }
                if name == "bad name"
        ));
    }

    #[tokio::test]
    async fn test_list_failure_is_reported() {
        let svc = Recorder {
            fail_list: true,
            ..Default::default()
        };
        let err = provision(&svc, &spec("vectors", 4), &NoopObserver).await.unwrap_err();
        assert!(matches!(err, ProvisionFailure::List(ServiceError::Transport(_))));
        assert_eq!(*svc.calls.lock().unwrap(), vec!["list"]);
    }

    #[tokio::test]
    async fn test_delete_failure_skips_create() {
        let svc = Recorder {
            existing: vec!["vectors".into()],
            reject_delete: true,
            ..Default::default()
        };
        let err = provision(&svc, &spec("vectors", 4), &NoopObserver).await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionFailure::Delete { ref name, source: ServiceError::Status { status: 500, .. } }
                if name == "vectors"
        ));
        assert_eq!(*svc.calls.lock().unwrap(), vec!["list", "delete vectors"]);
    }

    #[tokio::test]
    async fn test_invalid_spec_never_reaches_service() {
        let svc = Recorder::default();
        let err = provision(&svc, &spec("", 4), &NoopObserver).await.unwrap_err();
        assert!(matches!(err, ProvisionFailure::InvalidSpec(_)));
        let err = provision(&svc, &spec("v", 0), &NoopObserver).await.unwrap_err();
        assert!(matches!(err, ProvisionFailure::InvalidSpec(_)));
        assert!(svc.calls.lock().unwrap().is_empty());
    }
}
