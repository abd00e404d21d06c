#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use vector_loader::{CollectionSpec, Point, ServiceError, VectorService};

const NPY_MAGIC: &[u8] = b"\x93NUMPY";

/// Writes a v1.0 little-endian float32 `.npy` file.
pub fn write_npy(dir: &Path, name: &str, shape: &[usize], values: &[f32]) -> PathBuf {
    let shape_src = match shape {
        [n] => format!("({},)", n),
        dims => format!(
            "({})",
            dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
        ),
    };
    let mut hdr = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': {}, }}",
        shape_src
    )
    .into_bytes();
    while (10 + hdr.len() + 1) % 64 != 0 {
        hdr.push(b' ');
    }
    hdr.push(b'\n');

    let mut buf = Vec::new();
    buf.extend_from_slice(NPY_MAGIC);
    buf.extend_from_slice(&[1, 0]);
    buf.extend_from_slice(&(hdr.len() as u16).to_le_bytes());
    buf.extend_from_slice(&hdr);
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    let path = dir.join(name);
    std::fs::write(&path, buf).unwrap();
    path
}

/// `rows x dim` matrix where every value encodes its own position.
pub fn matrix(rows: usize, dim: usize) -> Vec<f32> {
    (0..rows * dim).map(|i| i as f32 / 8.0).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredCollection {
    pub spec: CollectionSpec,
    pub points: BTreeMap<u64, Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    Delete(String),
    Create(CollectionSpec),
    Upsert { collection: String, ids: Vec<u64> },
}

/// In-memory stand-in for the vector service. Shared through `Arc` so a test
/// can inspect it after the pipeline drops its session.
#[derive(Default)]
pub struct MemoryService {
    pub collections: Mutex<HashMap<String, StoredCollection>>,
    pub calls: Mutex<Vec<Call>>,
    pub opens: AtomicU32,
    pub unhealthy: bool,
    pub reject_create: bool,
    pub fail_upsert_call: Option<usize>,
    pub upserts: AtomicU32,
}

impl MemoryService {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn upsert_batches(&self) -> Vec<Vec<u64>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Upsert { ids, .. } => Some(ids),
                _ => None,
            })
            .collect()
    }

    pub fn snapshot(&self) -> HashMap<String, StoredCollection> {
        self.collections.lock().unwrap().clone()
    }

    pub fn seed(&self, spec: CollectionSpec, points: Vec<Point>) {
        let points = points.into_iter().map(|p| (p.id, p)).collect();
        self.collections
            .lock()
            .unwrap()
            .insert(spec.name.clone(), StoredCollection { spec, points });
    }
}

/// Opener handing out the shared instance, counting calls.
pub fn opener(svc: &Arc<MemoryService>) -> impl FnMut() -> Result<Arc<MemoryService>, ServiceError> {
    let svc = Arc::clone(svc);
    move || {
        svc.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&svc))
    }
}

#[async_trait]
impl VectorService for MemoryService {
    async fn list_collections(&self) -> Result<Vec<String>, ServiceError> {
        self.calls.lock().unwrap().push(Call::List);
        if self.unhealthy {
            return Err(ServiceError::Transport("connection refused".into()));
        }
        let mut names: Vec<String> = self.collections.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete_collection(&self, name: &str) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(Call::Delete(name.to_string()));
        self.collections.lock().unwrap().remove(name);
        Ok(())
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(Call::Create(spec.clone()));
        if self.reject_create {
            return Err(ServiceError::Status {
                status: 403,
                message: "forbidden".into(),
            });
        }
        let mut collections = self.collections.lock().unwrap();
        if collections.contains_key(&spec.name) {
            return Err(ServiceError::Status {
                status: 409,
                message: format!("collection {} already exists", spec.name),
            });
        }
        collections.insert(
            spec.name.clone(),
            StoredCollection {
                spec: spec.clone(),
                points: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn upsert_points(&self, collection: &str, points: Vec<Point>) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(Call::Upsert {
            collection: collection.to_string(),
            ids: points.iter().map(|p| p.id).collect(),
        });
        let n = self.upserts.fetch_add(1, Ordering::SeqCst) as usize;
        if self.fail_upsert_call == Some(n) {
            return Err(ServiceError::Status {
                status: 500,
                message: "disk full".into(),
            });
        }
        let mut collections = self.collections.lock().unwrap();
        let stored = collections.get_mut(collection).ok_or_else(|| ServiceError::Status {
            status: 404,
            message: format!("collection {} not found", collection),
        })?;
        for p in points {
            if p.vector.len() != stored.spec.dimensionality {
                return Err(ServiceError::Status {
                    status: 400,
                    message: "wrong vector dimension".into(),
                });
            }
            stored.points.insert(p.id, p);
        }
        Ok(())
    }
}
