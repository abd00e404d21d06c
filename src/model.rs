use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dense row-major matrix of vectors, all sharing one dimensionality.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSet {
    data: Vec<f32>,
    dim: usize,
}

impl VectorSet {
    /// Builds a set from contiguous row-major values.
    ///
    /// Returns `None` when `dim` is zero or `data` is not a whole number of rows.
    pub fn from_flat(data: Vec<f32>, dim: usize) -> Option<Self> {
        if dim == 0 || data.len() % dim != 0 {
            return None;
        }
        Some(Self { data, dim })
    }

    pub fn from_rows(rows: &[Vec<f32>], dim: usize) -> Option<Self> {
        if rows.iter().any(|r| r.len() != dim) {
            return None;
        }
        Self::from_flat(rows.concat(), dim)
    }

    pub fn rows(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn dimensionality(&self) -> usize {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        let start = i.checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    pub fn iter(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.dim)
    }
}

/// Similarity function fixed on a collection at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Distance {
    #[default]
    Cosine,
    Euclid,
    Dot,
    Manhattan,
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Distance::Cosine => "Cosine",
            Distance::Euclid => "Euclid",
            Distance::Dot => "Dot",
            Distance::Manhattan => "Manhattan",
        };
        f.write_str(s)
    }
}

impl FromStr for Distance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Distance::Cosine),
            "euclid" | "euclidean" | "l2" => Ok(Distance::Euclid),
            "dot" => Ok(Distance::Dot),
            "manhattan" | "l1" => Ok(Distance::Manhattan),
            other => Err(format!(
                "unknown distance metric '{}' (expected cosine|euclid|dot|manhattan)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    pub dimensionality: usize,
    pub distance: Distance,
}

impl CollectionSpec {
    pub fn for_vectors(name: impl Into<String>, vectors: &VectorSet, distance: Distance) -> Self {
        Self {
            name: name.into(),
            dimensionality: vectors.dimensionality(),
            distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub index: u64,
}

/// One record sent to the service. `id` and `payload.index` both equal the source row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

impl Point {
    pub fn from_row(index: usize, row: &[f32]) -> Self {
        let index = index as u64;
        Self {
            id: index,
            vector: row.to_vec(),
            payload: PointPayload { index },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub total_uploaded: usize,
    pub batches: usize,
}
