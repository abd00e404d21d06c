//! NumPy `.npy` reader producing a [`VectorSet`].
//!
//! Layout of a `.npy` file:
//!   - Magic:   \x93NUMPY
//!   - Version: major, minor (1.0, 2.0 or 3.0)
//!   - Header:  little-endian length (u16 for v1, u32 for v2/v3) followed by a
//!              Python dict literal with `descr`, `fortran_order` and `shape`
//!   - Data:    raw elements, C or Fortran order
//!
//! Only exactly two-dimensional numeric arrays are accepted. Every element is
//! converted to `f32`.

use crate::model::VectorSet;
use std::io;
use std::path::{Path, PathBuf};

pub const NPY_MAGIC: &[u8] = b"\x93NUMPY";

#[derive(Debug, thiserror::Error)]
pub enum ArrayError {
    #[error("file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("expected a 2-D array, got {ndim}-D array with shape {shape:?}")]
    Shape { ndim: usize, shape: Vec<usize> },

    #[error("malformed .npy data: {0}")]
    Format(String),

    #[error("unsupported dtype '{0}'")]
    UnsupportedDtype(String),

    #[error("non-finite value at row {row}, column {column}")]
    NonFinite { row: usize, column: usize },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Float,
    Int,
    Uint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dtype {
    kind: Kind,
    size: usize,
    big_endian: bool,
}

impl Dtype {
    fn parse(descr: &str) -> Result<Self, ArrayError> {
        let unsupported = || ArrayError::UnsupportedDtype(descr.to_string());
        let mut chars = descr.chars().peekable();
        let big_endian = match chars.peek() {
            Some('<') | Some('|') => {
                chars.next();
                false
            }
            Some('>') => {
                chars.next();
                true
            }
            Some('=') => {
                chars.next();
                cfg!(target_endian = "big")
            }
            _ => false,
        };
        let kind = match chars.next() {
            Some('f') => Kind::Float,
            Some('i') => Kind::Int,
            Some('u') => Kind::Uint,
            _ => return Err(unsupported()),
        };
        let size: usize = chars.collect::<String>().parse().map_err(|_| unsupported())?;
        let ok = match kind {
            Kind::Float => matches!(size, 4 | 8),
            Kind::Int | Kind::Uint => matches!(size, 1 | 2 | 4 | 8),
        };
        if !ok {
            return Err(unsupported());
        }
        Ok(Self { kind, size, big_endian })
    }

    fn read(&self, b: &[u8]) -> f64 {
        macro_rules! num {
            ($t:ty, $n:literal, $be:expr, $b:expr) => {{
                let mut raw = [0u8; $n];
                raw.copy_from_slice(&$b[..$n]);
                if $be {
                    <$t>::from_be_bytes(raw)
                } else {
                    <$t>::from_le_bytes(raw)
                }
            }};
        }
        let be = self.big_endian;
        match (self.kind, self.size) {
            (Kind::Float, 4) => num!(f32, 4, be, b) as f64,
            (Kind::Float, 8) => num!(f64, 8, be, b),
            (Kind::Int, 1) => b[0] as i8 as f64,
            (Kind::Int, 2) => num!(i16, 2, be, b) as f64,
            (Kind::Int, 4) => num!(i32, 4, be, b) as f64,
            (Kind::Int, 8) => num!(i64, 8, be, b) as f64,
            (Kind::Uint, 1) => b[0] as f64,
            (Kind::Uint, 2) => num!(u16, 2, be, b) as f64,
            (Kind::Uint, 4) => num!(u32, 4, be, b) as f64,
            (Kind::Uint, 8) => num!(u64, 8, be, b) as f64,
            // Dtype::parse rejects every other combination.
            _ => f64::NAN,
        }
    }
}

#[derive(Debug)]
struct NpyHeader {
    dtype: Dtype,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// Reads and decodes a 2-D array file. The file is never modified.
pub async fn load(path: impl AsRef<Path>) -> Result<VectorSet, ArrayError> {
    let path = path.as_ref();
    tracing::info!("Loading vectors from {}", path.display());

    let raw = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ArrayError::NotFound(path.to_path_buf()),
        _ => ArrayError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let vectors = decode(&raw)?;
    tracing::info!(
        "Loaded {} vectors of dimensionality {}",
        vectors.rows(),
        vectors.dimensionality()
    );
    Ok(vectors)
}

/// Decodes an in-memory `.npy` image.
pub fn decode(data: &[u8]) -> Result<VectorSet, ArrayError> {
    let (header, offset) = parse_header(data)?;

    let (rows, cols) = match *header.shape.as_slice() {
        [rows, cols] if cols > 0 => (rows, cols),
        _ => {
            return Err(ArrayError::Shape {
                ndim: header.shape.len(),
                shape: header.shape.clone(),
            })
        }
    };

    let item = header.dtype.size;
    let expected = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(item))
        .ok_or_else(|| ArrayError::Format(format!("shape ({}, {}) overflows", rows, cols)))?;
    let body = &data[offset..];
    if body.len() < expected {
        return Err(ArrayError::Format(format!(
            "data section too small: expected {} bytes, got {}",
            expected,
            body.len()
        )));
    }

    let mut values = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for column in 0..cols {
            let element = if header.fortran_order {
                column * rows + row
            } else {
                row * cols + column
            };
            let v = header.dtype.read(&body[element * item..(element + 1) * item]);
            if !v.is_finite() {
                return Err(ArrayError::NonFinite { row, column });
            }
            if v.abs() > f32::MAX as f64 {
                return Err(ArrayError::Format(format!(
                    "value {} at row {}, column {} does not fit in f32",
                    v, row, column
                )));
            }
            values.push(v as f32);
        }
    }

    VectorSet::from_flat(values, cols)
        .ok_or_else(|| ArrayError::Format("decoded element count does not match shape".into()))
}

fn parse_header(data: &[u8]) -> Result<(NpyHeader, usize), ArrayError> {
    if !data.starts_with(NPY_MAGIC) || data.len() < 10 {
        return Err(ArrayError::Format("not a .npy file (bad magic bytes)".into()));
    }

    let (major, minor) = (data[6], data[7]);
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([data[8], data[9]]) as usize, 10usize),
        2 | 3 if data.len() >= 12 => (
            u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize,
            12usize,
        ),
        2 | 3 => return Err(ArrayError::Format("truncated header length".into())),
        _ => {
            return Err(ArrayError::Format(format!(
                "unsupported .npy version {}.{}",
                major, minor
            )))
        }
    };

    let header_end = header_start + header_len;
    if data.len() < header_end {
        return Err(ArrayError::Format("file too short for declared header".into()));
    }
    let text = std::str::from_utf8(&data[header_start..header_end])
        .map_err(|_| ArrayError::Format("header is not valid UTF-8".into()))?;

    let descr = dict_value(text, "descr")
        .and_then(quoted)
        .ok_or_else(|| ArrayError::Format("missing 'descr' key".into()))?;
    let dtype = Dtype::parse(descr)?;

    let fortran_order = match dict_value(text, "fortran_order") {
        Some(v) if v.starts_with("True") => true,
        Some(v) if v.starts_with("False") => false,
        _ => return Err(ArrayError::Format("missing 'fortran_order' key".into())),
    };

    let shape_src = dict_value(text, "shape")
        .filter(|v| v.starts_with('('))
        .and_then(|v| v.find(')').map(|end| &v[1..end]))
        .ok_or_else(|| ArrayError::Format("missing 'shape' tuple".into()))?;
    let shape = shape_src
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| ArrayError::Format(format!("bad shape entry '{}'", s)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((
        NpyHeader {
            dtype,
            fortran_order,
            shape,
        },
        header_end,
    ))
}

/// Text following `'key':` in the header dict, with leading whitespace removed.
fn dict_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    ['\'', '"'].iter().find_map(|q| {
        let needle = format!("{q}{key}{q}");
        let at = header.find(&needle)? + needle.len();
        let rest = header[at..].trim_start().strip_prefix(':')?;
        Some(rest.trim_start())
    })
}

fn quoted(value: &str) -> Option<&str> {
    let q = value.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let inner = &value[1..];
    inner.find(q).map(|end| &inner[..end])
}
