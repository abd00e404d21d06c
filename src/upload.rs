use crate::model::{Point, UploadSummary, VectorSet};
use crate::progress::{Progress, ProgressObserver};
use crate::service::{ServiceError, VectorService};
use std::ops::Range;

#[derive(Debug, thiserror::Error)]
#[error("upsert of batch {batch} (rows from {start}) into '{collection}' failed")]
pub struct UploadFailure {
    pub collection: String,
    /// Zero-based index of the first failing batch.
    pub batch: usize,
    /// Global row index the failing batch starts at. Every lower row is stored.
    pub start: usize,
    #[source]
    pub source: ServiceError,
}

/// Splits `0..n` into consecutive ranges of at most `batch_size` rows.
pub fn batch_ranges(n: usize, batch_size: usize) -> Vec<Range<usize>> {
    let size = batch_size.max(1);
    (0..n)
        .step_by(size)
        .map(|start| start..(start + size).min(n))
        .collect()
}

/// Points for rows `range`, ids equal to the row index.
pub fn build_batch(vectors: &VectorSet, range: Range<usize>) -> Vec<Point> {
    vectors
        .iter()
        .enumerate()
        .skip(range.start)
        .take(range.len())
        .map(|(i, row)| Point::from_row(i, row))
        .collect()
}

/// Upserts every row of `vectors`, one batch at a time in ascending row order.
///
/// Stops at the first rejected batch. An empty set never contacts the service.
pub async fn upload<S>(
    session: &S,
    collection: &str,
    vectors: &VectorSet,
    batch_size: usize,
    observer: &dyn ProgressObserver,
) -> Result<UploadSummary, UploadFailure>
where
    S: VectorService + ?Sized,
{
    let total = vectors.rows();
    let ranges = batch_ranges(total, batch_size);
    observer.on_progress(&Progress::UploadStarted {
        collection: collection.to_string(),
        total,
    });

    for (batch, range) in ranges.iter().enumerate() {
        let points = build_batch(vectors, range.clone());
        tracing::debug!(
            "Upserting batch {} ({} points) into '{}'",
            batch,
            points.len(),
            collection
        );
        session
            .upsert_points(collection, points)
            .await
            .map_err(|source| UploadFailure {
                collection: collection.to_string(),
                batch,
                start: range.start,
                source,
            })?;
        observer.on_progress(&Progress::BatchUploaded {
            batch,
            uploaded: range.end,
            total,
        });
    }

    observer.on_progress(&Progress::UploadFinished {
        collection: collection.to_string(),
        total,
    });
    Ok(UploadSummary {
        total_uploaded: total,
        batches: ranges.len(),
    })
}
