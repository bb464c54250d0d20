//! Offload worker for CPU-heavy batch operations
//!
//! Aggregation, filtering and clustering run on a separate task reachable
//! only through message passing: the caller submits a task and awaits the
//! correlated response on a oneshot channel. All data crosses the boundary by
//! value; there is no shared mutable state with the orchestration context.
//! No ordering is guaranteed between in-flight tasks, and there is no error
//! channel: a dead worker simply yields an absent result.

use crate::dataset::{Record, field_f64};
use tokio::sync::{mpsc, oneshot};

/// Batch operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffloadOp {
    /// Sum the numeric `value` field across records (missing treated as 0)
    Aggregate,
    /// Keep records whose `status` field equals `"active"`
    Filter,
    /// k-means clustering over the `x`/`y` fields
    Cluster,
}

/// Options carried by a task
#[derive(Debug, Clone)]
pub struct OffloadOptions {
    /// Cluster count for [`OffloadOp::Cluster`]
    pub k: usize,
}

impl Default for OffloadOptions {
    fn default() -> Self {
        Self { k: 3 }
    }
}

/// A batch operation request
#[derive(Debug, Clone)]
pub struct OffloadTask {
    pub op: OffloadOp,
    pub data: Vec<Record>,
    pub options: OffloadOptions,
}

/// A cluster produced by [`OffloadOp::Cluster`]
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub centroid: (f64, f64),
    /// Indices into the task's record list
    pub members: Vec<usize>,
}

/// Result of a batch operation
#[derive(Debug, Clone, PartialEq)]
pub enum OffloadResult {
    Sum(f64),
    Records(Vec<Record>),
    Clusters(Vec<Cluster>),
}

struct Envelope {
    task: OffloadTask,
    reply: oneshot::Sender<OffloadResult>,
}

/// Handle to a spawned offload task processor
pub struct OffloadWorker {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl OffloadWorker {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
        tokio::spawn(async move {
            while let Some(Envelope { task, reply }) = rx.recv().await {
                let _ = reply.send(execute(task));
            }
            tracing::debug!("offload worker shutting down");
        });
        Self { tx }
    }

    /// Submit a task and await its result
    ///
    /// Returns `None` if the worker is gone. Once submitted a task runs to
    /// completion; there is no cancellation.
    pub async fn submit(&self, task: OffloadTask) -> Option<OffloadResult> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                task,
                reply: reply_tx,
            })
            .ok()?;
        reply_rx.await.ok()
    }
}

fn execute(task: OffloadTask) -> OffloadResult {
    match task.op {
        OffloadOp::Aggregate => OffloadResult::Sum(
            task.data
                .iter()
                .map(|r| field_f64(r, "value").unwrap_or(0.0))
                .sum(),
        ),
        OffloadOp::Filter => OffloadResult::Records(
            task.data
                .into_iter()
                .filter(|r| r.get("status").and_then(|v| v.as_str()) == Some("active"))
                .collect(),
        ),
        OffloadOp::Cluster => OffloadResult::Clusters(kmeans(&task.data, task.options.k)),
    }
}

/// Deterministic Lloyd's k-means over the `x`/`y` fields
///
/// Centroids are seeded from the first k usable records and iteration is
/// capped, so identical input always produces identical clusters. Records
/// without numeric coordinates are ignored.
fn kmeans(data: &[Record], k: usize) -> Vec<Cluster> {
    const MAX_ITERATIONS: usize = 10;

    let positions: Vec<(usize, (f64, f64))> = data
        .iter()
        .enumerate()
        .filter_map(|(i, r)| Some((i, (field_f64(r, "x")?, field_f64(r, "y")?))))
        .collect();

    let k = k.clamp(1, positions.len().max(1));
    if positions.is_empty() {
        return Vec::new();
    }

    let mut centroids: Vec<(f64, f64)> = positions.iter().take(k).map(|&(_, p)| p).collect();
    let mut assignment = vec![0usize; positions.len()];

    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;

        for (slot, &(_, pos)) in positions.iter().enumerate() {
            let nearest = centroids
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    dist2(pos, **a)
                        .partial_cmp(&dist2(pos, **b))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, _)| i)
                .unwrap_or(0);
            if assignment[slot] != nearest {
                assignment[slot] = nearest;
                changed = true;
            }
        }

        let mut sums = vec![(0.0f64, 0.0f64, 0usize); k];
        for (slot, &(_, pos)) in positions.iter().enumerate() {
            let s = &mut sums[assignment[slot]];
            s.0 += pos.0;
            s.1 += pos.1;
            s.2 += 1;
        }
        for (i, (sx, sy, n)) in sums.into_iter().enumerate() {
            if n > 0 {
                centroids[i] = (sx / n as f64, sy / n as f64);
            }
        }

        if !changed {
            break;
        }
    }

    let mut clusters: Vec<Cluster> = centroids
        .into_iter()
        .map(|centroid| Cluster {
            centroid,
            members: Vec::new(),
        })
        .collect();
    for (slot, &(record_index, _)) in positions.iter().enumerate() {
        clusters[assignment[slot]].members.push(record_index);
    }
    clusters
}

#[inline(always)]
fn dist2(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}
