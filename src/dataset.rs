//! Dataset - Immutable, versioned point storage
//!
//! A [`Dataset`] is produced from the generic records coming out of the data
//! pipeline. Once built it is never mutated; a new load produces a new dataset
//! with a higher version, so downstream indexes keyed by version can be
//! invalidated cheaply.

use crate::geom;
use geo::{Coord, Rect};
use serde_json::Value;

/// Generic record flowing through the pipeline and the offload worker.
///
/// `serde_json::Map` keeps keys sorted, so serializing a record is
/// deterministic (required for content-addressed cache keys).
pub type Record = serde_json::Map<String, Value>;

/// Default point radius when the source record carries none
const DEFAULT_RADIUS: f64 = 2.0;

/// A single renderable point
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// World-space position
    pub position: Coord<f64>,
    /// Optional third coordinate (carried through, not indexed)
    pub z: Option<f64>,
    /// Optional color token, interpreted by the renderer
    pub color: Option<String>,
    /// Point radius in world units
    pub radius: f64,
    /// Stable identity, unique within a dataset
    pub id: u64,
}

/// Summary statistics for a dataset
#[derive(Debug, Clone, Default)]
pub struct DatasetStats {
    /// Number of points
    pub count: usize,
    /// Rough in-memory footprint in bytes
    pub memory_estimate: usize,
    /// First point, if any
    pub first: Option<Point>,
    /// Last point, if any
    pub last: Option<Point>,
}

/// Immutable, versioned point set
#[derive(Debug, Clone)]
pub struct Dataset {
    points: Vec<Point>,
    bounds: Rect<f64>,
    version: u64,
    stats: DatasetStats,
}

impl Dataset {
    /// Build a dataset from pipeline records
    ///
    /// Records without numeric `x` and `y` fields are skipped. Numeric strings
    /// are accepted so CSV-sourced records (all string fields) work unchanged.
    /// Each point gets a stable id: the record's `id` field when numeric, else
    /// its positional index.
    pub fn from_records(records: &[Record], version: u64) -> Self {
        let mut points = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let (Some(x), Some(y)) = (field_f64(record, "x"), field_f64(record, "y")) else {
                continue;
            };

            points.push(Point {
                position: Coord { x, y },
                z: field_f64(record, "z"),
                color: record
                    .get("color")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                radius: field_f64(record, "radius").unwrap_or(DEFAULT_RADIUS),
                id: field_u64(record, "id").unwrap_or(index as u64),
            });
        }

        let bounds = geom::bounds_of(points.iter().map(|p| p.position))
            .unwrap_or_else(|| Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 0.0 }));

        let memory_estimate = points.len() * std::mem::size_of::<Point>()
            + points
                .iter()
                .map(|p| p.color.as_ref().map_or(0, String::len))
                .sum::<usize>();

        let stats = DatasetStats {
            count: points.len(),
            memory_estimate,
            first: points.first().cloned(),
            last: points.last().cloned(),
        };

        Self {
            points,
            bounds,
            version,
            stats,
        }
    }

    /// All points, in load order
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Bounding rectangle of all points
    #[inline]
    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// Monotonic dataset version assigned by the pipeline
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Summary statistics
    #[inline]
    pub fn stats(&self) -> &DatasetStats {
        &self.stats
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Read a numeric field, accepting JSON numbers and numeric strings
pub(crate) fn field_f64(record: &Record, name: &str) -> Option<f64> {
    match record.get(name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read an unsigned integer field, accepting JSON numbers and numeric strings
pub(crate) fn field_u64(record: &Record, name: &str) -> Option<u64> {
    match record.get(name)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
