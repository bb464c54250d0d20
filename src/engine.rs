//! Engine - top-level orchestration context
//!
//! Wires the pipeline, spatial index, viewport and LOD selector together.
//! The engine is constructed explicitly and owns all shared state; there is
//! no process-global instance. The spatial index follows a rebuild-and-swap
//! discipline: a new dataset version gets a freshly built tree, and the
//! `Arc` indirection is only repointed once the tree is complete, so readers
//! holding the previous tree are never exposed to a half-built one.

use crate::dataset::{Dataset, Point};
use crate::lod::{LodSelector, stride_sample};
use crate::pipeline::{DataPipeline, LoadOptions, MetricsSnapshot, PipelineConfig, Source};
use crate::quadtree::{Quadtree, QuadtreeConfig};
use crate::viewport::{ViewportConfig, ViewportController};
use crate::{LodConfig, Result, geom};
use std::sync::Arc;

/// Aggregate configuration for the engine
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub pipeline: PipelineConfig,
    pub quadtree: QuadtreeConfig,
    pub lod: LodConfig,
    pub viewport: ViewportConfig,
}

/// Orchestrates loading, indexing and viewport queries
pub struct Engine {
    pipeline: DataPipeline,
    viewport: ViewportController,
    lod: LodSelector,
    quadtree_config: QuadtreeConfig,
    dataset: Option<Arc<Dataset>>,
    index: Option<Arc<Quadtree>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            pipeline: DataPipeline::new(config.pipeline),
            viewport: ViewportController::new(config.viewport),
            lod: LodSelector::new(config.lod),
            quadtree_config: config.quadtree,
            dataset: None,
            index: None,
        }
    }

    /// Load a source and make it the active dataset
    ///
    /// Runs the pipeline, normalizes records into a new dataset version and
    /// builds its quadtree before swapping either into place. The previous
    /// dataset and index stay valid for anyone still holding their `Arc`s.
    pub async fn load_dataset(
        &mut self,
        source: Source,
        options: LoadOptions,
    ) -> Result<Arc<Dataset>> {
        let package = self.pipeline.load(source, options).await?;
        let version = self.pipeline.next_version();
        let dataset = Arc::new(Dataset::from_records(&package.data, version));

        // Build off to the side; swap only once complete
        let bounds = geom::ensure_extent(dataset.bounds(), 1e-9);
        let mut tree = Quadtree::new(bounds, self.quadtree_config.clone());
        for point in dataset.points() {
            // Root bounds come from the dataset, so insertion cannot miss
            tree.insert(point.clone());
        }

        tracing::info!(
            version,
            points = dataset.len(),
            nodes = tree.node_count(),
            "dataset indexed"
        );

        if let Some(previous) = &self.dataset {
            self.pipeline.release_dataset(previous.version());
        }
        self.pipeline
            .register_dataset(version, package.metadata.source.clone());
        self.index = Some(Arc::new(tree));
        self.dataset = Some(dataset.clone());

        Ok(dataset)
    }

    /// Points to hand to the renderer for the current viewport
    ///
    /// Queries the index with the visible world rectangle, selects a LOD tier
    /// from the current scale and dataset size, and stride-subsamples down to
    /// the tier's point cap.
    pub fn visible_points(&self, screen_w: f64, screen_h: f64) -> Vec<Point> {
        let (Some(index), Some(dataset)) = (&self.index, &self.dataset) else {
            return Vec::new();
        };

        let region = self.viewport.visible_world_rect(screen_w, screen_h);
        let hits = index.query(&region);

        let tier = self
            .lod
            .select(self.viewport.transform().scale, dataset.len());
        let max_points = self.lod.params(tier).max_points;

        stride_sample(&hits, max_points)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Currently active dataset
    #[inline]
    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.dataset.as_ref()
    }

    /// Current spatial index; clone the `Arc` to keep querying across a swap
    #[inline]
    pub fn index(&self) -> Option<&Arc<Quadtree>> {
        self.index.as_ref()
    }

    #[inline]
    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    #[inline]
    pub fn viewport_mut(&mut self) -> &mut ViewportController {
        &mut self.viewport
    }

    #[inline]
    pub fn lod(&self) -> &LodSelector {
        &self.lod
    }

    #[inline]
    pub fn pipeline_mut(&mut self) -> &mut DataPipeline {
        &mut self.pipeline
    }

    /// Pipeline counter snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.pipeline.metrics()
    }

    /// Drop the active dataset and index and reset the pipeline
    pub fn clear(&mut self) {
        self.dataset = None;
        self.index = None;
        self.pipeline.clear();
        self.viewport.reset();
    }
}
