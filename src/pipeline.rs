//! DataPipeline - source acquisition, parsing, validation and caching
//!
//! The pipeline turns a source (URL, inline text or literal records) into a
//! normalized [`DataPackage`], caching results in a [`BoundedCache`] keyed by
//! the source identity plus the format/transform identity. Large record sets
//! are transformed in fixed-size batches with a cooperative yield between
//! batches so the orchestration thread is never blocked for more than one
//! batch at a time.
//!
//! Concurrent identical loads are not deduplicated: two overlapping `load`
//! calls for the same source will both do the work. Callers that need
//! coalescing must serialize their own requests.

use crate::cache::BoundedCache;
use crate::dataset::Record;
use crate::formats::{self, DataFormat};
use crate::{PointfieldError, Result};
use instant::Instant;
use serde_json::Value;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc::UnboundedSender;

/// A data source handed to [`DataPipeline::load`]
#[derive(Debug, Clone)]
pub enum Source {
    /// HTTP(S) URL, fetched with the pipeline's client
    Url(String),
    /// Raw payload, parsed according to the load options (no I/O)
    Inline(String),
    /// Literal records, used as-is (no I/O, no parsing)
    Records(Vec<Record>),
    /// A single literal record
    Record(Record),
}

impl Source {
    /// Human-readable label used in metadata, events and logs
    pub fn label(&self) -> String {
        match self {
            Source::Url(url) => url.clone(),
            Source::Inline(text) => format!("inline:{}b", text.len()),
            Source::Records(records) => format!("records:{}", records.len()),
            Source::Record(_) => "record".to_string(),
        }
    }

    /// Deterministic identity for cache keying
    fn identity(&self) -> String {
        match self {
            Source::Url(url) => format!("url:{url}"),
            Source::Inline(text) => format!("inline:{:016x}", hash64(text)),
            // serde_json::Map serializes with sorted keys, so this is stable
            Source::Records(records) => {
                let serialized = serde_json::to_string(records).unwrap_or_default();
                format!("records:{:016x}", hash64(&serialized))
            }
            Source::Record(record) => {
                let serialized = serde_json::to_string(record).unwrap_or_default();
                format!("record:{:016x}", hash64(&serialized))
            }
        }
    }
}

fn hash64(s: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// A named record transform
///
/// The name participates in the cache key, so two transforms with the same
/// name are assumed interchangeable for caching purposes.
#[derive(Clone)]
pub struct Transform {
    name: String,
    func: Arc<dyn Fn(Record) -> Record + Send + Sync>,
}

impl Transform {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(Record) -> Record + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transform").field("name", &self.name).finish()
    }
}

/// Options for a single load
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub format: DataFormat,
    pub transform: Option<Transform>,
    /// Read from and write to the pipeline cache (default true)
    pub cache: bool,
    /// Extra request headers for URL sources
    pub headers: HashMap<String, String>,
    /// Fetch deadline for URL sources (default 30s)
    pub timeout: Duration,
    /// Treat the first non-blank CSV line as a header row (default true)
    pub csv_header: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            format: DataFormat::Auto,
            transform: None,
            cache: true,
            headers: HashMap::new(),
            timeout: Duration::from_secs(30),
            csv_header: true,
        }
    }
}

/// Pluggable validation capability
///
/// Failure reasons surface to the caller as
/// [`PointfieldError::Validation`]; nothing is cached on failure.
pub trait Validator: Send + Sync {
    fn validate(&self, records: &[Record]) -> std::result::Result<(), Vec<String>>;
}

/// Validator requiring a set of fields on every record
pub struct RequiredFields {
    fields: Vec<String>,
    /// Cap on collected reasons so a large bad dataset stays readable
    max_reasons: usize,
}

impl RequiredFields {
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            max_reasons: 10,
        }
    }
}

impl Validator for RequiredFields {
    fn validate(&self, records: &[Record]) -> std::result::Result<(), Vec<String>> {
        let mut reasons = Vec::new();
        for (index, record) in records.iter().enumerate() {
            for field in &self.fields {
                if !record.contains_key(field) {
                    reasons.push(format!("record {index}: missing field '{field}'"));
                    if reasons.len() >= self.max_reasons {
                        return Err(reasons);
                    }
                }
            }
        }
        if reasons.is_empty() { Ok(()) } else { Err(reasons) }
    }
}

/// Metadata attached to a loaded package
#[derive(Debug, Clone)]
pub struct LoadMetadata {
    pub source: String,
    pub format: DataFormat,
    pub loaded_at: SystemTime,
    /// Record count
    pub size: usize,
    pub load_time: Duration,
}

/// Observability statistics for a loaded package
#[derive(Debug, Clone)]
pub struct LoadStats {
    pub count: usize,
    /// Serialized size in bytes, a rough memory estimate
    pub memory_estimate: usize,
    pub first: Option<Record>,
    pub last: Option<Record>,
}

/// The result of a successful load
#[derive(Debug, Clone)]
pub struct DataPackage {
    pub data: Vec<Record>,
    pub metadata: LoadMetadata,
    pub statistics: LoadStats,
}

/// Notifications emitted by the pipeline
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum PipelineEvent {
    LoadComplete { source: String, cached: bool },
    LoadFailed { source: String, error: String },
}

/// Read-only snapshot of the pipeline counters
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Total records delivered by completed loads (cached or not)
    pub total_loaded: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Cumulative wall time spent in non-cached loads
    pub load_time: Duration,
    /// Cumulative wall time spent applying transforms
    pub transform_time: Duration,
    pub cache_size: usize,
    pub active_datasets: usize,
}

#[derive(Debug, Clone, Default)]
struct Counters {
    total_loaded: u64,
    cache_hits: u64,
    cache_misses: u64,
    load_time: Duration,
    transform_time: Duration,
}

/// Pipeline tuning parameters
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cache_max_size: usize,
    pub cache_ttl: Duration,
    /// Records transformed between cooperative yields
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_max_size: 64,
            cache_ttl: Duration::from_secs(300),
            batch_size: 5_000,
        }
    }
}

/// Orchestrates source acquisition, parsing, validation, transformation and
/// caching
///
/// Explicitly constructed and passed around; there is no process-global
/// instance. All mutation happens from the owning context.
pub struct DataPipeline {
    config: PipelineConfig,
    http: reqwest::Client,
    cache: BoundedCache<String, Arc<DataPackage>>,
    validator: Option<Box<dyn Validator>>,
    events: Option<UnboundedSender<PipelineEvent>>,
    counters: Counters,
    /// version -> source label for datasets built from this pipeline's loads
    active: HashMap<u64, String>,
    next_version: u64,
}

impl DataPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let cache = BoundedCache::new(config.cache_max_size, config.cache_ttl);
        Self {
            config,
            http: reqwest::Client::new(),
            cache,
            validator: None,
            events: None,
            counters: Counters::default(),
            active: HashMap::new(),
            next_version: 0,
        }
    }

    /// Attach a validator applied to every non-cached load
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Attach an event channel for load notifications
    pub fn with_events(mut self, events: UnboundedSender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Load, parse, validate, transform and normalize a source
    ///
    /// On a cache hit the package is returned immediately with no network or
    /// transform work. On failure nothing is cached and the error propagates
    /// after a `LoadFailed` event.
    pub async fn load(&mut self, source: Source, options: LoadOptions) -> Result<Arc<DataPackage>> {
        let label = source.label();
        let key = cache_key(&source, &options);

        if options.cache {
            if let Some(package) = self.cache.get(&key).cloned() {
                self.counters.cache_hits += 1;
                self.counters.total_loaded += package.data.len() as u64;
                tracing::debug!(source = %label, "load served from cache");
                self.emit(PipelineEvent::LoadComplete {
                    source: label,
                    cached: true,
                });
                return Ok(package);
            }
            self.counters.cache_misses += 1;
        }

        match self.load_uncached(source, &options, &label).await {
            Ok(package) => {
                self.counters.total_loaded += package.data.len() as u64;
                self.counters.load_time += package.metadata.load_time;
                if options.cache {
                    self.cache.set(key, package.clone());
                }
                tracing::info!(
                    source = %label,
                    records = package.data.len(),
                    format = %package.metadata.format,
                    "load complete"
                );
                self.emit(PipelineEvent::LoadComplete {
                    source: label,
                    cached: false,
                });
                Ok(package)
            }
            Err(error) => {
                tracing::warn!(source = %label, %error, "load failed");
                self.emit(PipelineEvent::LoadFailed {
                    source: label,
                    error: error.to_string(),
                });
                Err(error)
            }
        }
    }

    async fn load_uncached(
        &mut self,
        source: Source,
        options: &LoadOptions,
        label: &str,
    ) -> Result<Arc<DataPackage>> {
        let started = Instant::now();

        let (mut records, format) = match source {
            Source::Url(url) => {
                let (content_type, body) = self.fetch(&url, options).await?;
                let format = resolve_format(options.format, content_type.as_deref(), &url, &body);
                (formats::parse_records(&body, format, options.csv_header)?, format)
            }
            Source::Inline(text) => {
                let format = match options.format {
                    DataFormat::Auto => formats::sniff(&text),
                    explicit => explicit,
                };
                (formats::parse_records(&text, format, options.csv_header)?, format)
            }
            Source::Records(records) => (records, DataFormat::Json),
            Source::Record(record) => (vec![record], DataFormat::Json),
        };

        if let Some(validator) = &self.validator {
            validator
                .validate(&records)
                .map_err(|reasons| PointfieldError::Validation { reasons })?;
        }

        if let Some(transform) = &options.transform {
            records = self.apply_transform(records, transform).await;
        }

        normalize_ids(&mut records);

        let memory_estimate = serde_json::to_string(&records)?.len();
        let statistics = LoadStats {
            count: records.len(),
            memory_estimate,
            first: records.first().cloned(),
            last: records.last().cloned(),
        };

        let metadata = LoadMetadata {
            source: label.to_string(),
            format,
            loaded_at: SystemTime::now(),
            size: records.len(),
            load_time: started.elapsed(),
        };

        Ok(Arc::new(DataPackage {
            data: records,
            metadata,
            statistics,
        }))
    }

    /// Fetch a URL within the configured timeout
    async fn fetch(&self, url: &str, options: &LoadOptions) -> Result<(Option<String>, String)> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(PointfieldError::UnsupportedSource(url.to_string()));
        }

        let mut request = self.http.get(url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let fetch = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(PointfieldError::Http {
                    status: status.as_u16(),
                });
            }
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = response.text().await?;
            Ok((content_type, body))
        };

        tokio::time::timeout(options.timeout, fetch)
            .await
            .map_err(|_| PointfieldError::Timeout)?
    }

    /// Apply a transform in batches, yielding to the scheduler between batches
    async fn apply_transform(&mut self, records: Vec<Record>, transform: &Transform) -> Vec<Record> {
        let batch_size = self.config.batch_size.max(1);
        let started = Instant::now();

        let mut transformed = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            if index > 0 && index % batch_size == 0 {
                // Cooperative yield so the orchestration thread stays
                // responsive on large arrays
                tokio::task::yield_now().await;
            }
            transformed.push((transform.func)(record));
        }

        self.counters.transform_time += started.elapsed();
        transformed
    }

    /// Reserve the next dataset version
    pub fn next_version(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    /// Record a dataset built from a load as active
    pub fn register_dataset(&mut self, version: u64, source: impl Into<String>) {
        self.active.insert(version, source.into());
    }

    /// Forget a previously registered dataset version
    pub fn release_dataset(&mut self, version: u64) {
        self.active.remove(&version);
    }

    /// Read-only counter snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_loaded: self.counters.total_loaded,
            cache_hits: self.counters.cache_hits,
            cache_misses: self.counters.cache_misses,
            load_time: self.counters.load_time,
            transform_time: self.counters.transform_time,
            cache_size: self.cache.len(),
            active_datasets: self.active.len(),
        }
    }

    /// Empty the cache and the active-dataset registry and reset counters
    ///
    /// In-flight loads are not cancelled.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.active.clear();
        self.counters = Counters::default();
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

/// Deterministic composite cache key
///
/// Identical source + options must yield identical keys across calls, or
/// cache hits could never happen.
fn cache_key(source: &Source, options: &LoadOptions) -> String {
    let transform = options
        .transform
        .as_ref()
        .map(Transform::name)
        .unwrap_or("none");
    format!(
        "{}|fmt:{}|tx:{}|hdr:{}",
        source.identity(),
        options.format,
        transform,
        options.csv_header
    )
}

/// Pick the effective format for a fetched payload
fn resolve_format(
    requested: DataFormat,
    content_type: Option<&str>,
    url: &str,
    body: &str,
) -> DataFormat {
    if requested != DataFormat::Auto {
        return requested;
    }
    content_type
        .and_then(formats::detect_from_content_type)
        .or_else(|| formats::detect_from_url(url))
        .unwrap_or_else(|| formats::sniff(body))
}

/// Assign every record a stable id: existing field wins, else the index
fn normalize_ids(records: &mut [Record]) {
    for (index, record) in records.iter_mut().enumerate() {
        if !record.contains_key("id") {
            record.insert("id".to_string(), Value::from(index as u64));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn pipeline() -> DataPipeline {
        DataPipeline::new(PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_load_csv_scenario() {
        // CSV fields stay strings; ids are assigned positionally
        let mut p = pipeline();
        let package = p
            .load(
                Source::Inline("x,y\n1,2\n3,4".to_string()),
                LoadOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(package.data.len(), 2);
        assert_eq!(package.data[0]["x"], json!("1"));
        assert_eq!(package.data[0]["y"], json!("2"));
        assert_eq!(package.data[0]["id"], json!(0));
        assert_eq!(package.data[1]["x"], json!("3"));
        assert_eq!(package.data[1]["y"], json!("4"));
        assert_eq!(package.data[1]["id"], json!(1));
        assert_eq!(package.metadata.format, DataFormat::Csv);
    }

    #[tokio::test]
    async fn test_load_records_source() {
        let mut p = pipeline();
        let records = vec![
            record(&[("x", json!(1.0)), ("y", json!(2.0))]),
            record(&[("x", json!(3.0)), ("y", json!(4.0)), ("id", json!(99))]),
        ];
        let package = p
            .load(Source::Records(records), LoadOptions::default())
            .await
            .unwrap();

        assert_eq!(package.data[0]["id"], json!(0));
        // Explicit id preserved
        assert_eq!(package.data[1]["id"], json!(99));
        assert_eq!(package.statistics.count, 2);
        assert!(package.statistics.memory_estimate > 0);
    }

    #[tokio::test]
    async fn test_idempotent_load_cache_hit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_transform = calls.clone();
        let transform = Transform::new("count-calls", move |r| {
            calls_in_transform.fetch_add(1, Ordering::SeqCst);
            r
        });

        let mut p = pipeline();
        let options = LoadOptions {
            transform: Some(transform),
            ..LoadOptions::default()
        };
        let source = Source::Inline("x,y\n1,2\n3,4".to_string());

        let first = p.load(source.clone(), options.clone()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let second = p.load(source, options).await.unwrap();
        // Served from cache: identical data, no repeated transform work
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(first.data, second.data);

        let metrics = p.metrics();
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.cache_misses, 1);
        assert_eq!(metrics.cache_size, 1);
    }

    #[tokio::test]
    async fn test_cache_disabled() {
        let mut p = pipeline();
        let options = LoadOptions {
            cache: false,
            ..LoadOptions::default()
        };
        let source = Source::Inline("x,y\n1,2".to_string());

        p.load(source.clone(), options.clone()).await.unwrap();
        p.load(source, options).await.unwrap();

        let metrics = p.metrics();
        assert_eq!(metrics.cache_hits, 0);
        assert_eq!(metrics.cache_size, 0);
    }

    #[tokio::test]
    async fn test_transform_applied_in_batches() {
        let mut p = DataPipeline::new(PipelineConfig {
            batch_size: 10,
            ..PipelineConfig::default()
        });

        let records: Vec<Record> = (0..100)
            .map(|i| record(&[("x", json!(i)), ("y", json!(0))]))
            .collect();

        let transform = Transform::new("double-x", |mut r| {
            let x = r["x"].as_i64().unwrap();
            r.insert("x".to_string(), json!(x * 2));
            r
        });

        let package = p
            .load(
                Source::Records(records),
                LoadOptions {
                    transform: Some(transform),
                    ..LoadOptions::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(package.data[50]["x"], json!(100));
        assert!(p.metrics().transform_time >= Duration::ZERO);
    }

    #[tokio::test]
    async fn test_validation_failure_aborts_and_caches_nothing() {
        let mut p = pipeline().with_validator(RequiredFields::new(["x", "y"]));
        let source = Source::Records(vec![record(&[("x", json!(1.0))])]);

        let err = p.load(source, LoadOptions::default()).await.unwrap_err();
        match err {
            PointfieldError::Validation { reasons } => {
                assert_eq!(reasons.len(), 1);
                assert!(reasons[0].contains("missing field 'y'"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
        assert_eq!(p.metrics().cache_size, 0);
    }

    #[tokio::test]
    async fn test_events_emitted() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut p = pipeline().with_events(tx);
        let source = Source::Inline("x,y\n1,2".to_string());

        p.load(source.clone(), LoadOptions::default()).await.unwrap();
        p.load(source, LoadOptions::default()).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first, PipelineEvent::LoadComplete { cached: false, .. }));
        assert!(matches!(second, PipelineEvent::LoadComplete { cached: true, .. }));
    }

    #[tokio::test]
    async fn test_failure_event() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut p = pipeline().with_events(tx);

        let err = p
            .load(
                Source::Inline("{not valid json".to_string()),
                LoadOptions {
                    format: DataFormat::Json,
                    ..LoadOptions::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PointfieldError::Json(_)));

        assert!(matches!(
            rx.recv().await.unwrap(),
            PipelineEvent::LoadFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_unsupported_source_scheme() {
        let mut p = pipeline();
        let err = p
            .load(
                Source::Url("ftp://example.com/data.csv".to_string()),
                LoadOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PointfieldError::UnsupportedSource(_)));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n")
                .await;
        });

        let mut p = pipeline();
        let err = p
            .load(
                Source::Url(format!("http://{addr}/missing.json")),
                LoadOptions::default(),
            )
            .await
            .unwrap_err();
        match err {
            PointfieldError::Http { status } => assert_eq!(status, 404),
            other => panic!("expected Http, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            // Accept and hold the connection open without responding
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let mut p = pipeline();
        let err = p
            .load(
                Source::Url(format!("http://{addr}/slow.json")),
                LoadOptions {
                    timeout: Duration::from_millis(100),
                    ..LoadOptions::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PointfieldError::Timeout));
    }

    #[tokio::test]
    async fn test_fetch_success_with_content_type() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let body = br#"[{"x": 1, "y": 2}]"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.write_all(body).await;
        });

        let mut p = pipeline();
        let package = p
            .load(
                Source::Url(format!("http://{addr}/data")),
                LoadOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(package.metadata.format, DataFormat::Json);
        assert_eq!(package.data[0]["x"], json!(1));
    }

    #[tokio::test]
    async fn test_metrics_and_clear() {
        let mut p = pipeline();
        p.load(
            Source::Inline("x,y\n1,2\n3,4".to_string()),
            LoadOptions::default(),
        )
        .await
        .unwrap();

        let version = p.next_version();
        p.register_dataset(version, "test");

        let metrics = p.metrics();
        assert_eq!(metrics.total_loaded, 2);
        assert_eq!(metrics.active_datasets, 1);
        assert_eq!(metrics.cache_size, 1);

        p.clear();
        let metrics = p.metrics();
        assert_eq!(metrics, MetricsSnapshot::default());
    }

    #[test]
    fn test_cache_key_deterministic() {
        let source = Source::Records(vec![record(&[("x", json!(1))])]);
        let options = LoadOptions::default();
        assert_eq!(cache_key(&source, &options), cache_key(&source, &options));

        // Different format or transform changes the key
        let other = LoadOptions {
            format: DataFormat::Csv,
            ..LoadOptions::default()
        };
        assert_ne!(cache_key(&source, &options), cache_key(&source, &other));

        let named = LoadOptions {
            transform: Some(Transform::new("t1", |r| r)),
            ..LoadOptions::default()
        };
        assert_ne!(cache_key(&source, &options), cache_key(&source, &named));
    }

    #[test]
    fn test_versions_monotonic() {
        let mut p = pipeline();
        let a = p.next_version();
        let b = p.next_version();
        assert!(b > a);
    }
}
