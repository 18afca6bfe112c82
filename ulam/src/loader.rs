//! Loading datasets from disk or the network.
//!
//! Dataset files are JSON, optionally wrapped in a JavaScript assignment
//! (`const bu = {...};`) and optionally gzip-compressed. Compression is
//! detected from the payload's magic bytes, not the file name.
//!
//! Decoded datasets are kept in a [`DatasetCache`] so repeated loads of the
//! same source (for example the fallback dataset) do not decode the grids
//! again.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use flate2::read::GzDecoder;
use memmap2::Mmap;
use moka::sync::Cache;
use tracing::{debug, info};

use crate::dataset::{Dataset, RawDataset};
use crate::error::{Result, UlamError};
use crate::session::FallbackProvider;

#[cfg(feature = "download")]
use crate::download::Downloader;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Where a dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatasetSource {
    /// A local file.
    File(PathBuf),
    /// A dataset URL.
    #[cfg(feature = "download")]
    Url(String),
    /// A pointer file URL naming the latest dataset URL.
    #[cfg(feature = "download")]
    Pointer(String),
}

impl DatasetSource {
    /// True for sources that need the network.
    pub fn is_remote(&self) -> bool {
        !matches!(self, DatasetSource::File(_))
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::File(path) => write!(f, "{}", path.display()),
            #[cfg(feature = "download")]
            DatasetSource::Url(url) => write!(f, "{}", url),
            #[cfg(feature = "download")]
            DatasetSource::Pointer(url) => write!(f, "pointer {}", url),
        }
    }
}

/// Strip a leading `const name =` (or `var`/`let`) and a trailing `;`.
///
/// Text without an assignment is returned trimmed.
pub fn strip_js_assignment(text: &str) -> &str {
    let text = text.trim_start_matches('\u{feff}').trim();
    let is_assignment = ["const ", "var ", "let "]
        .iter()
        .any(|keyword| text.starts_with(keyword));
    let body = if is_assignment {
        match text.find('=') {
            Some(pos) => &text[pos + 1..],
            None => text,
        }
    } else {
        text
    };
    body.trim().trim_end_matches(';').trim_end()
}

/// Decompress `bytes` if they start with the gzip magic number.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoder = GzDecoder::new(bytes);
        let mut data = Vec::new();
        decoder.read_to_end(&mut data)?;
        Ok(data)
    } else {
        Ok(bytes.to_vec())
    }
}

/// Decode a dataset payload into its wire form.
pub fn decode_payload(bytes: &[u8]) -> Result<RawDataset> {
    let data = decompress(bytes)?;
    let text = String::from_utf8_lossy(&data);
    Ok(serde_json::from_str(strip_js_assignment(&text))?)
}

/// Decode and validate a dataset payload.
pub fn parse_dataset(bytes: &[u8]) -> Result<Dataset> {
    Dataset::try_from(decode_payload(bytes)?)
}

/// Extract the dataset URL from a pointer file.
///
/// # Example
///
/// ```
/// use ulam::loader::parse_pointer;
///
/// let url = parse_pointer("const bulatestdataurl = 'https://example.com/bu.js.gz'").unwrap();
/// assert_eq!(url, "https://example.com/bu.js.gz");
/// ```
pub fn parse_pointer(text: &str) -> Result<String> {
    let value = strip_js_assignment(text);
    let unquoted = ['\'', '"']
        .iter()
        .find_map(|&quote| {
            value
                .strip_prefix(quote)
                .and_then(|rest| rest.strip_suffix(quote))
        })
        .ok_or_else(|| UlamError::InvalidPointer {
            reason: format!("expected a quoted URL, found {:?}", value),
        })?;

    let url = unquoted.trim();
    if url.is_empty() {
        return Err(UlamError::InvalidPointer {
            reason: "empty URL".to_string(),
        });
    }
    Ok(url.to_string())
}

/// Load a dataset file through a memory map.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        // Zero-length files cannot be mapped
        return parse_dataset(&[]);
    }
    // Safety: the map is read-only and dropped before this function returns.
    let mmap = unsafe { Mmap::map(&file)? };
    parse_dataset(&mmap)
}

/// Statistics about dataset cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Number of datasets currently cached.
    pub entry_count: u64,
    /// Loads served from the cache.
    pub hit_count: u64,
    /// Loads that decoded a payload.
    pub miss_count: u64,
}

impl CacheStats {
    /// Fraction of loads served from the cache (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing has been loaded yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// LRU cache of decoded datasets, keyed by source.
pub struct DatasetCache {
    datasets: Cache<DatasetSource, Arc<Dataset>>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    #[cfg(feature = "download")]
    downloader: Option<Downloader>,
}

impl fmt::Debug for DatasetCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetCache")
            .field("stats", &self.stats())
            .finish()
    }
}

impl DatasetCache {
    /// Create a cache holding up to `capacity` datasets.
    pub fn new(capacity: u64) -> Self {
        Self {
            datasets: Cache::builder().max_capacity(capacity).build(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            #[cfg(feature = "download")]
            downloader: None,
        }
    }

    /// Allow URL and pointer sources.
    #[cfg(feature = "download")]
    pub fn with_downloader(mut self, downloader: Downloader) -> Self {
        self.downloader = Some(downloader);
        self
    }

    /// Load a dataset, from the cache if possible.
    ///
    /// Pointer sources are resolved on every call; the dataset they name is
    /// cached under its URL.
    pub fn load(&self, source: &DatasetSource) -> Result<Arc<Dataset>> {
        #[cfg(feature = "download")]
        if let DatasetSource::Pointer(url) = source {
            let target = self.downloader()?.resolve_pointer(url)?;
            return self.load(&DatasetSource::Url(target));
        }

        if let Some(dataset) = self.datasets.get(source) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Ok(dataset);
        }
        self.miss_count.fetch_add(1, Ordering::Relaxed);

        let dataset = Arc::new(self.fetch(source)?);
        info!(
            source = %source,
            epoch = %dataset.reference_epoch(),
            snapshots = dataset.snapshots().len(),
            "loaded dataset"
        );
        self.datasets.insert(source.clone(), dataset.clone());
        Ok(dataset)
    }

    fn fetch(&self, source: &DatasetSource) -> Result<Dataset> {
        debug!(source = %source, "decoding dataset");
        match source {
            DatasetSource::File(path) => load_file(path),
            #[cfg(feature = "download")]
            DatasetSource::Url(url) => self.downloader()?.fetch_dataset(url),
            #[cfg(feature = "download")]
            DatasetSource::Pointer(url) => self.downloader()?.fetch_latest(url),
        }
    }

    #[cfg(feature = "download")]
    fn downloader(&self) -> Result<&Downloader> {
        self.downloader.as_ref().ok_or(UlamError::MissingConfig {
            name: "download configuration",
        })
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.datasets.entry_count(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }

    /// Maximum number of cached datasets.
    pub fn capacity(&self) -> u64 {
        self.datasets.policy().max_capacity().unwrap_or(0)
    }

    /// Drop one source from the cache, e.g. after its file changed.
    pub fn invalidate(&self, source: &DatasetSource) {
        self.datasets.invalidate(source);
    }

    /// Drop every cached dataset.
    pub fn clear(&self) {
        self.datasets.invalidate_all();
    }
}

/// Fallback provider that loads a fixed source through a shared cache.
#[derive(Debug)]
pub struct SourceFallback {
    cache: Arc<DatasetCache>,
    source: DatasetSource,
}

impl SourceFallback {
    pub fn new(cache: Arc<DatasetCache>, source: DatasetSource) -> Self {
        Self { cache, source }
    }

    pub fn source(&self) -> &DatasetSource {
        &self.source
    }
}

impl FallbackProvider for SourceFallback {
    fn load_fallback(&self) -> Result<Arc<Dataset>> {
        self.cache.load(&self.source)
    }
}
