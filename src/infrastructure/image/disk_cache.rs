//! Content-addressed disk cache for remotely fetched overlay assets.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::fs;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::domain::entities::{AssetSource, CacheKey, CachedAsset, cache_file_name};
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::AssetFetchPort;

/// Name of the image cache directory under the cache root.
pub const IMAGE_CACHE_DIR_NAME: &str = "ImageCache";

/// Disk cache keyed by the SHA-256 of the source URL.
///
/// Hits are served from disk without touching the network. Misses are fetched,
/// validated by decoding and written back in the background with an atomic rename.
pub struct DiskImageCache {
    cache_dir: PathBuf,
    fetcher: Arc<dyn AssetFetchPort>,
    dir_ready: OnceCell<()>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for DiskImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskImageCache")
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

impl DiskImageCache {
    /// Creates a cache rooted at `cache_dir`. The directory is created on first use.
    #[must_use]
    pub fn new(cache_dir: PathBuf, fetcher: Arc<dyn AssetFetchPort>) -> Self {
        Self {
            cache_dir,
            fetcher,
            dir_ready: OnceCell::new(),
            pending_writes: Mutex::new(Vec::new()),
        }
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the on-disk path for a URL.
    #[must_use]
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.cache_dir.join(cache_file_name(url))
    }

    /// Checks if a URL is cached.
    pub async fn contains(&self, url: &str) -> bool {
        fs::try_exists(self.path_for(url)).await.unwrap_or(false)
    }

    /// Gets raw bytes for a URL from disk, if present.
    pub async fn get_bytes(&self, url: &str) -> Option<Vec<u8>> {
        let path = self.path_for(url);
        match fs::read(&path).await {
            Ok(bytes) => {
                trace!(path = %path.display(), "Disk cache hit");
                Some(bytes)
            }
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to read cache file");
                }
                trace!(url = %url, "Disk cache miss");
                None
            }
        }
    }

    /// Returns the asset for `url`, from disk if cached, else from the network.
    ///
    /// On a miss the downloaded bytes are decoded first; only valid images are
    /// written back, and the write completes in the background.
    ///
    /// # Errors
    /// Returns `FetchFailed` if the download fails and `InvalidAssetData` if the
    /// downloaded bytes are not an image.
    pub async fn get_or_fetch(&self, url: &str) -> CacheResult<CachedAsset> {
        self.ensure_dir().await?;
        let key = CacheKey::from_url(url);

        if let Some(bytes) = self.get_bytes(url).await {
            let bytes = Bytes::from(bytes);
            match decode(bytes.clone()).await {
                Ok(image) => {
                    debug!(key = %key, "Served asset from disk cache");
                    return Ok(CachedAsset {
                        key,
                        bytes,
                        image: Arc::new(image),
                        source: AssetSource::Disk,
                    });
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Cached asset is not decodable, refetching");
                }
            }
        }

        debug!(key = %key, url = %url, "Fetching asset from network");
        let bytes = self.fetcher.fetch(url).await?;

        let image = decode(bytes.clone())
            .await
            .map_err(|e| CacheError::invalid_asset(url, e))?;

        self.spawn_write(self.path_for(url), bytes.clone());

        Ok(CachedAsset {
            key,
            bytes,
            image: Arc::new(image),
            source: AssetSource::Network,
        })
    }

    /// Waits for all background writes started so far.
    pub async fn wait_for_pending_writes(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.pending_writes.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Cache write task failed");
            }
        }
    }

    async fn ensure_dir(&self) -> CacheResult<()> {
        self.dir_ready
            .get_or_try_init(|| async {
                fs::create_dir_all(&self.cache_dir).await.map_err(|e| {
                    CacheError::io(format!("Failed to create cache dir: {e}"))
                })?;
                debug!(path = %self.cache_dir.display(), "Cache directory ready");
                Ok::<(), CacheError>(())
            })
            .await
            .map(|_| ())
    }

    fn spawn_write(&self, path: PathBuf, bytes: Bytes) {
        let handle = tokio::spawn(async move {
            let target = path.clone();
            let size = bytes.len();
            match tokio::task::spawn_blocking(move || write_atomic(&target, &bytes)).await {
                Ok(Ok(())) => {
                    debug!(path = %path.display(), size = size, "Stored asset in disk cache");
                }
                Ok(Err(e)) => {
                    warn!(path = %path.display(), error = %e, "Failed to cache to disk");
                }
                Err(e) => warn!(error = %e, "Cache write task panicked"),
            }
        });

        let mut pending = self.pending_writes.lock();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }
}

/// Writes `bytes` next to `path` and renames it into place.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("Invalid path"))?;
    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(bytes)?;
    temp_file.flush()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

async fn decode(bytes: Bytes) -> Result<image::DynamicImage, String> {
    tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| format!("Decode task panicked: {e}"))?
        .map_err(|e| format!("Failed to decode image: {e}"))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Cursor;

    use image::{ImageFormat, Rgba, RgbaImage};

    /// Encodes a small solid-color PNG.
    pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::png_bytes;
    use super::*;
    use crate::domain::ports::mocks::{MockAssetFetchPort, StaticAssetFetcher};
    use tempfile::TempDir;

    const URL: &str = "https://cdn.example.com/overlays/glow.png";

    fn cache_with(fetcher: Arc<dyn AssetFetchPort>) -> (DiskImageCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskImageCache::new(temp_dir.path().join("nested").join("ImageCache"), fetcher);
        (cache, temp_dir)
    }

    #[tokio::test]
    async fn test_miss_then_hit_fetches_once() {
        let body = Bytes::from(png_bytes(4, 4, [255, 0, 0, 255]));
        let mut fetcher = MockAssetFetchPort::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(move |_| Ok(body.clone()));
        let (cache, _temp) = cache_with(Arc::new(fetcher));

        let first = cache.get_or_fetch(URL).await.unwrap();
        assert_eq!(first.source, AssetSource::Network);
        cache.wait_for_pending_writes().await;

        let second = cache.get_or_fetch(URL).await.unwrap();
        assert!(second.is_cache_hit());
        assert_eq!(second.bytes, first.bytes);
        assert_eq!(second.key, first.key);
        assert_eq!(second.image.width(), 4);
    }

    #[tokio::test]
    async fn test_creates_directory_lazily() {
        let fetcher = StaticAssetFetcher::new().with_body(URL, png_bytes(1, 1, [0, 0, 0, 255]));
        let (cache, _temp) = cache_with(Arc::new(fetcher));
        assert!(!cache.cache_dir().exists());

        cache.get_or_fetch(URL).await.unwrap();
        assert!(cache.cache_dir().is_dir());
    }

    #[tokio::test]
    async fn test_file_named_by_key_and_extension() {
        let fetcher = StaticAssetFetcher::new().with_body(URL, png_bytes(2, 2, [1, 2, 3, 255]));
        let (cache, _temp) = cache_with(Arc::new(fetcher));

        let asset = cache.get_or_fetch(URL).await.unwrap();
        cache.wait_for_pending_writes().await;

        let expected = cache.cache_dir().join(format!("{}.png", asset.key));
        assert_eq!(cache.path_for(URL), expected);
        assert_eq!(std::fs::read(&expected).unwrap(), asset.bytes.to_vec());
    }

    #[tokio::test]
    async fn test_invalid_data_is_not_cached() {
        let fetcher = StaticAssetFetcher::new().with_body(URL, &b"<html>not an image</html>"[..]);
        let (cache, _temp) = cache_with(Arc::new(fetcher));

        let err = cache.get_or_fetch(URL).await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidAssetData { .. }));

        cache.wait_for_pending_writes().await;
        assert!(!cache.contains(URL).await);
        assert_eq!(std::fs::read_dir(cache.cache_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_network_failure_surfaces_fetch_failed() {
        let fetcher = Arc::new(StaticAssetFetcher::new());
        let (cache, _temp) = cache_with(fetcher.clone());

        let err = cache.get_or_fetch(URL).await.unwrap_err();
        assert!(err.is_network_error());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_refetched() {
        let fetcher = Arc::new(
            StaticAssetFetcher::new().with_body(URL, png_bytes(3, 3, [9, 9, 9, 255])),
        );
        let (cache, _temp) = cache_with(fetcher.clone());
        std::fs::create_dir_all(cache.cache_dir()).unwrap();
        std::fs::write(cache.path_for(URL), b"truncated").unwrap();

        let asset = cache.get_or_fetch(URL).await.unwrap();
        assert_eq!(asset.source, AssetSource::Network);
        assert_eq!(fetcher.calls(), 1);

        cache.wait_for_pending_writes().await;
        assert_eq!(std::fs::read(cache.path_for(URL)).unwrap(), asset.bytes.to_vec());
    }

    #[test]
    fn test_write_atomic_replaces_whole_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entry.png");
        write_atomic(&path, b"old contents").unwrap();
        write_atomic(&path, b"new").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_reader_never_sees_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entry.dat");
        let old = vec![1u8; 64 * 1024];
        let new = vec![2u8; 256 * 1024];
        write_atomic(&path, &old).unwrap();

        let writer_path = path.clone();
        let writer_new = new.clone();
        let writer = tokio::task::spawn_blocking(move || {
            for _ in 0..20 {
                write_atomic(&writer_path, &writer_new).unwrap();
            }
        });

        for _ in 0..200 {
            let read = std::fs::read(&path).unwrap();
            assert!(read == old || read == new, "observed {} bytes", read.len());
        }
        writer.await.unwrap();
    }
}
