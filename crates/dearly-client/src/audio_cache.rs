use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::error::ClientError;

/// Cached audio is kept for 30 days.
pub const AUDIO_TTL_DAYS: i64 = 30;

#[derive(Debug, Serialize, Deserialize)]
struct CacheMeta {
    url: String,
    stored_at: DateTime<Utc>,
}

/// On-disk cache of audio blobs keyed by URL.
///
/// Each entry is two files named after the SHA-256 of the URL: the raw
/// bytes (`.bin`) and a small JSON record of when they were stored (`.json`).
#[derive(Debug, Clone)]
pub struct AudioCache {
    dir: PathBuf,
    ttl: Duration,
}

impl AudioCache {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            ttl: Duration::days(AUDIO_TTL_DAYS),
        })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn cache_key(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    pub async fn get(&self, url: &str) -> Result<Option<Vec<u8>>, ClientError> {
        self.get_at(url, Utc::now()).await
    }

    /// Cached bytes for `url`, or `None` when missing or older than the TTL.
    /// Expired entries are removed.
    pub async fn get_at(&self, url: &str, now: DateTime<Utc>) -> Result<Option<Vec<u8>>, ClientError> {
        let key = Self::cache_key(url);
        let Some(meta) = self.read_meta(&key).await? else {
            return Ok(None);
        };

        if now - meta.stored_at > self.ttl {
            debug!("Audio cache entry for {} expired", url);
            self.remove(&key).await?;
            return Ok(None);
        }

        match tokio::fs::read(self.data_path(&key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Audio cache entry for {} lost its data file", url);
                self.remove(&key).await?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn put(&self, url: &str, bytes: &[u8]) -> Result<(), ClientError> {
        self.put_at(url, bytes, Utc::now()).await
    }

    pub async fn put_at(&self, url: &str, bytes: &[u8], now: DateTime<Utc>) -> Result<(), ClientError> {
        let key = Self::cache_key(url);
        let meta = CacheMeta {
            url: url.to_string(),
            stored_at: now,
        };
        tokio::fs::write(self.data_path(&key), bytes).await?;
        tokio::fs::write(self.meta_path(&key), serde_json::to_vec(&meta)?).await?;
        Ok(())
    }

    /// Cached copy of a proxied audio file, downloading it on a miss.
    pub async fn fetch(&self, client: &ApiClient, path: &str) -> Result<Vec<u8>, ClientError> {
        let url = format!("{}/api/audio-proxy/{}", client.base_url(), path.trim_start_matches('/'));
        if let Some(bytes) = self.get(&url).await? {
            return Ok(bytes);
        }

        let bytes = client.fetch_audio(path).await?;
        if let Err(e) = self.put(&url, &bytes).await {
            warn!("Could not cache audio {}: {}", url, e);
        }
        Ok(bytes)
    }

    pub async fn purge_expired(&self) -> Result<usize, ClientError> {
        self.purge_expired_at(Utc::now()).await
    }

    /// Delete every entry older than the TTL. Returns how many were removed.
    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize, ClientError> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let expired = match self.read_meta(&key).await? {
                Some(meta) => now - meta.stored_at > self.ttl,
                None => true,
            };
            if expired {
                self.remove(&key).await?;
                removed += 1;
            }
        }
        debug!("Purged {} expired audio entries", removed);
        Ok(removed)
    }

    async fn read_meta(&self, key: &str) -> Result<Option<CacheMeta>, ClientError> {
        let raw = match tokio::fs::read(self.meta_path(key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&raw) {
            Ok(meta) => Ok(Some(meta)),
            Err(e) => {
                warn!("Corrupt audio cache record {}: {}", key, e);
                self.remove(key).await?;
                Ok(None)
            }
        }
    }

    async fn remove(&self, key: &str) -> Result<(), ClientError> {
        for path in [self.data_path(key), self.meta_path(key)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn data_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.bin"))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_cache() -> AudioCache {
        let dir = std::env::temp_dir().join(format!("dearly_audio_{}", uuid::Uuid::new_v4()));
        AudioCache::open(dir).await.unwrap()
    }

    #[test]
    fn keys_are_sha256_hex() {
        let key = AudioCache::cache_key("https://example.com/a.mp3");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, AudioCache::cache_key("https://example.com/b.mp3"));
    }

    #[tokio::test]
    async fn stores_and_returns_bytes() {
        let cache = temp_cache().await;
        assert!(cache.get("u1").await.unwrap().is_none());

        cache.put("u1", b"ID3 audio").await.unwrap();
        assert_eq!(cache.get("u1").await.unwrap().as_deref(), Some(&b"ID3 audio"[..]));

        let _ = tokio::fs::remove_dir_all(cache.dir()).await;
    }

    #[tokio::test]
    async fn entries_expire_after_thirty_days() {
        let cache = temp_cache().await;
        let stored = Utc::now();
        cache.put_at("u1", b"old", stored).await.unwrap();

        let within = stored + Duration::days(29);
        assert!(cache.get_at("u1", within).await.unwrap().is_some());

        let after = stored + Duration::days(31);
        assert!(cache.get_at("u1", after).await.unwrap().is_none());
        // The expired entry is gone even for an earlier clock
        assert!(cache.get_at("u1", within).await.unwrap().is_none());

        let _ = tokio::fs::remove_dir_all(cache.dir()).await;
    }

    #[tokio::test]
    async fn purge_removes_only_expired_entries() {
        let cache = temp_cache().await;
        let now = Utc::now();
        cache.put_at("old", b"1", now - Duration::days(40)).await.unwrap();
        cache.put_at("fresh", b"2", now - Duration::days(1)).await.unwrap();

        assert_eq!(cache.purge_expired_at(now).await.unwrap(), 1);
        assert!(cache.get_at("fresh", now).await.unwrap().is_some());
        assert!(cache.get_at("old", now).await.unwrap().is_none());

        let _ = tokio::fs::remove_dir_all(cache.dir()).await;
    }
}
