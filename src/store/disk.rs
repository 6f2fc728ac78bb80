//! On-disk generational store.
//!
//! Layout under the root directory:
//!
//! ```text
//! generations.json          manifest: generation names in creation order
//! <dir>/<key digest>.json   one entry per file, body base64-encoded
//! ```
//!
//! Generation directories are named by a digest of the generation name so
//! arbitrary tags never touch the filesystem namespace directly.

use super::{Store, StoreError, StoreResult};
use crate::types::{CachedResponse, RequestKey};
use async_trait::async_trait;
use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const MANIFEST_FILE: &str = "generations.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GenerationRecord {
    name: String,
    dir: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    generations: Vec<GenerationRecord>,
}

impl Manifest {
    fn find(&self, name: &str) -> Option<&GenerationRecord> {
        self.generations.iter().find(|g| g.name == name)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    method: String,
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl StoredEntry {
    fn new(key: &RequestKey, response: &CachedResponse) -> Self {
        Self {
            method: key.method.clone(),
            url: key.url.clone(),
            status: response.status,
            headers: response.headers.clone(),
            body: base64::engine::general_purpose::STANDARD.encode(&response.body),
        }
    }

    fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }

    fn into_response(self, path: &Path) -> StoreResult<CachedResponse> {
        let body = base64::engine::general_purpose::STANDARD
            .decode(self.body.as_bytes())
            .map_err(|e| StoreError::Corrupt {
                path: path.to_path_buf(),
                message: format!("invalid body encoding: {}", e),
            })?;
        Ok(CachedResponse {
            status: self.status,
            headers: self.headers,
            body: Bytes::from(body),
        })
    }
}

/// Persists generations as directories of JSON entries.
///
/// Manifest updates are serialized through an in-process mutex; entry files
/// are written to a temporary name and renamed into place, so readers see
/// either the old or the new entry, never a torn one.
pub struct DiskStore {
    root: PathBuf,
    manifest_lock: Mutex<()>,
}

impl DiskStore {
    /// Creates the root directory if needed.
    pub async fn open_root(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::io(&root, e))?;
        Ok(Self {
            root,
            manifest_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    fn entry_path(&self, record: &GenerationRecord, key: &RequestKey) -> PathBuf {
        self.root
            .join(&record.dir)
            .join(format!("{}.json", key.digest()))
    }

    async fn read_manifest(&self) -> StoreResult<Manifest> {
        let path = self.manifest_path();
        match tokio::fs::read(&path).await {
            Ok(data) => serde_json::from_slice(&data).map_err(|e| StoreError::Corrupt {
                path,
                message: e.to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Manifest::default()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    async fn write_manifest(&self, manifest: &Manifest) -> StoreResult<()> {
        let data = serde_json::to_vec_pretty(manifest)
            .map_err(|e| StoreError::Other(format!("encode manifest: {}", e)))?;
        write_atomic(&self.manifest_path(), &data).await
    }

    /// Returns the record for `generation`, registering it when absent.
    async fn ensure_generation(&self, generation: &str) -> StoreResult<(GenerationRecord, bool)> {
        let _guard = self.manifest_lock.lock().await;
        let mut manifest = self.read_manifest().await?;
        if let Some(record) = manifest.find(generation) {
            return Ok((record.clone(), false));
        }
        let record = GenerationRecord {
            name: generation.to_string(),
            dir: generation_dir(generation),
        };
        let dir = self.root.join(&record.dir);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;
        manifest.generations.push(record.clone());
        self.write_manifest(&manifest).await?;
        Ok((record, true))
    }

    async fn read_entry(&self, path: &Path) -> StoreResult<Option<StoredEntry>> {
        match tokio::fs::read(path).await {
            Ok(data) => serde_json::from_slice(&data)
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }),
            // The generation may have been reaped since the manifest was read.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

fn generation_dir(generation: &str) -> String {
    let digest = Sha256::digest(generation.as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
    format!("gen-{}", hex)
}

async fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
    let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
    tokio::fs::write(&tmp, data)
        .await
        .map_err(|e| StoreError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::io(path, e))
}

#[async_trait]
impl Store for DiskStore {
    async fn open(&self, generation: &str) -> StoreResult<bool> {
        let (_, created) = self.ensure_generation(generation).await?;
        Ok(created)
    }

    async fn put(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &CachedResponse,
    ) -> StoreResult<()> {
        let (record, _) = self.ensure_generation(generation).await?;
        let data = serde_json::to_vec(&StoredEntry::new(key, response))
            .map_err(|e| StoreError::Other(format!("encode entry: {}", e)))?;
        // A concurrent delete may have removed the directory of a listed generation.
        let dir = self.root.join(&record.dir);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;
        write_atomic(&self.entry_path(&record, key), &data).await
    }

    async fn get(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> StoreResult<Option<CachedResponse>> {
        let manifest = self.read_manifest().await?;
        let Some(record) = manifest.find(generation) else {
            return Ok(None);
        };
        let path = self.entry_path(record, key);
        match self.read_entry(&path).await? {
            Some(entry) => entry.into_response(&path).map(Some),
            None => Ok(None),
        }
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .read_manifest()
            .await?
            .generations
            .into_iter()
            .map(|g| g.name)
            .collect())
    }

    async fn delete(&self, generation: &str) -> StoreResult<bool> {
        let record = {
            let _guard = self.manifest_lock.lock().await;
            let mut manifest = self.read_manifest().await?;
            let Some(idx) = manifest.generations.iter().position(|g| g.name == generation)
            else {
                return Ok(false);
            };
            let record = manifest.generations.remove(idx);
            self.write_manifest(&manifest).await?;
            record
        };
        // Unlisted first, so lookups stop finding it before the files go.
        let dir = self.root.join(&record.dir);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(StoreError::io(dir, e)),
        }
    }

    async fn keys(&self, generation: &str) -> StoreResult<Vec<RequestKey>> {
        let manifest = self.read_manifest().await?;
        let Some(record) = manifest.find(generation) else {
            return Ok(Vec::new());
        };
        let dir = self.root.join(&record.dir);
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(dir, e)),
        };
        let mut keys = Vec::new();
        while let Some(item) = read_dir
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(entry) = self.read_entry(&path).await? {
                keys.push(entry.key());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}
