//! File-backed chunk store.
//!
//! Layout under the store directory:
//!
//! ```text
//! <root>/manifest.json          current root + generation
//! <root>/chunks/<ab>/<address>  one file per chunk, sharded by first byte
//! ```
//!
//! Chunk files are immutable once written; both chunk writes and manifest
//! updates go through a write-temp-then-rename so a crash never leaves a
//! partially written file at a live path. The root CAS holds the manifest
//! lock across the re-read/compare/rewrite sequence.

use crate::chunk::Chunk;
use crate::error::{Error, Result};
use crate::hash::{Address, AddressSet};
use crate::store::ChunkStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Manifest format version written by this crate.
const MANIFEST_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const CHUNKS_DIR: &str = "chunks";

/// Configuration for [`FileChunkStore`].
#[derive(Clone, Debug)]
pub struct FileStoreConfig {
    /// Directory holding the manifest and chunk files.
    pub root_dir: PathBuf,
}

/// Persisted store state, rewritten atomically on every root commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    root: Address,
    generation: u64,
}

impl Manifest {
    fn fresh() -> Manifest {
        Manifest {
            version: MANIFEST_VERSION,
            root: Address::EMPTY,
            generation: 0,
        }
    }
}

/// Durable chunk store over a local directory.
#[derive(Debug)]
pub struct FileChunkStore {
    dir: PathBuf,
    manifest: Mutex<Manifest>,
}

impl FileChunkStore {
    /// Open a store at `config.root_dir`, creating it if absent.
    pub async fn open(config: FileStoreConfig) -> Result<FileChunkStore> {
        let dir = config.root_dir;
        tokio::fs::create_dir_all(dir.join(CHUNKS_DIR)).await?;

        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = match tokio::fs::read(&manifest_path).await {
            Ok(bytes) => {
                let m: Manifest = serde_json::from_slice(&bytes)?;
                if m.version != MANIFEST_VERSION {
                    return Err(Error::format_unsupported(format!(
                        "manifest version {} (expected {MANIFEST_VERSION})",
                        m.version
                    )));
                }
                m
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let m = Manifest::fresh();
                write_atomic(&manifest_path, &serde_json::to_vec_pretty(&m)?).await?;
                m
            }
            Err(e) => return Err(e.into()),
        };

        Ok(FileChunkStore {
            dir,
            manifest: Mutex::new(manifest),
        })
    }

    fn chunk_path(&self, addr: Address) -> PathBuf {
        let name = addr.to_string();
        self.dir
            .join(CHUNKS_DIR)
            .join(&name[..2])
            .join(&name)
    }
}

/// Write `bytes` to `path` via a sibling temp file and rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl ChunkStore for FileChunkStore {
    async fn get(&self, addr: Address) -> Result<Option<Chunk>> {
        match tokio::fs::read(self.chunk_path(addr)).await {
            Ok(bytes) => {
                let chunk = Chunk::with_address(bytes, addr);
                chunk.verify()?;
                Ok(Some(chunk))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn has(&self, addr: Address) -> Result<bool> {
        match tokio::fs::metadata(self.chunk_path(addr)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn has_many(&self, addrs: &[Address]) -> Result<AddressSet> {
        let mut absent = AddressSet::default();
        for &addr in addrs {
            if !self.has(addr).await? {
                absent.insert(addr);
            }
        }
        Ok(absent)
    }

    async fn put(&self, chunk: Chunk) -> Result<()> {
        chunk.verify()?;
        let path = self.chunk_path(chunk.address());
        if let Ok(true) = tokio::fs::try_exists(&path).await {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        write_atomic(&path, chunk.data()).await?;
        tracing::trace!(addr = %chunk.address(), len = chunk.len(), "wrote chunk file");
        Ok(())
    }

    async fn root(&self) -> Result<Address> {
        Ok(self.manifest.lock().await.root)
    }

    async fn commit(&self, new: Address, expected: Address) -> Result<bool> {
        let mut manifest = self.manifest.lock().await;
        if manifest.root != expected {
            return Ok(false);
        }
        let next = Manifest {
            version: MANIFEST_VERSION,
            root: new,
            generation: manifest.generation + 1,
        };
        write_atomic(
            &self.dir.join(MANIFEST_FILE),
            &serde_json::to_vec_pretty(&next)?,
        )
        .await?;
        *manifest = next;
        tracing::info!(root = %new, generation = manifest.generation, "committed store root");
        Ok(true)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
