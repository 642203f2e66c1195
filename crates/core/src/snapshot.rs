//! Disk snapshots for the index.
//!
//! Layout: 4-byte magic, 2-byte little-endian format version, bincode
//! payload (configuration, point store, layered adjacency, entry point),
//! 4-byte big-endian CRC32 of the payload. Writes go to a temp file that is
//! renamed into place, so a crash never leaves a half-written snapshot
//! behind. The format is opaque; only this crate reads it.
//!
//! Loading verifies the header and checksum, deserializes, and re-checks
//! every structural invariant of the graph before handing the index back.
//! The level-sampling RNG is re-seeded from the persisted configuration; it
//! is not part of the snapshot.

use crate::error::{IndexError, Result};
use crate::hnsw::graph::HnswGraph;
use crate::index::Index;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Magic bytes at the start of every snapshot.
const SNAPSHOT_MAGIC: &[u8; 4] = b"SWG1";

/// Current snapshot format version.
const SNAPSHOT_VERSION: u16 = 1;

/// Magic + version.
const HEADER_LEN: usize = 6;

/// CRC32 footer.
const FOOTER_LEN: usize = 4;

fn corrupted(path: &Path, detail: impl Into<String>) -> IndexError {
    IndexError::SnapshotCorrupted {
        path: path.to_path_buf(),
        detail: detail.into(),
    }
}

/// Write a snapshot of the index to `path`, atomically.
pub fn save_index<P: AsRef<Path>>(index: &Index, path: P) -> Result<()> {
    let path = path.as_ref();
    let data = index.data.read();

    let payload = bincode::serialize(&data.graph)
        .map_err(|e| IndexError::Io(io::Error::other(e.to_string())))?;
    let crc = crc32fast::hash(&payload);

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + FOOTER_LEN);
    out.extend_from_slice(SNAPSHOT_MAGIC);
    out.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&crc.to_be_bytes());

    // Atomic write: temp file in the same directory, then rename.
    let tmp = tmp_path(path);
    fs::write(&tmp, &out)?;
    fs::rename(&tmp, path)?;

    tracing::info!(
        "saved index snapshot to {:?} ({} points, {} bytes, CRC32={:#010x})",
        path,
        data.graph.len(),
        payload.len(),
        crc
    );
    Ok(())
}

/// Load a snapshot written by [`save_index`].
pub fn load_index<P: AsRef<Path>>(path: P) -> Result<Index> {
    let path = path.as_ref();
    let raw = fs::read(path)?;

    if raw.len() < HEADER_LEN + FOOTER_LEN {
        return Err(corrupted(path, format!("truncated file ({} bytes)", raw.len())));
    }
    if &raw[..4] != SNAPSHOT_MAGIC {
        return Err(corrupted(path, "bad magic; not an index snapshot"));
    }
    let version = u16::from_le_bytes([raw[4], raw[5]]);
    if version != SNAPSHOT_VERSION {
        return Err(corrupted(
            path,
            format!("unsupported format version {version} (expected {SNAPSHOT_VERSION})"),
        ));
    }

    let payload = &raw[HEADER_LEN..raw.len() - FOOTER_LEN];
    let footer: [u8; FOOTER_LEN] = raw[raw.len() - FOOTER_LEN..]
        .try_into()
        .expect("footer slice has exactly FOOTER_LEN bytes");
    let stored_crc = u32::from_be_bytes(footer);
    let computed_crc = crc32fast::hash(payload);
    if computed_crc != stored_crc {
        return Err(corrupted(
            path,
            format!("CRC32 mismatch: stored {stored_crc:#010x}, computed {computed_crc:#010x}"),
        ));
    }
    tracing::debug!("snapshot CRC32 verified: {:#010x}", stored_crc);

    let graph: HnswGraph =
        bincode::deserialize(payload).map_err(|e| corrupted(path, e.to_string()))?;
    graph
        .validate()
        .map_err(|detail| corrupted(path, format!("validation failed: {detail}")))?;

    tracing::info!("loaded index snapshot from {:?} ({} points)", path, graph.len());
    Ok(Index::from_graph(graph))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hnsw::graph::HnswConfig;
    use tempfile::tempdir;

    fn build_index() -> Index {
        let index = Index::new(
            4,
            HnswConfig {
                seed: Some(77),
                ..HnswConfig::default()
            },
        )
        .unwrap();
        for i in 0..40u64 {
            let v = vec![
                (i % 4) as f32,
                (i % 7) as f32 * 0.5,
                (i % 3) as f32 * 2.0,
                i as f32 * 0.1,
            ];
            if i % 10 == 0 {
                index.insert_with_tag(i, v, format!("tag-{i}")).unwrap();
            } else {
                index.insert(i, v).unwrap();
            }
        }
        index
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.swg");
        let index = build_index();
        save_index(&index, &path).unwrap();

        let loaded = load_index(&path).unwrap();
        assert_eq!(loaded.len(), index.len());
        assert_eq!(loaded.dimension(), 4);
        assert_eq!(loaded.tag(10).unwrap(), Some("tag-10".to_string()));
        assert_eq!(loaded.get(13).unwrap(), index.get(13).unwrap());
        assert!(loaded.validate().is_ok());

        // Identical graphs answer identically.
        let q = [1.0, 0.5, 2.0, 1.5];
        assert_eq!(index.knn(&q, 5).unwrap(), loaded.knn(&q, 5).unwrap());
    }

    #[test]
    fn test_snapshot_starts_with_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.swg");
        save_index(&build_index(), &path).unwrap();
        let raw = fs::read(&path).unwrap();
        assert_eq!(&raw[..4], b"SWG1");
        assert_eq!(u16::from_le_bytes([raw[4], raw[5]]), 1);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.swg");
        save_index(&build_index(), &path).unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("index.swg")]);
    }

    #[test]
    fn test_flipped_byte_is_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.swg");
        save_index(&build_index(), &path).unwrap();

        let mut raw = fs::read(&path).unwrap();
        let mid = raw.len() / 2;
        raw[mid] ^= 0xFF;
        fs::write(&path, &raw).unwrap();

        let err = load_index(&path).unwrap_err();
        assert!(matches!(err, IndexError::SnapshotCorrupted { .. }), "{err}");
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("not-a-snapshot");
        fs::write(&path, b"definitely not a snapshot file").unwrap();
        let err = load_index(&path).unwrap_err();
        assert!(err.to_string().contains("magic"), "{err}");
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny");
        fs::write(&path, b"SWG1").unwrap();
        let err = load_index(&path).unwrap_err();
        assert!(err.to_string().contains("truncated"), "{err}");
    }

    #[test]
    fn test_future_version_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.swg");
        save_index(&build_index(), &path).unwrap();

        let mut raw = fs::read(&path).unwrap();
        raw[4] = 0xFF;
        raw[5] = 0xFF;
        fs::write(&path, &raw).unwrap();

        let err = load_index(&path).unwrap_err();
        assert!(err.to_string().contains("version"), "{err}");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_index("/definitely/not/here.swg").unwrap_err();
        assert!(matches!(err, IndexError::Io(_)));
    }

    #[test]
    fn test_loaded_index_keeps_accepting_inserts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.swg");
        let index = build_index();
        save_index(&index, &path).unwrap();

        let loaded = load_index(&path).unwrap();
        loaded.insert(1000, vec![9.0, 9.0, 9.0, 9.0]).unwrap();
        assert_eq!(loaded.len(), 41);
        assert!(loaded.validate().is_ok());
        assert_eq!(loaded.knn(&[9.0, 9.0, 9.0, 9.0], 1).unwrap(), vec![1000]);
    }
}
