//! Whole-file snapshots of the catalog database.
//!
//! Snapshots are consistent copies written with `VACUUM INTO` while the store
//! lock is held, named `catalog_YYYYMMDD_HHMMSS.db`. Restoring swaps the live
//! database file for a validated copy of a snapshot.

use super::error::{CatalogError, CatalogResult};
use super::schema::CATALOG_SCHEMA;
use super::store::{open_connection, SqliteCatalogStore};
use chrono::Local;
use rusqlite::{params, Connection, OpenFlags};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

const SNAPSHOT_PREFIX: &str = "catalog_";
const SNAPSHOT_SUFFIX: &str = ".db";

impl SqliteCatalogStore {
    /// Write a snapshot of the catalog into `backup_dir` and return its path.
    pub fn snapshot<P: AsRef<Path>>(&self, backup_dir: P) -> CatalogResult<PathBuf> {
        let backup_dir = backup_dir.as_ref();
        fs::create_dir_all(backup_dir)?;

        let conn = self.lock()?;
        let path = next_snapshot_path(backup_dir);
        let path_str = path
            .to_str()
            .ok_or_else(|| CatalogError::Snapshot(format!("Non UTF-8 snapshot path {:?}", path)))?;
        conn.execute("VACUUM INTO ?1", params![path_str])?;

        info!("Catalog snapshot written to {:?}", path);
        Ok(path)
    }

    /// Snapshots found in `backup_dir`, most recent first, at most `limit`.
    pub fn list_snapshots<P: AsRef<Path>>(
        backup_dir: P,
        limit: usize,
    ) -> CatalogResult<Vec<PathBuf>> {
        let backup_dir = backup_dir.as_ref();
        if !backup_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut snapshots: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in fs::read_dir(backup_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !is_snapshot_file(&path) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            snapshots.push((modified, path));
        }

        snapshots.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        Ok(snapshots
            .into_iter()
            .take(limit)
            .map(|(_, path)| path)
            .collect())
    }

    /// Delete all but the `keep` most recent snapshots. Returns how many were deleted.
    pub fn prune_snapshots<P: AsRef<Path>>(backup_dir: P, keep: usize) -> CatalogResult<usize> {
        let snapshots = Self::list_snapshots(backup_dir, usize::MAX)?;
        let mut removed = 0;
        for path in snapshots.iter().skip(keep) {
            fs::remove_file(path)?;
            removed += 1;
        }
        if removed > 0 {
            info!("Removed {} old catalog snapshots", removed);
        }
        Ok(removed)
    }

    /// Replace the live catalog with the content of `snapshot`.
    ///
    /// The snapshot is validated first and copied next to the live database,
    /// then renamed over it while the store lock is held.
    pub fn restore<P: AsRef<Path>>(&self, snapshot: P) -> CatalogResult<()> {
        let snapshot = snapshot.as_ref();
        let db_path = self.db_path().map(Path::to_path_buf).ok_or_else(|| {
            CatalogError::Snapshot("An in-memory catalog cannot be restored".to_string())
        })?;

        verify_snapshot(snapshot)?;

        let parent = db_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = tempfile::NamedTempFile::new_in(parent)?;
        let mut source = fs::File::open(snapshot)?;
        std::io::copy(&mut source, staged.as_file_mut())?;
        staged.as_file().sync_all()?;

        let mut conn = self.lock()?;
        let live = std::mem::replace(&mut *conn, Connection::open_in_memory()?);
        if let Err((live, e)) = live.close() {
            *conn = live;
            return Err(e.into());
        }
        remove_sidecar_files(&db_path)?;

        let swapped = staged.persist(&db_path).map(|_| ()).map_err(|e| CatalogError::from(e.error));
        // Reopen whatever is at the live path now, the old file if the rename failed
        *conn = open_connection(&db_path)?;
        swapped?;

        info!("Catalog {:?} restored from {:?}", db_path, snapshot);
        Ok(())
    }
}

fn is_snapshot_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(SNAPSHOT_PREFIX) && n.ends_with(SNAPSHOT_SUFFIX))
            .unwrap_or(false)
}

fn next_snapshot_path(backup_dir: &Path) -> PathBuf {
    let stem = format!(
        "{}{}",
        SNAPSHOT_PREFIX,
        Local::now().format("%Y%m%d_%H%M%S")
    );
    let mut path = backup_dir.join(format!("{}{}", stem, SNAPSHOT_SUFFIX));
    let mut n = 1;
    while path.exists() {
        path = backup_dir.join(format!("{}_{}{}", stem, n, SNAPSHOT_SUFFIX));
        n += 1;
    }
    path
}

/// A snapshot must carry the current schema and pass SQLite's own check.
fn verify_snapshot(snapshot: &Path) -> CatalogResult<()> {
    if !snapshot.is_file() {
        return Err(CatalogError::Snapshot(format!(
            "Snapshot not found: {:?}",
            snapshot
        )));
    }
    let conn = Connection::open_with_flags(
        snapshot,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    CATALOG_SCHEMA
        .validate(&conn)
        .map_err(|e| CatalogError::Snapshot(format!("{:?} is not a catalog: {:#}", snapshot, e)))?;
    let quick_check: String = conn.query_row("PRAGMA quick_check", [], |r| r.get(0))?;
    if quick_check != "ok" {
        return Err(CatalogError::Snapshot(format!(
            "{:?} failed integrity check: {}",
            snapshot, quick_check
        )));
    }
    Ok(())
}

/// WAL and shared-memory files of the replaced database must not be applied
/// to the restored one.
fn remove_sidecar_files(db_path: &Path) -> CatalogResult<()> {
    for suffix in ["-wal", "-shm"] {
        let mut sidecar = db_path.as_os_str().to_owned();
        sidecar.push(suffix);
        match fs::remove_file(&sidecar) {
            Ok(()) => warn!("Removed leftover {:?}", sidecar),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
