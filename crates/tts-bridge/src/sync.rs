//! On-disk mirror of the game's scripts
//!
//! Every object becomes `<name>_<guid>.lua`, plus `<name>_<guid>.xml` when it
//! has UI markup. A load-game wipes the directory before repopulating it; new
//! objects only add or overwrite. An object re-sent with empty UI keeps its old
//! `.xml` until the next full reset.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use tts_sync_core::{
    Result, SCRIPT_EXTENSION, ScriptState, SyncError, UI_EXTENSION, split_base_name,
};

/// Outcome of applying a batch of script states
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    pub written: usize,
    pub skipped: usize,
}

/// Owner of the script directory
///
/// All mutations go through one lock so a reset from one connection can never
/// interleave with an apply from another.
pub struct ScriptSynchronizer {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl ScriptSynchronizer {
    /// Ensure `dir` exists and take ownership of it
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| SyncError::file_io(&dir, e))?;
        info!("Script directory ready at {}", dir.display());

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Delete every entry in the directory. Returns how many were removed.
    pub async fn reset(&self) -> usize {
        let _guard = self.write_lock.lock().await;
        self.reset_locked().await
    }

    /// Write each state's files, skipping entries that fail
    pub async fn apply(&self, states: &[ScriptState]) -> ApplyReport {
        let _guard = self.write_lock.lock().await;
        self.apply_locked(states).await
    }

    /// Full resync: reset then apply, as one unit
    pub async fn load_game(&self, states: &[ScriptState]) -> ApplyReport {
        let _guard = self.write_lock.lock().await;
        let removed = self.reset_locked().await;
        debug!("Load game cleared {} entries", removed);
        self.apply_locked(states).await
    }

    /// Read the directory back into script states, sorted by base name.
    ///
    /// `.lua` files define the objects; a matching `.xml` supplies the UI.
    /// Files that don't follow the naming scheme are ignored.
    pub async fn collect(&self) -> Result<Vec<ScriptState>> {
        let _guard = self.write_lock.lock().await;

        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| SyncError::file_io(&self.dir, e))?;

        let mut bases = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SyncError::file_io(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SCRIPT_EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if split_base_name(stem).is_some() => bases.push(stem.to_string()),
                _ => debug!("Ignoring {}", path.display()),
            }
        }
        bases.sort();

        let mut states = Vec::with_capacity(bases.len());
        for base in bases {
            let Some((name, guid)) = split_base_name(&base) else {
                continue;
            };
            let lua_path = self.path_for(&base, SCRIPT_EXTENSION);
            let script = fs::read_to_string(&lua_path)
                .await
                .map_err(|e| SyncError::file_io(&lua_path, e))?;

            let xml_path = self.path_for(&base, UI_EXTENSION);
            let ui = match fs::read_to_string(&xml_path).await {
                Ok(ui) => Some(ui),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(SyncError::file_io(&xml_path, e)),
            };

            states.push(ScriptState {
                name: name.to_string(),
                guid: guid.to_string(),
                script,
                ui,
            });
        }

        Ok(states)
    }

    async fn reset_locked(&self) -> usize {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to list {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to list {}: {}", self.dir.display(), e);
                    break;
                }
            };

            let path = entry.path();
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            let result = if is_dir {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            };

            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        removed
    }

    async fn apply_locked(&self, states: &[ScriptState]) -> ApplyReport {
        if let Err(e) = fs::create_dir_all(&self.dir).await {
            error!("Script directory {} unavailable: {}", self.dir.display(), e);
        }

        let mut report = ApplyReport::default();
        for state in states {
            match self.write_state(state).await {
                Ok(()) => report.written += 1,
                Err(e) => {
                    warn!("Skipping {} ({}): {}", state.name, state.guid, e);
                    report.skipped += 1;
                }
            }
        }

        info!(
            "Synced {} scripts to {} ({} skipped)",
            report.written,
            self.dir.display(),
            report.skipped
        );
        report
    }

    async fn write_state(&self, state: &ScriptState) -> Result<()> {
        let base = state.base_name();
        if base.contains(['/', '\\', '\0']) {
            return Err(SyncError::file_io(
                self.dir.join(&base),
                "invalid characters in file name",
            ));
        }

        write_file(&self.path_for(&base, SCRIPT_EXTENSION), &state.script).await?;

        if let Some(ui) = state.ui_content() {
            write_file(&self.path_for(&base, UI_EXTENSION), ui).await?;
        }

        Ok(())
    }

    fn path_for(&self, base: &str, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", base, extension))
    }
}

/// Write through a temp file and rename, so a failed write never leaves a
/// truncated file behind.
async fn write_file(path: &Path, contents: &str) -> Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    if let Err(e) = fs::write(&tmp, contents).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(SyncError::file_io(path, e));
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(SyncError::file_io(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn listing(dir: &Path) -> BTreeSet<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn synchronizer() -> (TempDir, ScriptSynchronizer) {
        let tmp = TempDir::new().unwrap();
        let sync = ScriptSynchronizer::create(tmp.path().join("scripts")).await.unwrap();
        (tmp, sync)
    }

    #[tokio::test]
    async fn test_create_makes_directory() {
        let (_tmp, sync) = synchronizer().await;
        assert!(sync.dir().is_dir());
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let (_tmp, sync) = synchronizer().await;
        let state = ScriptState::new("Card", "abc123", "print('a')").with_ui("<Text/>");

        sync.apply(std::slice::from_ref(&state)).await;
        sync.apply(std::slice::from_ref(&state)).await;

        assert_eq!(listing(sync.dir()), names(&["Card_abc123.lua", "Card_abc123.xml"]));
        let lua = std::fs::read_to_string(sync.dir().join("Card_abc123.lua")).unwrap();
        assert_eq!(lua, "print('a')");
    }

    #[tokio::test]
    async fn test_apply_overwrites_longer_content() {
        let (_tmp, sync) = synchronizer().await;
        sync.apply(&[ScriptState::new("A", "1", "a much longer script body")]).await;
        sync.apply(&[ScriptState::new("A", "1", "short")]).await;

        let lua = std::fs::read_to_string(sync.dir().join("A_1.lua")).unwrap();
        assert_eq!(lua, "short");
    }

    #[tokio::test]
    async fn test_reset_removes_everything() {
        let (_tmp, sync) = synchronizer().await;
        std::fs::write(sync.dir().join("notes.txt"), "hand written").unwrap();
        std::fs::create_dir(sync.dir().join("nested")).unwrap();
        std::fs::write(sync.dir().join("nested").join("inner.lua"), "x").unwrap();
        sync.apply(&[ScriptState::new("A", "1", "")]).await;

        let removed = sync.reset().await;

        assert_eq!(removed, 3);
        assert!(listing(sync.dir()).is_empty());
    }

    #[tokio::test]
    async fn test_load_game_resyncs() {
        let (_tmp, sync) = synchronizer().await;
        sync.apply(&[
            ScriptState::new("A", "1", "a"),
            ScriptState::new("B", "2", "b").with_ui("<B/>"),
        ])
        .await;

        let report = sync.load_game(&[ScriptState::new("C", "3", "c")]).await;

        assert_eq!(report, ApplyReport { written: 1, skipped: 0 });
        assert_eq!(listing(sync.dir()), names(&["C_3.lua"]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_load_game_and_apply_never_interleave() {
        let (_tmp, sync) = synchronizer().await;
        let sync = std::sync::Arc::new(sync);
        let loaded = [ScriptState::new("C", "3", "c")];
        let applied = [
            ScriptState::new("A", "1", "a"),
            ScriptState::new("B", "2", "b").with_ui("<B/>"),
        ];

        for _ in 0..10 {
            sync.apply(&[ScriptState::new("Old", "0", "stale")]).await;

            let load = tokio::spawn({
                let sync = sync.clone();
                let loaded = loaded.clone();
                async move { sync.load_game(&loaded).await }
            });
            let apply = tokio::spawn({
                let sync = sync.clone();
                let applied = applied.clone();
                async move { sync.apply(&applied).await }
            });
            load.await.unwrap();
            apply.await.unwrap();

            // Either order is fine; a half-reset mix is not
            let files = listing(sync.dir());
            assert!(
                files == names(&["C_3.lua"])
                    || files == names(&["A_1.lua", "B_2.lua", "B_2.xml", "C_3.lua"]),
                "{:?}",
                files
            );
        }
    }

    #[tokio::test]
    async fn test_new_object_is_incremental() {
        let (_tmp, sync) = synchronizer().await;
        sync.apply(&[ScriptState::new("A", "1", "a")]).await;
        sync.apply(&[ScriptState::new("B", "2", "b")]).await;

        assert_eq!(listing(sync.dir()), names(&["A_1.lua", "B_2.lua"]));
        let a = std::fs::read_to_string(sync.dir().join("A_1.lua")).unwrap();
        assert_eq!(a, "a");
    }

    #[tokio::test]
    async fn test_empty_ui_leaves_stale_xml() {
        let (_tmp, sync) = synchronizer().await;
        sync.apply(&[ScriptState::new("A", "1", "a").with_ui("<Old/>")]).await;
        sync.apply(&[ScriptState::new("A", "1", "a2").with_ui("")]).await;
        sync.apply(&[ScriptState::new("A", "1", "a3")]).await;

        let xml = std::fs::read_to_string(sync.dir().join("A_1.xml")).unwrap();
        assert_eq!(xml, "<Old/>");
    }

    #[tokio::test]
    async fn test_bad_entry_is_skipped_and_batch_continues() {
        let (tmp, sync) = synchronizer().await;
        let report = sync
            .apply(&[
                ScriptState::new("../escape", "1", "nope"),
                ScriptState::new("Good", "2", "ok"),
            ])
            .await;

        assert_eq!(report, ApplyReport { written: 1, skipped: 1 });
        assert_eq!(listing(sync.dir()), names(&["Good_2.lua"]));
        assert!(!tmp.path().join("escape_1.lua").exists());
    }

    #[tokio::test]
    async fn test_collect_reads_back_states() {
        let (_tmp, sync) = synchronizer().await;
        std::fs::write(sync.dir().join("README.md"), "not a script").unwrap();
        sync.apply(&[
            ScriptState::new("Deck_of_Cards", "b2", "deck").with_ui("<Deck/>"),
            ScriptState::new("Board", "a1", "board"),
        ])
        .await;

        let states = sync.collect().await.unwrap();

        assert_eq!(
            states,
            vec![
                ScriptState::new("Board", "a1", "board"),
                ScriptState::new("Deck_of_Cards", "b2", "deck").with_ui("<Deck/>"),
            ]
        );
    }
}
