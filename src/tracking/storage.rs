//! Local file system run store

use super::{RunRecord, RunTracker};
use crate::error::Result;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

/// Keeps every run in `<base_dir>/runs.json`
pub struct LocalRunStore {
    base_dir: PathBuf,
    lock: Mutex<()>,
}

impl LocalRunStore {
    /// Create a new local run store
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            lock: Mutex::new(()),
        }
    }

    fn runs_file(&self) -> PathBuf {
        self.base_dir.join("runs.json")
    }

    /// Load all recorded runs, oldest first
    pub fn load_runs(&self) -> Result<Vec<RunRecord>> {
        let path = self.runs_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn save_runs(&self, runs: &[RunRecord]) -> Result<()> {
        fs::create_dir_all(&self.base_dir)?;
        let json = serde_json::to_string_pretty(runs)?;
        let tmp = self.base_dir.join("runs.json.tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(tmp, self.runs_file())?;
        Ok(())
    }
}

impl RunTracker for LocalRunStore {
    fn log_run(&self, record: &RunRecord) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut runs = self.load_runs()?;
        runs.push(record.clone());
        self.save_runs(&runs)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
