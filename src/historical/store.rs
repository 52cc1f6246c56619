use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use crate::error::Result;
use crate::historical::dataset::HistoricalDataset;

/// Owns the cached traffic log for the lifetime of the process.
///
/// The first successful `load` parses the file and caches the dataset; every
/// later call returns the same `Arc` without touching the file. Concurrent
/// first callers queue on `init_lock`, so only one parse is ever in flight and
/// at most one ever succeeds. A failed load is not cached: the caller gets the
/// error and the next call tries again.
#[derive(Debug)]
pub struct HistoricalStore {
    path: PathBuf,
    dataset: OnceLock<Arc<HistoricalDataset>>,
    init_lock: Mutex<()>,
}

impl HistoricalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dataset: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// A store that is already populated, for callers that build datasets in memory.
    pub fn preloaded(dataset: HistoricalDataset) -> Self {
        let store = Self::new(PathBuf::new());
        // Freshly created cell, so this cannot already be set.
        let _ = store.dataset.set(Arc::new(dataset));
        store
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.get().is_some()
    }

    /// Returns the cached dataset, loading it on first use.
    pub fn load(&self) -> Result<Arc<HistoricalDataset>> {
        if let Some(dataset) = self.dataset.get() {
            return Ok(Arc::clone(dataset));
        }

        // A panic inside a previous loader leaves nothing cached, so the
        // poisoned guard is still safe to reuse.
        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Another caller may have finished while we waited.
        if let Some(dataset) = self.dataset.get() {
            return Ok(Arc::clone(dataset));
        }

        let started = Instant::now();
        let dataset = match HistoricalDataset::from_path(&self.path) {
            Ok(dataset) => Arc::new(dataset),
            Err(e) => {
                log::error!(
                    "Failed to load traffic data from {}: {}",
                    self.path.display(),
                    e
                );
                return Err(e);
            }
        };
        log::info!(
            "Loaded {} traffic records from {} in {:?}",
            dataset.len(),
            self.path.display(),
            started.elapsed()
        );

        let _ = self.dataset.set(Arc::clone(&dataset));
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForecastError;
    use std::fs;
    use std::thread;

    fn temp_csv(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "junction_forecast_store_{}_{}.csv",
            name,
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    const SAMPLE: &str = "DateTime,Junction,Vehicles\n\
                          2015-11-01 00:00:00,1,15\n\
                          2015-11-01 01:00:00,1,13\n\
                          2015-11-01 00:00:00,2,6\n";

    #[test]
    fn load_is_cached_after_first_success() {
        let path = temp_csv("cached", SAMPLE);
        let store = HistoricalStore::new(&path);
        assert!(!store.is_loaded());

        let first = store.load().unwrap();
        // The source disappearing must not matter once the cache is populated.
        fs::remove_file(&path).unwrap();
        let second = store.load().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 3);
    }

    #[test]
    fn failures_are_reported_on_every_call_until_fixed() {
        let path = std::env::temp_dir().join(format!(
            "junction_forecast_store_late_{}.csv",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        let store = HistoricalStore::new(&path);

        for _ in 0..2 {
            assert!(matches!(store.load(), Err(ForecastError::DataUnavailable(_))));
        }
        assert!(!store.is_loaded());

        fs::write(&path, SAMPLE).unwrap();
        assert_eq!(store.load().unwrap().len(), 3);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn concurrent_first_access_shares_one_dataset() {
        let path = temp_csv("concurrent", SAMPLE);
        let store = Arc::new(HistoricalStore::new(&path));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.load().unwrap())
            })
            .collect();
        let loaded: Vec<Arc<HistoricalDataset>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        for dataset in &loaded[1..] {
            assert!(Arc::ptr_eq(&loaded[0], dataset));
        }
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn preloaded_store_never_reads_a_file() {
        let store = HistoricalStore::preloaded(HistoricalDataset::default());
        assert!(store.is_loaded());
        assert!(store.load().unwrap().is_empty());
    }
}
