// src/definitions/refresh.rs

//! Rebuilding the definition store from the registry
//!
//! A refresh walks every registry source, fetches and parses its recipe and
//! collects the results into a new [`DefinitionStore`]. Sources without a
//! usable recipe are skipped. The store is persisted only once every source
//! has been processed; a cancelled or failed refresh leaves both the
//! snapshot and the live store untouched.

use crate::error::{Error, Result};
use crate::progress::{ProgressObserver, RefreshEvent};
use crate::recipe::{parse_recipe, Recipe};
use crate::repository::{Registry, Source};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

use super::{DefinitionStore, SharedDefinitions};

/// Result of a completed refresh
#[derive(Debug)]
pub struct RefreshReport {
    /// The freshly built (and already persisted) store
    pub store: DefinitionStore,
    /// Sources examined
    pub processed: usize,
    /// Sources skipped for lack of a usable recipe
    pub skipped: usize,
}

/// Build a new store from the registry and persist it to `snapshot_path`
///
/// `cancel` is checked once per source, before its recipe is fetched.
pub fn refresh_from_registry(
    registry: &Registry,
    snapshot_path: &Path,
    observer: &dyn ProgressObserver,
    cancel: &AtomicBool,
) -> Result<RefreshReport> {
    observer.notify(RefreshEvent::Listing.into());

    let mut store = DefinitionStore::new();
    let mut processed = 0;
    let mut skipped = 0;

    for source in registry.list_sources() {
        let source = source?;

        if cancel.load(Ordering::SeqCst) {
            return Err(cancelled(observer));
        }

        processed += 1;
        observer.notify(
            RefreshEvent::SourceStarted {
                name: source.name.clone(),
                index: processed,
            }
            .into(),
        );
        info!("Processing {}", source.name);

        match load_source(registry, &source) {
            Ok(recipe) => {
                let archive = recipe.archive_name.clone();
                if let Some(previous) = store.insert(recipe) {
                    warn!(
                        "{} redefines {} (previously from {})",
                        source.name,
                        archive,
                        previous.source_url.as_deref().unwrap_or("unknown source")
                    );
                }
                observer.notify(
                    RefreshEvent::SourceAdded {
                        name: source.name.clone(),
                        archive,
                        count: store.len(),
                    }
                    .into(),
                );
            }
            Err(reason) => {
                skipped += 1;
                warn!("Source {} skipped: {}", source.name, reason);
                observer.notify(
                    RefreshEvent::SourceSkipped {
                        name: source.name.clone(),
                        reason,
                    }
                    .into(),
                );
            }
        }
    }

    if cancel.load(Ordering::SeqCst) {
        return Err(cancelled(observer));
    }

    store.persist(snapshot_path)?;
    info!(
        "Refreshed {} definitions from {} sources ({} skipped)",
        store.len(),
        processed,
        skipped
    );
    observer.notify(RefreshEvent::Finished { count: store.len() }.into());

    Ok(RefreshReport {
        store,
        processed,
        skipped,
    })
}

/// Fetch and parse one source's recipe; `Err` carries the skip reason
fn load_source(registry: &Registry, source: &Source) -> std::result::Result<Recipe, String> {
    let text = match registry.fetch_recipe(source) {
        Ok(Some(text)) => text,
        Ok(None) => return Err("missing rom info".to_string()),
        Err(e) => return Err(e.to_string()),
    };

    parse_recipe(&text, Some(&source.html_url)).map_err(|e| e.to_string())
}

fn cancelled(observer: &dyn ProgressObserver) -> Error {
    info!("Definition refresh cancelled");
    observer.notify(RefreshEvent::Cancelled.into());
    Error::Cancelled
}

/// Resets the running flag when the worker thread ends, panics included
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs at most one refresh at a time on a background thread
///
/// A successful refresh is published to the shared definitions; a failed or
/// cancelled one is discarded.
pub struct RefreshWorker {
    registry: Registry,
    snapshot_path: PathBuf,
    definitions: SharedDefinitions,
    running: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<Result<usize>>>>,
}

impl RefreshWorker {
    pub fn new(registry: Registry, snapshot_path: PathBuf, definitions: SharedDefinitions) -> Self {
        Self {
            registry,
            snapshot_path,
            definitions,
            running: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Start a refresh; returns `false` without doing anything if one is
    /// already in flight
    pub fn start(&self, observer: Arc<dyn ProgressObserver>) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Definition refresh already running");
            return false;
        }
        self.cancel.store(false, Ordering::SeqCst);

        let guard = RunningGuard(Arc::clone(&self.running));
        let registry = self.registry.clone();
        let snapshot_path = self.snapshot_path.clone();
        let definitions = self.definitions.clone();
        let cancel = Arc::clone(&self.cancel);

        // The slot stays locked until the handle is stored, so a start that
        // follows this run's completion cannot be overwritten by it
        let mut slot = self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let handle = thread::spawn(move || {
            let _guard = guard;
            let report =
                refresh_from_registry(&registry, &snapshot_path, observer.as_ref(), &cancel)?;
            let count = report.store.len();
            definitions.publish(report.store);
            Ok(count)
        });
        *slot = Some(handle);
        true
    }

    /// Ask the running refresh to stop after the current source
    pub fn cancel(&self) {
        info!("Refresh stop requested");
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Wait for the last started refresh; `None` if none was started since
    /// the previous join
    pub fn join(&self) -> Option<Result<usize>> {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()?;

        Some(
            handle
                .join()
                .unwrap_or_else(|_| Err(Error::InitError("refresh worker panicked".to_string()))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::progress::{ChannelProgress, ProgressEvent, SilentProgress};
    use crate::repository::{Fetch, FetchResponse};
    use std::collections::HashMap;

    const API: &str = "https://api.test";

    /// Serves canned responses; optionally raises a flag when a URL is hit
    #[derive(Default)]
    struct Scripted {
        responses: HashMap<String, FetchResponse>,
        trip: Option<(String, Arc<AtomicBool>)>,
    }

    impl Scripted {
        fn with_sources(sources: &[(&str, Option<&str>)]) -> Self {
            let config = test_config();
            let listing: Vec<_> = sources
                .iter()
                .map(|(name, _)| {
                    serde_json::json!({ "name": name, "html_url": format!("https://example.com/{}", name) })
                })
                .collect();

            let mut responses = HashMap::new();
            responses.insert(
                config.listing_url(1),
                FetchResponse::ok(serde_json::to_vec(&listing).unwrap()),
            );
            for (name, recipe) in sources {
                if let Some(recipe) = recipe {
                    responses.insert(
                        format!("https://example.com/{}/raw/master/releases/build_rom.ini", name),
                        FetchResponse::ok(recipe.as_bytes()),
                    );
                }
            }
            Self {
                responses,
                trip: None,
            }
        }
    }

    impl Fetch for Scripted {
        fn get(&self, url: &str) -> Result<FetchResponse> {
            if let Some((trigger, flag)) = &self.trip {
                if url == trigger {
                    flag.store(true, Ordering::SeqCst);
                }
            }
            Ok(self
                .responses
                .get(url)
                .cloned()
                .unwrap_or(FetchResponse::status(404)))
        }
    }

    fn test_config() -> Config {
        Config {
            api_host: API.to_string(),
            ..Config::default()
        }
    }

    const DKONG: &str = "zip=dkong.zip\nifiles=(a.bin ../extra/b.bin)\nofile=a.dkong.rom\n";
    const GALAGA: &str = "zip=galaga.zip\nifiles=g.bin\nofile=a.galaga.rom\n";

    #[test]
    fn test_refresh_builds_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("definitions.toml");
        let fetcher = Scripted::with_sources(&[
            ("Arcade-DonkeyKong_MiSTer", Some(DKONG)),
            ("Arcade-NoRecipe_MiSTer", None),
            ("Arcade-Broken_MiSTer", Some("no separator here")),
            ("Arcade-Galaga_MiSTer", Some(GALAGA)),
            ("Menu_MiSTer", Some(GALAGA)),
        ]);
        let registry = Registry::new(test_config(), Arc::new(fetcher));

        let report =
            refresh_from_registry(&registry, &path, &SilentProgress, &AtomicBool::new(false)).unwrap();

        assert_eq!(report.processed, 4);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.store.len(), 2);

        let dkong = report.store.lookup("dkong.zip").unwrap();
        assert_eq!(
            dkong.inputs[1].as_token(),
            "https://example.com/Arcade-DonkeyKong_MiSTer/raw/master/releases/foo/extra/b.bin"
        );
        assert_eq!(
            dkong.source_url.as_deref(),
            Some("https://example.com/Arcade-DonkeyKong_MiSTer")
        );

        let reloaded = DefinitionStore::load_from_snapshot(&path).unwrap();
        assert_eq!(reloaded, report.store);
    }

    #[test]
    fn test_keyed_by_declared_archive_name() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Scripted::with_sources(&[
            ("Arcade-First_MiSTer", Some(GALAGA)),
            ("Arcade-Second_MiSTer", Some(GALAGA)),
        ]);
        let registry = Registry::new(test_config(), Arc::new(fetcher));

        let report = refresh_from_registry(
            &registry,
            &dir.path().join("d.toml"),
            &SilentProgress,
            &AtomicBool::new(false),
        )
        .unwrap();

        assert_eq!(report.store.len(), 1);
        let recipe = report.store.lookup("galaga.zip").unwrap();
        assert_eq!(recipe.core_name().as_deref(), Some("Second"));
    }

    #[test]
    fn test_cancel_discards_partial_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("definitions.toml");
        std::fs::write(&path, "").unwrap();

        let cancel = Arc::new(AtomicBool::new(false));
        let mut fetcher = Scripted::with_sources(&[
            ("Arcade-DonkeyKong_MiSTer", Some(DKONG)),
            ("Arcade-Galaga_MiSTer", Some(GALAGA)),
        ]);
        fetcher.trip = Some((
            "https://example.com/Arcade-DonkeyKong_MiSTer/raw/master/releases/build_rom.ini"
                .to_string(),
            Arc::clone(&cancel),
        ));
        let registry = Registry::new(test_config(), Arc::new(fetcher));
        let (observer, events) = ChannelProgress::channel();

        let err = refresh_from_registry(&registry, &path, &observer, &cancel).unwrap_err();
        assert!(matches!(err, Error::Cancelled));

        let events: Vec<_> = events.try_iter().collect();
        assert!(events.contains(&ProgressEvent::Refresh(RefreshEvent::Cancelled)));
        assert!(!events
            .iter()
            .any(|e| matches!(e, ProgressEvent::Refresh(RefreshEvent::SourceStarted { index: 2, .. }))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_listing_failure_fails_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("definitions.toml");
        let registry = Registry::new(test_config(), Arc::new(Scripted::default()));

        let result = refresh_from_registry(&registry, &path, &SilentProgress, &AtomicBool::new(false));
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_worker_publishes_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Scripted::with_sources(&[("Arcade-Galaga_MiSTer", Some(GALAGA))]);
        let registry = Registry::new(test_config(), Arc::new(fetcher));
        let shared = SharedDefinitions::default();
        let worker = RefreshWorker::new(registry, dir.path().join("d.toml"), shared.clone());

        assert!(worker.start(Arc::new(SilentProgress)));
        assert_eq!(worker.join().unwrap().unwrap(), 1);
        assert!(!worker.is_running());
        assert!(shared.current().lookup("galaga.zip").is_some());
        assert!(worker.join().is_none());
    }

    /// Blocks the listing request until released
    struct Gate {
        inner: Scripted,
        release: Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl Fetch for Gate {
        fn get(&self, url: &str) -> Result<FetchResponse> {
            if url.contains("/users/") {
                let _ = self.release.lock().unwrap().recv();
            }
            self.inner.get(url)
        }
    }

    #[test]
    fn test_worker_single_flight() {
        let dir = tempfile::tempdir().unwrap();
        let (release, gate) = std::sync::mpsc::channel();
        let fetcher = Gate {
            inner: Scripted::with_sources(&[("Arcade-Galaga_MiSTer", Some(GALAGA))]),
            release: Mutex::new(gate),
        };
        let registry = Registry::new(test_config(), Arc::new(fetcher));
        let shared = SharedDefinitions::default();
        let worker = RefreshWorker::new(registry, dir.path().join("d.toml"), shared.clone());

        assert!(worker.start(Arc::new(SilentProgress)));
        assert!(worker.is_running());
        assert!(!worker.start(Arc::new(SilentProgress)));

        release.send(()).unwrap();
        assert_eq!(worker.join().unwrap().unwrap(), 1);
        assert_eq!(shared.current().len(), 1);
    }

    /// Each listing request returns one more source than the last
    #[derive(Default)]
    struct Growing {
        listings: std::sync::atomic::AtomicUsize,
    }

    impl Fetch for Growing {
        fn get(&self, url: &str) -> Result<FetchResponse> {
            if url.contains("/users/") {
                let count = self.listings.fetch_add(1, Ordering::SeqCst) + 1;
                let listing: Vec<_> = (1..=count)
                    .map(|i| {
                        serde_json::json!({
                            "name": format!("Arcade-S{}_MiSTer", i),
                            "html_url": format!("https://example.com/Arcade-S{}_MiSTer", i),
                        })
                    })
                    .collect();
                return Ok(FetchResponse::ok(serde_json::to_vec(&listing).unwrap()));
            }
            let name = url.split('/').nth(3).unwrap_or("unknown");
            Ok(FetchResponse::ok(format!("zip={}.zip\nifiles=a.bin\n", name).into_bytes()))
        }
    }

    #[test]
    fn test_worker_join_returns_latest_run() {
        for _ in 0..20 {
            let dir = tempfile::tempdir().unwrap();
            let fetcher = Arc::new(Growing::default());
            let registry = Registry::new(test_config(), fetcher.clone());
            let worker = Arc::new(RefreshWorker::new(
                registry,
                dir.path().join("d.toml"),
                SharedDefinitions::default(),
            ));

            let first = {
                let worker = Arc::clone(&worker);
                thread::spawn(move || assert!(worker.start(Arc::new(SilentProgress))))
            };
            while fetcher.listings.load(Ordering::SeqCst) == 0 || worker.is_running() {
                thread::yield_now();
            }

            assert!(worker.start(Arc::new(SilentProgress)));
            first.join().unwrap();

            assert_eq!(worker.join().unwrap().unwrap(), 2);
            assert_eq!(worker.definitions.current().len(), 2);
        }
    }

    #[test]
    fn test_worker_cancel_keeps_old_store() {
        let dir = tempfile::tempdir().unwrap();
        let (release, gate) = std::sync::mpsc::channel();
        let fetcher = Gate {
            inner: Scripted::with_sources(&[("Arcade-Galaga_MiSTer", Some(GALAGA))]),
            release: Mutex::new(gate),
        };
        let registry = Registry::new(test_config(), Arc::new(fetcher));
        let old: DefinitionStore = crate::recipe::parse_recipe(DKONG, None).into_iter().collect();
        let shared = SharedDefinitions::new(old.clone());
        let worker = RefreshWorker::new(registry, dir.path().join("d.toml"), shared.clone());

        assert!(worker.start(Arc::new(SilentProgress)));
        worker.cancel();
        release.send(()).unwrap();

        assert!(matches!(worker.join(), Some(Err(Error::Cancelled))));
        assert_eq!(*shared.current(), old);
        assert!(!dir.path().join("d.toml").exists());
    }
}
