//! Bookkeeping for the set of open directory watches.
//!
//! The [`WatcherRegistry`] owns one non-recursive handle per absolute
//! directory and reconciles that set against the directories the UI has
//! expanded. Reconciliation is an explicit diff-and-apply:
//!
//! 1. resolve every desired path (root first) before touching anything,
//! 2. open a handle for each desired directory that has none,
//! 3. close every handle that is neither desired nor the root.
//!
//! Running the same reconcile twice is a no-op the second time.

use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::{FxHashMap, FxHashSet};
use wsb_core::{PathError, PathResolver};

use crate::backend::WatchBackend;
use crate::error::WatchError;

/// An open non-recursive watch on one directory.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    dir: Utf8PathBuf,
    opened_at: Instant,
}

impl WatchHandle {
    fn new(dir: Utf8PathBuf) -> Self {
        Self {
            dir,
            opened_at: Instant::now(),
        }
    }

    /// The watched directory (absolute).
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// When the watch was opened.
    #[inline]
    #[must_use]
    pub const fn opened_at(&self) -> Instant {
        self.opened_at
    }
}

/// What a reconcile (or root open) changed.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// Directories that gained a handle, in the order they were opened.
    pub opened: Vec<Utf8PathBuf>,

    /// Directories whose handle was closed.
    pub closed: Vec<Utf8PathBuf>,

    /// Directories whose watch could not be opened.
    pub failed: Vec<(Utf8PathBuf, WatchError)>,
}

impl ReconcileOutcome {
    /// Returns `true` if nothing was opened, closed, or attempted.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.opened.is_empty() && self.closed.is_empty() && self.failed.is_empty()
    }

    /// Iterates over the failures that must be surfaced to the user.
    pub fn fatal(&self) -> impl Iterator<Item = (&Utf8Path, &WatchError)> {
        self.failed
            .iter()
            .filter(|(_, error)| error.is_fatal())
            .map(|(dir, error)| (dir.as_path(), error))
    }
}

/// Owns the active watch handles of one session.
///
/// # Invariants
///
/// After every [`reconcile`](Self::reconcile), the set of watched directories
/// is exactly the root plus the absolute form of every expanded path, minus
/// the directories whose watch failed to open. There is at most one handle
/// per absolute directory.
#[derive(Debug)]
pub struct WatcherRegistry<B> {
    backend: B,
    handles: FxHashMap<Utf8PathBuf, WatchHandle>,
}

impl<B: WatchBackend> WatcherRegistry<B> {
    /// Creates an empty registry over `backend`.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            handles: FxHashMap::default(),
        }
    }

    /// Opens the watch on the workspace root if it is not open yet.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::NotConfigured`] if the resolver has no root. A
    /// failure to open the watch itself is reported in the outcome.
    pub fn open_root(&mut self, resolver: &PathResolver) -> Result<ReconcileOutcome, PathError> {
        let root = resolver.root()?.to_owned();
        let mut outcome = ReconcileOutcome::default();

        if !self.handles.contains_key(&root) {
            self.open(root, &mut outcome);
        }

        Ok(outcome)
    }

    /// Brings the open handles in line with `expanded` (normalized relative
    /// paths).
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] if the resolver has no root or an expanded
    /// path does not resolve. Nothing is opened or closed in that case.
    pub fn reconcile(
        &mut self,
        resolver: &PathResolver,
        expanded: &[Utf8PathBuf],
    ) -> Result<ReconcileOutcome, PathError> {
        let root = resolver.root()?;

        let mut desired = Vec::with_capacity(expanded.len() + 1);
        let mut desired_set = FxHashSet::default();
        desired_set.insert(root.to_owned());
        desired.push(root.to_owned());

        for relative in expanded {
            let absolute = resolver.to_absolute(relative.as_str())?;
            if desired_set.insert(absolute.clone()) {
                desired.push(absolute);
            }
        }

        let mut outcome = ReconcileOutcome::default();

        for dir in desired {
            if !self.handles.contains_key(&dir) {
                self.open(dir, &mut outcome);
            }
        }

        let mut stale: Vec<Utf8PathBuf> = self
            .handles
            .keys()
            .filter(|dir| !desired_set.contains(*dir) && dir.as_path() != root)
            .cloned()
            .collect();
        stale.sort_unstable();

        for dir in stale {
            if self.close(&dir) {
                outcome.closed.push(dir);
            }
        }

        if !outcome.is_unchanged() {
            tracing::debug!(
                opened = outcome.opened.len(),
                closed = outcome.closed.len(),
                failed = outcome.failed.len(),
                watched = self.handles.len(),
                "Reconciled directory watches"
            );
        }

        Ok(outcome)
    }

    /// Drops the handle for `dir` after the backend reported it broken.
    ///
    /// Returns `true` if a handle was removed.
    pub fn evict(&mut self, dir: &Utf8Path) -> bool {
        let evicted = self.close(dir);
        if evicted {
            tracing::info!(path = %dir, "Evicted directory watch after backend error");
        }
        evicted
    }

    /// Closes every handle, including the root's.
    ///
    /// Returns the number of handles closed.
    pub fn close_all(&mut self) -> usize {
        let count = self.handles.len();
        for (dir, _handle) in self.handles.drain() {
            if let Err(error) = self.backend.unwatch(&dir) {
                tracing::debug!(path = %dir, error = %error, "Failed to unwatch directory");
            }
        }
        if count > 0 {
            tracing::debug!(count, "Closed all directory watches");
        }
        count
    }

    /// Returns `true` if `dir` has an open handle.
    #[inline]
    #[must_use]
    pub fn is_watching(&self, dir: &Utf8Path) -> bool {
        self.handles.contains_key(dir)
    }

    /// Returns the handle for `dir`, if any.
    #[must_use]
    pub fn handle(&self, dir: &Utf8Path) -> Option<&WatchHandle> {
        self.handles.get(dir)
    }

    /// Returns the watched directories, sorted.
    #[must_use]
    pub fn watched(&self) -> Vec<Utf8PathBuf> {
        let mut dirs: Vec<Utf8PathBuf> = self.handles.keys().cloned().collect();
        dirs.sort_unstable();
        dirs
    }

    /// Number of open handles.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if no handle is open.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// The underlying backend.
    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn open(&mut self, dir: Utf8PathBuf, outcome: &mut ReconcileOutcome) {
        match self.backend.watch(&dir) {
            Ok(()) => {
                self.handles.insert(dir.clone(), WatchHandle::new(dir.clone()));
                outcome.opened.push(dir);
            }
            Err(error) => {
                if error.is_fatal() {
                    tracing::error!(path = %dir, error = %error, "Watch limit reached");
                } else {
                    tracing::warn!(path = %dir, error = %error, "Failed to watch directory");
                }
                outcome.failed.push((dir, error));
            }
        }
    }

    fn close(&mut self, dir: &Utf8Path) -> bool {
        if self.handles.remove(dir).is_none() {
            return false;
        }
        if let Err(error) = self.backend.unwatch(dir) {
            // Expected when the directory itself was deleted.
            tracing::debug!(path = %dir, error = %error, "Failed to unwatch directory");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct RecordingBackend {
        watch_calls: Vec<Utf8PathBuf>,
        unwatch_calls: Vec<Utf8PathBuf>,
        exhausted: FxHashSet<Utf8PathBuf>,
        missing: FxHashSet<Utf8PathBuf>,
    }

    impl WatchBackend for RecordingBackend {
        fn watch(&mut self, dir: &Utf8Path) -> Result<(), WatchError> {
            self.watch_calls.push(dir.to_owned());
            if self.exhausted.contains(dir) {
                return Err(notify::Error::new(notify::ErrorKind::MaxFilesWatch).into());
            }
            if self.missing.contains(dir) {
                return Err(WatchError::path_not_found(dir));
            }
            Ok(())
        }

        fn unwatch(&mut self, dir: &Utf8Path) -> Result<(), WatchError> {
            self.unwatch_calls.push(dir.to_owned());
            Ok(())
        }
    }

    fn resolver() -> PathResolver {
        PathResolver::with_root("/ws").unwrap()
    }

    fn rel(paths: &[&str]) -> Vec<Utf8PathBuf> {
        paths.iter().map(Utf8PathBuf::from).collect()
    }

    fn watched(registry: &WatcherRegistry<RecordingBackend>) -> Vec<String> {
        registry
            .watched()
            .into_iter()
            .map(Utf8PathBuf::into_string)
            .collect()
    }

    #[test]
    fn test_open_root() {
        let mut registry = WatcherRegistry::new(RecordingBackend::default());
        let outcome = registry.open_root(&resolver()).unwrap();

        assert_eq!(outcome.opened, rel(&["/ws"]));
        assert!(registry.is_watching(Utf8Path::new("/ws")));

        let again = registry.open_root(&resolver()).unwrap();
        assert!(again.is_unchanged());
        assert_eq!(registry.backend().watch_calls.len(), 1);
    }

    #[test]
    fn test_open_root_requires_root() {
        let mut registry = WatcherRegistry::new(RecordingBackend::default());
        let result = registry.open_root(&PathResolver::new());
        assert!(result.is_err_and(|e| e.is_not_configured()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_expand_and_collapse() {
        let resolver = resolver();
        let mut registry = WatcherRegistry::new(RecordingBackend::default());
        registry.open_root(&resolver).unwrap();

        let outcome = registry.reconcile(&resolver, &rel(&["src"])).unwrap();
        assert_eq!(outcome.opened, rel(&["/ws/src"]));
        assert_eq!(watched(&registry), vec!["/ws", "/ws/src"]);

        let outcome = registry.reconcile(&resolver, &[]).unwrap();
        assert_eq!(outcome.closed, rel(&["/ws/src"]));
        assert_eq!(watched(&registry), vec!["/ws"]);
        assert_eq!(registry.backend().unwatch_calls, rel(&["/ws/src"]));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let resolver = resolver();
        let mut registry = WatcherRegistry::new(RecordingBackend::default());
        let expanded = rel(&["src", "src/lib", "docs"]);

        registry.reconcile(&resolver, &expanded).unwrap();
        let before = watched(&registry);
        let calls = registry.backend().watch_calls.len();

        let outcome = registry.reconcile(&resolver, &expanded).unwrap();
        assert!(outcome.is_unchanged());
        assert_eq!(watched(&registry), before);
        assert_eq!(registry.backend().watch_calls.len(), calls);
    }

    #[test]
    fn test_root_opened_first_then_input_order() {
        let resolver = resolver();
        let mut registry = WatcherRegistry::new(RecordingBackend::default());

        registry
            .reconcile(&resolver, &rel(&["zeta", "alpha", "mid"]))
            .unwrap();

        assert_eq!(
            registry.backend().watch_calls,
            rel(&["/ws", "/ws/zeta", "/ws/alpha", "/ws/mid"])
        );
    }

    #[test]
    fn test_watch_set_invariant_over_sequence() {
        let resolver = resolver();
        let mut registry = WatcherRegistry::new(RecordingBackend::default());
        let steps: [&[&str]; 5] = [
            &["a", "a/b"],
            &["a/b", "c"],
            &[],
            &["c", "c/d", "e"],
            &["e"],
        ];

        for step in steps {
            registry.reconcile(&resolver, &rel(step)).unwrap();

            let mut expected: Vec<String> = std::iter::once("/ws".to_owned())
                .chain(step.iter().map(|p| format!("/ws/{p}")))
                .collect();
            expected.sort();
            assert_eq!(watched(&registry), expected, "after {step:?}");
        }
    }

    #[test]
    fn test_root_alias_does_not_duplicate() {
        let resolver = resolver();
        let mut registry = WatcherRegistry::new(RecordingBackend::default());

        registry.reconcile(&resolver, &rel(&[".", "src"])).unwrap();
        assert_eq!(watched(&registry), vec!["/ws", "/ws/src"]);
        assert_eq!(registry.backend().watch_calls.len(), 2);
    }

    #[test]
    fn test_root_is_never_closed_by_reconcile() {
        let resolver = resolver();
        let mut registry = WatcherRegistry::new(RecordingBackend::default());
        registry.open_root(&resolver).unwrap();

        registry.reconcile(&resolver, &rel(&["src"])).unwrap();
        registry.reconcile(&resolver, &[]).unwrap();

        assert!(registry.is_watching(Utf8Path::new("/ws")));
        assert!(
            !registry
                .backend()
                .unwatch_calls
                .contains(&Utf8PathBuf::from("/ws"))
        );
    }

    #[test]
    fn test_exhaustion_leaves_directory_unwatched() {
        let resolver = resolver();
        let mut backend = RecordingBackend::default();
        backend.exhausted.insert(Utf8PathBuf::from("/ws/big"));
        let mut registry = WatcherRegistry::new(backend);

        let outcome = registry
            .reconcile(&resolver, &rel(&["big", "small"]))
            .unwrap();

        assert_eq!(outcome.opened, rel(&["/ws", "/ws/small"]));
        assert_eq!(outcome.failed.len(), 1);
        let fatal: Vec<_> = outcome.fatal().collect();
        assert_eq!(fatal.len(), 1);
        assert_eq!(fatal[0].0.as_str(), "/ws/big");
        assert_eq!(watched(&registry), vec!["/ws", "/ws/small"]);
    }

    #[test]
    fn test_missing_directory_is_not_fatal() {
        let resolver = resolver();
        let mut backend = RecordingBackend::default();
        backend.missing.insert(Utf8PathBuf::from("/ws/gone"));
        let mut registry = WatcherRegistry::new(backend);

        let outcome = registry.reconcile(&resolver, &rel(&["gone"])).unwrap();
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.fatal().count(), 0);
        assert!(!registry.is_watching(Utf8Path::new("/ws/gone")));
    }

    #[test]
    fn test_unresolvable_path_changes_nothing() {
        let resolver = resolver();
        let mut registry = WatcherRegistry::new(RecordingBackend::default());
        registry.reconcile(&resolver, &rel(&["src"])).unwrap();

        let result = registry.reconcile(&resolver, &rel(&["docs", "../etc"]));
        assert!(result.is_err());
        assert_eq!(watched(&registry), vec!["/ws", "/ws/src"]);
        assert!(registry.backend().unwatch_calls.is_empty());
    }

    #[test]
    fn test_evict() {
        let resolver = resolver();
        let mut registry = WatcherRegistry::new(RecordingBackend::default());
        registry.reconcile(&resolver, &rel(&["src"])).unwrap();

        assert!(registry.evict(Utf8Path::new("/ws/src")));
        assert!(!registry.evict(Utf8Path::new("/ws/src")));
        assert_eq!(watched(&registry), vec!["/ws"]);

        // Reconciling again re-opens it.
        let outcome = registry.reconcile(&resolver, &rel(&["src"])).unwrap();
        assert_eq!(outcome.opened, rel(&["/ws/src"]));
    }

    #[test]
    fn test_close_all() {
        let resolver = resolver();
        let mut registry = WatcherRegistry::new(RecordingBackend::default());
        registry.reconcile(&resolver, &rel(&["a", "b"])).unwrap();

        assert_eq!(registry.close_all(), 3);
        assert!(registry.is_empty());
        assert_eq!(registry.backend().unwatch_calls.len(), 3);
        assert_eq!(registry.close_all(), 0);
    }

    #[test]
    fn test_handle_records_open_time() {
        let before = Instant::now();
        let mut registry = WatcherRegistry::new(RecordingBackend::default());
        registry.open_root(&resolver()).unwrap();

        let handle = registry.handle(Utf8Path::new("/ws")).unwrap();
        assert_eq!(handle.dir().as_str(), "/ws");
        assert!(handle.opened_at() >= before);
    }
}
