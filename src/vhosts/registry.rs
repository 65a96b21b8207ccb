//! The vhost registry.
//!
//! # Responsibilities
//! - Store vhosts in insertion order with unique hostnames
//! - Resolve a hostname to its vhost
//! - Swap handlers in place and re-attach them from the catalog
//! - Save / load the vhost set with checksum verification
//!
//! # Design Decisions
//! - One `RwLock` guards the whole registry (vhosts, metadata, catalog)
//! - Lookups go through a hostname → position index; the `Vec` keeps order
//! - `version` counts structural changes (add / remove) and survives save/load
//! - The checksum is only refreshed by `save` and `load`

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;

use crate::observability::metrics;
use crate::vhosts::binding::{unix_now, Vhost};
use crate::vhosts::error::{VhostError, VhostResult};
use crate::vhosts::handler::{
    default_error_handler, default_handler, ErrorHandler, Handler, HandlerCatalog, HandlerPair,
};
use crate::vhosts::hash::{fingerprint, Checksum};
use crate::vhosts::store::{self, PersistedVhosts, VhostRecord};

#[derive(Default)]
struct Inner {
    vhosts: Vec<Vhost>,
    index: HashMap<String, usize>,
    version: u64,
    last_modified: i64,
    checksum: Option<Checksum>,
    catalog: HandlerCatalog,
}

impl Inner {
    fn position(&self, hostname: &str) -> Option<usize> {
        self.index.get(hostname).copied()
    }

    fn reindex(&mut self) {
        self.index = self
            .vhosts
            .iter()
            .enumerate()
            .map(|(i, v)| (v.hostname.clone(), i))
            .collect();
    }

    fn touch(&mut self) {
        self.version += 1;
        self.last_modified = unix_now();
        metrics::record_registry_size(self.vhosts.len());
    }

    /// Join every vhost's `path` against the catalog.
    fn relink(&mut self) -> ReloadSummary {
        let mut summary = ReloadSummary::default();
        let Inner {
            vhosts, catalog, ..
        } = self;

        for vhost in vhosts.iter_mut() {
            if vhost.is_unlinked() {
                vhost.handler = default_handler();
                vhost.error_handler = default_error_handler();
                summary.defaulted += 1;
                continue;
            }

            match catalog.handler(&vhost.path) {
                Some(handler) => {
                    vhost.handler = handler;
                    summary.linked += 1;
                }
                None => {
                    tracing::debug!(hostname = %vhost.hostname, path = %vhost.path, "No catalog handler for path");
                    summary.unmatched += 1;
                }
            }
            if let Some(error_handler) = catalog.error_handler(&vhost.path) {
                vhost.error_handler = error_handler;
            }
        }
        summary
    }
}

/// Outcome of [`Vhosts::reload_handlers`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    /// Vhosts whose handler was found in the catalog.
    pub linked: usize,
    /// Vhosts with an empty path, reset to the placeholder handlers.
    pub defaulted: usize,
    /// Vhosts whose path has no catalog handler; left untouched.
    pub unmatched: usize,
}

/// Outcome of [`Vhosts::initialize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitializeSummary {
    pub added: usize,
    /// Hostnames that were already bound and therefore skipped.
    pub skipped: Vec<String>,
}

/// Concurrency-safe collection of vhosts.
#[derive(Default)]
pub struct Vhosts {
    inner: RwLock<Inner>,
}

impl std::fmt::Debug for Vhosts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Vhosts")
            .field("vhosts", &inner.vhosts)
            .field("version", &inner.version)
            .field("last_modified", &inner.last_modified)
            .field("checksum", &inner.checksum)
            .field("catalog", &inner.catalog)
            .finish()
    }
}

impl Vhosts {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vhost. Fails with `AlreadyExists` if the hostname is bound.
    pub fn add(&self, vhost: Vhost) -> VhostResult<()> {
        let mut inner = self.inner.write();
        if inner.index.contains_key(&vhost.hostname) {
            return Err(VhostError::AlreadyExists(vhost.hostname));
        }
        tracing::debug!(hostname = %vhost.hostname, path = %vhost.path, "Adding vhost");
        let position = inner.vhosts.len();
        inner.index.insert(vhost.hostname.clone(), position);
        inner.vhosts.push(vhost);
        inner.touch();
        Ok(())
    }

    /// Look up the vhost bound to `hostname` (exact match).
    pub fn get(&self, hostname: &str) -> Option<Vhost> {
        let inner = self.inner.read();
        inner.position(hostname).map(|i| inner.vhosts[i].clone())
    }

    /// Remove a vhost, keeping the order of the others.
    pub fn remove(&self, hostname: &str) -> VhostResult<()> {
        let mut inner = self.inner.write();
        let position = inner
            .position(hostname)
            .ok_or_else(|| VhostError::NotFound(hostname.to_string()))?;
        inner.vhosts.remove(position);
        inner.reindex();
        inner.touch();
        tracing::debug!(hostname = %hostname, "Removed vhost");
        Ok(())
    }

    /// Number of vhosts.
    pub fn number_of_vhosts(&self) -> usize {
        self.inner.read().vhosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().vhosts.is_empty()
    }

    /// Hostnames in insertion order.
    pub fn vhostnames(&self) -> Vec<String> {
        self.inner
            .read()
            .vhosts
            .iter()
            .map(|v| v.hostname.clone())
            .collect()
    }

    /// Snapshot of all vhosts in insertion order.
    pub fn vhosts(&self) -> Vec<Vhost> {
        self.inner.read().vhosts.clone()
    }

    /// Structural change counter.
    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    /// Time of the last structural change (seconds since epoch).
    pub fn last_modified(&self) -> i64 {
        self.inner.read().last_modified
    }

    /// Checksum from the last save or load, if any.
    pub fn checksum(&self) -> Option<Checksum> {
        self.inner.read().checksum
    }

    /// Replace the handler of a bound vhost.
    pub fn set_handler(&self, hostname: &str, handler: Handler) -> VhostResult<()> {
        let mut inner = self.inner.write();
        let position = inner
            .position(hostname)
            .ok_or_else(|| VhostError::NotFound(hostname.to_string()))?;
        let vhost = &mut inner.vhosts[position];
        vhost.handler = handler;
        vhost.last_modified = unix_now();
        Ok(())
    }

    /// Replace the error handler of a bound vhost.
    pub fn set_error_handler(&self, hostname: &str, error_handler: ErrorHandler) -> VhostResult<()> {
        let mut inner = self.inner.write();
        let position = inner
            .position(hostname)
            .ok_or_else(|| VhostError::NotFound(hostname.to_string()))?;
        let vhost = &mut inner.vhosts[position];
        vhost.error_handler = error_handler;
        vhost.last_modified = unix_now();
        Ok(())
    }

    // --- Catalog ---

    /// Register a handler under `tag`, replacing any previous one.
    pub fn add_handler(&self, tag: impl Into<String>, handler: Handler) {
        self.inner.write().catalog.insert_handler(tag, handler);
    }

    pub fn handler(&self, tag: &str) -> Option<Handler> {
        self.inner.read().catalog.handler(tag)
    }

    pub fn remove_handler(&self, tag: &str) -> VhostResult<()> {
        self.inner
            .write()
            .catalog
            .remove_handler(tag)
            .map(|_| ())
            .ok_or_else(|| VhostError::HandlerNotFound(tag.to_string()))
    }

    /// Register an error handler under `tag`, replacing any previous one.
    pub fn add_error_handler(&self, tag: impl Into<String>, error_handler: ErrorHandler) {
        self.inner
            .write()
            .catalog
            .insert_error_handler(tag, error_handler);
    }

    pub fn error_handler(&self, tag: &str) -> Option<ErrorHandler> {
        self.inner.read().catalog.error_handler(tag)
    }

    pub fn remove_error_handler(&self, tag: &str) -> VhostResult<()> {
        self.inner
            .write()
            .catalog
            .remove_error_handler(tag)
            .map(|_| ())
            .ok_or_else(|| VhostError::HandlerNotFound(tag.to_string()))
    }

    /// Re-attach handlers by joining each vhost's `path` against the catalog.
    ///
    /// Vhosts with an empty path get the placeholder handlers. A path with no
    /// catalog entry keeps whatever handler the vhost already had.
    pub fn reload_handlers(&self) -> ReloadSummary {
        let summary = self.inner.write().relink();

        tracing::info!(
            linked = summary.linked,
            defaulted = summary.defaulted,
            unmatched = summary.unmatched,
            "Vhost handlers reloaded"
        );
        summary
    }

    /// Seed the registry from a hostname → handlers mapping.
    ///
    /// Hostnames that are already bound are skipped and reported; the rest
    /// are still added.
    pub fn initialize<I>(&self, catalog: I) -> InitializeSummary
    where
        I: IntoIterator<Item = (String, HandlerPair)>,
    {
        let mut summary = InitializeSummary::default();
        for (hostname, pair) in catalog {
            match self.add(Vhost::new(hostname, "", "", pair.handler, pair.error_handler)) {
                Ok(()) => summary.added += 1,
                Err(VhostError::AlreadyExists(hostname)) => {
                    tracing::warn!(hostname = %hostname, "Skipping duplicate vhost during initialization");
                    summary.skipped.push(hostname);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Unexpected error during initialization");
                }
            }
        }
        summary
    }

    // --- Persistence ---

    /// Fingerprint the current vhosts, store it, and write everything to `path`.
    pub fn save(&self, path: &Path) -> VhostResult<Checksum> {
        let mut inner = self.inner.write();
        let checksum = fingerprint(&inner.vhosts)?;
        inner.checksum = Some(checksum);

        let data = PersistedVhosts {
            version: inner.version,
            last_modified: inner.last_modified,
            checksum,
            vhosts: inner.vhosts.iter().map(VhostRecord::from).collect(),
        };
        let result = store::write_file(path, &data);
        metrics::record_persist("save", result.is_ok());
        result?;

        tracing::info!(
            path = %path.display(),
            vhosts = data.vhosts.len(),
            version = data.version,
            checksum = %checksum,
            "Vhosts saved"
        );
        Ok(checksum)
    }

    /// Replace the registry contents with the verified contents of `path`.
    ///
    /// Catalog handlers are re-attached before the write lock is released, so
    /// no request sees a linked vhost on its placeholder handler.
    pub fn load(&self, path: &Path) -> VhostResult<()> {
        let result = store::read_file(path);
        metrics::record_persist("load", result.is_ok());
        let data = result?;

        let mut index = HashMap::with_capacity(data.vhosts.len());
        for (i, record) in data.vhosts.iter().enumerate() {
            if index.insert(record.hostname.clone(), i).is_some() {
                return Err(VhostError::Format(format!(
                    "duplicate hostname {}",
                    record.hostname
                )));
            }
        }

        let vhosts: Vec<Vhost> = data.vhosts.into_iter().map(Vhost::from).collect();
        let mut inner = self.inner.write();
        inner.vhosts = vhosts;
        inner.index = index;
        inner.version = data.version;
        inner.last_modified = data.last_modified;
        inner.checksum = Some(data.checksum);
        let summary = inner.relink();
        metrics::record_registry_size(inner.vhosts.len());

        tracing::info!(
            path = %path.display(),
            vhosts = inner.vhosts.len(),
            version = inner.version,
            checksum = %data.checksum,
            linked = summary.linked,
            "Vhosts loaded"
        );
        Ok(())
    }
}

/// Hostnames across several registries, registry by registry.
pub fn vhostnames(registries: &[&Vhosts]) -> Vec<String> {
    registries.iter().flat_map(|r| r.vhostnames()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vhosts::handler::{error_handler, handler, HandlerError, RequestContext};
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, StatusCode};

    fn ctx() -> RequestContext {
        RequestContext::new(
            Method::GET,
            "http://a.com/".parse().unwrap(),
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    fn body_of(h: &Handler) -> Vec<u8> {
        let mut ctx = ctx();
        h(&mut ctx).unwrap();
        ctx.response_body().to_vec()
    }

    fn text(body: &'static str) -> Handler {
        handler(move |ctx| ctx.send_string(body))
    }

    #[test]
    fn test_add_and_get() {
        let vhosts = Vhosts::new();
        vhosts.add(Vhost::unlinked("test.com", "", "w1")).unwrap();

        let found = vhosts.get("test.com").unwrap();
        assert_eq!(found.website_id, "w1");
        assert!(vhosts.get("test2.com").is_none());
        assert!(vhosts.get("TEST.com").is_none());
    }

    #[test]
    fn test_add_duplicate() {
        let vhosts = Vhosts::new();
        vhosts.add(Vhost::unlinked("test.com", "p1", "w1")).unwrap();
        let version = vhosts.version();

        let err = vhosts.add(Vhost::unlinked("test.com", "p2", "w2")).unwrap_err();
        assert!(matches!(err, VhostError::AlreadyExists(ref h) if h == "test.com"));
        assert_eq!(vhosts.number_of_vhosts(), 1);
        assert_eq!(vhosts.get("test.com").unwrap().path, "p1");
        assert_eq!(vhosts.version(), version);
    }

    #[test]
    fn test_remove() {
        let vhosts = Vhosts::new();
        for h in ["a.com", "b.com", "c.com"] {
            vhosts.add(Vhost::unlinked(h, "", "")).unwrap();
        }
        vhosts.remove("a.com").unwrap();
        assert!(vhosts.get("a.com").is_none());
        assert_eq!(vhosts.vhostnames(), vec!["b.com", "c.com"]);
        // Index follows the shifted positions.
        assert_eq!(vhosts.get("c.com").unwrap().hostname, "c.com");

        let err = vhosts.remove("a.com").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(vhosts.number_of_vhosts(), 2);
    }

    #[test]
    fn test_version_counts_structural_changes() {
        let vhosts = Vhosts::new();
        assert_eq!(vhosts.version(), 0);
        vhosts.add(Vhost::unlinked("a.com", "", "")).unwrap();
        vhosts.add(Vhost::unlinked("b.com", "", "")).unwrap();
        assert_eq!(vhosts.version(), 2);
        vhosts.remove("a.com").unwrap();
        assert_eq!(vhosts.version(), 3);
        assert!(vhosts.last_modified() > 0);

        vhosts.set_handler("b.com", default_handler()).unwrap();
        assert_eq!(vhosts.version(), 3);
        assert!(vhosts.get("b.com").unwrap().last_modified > 0);
        let _ = vhosts.remove("missing.com");
        assert_eq!(vhosts.version(), 3);
    }

    #[test]
    fn test_set_handlers() {
        let vhosts = Vhosts::new();
        vhosts.add(Vhost::unlinked("a.com", "", "")).unwrap();

        vhosts.set_handler("a.com", text("hello")).unwrap();
        assert_eq!(body_of(&vhosts.get("a.com").unwrap().handler), b"hello");

        vhosts
            .set_error_handler(
                "a.com",
                error_handler(|ctx, _| ctx.status(StatusCode::BAD_GATEWAY).send_string("oops")),
            )
            .unwrap();
        let vhost = vhosts.get("a.com").unwrap();
        let mut c = ctx();
        (vhost.error_handler)(&mut c, HandlerError::internal("x")).unwrap();
        assert_eq!(c.response_status(), StatusCode::BAD_GATEWAY);

        assert!(vhosts.set_handler("b.com", text("x")).unwrap_err().is_not_found());
        assert!(vhosts
            .set_error_handler("b.com", default_error_handler())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_set_handler_touches_vhost() {
        let vhosts = Vhosts::new();
        let mut vhost = Vhost::unlinked("a.com", "", "");
        vhost.last_modified = 0;
        vhosts.add(vhost).unwrap();

        vhosts.set_handler("a.com", text("x")).unwrap();
        let after_handler = vhosts.get("a.com").unwrap().last_modified;
        assert!(after_handler > 0);

        let mut vhost = Vhost::unlinked("b.com", "", "");
        vhost.last_modified = 0;
        vhosts.add(vhost).unwrap();
        vhosts.set_error_handler("b.com", default_error_handler()).unwrap();
        assert!(vhosts.get("b.com").unwrap().last_modified > 0);
    }

    #[test]
    fn test_reload_handlers() {
        let vhosts = Vhosts::new();
        vhosts.add(Vhost::unlinked("a.com", "p1", "w1")).unwrap();
        vhosts.add(Vhost::unlinked("b.com", "", "w2")).unwrap();
        vhosts.add(Vhost::unlinked("c.com", "p9", "w3")).unwrap();
        vhosts.set_handler("c.com", text("kept")).unwrap();
        vhosts.set_handler("b.com", text("replaced")).unwrap();
        vhosts.add_handler("p1", text("H1"));

        let summary = vhosts.reload_handlers();
        assert_eq!(
            summary,
            ReloadSummary {
                linked: 1,
                defaulted: 1,
                unmatched: 1
            }
        );

        assert_eq!(body_of(&vhosts.get("a.com").unwrap().handler), b"H1");
        assert_eq!(
            body_of(&vhosts.get("b.com").unwrap().handler),
            crate::vhosts::handler::NOT_LINKED_BODY.as_bytes()
        );
        assert_eq!(body_of(&vhosts.get("c.com").unwrap().handler), b"kept");
        assert_eq!(vhosts.vhostnames(), vec!["a.com", "b.com", "c.com"]);
    }

    #[test]
    fn test_reload_attaches_error_handler() {
        let vhosts = Vhosts::new();
        vhosts.add(Vhost::unlinked("a.com", "p1", "")).unwrap();
        vhosts.add_error_handler(
            "p1",
            error_handler(|ctx, _| ctx.status(StatusCode::IM_A_TEAPOT).send_string("tea")),
        );
        vhosts.reload_handlers();

        let vhost = vhosts.get("a.com").unwrap();
        let mut c = ctx();
        (vhost.error_handler)(&mut c, HandlerError::internal("x")).unwrap();
        assert_eq!(c.response_status(), StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn test_catalog_management() {
        let vhosts = Vhosts::new();
        vhosts.add_handler("p1", text("one"));
        vhosts.add_error_handler("p1", default_error_handler());
        assert!(vhosts.handler("p1").is_some());
        assert!(vhosts.error_handler("p1").is_some());

        vhosts.remove_handler("p1").unwrap();
        vhosts.remove_error_handler("p1").unwrap();
        assert!(vhosts.handler("p1").is_none());
        assert!(matches!(
            vhosts.remove_handler("p1"),
            Err(VhostError::HandlerNotFound(_))
        ));
        assert!(matches!(
            vhosts.remove_error_handler("p1"),
            Err(VhostError::HandlerNotFound(_))
        ));
    }

    #[test]
    fn test_initialize_skips_duplicates() {
        let vhosts = Vhosts::new();
        vhosts.add(Vhost::unlinked("example.com", "", "")).unwrap();

        let pair = HandlerPair::new(text("hi"), default_error_handler());
        let summary = vhosts.initialize(vec![
            ("localhost".to_string(), pair.clone()),
            ("example.com".to_string(), pair.clone()),
            ("example.org".to_string(), pair),
        ]);

        assert_eq!(summary.added, 2);
        assert_eq!(summary.skipped, vec!["example.com".to_string()]);
        assert_eq!(
            vhosts.vhostnames(),
            vec!["example.com", "localhost", "example.org"]
        );
        assert_eq!(body_of(&vhosts.get("localhost").unwrap().handler), b"hi");
        // The pre-existing vhost keeps its own handler.
        assert_eq!(
            body_of(&vhosts.get("example.com").unwrap().handler),
            crate::vhosts::handler::NOT_LINKED_BODY.as_bytes()
        );
    }

    #[test]
    fn test_vhostnames_across_registries() {
        let first = Vhosts::new();
        let second = Vhosts::new();
        first.add(Vhost::unlinked("localhost", "", "")).unwrap();
        second.add(Vhost::unlinked("example.com", "", "")).unwrap();
        assert_eq!(
            vhostnames(&[&first, &second]),
            vec!["localhost", "example.com"]
        );
        assert!(vhostnames(&[]).is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vhosts.bin");

        let vhosts = Vhosts::new();
        vhosts.add(Vhost::unlinked("test.com", "p1", "w1")).unwrap();
        assert!(vhosts.checksum().is_none());
        let checksum = vhosts.save(&path).unwrap();
        assert_eq!(vhosts.checksum(), Some(checksum));

        // Overwrite with a larger set, then a smaller one.
        vhosts.add(Vhost::unlinked("test2.com", "", "w2")).unwrap();
        vhosts.save(&path).unwrap();
        vhosts.remove("test2.com").unwrap();
        vhosts.save(&path).unwrap();

        let loaded = Vhosts::new();
        loaded.add(Vhost::unlinked("stale.com", "", "")).unwrap();
        loaded.load(&path).unwrap();
        assert_eq!(loaded.vhostnames(), vec!["test.com"]);
        assert_eq!(loaded.version(), vhosts.version());
        assert_eq!(loaded.checksum(), vhosts.checksum());
        assert!(loaded.get("stale.com").is_none());
    }

    #[test]
    fn test_load_relinks_under_same_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vhosts.bin");

        let vhosts = Vhosts::new();
        vhosts.add_handler("p1", text("H1"));
        vhosts.add(Vhost::unlinked("a.com", "p1", "w1")).unwrap();
        vhosts.add(Vhost::unlinked("b.com", "", "w2")).unwrap();
        vhosts.reload_handlers();
        vhosts.save(&path).unwrap();

        // No reload_handlers between load and lookup.
        vhosts.load(&path).unwrap();
        assert_eq!(body_of(&vhosts.get("a.com").unwrap().handler), b"H1");
        assert_eq!(
            body_of(&vhosts.get("b.com").unwrap().handler),
            crate::vhosts::handler::NOT_LINKED_BODY.as_bytes()
        );
    }

    #[test]
    fn test_load_stat_failure_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain");
        std::fs::write(&plain, b"regular file").unwrap();

        let vhosts = Vhosts::new();
        vhosts.add(Vhost::unlinked("keep.com", "", "")).unwrap();
        let err = vhosts.load(&plain.join("vhosts.bin")).unwrap_err();
        assert!(matches!(err, VhostError::Io(_)));
        assert!(!err.is_not_found());
        assert_eq!(vhosts.vhostnames(), vec!["keep.com"]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let vhosts = Vhosts::new();
        vhosts.add(Vhost::unlinked("keep.com", "", "")).unwrap();

        let err = vhosts.load(&dir.path().join("testx.bin")).unwrap_err();
        assert!(matches!(err, VhostError::FileNotFound(_)));
        assert_eq!(vhosts.vhostnames(), vec!["keep.com"]);
    }

    #[test]
    fn test_load_rejects_duplicate_hostnames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.bin");
        let record = VhostRecord {
            hostname: "a.com".into(),
            path: String::new(),
            website_id: String::new(),
            last_modified: 0,
        };
        let mut data = PersistedVhosts {
            version: 1,
            last_modified: 0,
            checksum: Checksum::default(),
            vhosts: vec![record.clone(), record],
        };
        data.checksum = data.compute_checksum().unwrap();
        store::write_file(&path, &data).unwrap();

        let vhosts = Vhosts::new();
        assert!(matches!(vhosts.load(&path), Err(VhostError::Format(_))));
        assert!(vhosts.is_empty());
    }
}
