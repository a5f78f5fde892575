//! Catalog session: the controller the view layer talks to
//!
//! A session owns the record store and the two selectors (active customer,
//! search query). After every command it recomputes the visible set and the
//! customer summary from scratch and publishes both as one `CatalogView`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use super::data::Part;
use super::edit::PartFields;
use super::filter;
use super::library::{Library, MergeSummary};
use crate::error::{CatalogError, Result};
use crate::probe::{DecodingLoader, ImageLoader, ImageProbe};

/// Lifecycle of a session's initial load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Where the catalog document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Inline(String),
}

/// Everything the view layer renders, computed together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogView {
    /// Cards to show, in store order
    pub visible: Vec<Part>,
    /// Navigation summary keyed by customer
    pub groups: BTreeMap<String, Vec<Part>>,
    /// Count for the "all customers" entry
    pub available: usize,
    pub active_customer: Option<String>,
    pub query: String,
}

pub struct CatalogSession<L = DecodingLoader> {
    library: Library<L>,
    state: SessionState,
    source: Option<DataSource>,
    active_customer: Option<String>,
    query: String,
    view: Arc<CatalogView>,
    view_tx: watch::Sender<Arc<CatalogView>>,
}

impl<L: ImageLoader> CatalogSession<L> {
    pub fn new(probe: ImageProbe<L>) -> Self {
        let view = Arc::new(CatalogView::default());
        let (view_tx, _) = watch::channel(Arc::clone(&view));
        CatalogSession {
            library: Library::new(probe),
            state: SessionState::Idle,
            source: None,
            active_customer: None,
            query: String::new(),
            view,
            view_tx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn library(&self) -> &Library<L> {
        &self.library
    }

    /// Receive every view published from now on
    pub fn subscribe(&self) -> watch::Receiver<Arc<CatalogView>> {
        self.view_tx.subscribe()
    }

    /// The most recently published view
    pub fn view(&self) -> Arc<CatalogView> {
        Arc::clone(&self.view)
    }

    pub fn visible_parts(&self) -> &[Part] {
        &self.view.visible
    }

    pub fn customer_groups(&self) -> &BTreeMap<String, Vec<Part>> {
        &self.view.groups
    }

    pub fn active_customer(&self) -> Option<&str> {
        self.active_customer.as_deref()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Initial load. Only allowed from `Idle`.
    pub async fn load(&mut self, source: DataSource) -> Result<()> {
        self.require(SessionState::Idle, "load")?;
        self.source = Some(source.clone());
        self.run_load(source).await
    }

    /// Re-read the last source after a failed load
    pub async fn retry(&mut self) -> Result<()> {
        self.require(SessionState::Error, "retry")?;
        let source = self.source.clone().ok_or(CatalogError::InvalidState {
            state: self.state,
            command: "retry",
        })?;
        self.run_load(source).await
    }

    async fn run_load(&mut self, source: DataSource) -> Result<()> {
        self.state = SessionState::Loading;

        let loaded = match read_source(&source).await {
            Ok(json) => self.library.load_json(&json).await,
            Err(err) => {
                self.library.clear();
                Err(err)
            }
        };

        match loaded {
            Ok(()) => {
                self.state = SessionState::Ready;
                info!(records = self.library.len(), "session ready");
            }
            Err(ref err) => {
                self.state = SessionState::Error;
                warn!(error = %err, "could not load catalog");
            }
        }
        self.publish();
        loaded
    }

    pub async fn add(&mut self, fields: PartFields) -> Result<Part> {
        let part = self.library.add(fields).await?;
        self.publish();
        Ok(part)
    }

    pub async fn update(&mut self, id: &str, fields: PartFields) -> Result<Part> {
        let part = self.library.update(id, fields).await?;
        self.publish();
        Ok(part)
    }

    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.library.soft_delete(id)?;
        self.publish();
        Ok(())
    }

    /// Merge an imported document given as text
    pub async fn merge_json(&mut self, json: &str) -> Result<MergeSummary> {
        let summary = self.library.merge_json(json).await?;
        self.publish();
        Ok(summary)
    }

    /// Merge an imported document read from disk
    pub async fn import_file(&mut self, path: &Path) -> Result<MergeSummary> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CatalogError::io(path, e))?;
        self.merge_json(&json).await
    }

    /// Select a customer, or `None` for all customers
    pub fn set_active_customer(&mut self, customer: Option<String>) {
        self.active_customer = customer;
        self.publish();
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.publish();
    }

    /// Pretty-printed document of every record, soft-deleted included
    pub fn export_json(&self) -> Result<String> {
        self.library.export_json()
    }

    pub async fn export_to(&self, path: &Path) -> Result<()> {
        let json = self.export_json()?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| CatalogError::io(path, e))?;
        info!(path = %path.display(), records = self.library.len(), "catalog exported");
        Ok(())
    }

    fn require(&self, expected: SessionState, command: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CatalogError::InvalidState {
                state: self.state,
                command,
            })
        }
    }

    /// Recompute the whole view and swap it in as one unit
    fn publish(&mut self) {
        let parts = self.library.snapshot();
        let view = Arc::new(CatalogView {
            visible: filter::visible(parts, self.active_customer.as_deref(), &self.query),
            groups: filter::group_by_customer(parts),
            available: filter::available_count(parts),
            active_customer: self.active_customer.clone(),
            query: self.query.clone(),
        });
        self.view = Arc::clone(&view);
        self.view_tx.send_replace(view);
    }
}

impl CatalogSession<DecodingLoader> {
    /// Session that resolves relative image paths against `image_root`
    pub fn with_image_root(image_root: impl Into<PathBuf>, timeout: std::time::Duration) -> Self {
        Self::new(ImageProbe::new(DecodingLoader::new(image_root), timeout))
    }
}

async fn read_source(source: &DataSource) -> Result<String> {
    match source {
        DataSource::File(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CatalogError::io(path, e)),
        DataSource::Inline(json) => Ok(json.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::testing::ScriptedLoader;
    use crate::probe::DEFAULT_PROBE_TIMEOUT;

    const DOC: &str = r#"[
        {"id": "1", "Customer Name": "Acme", "Part Name": "Bolt", "Part No": "B1", "Image Name": "ok.png"},
        {"id": "2", "Customer Name": "Beta", "Part Name": "Nut", "Part No": "N1", "Image Name": "ok.png"},
        {"id": "3", "Customer Name": "Beta", "Part Name": "Pin", "Part No": "P1", "Image Name": "gone.png"}
    ]"#;

    fn session() -> CatalogSession<ScriptedLoader> {
        CatalogSession::new(ImageProbe::new(
            ScriptedLoader::new().ok("ok.png"),
            DEFAULT_PROBE_TIMEOUT,
        ))
    }

    fn ids(parts: &[Part]) -> Vec<&str> {
        parts.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_load_moves_to_ready_and_publishes() {
        let mut session = session();
        let mut rx = session.subscribe();
        assert_eq!(session.state(), SessionState::Idle);

        session.load(DataSource::Inline(DOC.into())).await.unwrap();

        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(ids(session.visible_parts()), vec!["1", "2"]);
        assert!(rx.has_changed().unwrap());
        let view = rx.borrow_and_update().clone();
        assert_eq!(view.available, 2);
        assert_eq!(view.groups.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_load_moves_to_error_with_empty_catalog() {
        let mut session = session();
        let err = session
            .load(DataSource::Inline(r#"{"not": "an array"}"#.into()))
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Format(_)));
        assert_eq!(session.state(), SessionState::Error);
        assert!(session.visible_parts().is_empty());
        assert!(session.library().is_empty());

        // Still usable while in Error
        session
            .add(PartFields {
                customer_name: "Acme".into(),
                part_name: "Bolt".into(),
                part_no: "B1".into(),
                image_locator: "ok.png".into(),
                ..PartFields::new()
            })
            .await
            .unwrap();
        assert_eq!(session.visible_parts().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error_and_retry_rereads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("images.json");

        let mut session = session();
        let err = session.load(DataSource::File(path.clone())).await.unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
        assert_eq!(session.state(), SessionState::Error);

        std::fs::write(&path, DOC).unwrap();
        session.retry().await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.visible_parts().len(), 2);
    }

    #[tokio::test]
    async fn test_load_and_retry_guard_states() {
        let mut session = session();
        assert!(matches!(
            session.retry().await,
            Err(CatalogError::InvalidState { state: SessionState::Idle, .. })
        ));

        session.load(DataSource::Inline(DOC.into())).await.unwrap();
        assert!(matches!(
            session.load(DataSource::Inline("[]".into())).await,
            Err(CatalogError::InvalidState { state: SessionState::Ready, .. })
        ));
        assert!(matches!(
            session.retry().await,
            Err(CatalogError::InvalidState { .. })
        ));
        assert_eq!(session.library().len(), 3);
    }

    #[tokio::test]
    async fn test_selectors_recompute_view() {
        let mut session = session();
        session.load(DataSource::Inline(DOC.into())).await.unwrap();

        session.set_active_customer(Some("Beta".into()));
        assert_eq!(ids(session.visible_parts()), vec!["2"]);
        assert_eq!(session.view().active_customer.as_deref(), Some("Beta"));

        session.set_active_customer(None);
        session.set_query("BOLT");
        assert_eq!(ids(session.visible_parts()), vec!["1"]);
        // Groups ignore the selectors
        assert_eq!(session.customer_groups().len(), 2);

        session.set_query("");
        assert_eq!(session.visible_parts().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_command_publishes_nothing() {
        let mut session = session();
        session.load(DataSource::Inline(DOC.into())).await.unwrap();
        let mut rx = session.subscribe();
        rx.borrow_and_update();

        let err = session.delete("missing").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
        assert!(!rx.has_changed().unwrap());

        session.delete("1").unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(ids(&rx.borrow().visible), vec!["2"]);
    }

    #[tokio::test]
    async fn test_export_and_import_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("export.json");

        let mut original = session();
        original.load(DataSource::Inline(DOC.into())).await.unwrap();
        original.delete("2").unwrap();
        original.export_to(&out).await.unwrap();

        let mut other = session();
        other.load(DataSource::Inline("[]".into())).await.unwrap();
        let summary = other.import_file(&out).await.unwrap();
        assert_eq!(summary.appended, 3);
        assert_eq!(other.library().snapshot(), original.library().snapshot());
        assert_eq!(ids(other.visible_parts()), vec!["1"]);

        assert!(matches!(
            other.import_file(&dir.path().join("nope.json")).await,
            Err(CatalogError::Io { .. })
        ));
    }
}
