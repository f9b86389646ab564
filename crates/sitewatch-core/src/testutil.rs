//! Test utilities: in-memory store and mock collaborators.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::error::AppError;
use crate::models::{Envelope, PendingMail, Site};
use crate::report::{RunEvent, RunReporter};
use crate::traits::{LinkFetcher, Mailer, WatchStore};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher serving a fixed link graph.
///
/// Unknown URLs are pages without links.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<Mutex<HashMap<String, Vec<String>>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    hanging: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, links: &[&str]) -> Self {
        self.set_page(url, links);
        self
    }

    /// Fetching `url` fails with HTTP 500.
    pub fn with_failure(self, url: &str) -> Self {
        self.failing.lock().unwrap().insert(url.to_string());
        self
    }

    /// Fetching `url` never completes.
    pub fn with_hang(self, url: &str) -> Self {
        self.hanging.lock().unwrap().insert(url.to_string());
        self
    }

    /// Replace the links served for `url`.
    pub fn set_page(&self, url: &str, links: &[&str]) {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            links.iter().map(|l| l.to_string()).collect(),
        );
    }

    /// Every fetched URL, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
    }
}

impl LinkFetcher for MockFetcher {
    async fn fetch_links(&self, url: &str) -> Result<Vec<String>, AppError> {
        self.calls.lock().unwrap().push(url.to_string());

        let hangs = self.hanging.lock().unwrap().contains(url);
        if hangs {
            std::future::pending::<()>().await;
        }

        if self.failing.lock().unwrap().contains(url) {
            return Err(AppError::HttpStatus {
                url: url.to_string(),
                status: 500,
            });
        }

        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MockMailer
// ---------------------------------------------------------------------------

/// Mock mailer recording every accepted message.
#[derive(Clone, Default)]
pub struct MockMailer {
    sent: Arc<Mutex<Vec<(Envelope, String)>>>,
    fail_all: Arc<Mutex<bool>>,
    failing_bodies: Arc<Mutex<HashSet<String>>>,
    hang: Arc<Mutex<bool>>,
}

impl MockMailer {
    pub fn working() -> Self {
        Self::default()
    }

    /// Every delivery fails.
    pub fn failing() -> Self {
        let mailer = Self::default();
        *mailer.fail_all.lock().unwrap() = true;
        mailer
    }

    /// Every delivery never completes.
    pub fn hanging() -> Self {
        let mailer = Self::default();
        *mailer.hang.lock().unwrap() = true;
        mailer
    }

    /// Delivery of this exact body fails.
    pub fn failing_for(self, body: &str) -> Self {
        self.failing_bodies.lock().unwrap().insert(body.to_string());
        self
    }

    /// Make the transport healthy again.
    pub fn clear_failures(&self) {
        *self.fail_all.lock().unwrap() = false;
        self.failing_bodies.lock().unwrap().clear();
    }

    pub fn sent(&self) -> Vec<(Envelope, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for MockMailer {
    async fn deliver(&self, envelope: &Envelope, body: &str) -> Result<(), AppError> {
        let hangs = *self.hang.lock().unwrap();
        if hangs {
            std::future::pending::<()>().await;
        }

        let fails =
            *self.fail_all.lock().unwrap() || self.failing_bodies.lock().unwrap().contains(body);
        if fails {
            return Err(AppError::DeliveryError("connection refused".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((envelope.clone(), body.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A mail row as held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMail {
    pub id: i64,
    pub body: String,
    pub is_sent: bool,
}

#[derive(Default)]
struct MemoryState {
    sites: BTreeMap<String, Site>,
    posts: Vec<(String, String)>,
    mails: Vec<StoredMail>,
    fail_writes: bool,
    fail_mail_inserts: bool,
}

impl MemoryState {
    fn check_writable(&self) -> Result<(), AppError> {
        if self.fail_writes {
            Err(AppError::DatabaseError("database is locked".into()))
        } else {
            Ok(())
        }
    }

    fn check_mail_insertable(&self) -> Result<(), AppError> {
        self.check_writable()?;
        if self.fail_mail_inserts {
            Err(AppError::DatabaseError("no such table: mails".into()))
        } else {
            Ok(())
        }
    }

    fn push_mail(&mut self, body: &str) -> i64 {
        let id = self.mails.len() as i64 + 1;
        self.mails.push(StoredMail {
            id,
            body: body.to_string(),
            is_sent: false,
        });
        id
    }
}

/// In-memory [`WatchStore`] with the same constraints as the SQL schema:
/// unique sites, unique (site, link), posts referencing existing sites,
/// cascading site removal.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site(self, url: &str) -> Self {
        self.state.lock().unwrap().sites.insert(
            url.to_string(),
            Site {
                url: url.to_string(),
                last_link: None,
                added_at: Utc::now(),
            },
        );
        self
    }

    /// Make every write fail with a database error.
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    /// Make only mail inserts fail; post inserts still succeed on their own.
    pub fn fail_mail_inserts(&self, fail: bool) {
        self.state.lock().unwrap().fail_mail_inserts = fail;
    }

    pub fn posts(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().posts.clone()
    }

    pub fn mails(&self) -> Vec<StoredMail> {
        self.state.lock().unwrap().mails.clone()
    }

    pub fn mail(&self, id: i64) -> Option<StoredMail> {
        self.state
            .lock()
            .unwrap()
            .mails
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .mails
            .iter()
            .filter(|m| !m.is_sent)
            .count()
    }
}

impl WatchStore for MemoryStore {
    async fn site_exists(&self, url: &str) -> Result<bool, AppError> {
        Ok(self.state.lock().unwrap().sites.contains_key(url))
    }

    async fn add_site(&self, url: &str, initial_link: Option<&str>) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.check_writable()?;
        if state.sites.contains_key(url) {
            return Err(AppError::DuplicateKey(url.to_string()));
        }
        state.sites.insert(
            url.to_string(),
            Site {
                url: url.to_string(),
                last_link: initial_link.map(str::to_owned),
                added_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn remove_site(&self, url: &str) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        state.check_writable()?;
        let removed = state.sites.remove(url).is_some();
        state.posts.retain(|(site, _)| site != url);
        Ok(removed)
    }

    async fn list_sites(&self) -> Result<Vec<Site>, AppError> {
        Ok(self.state.lock().unwrap().sites.values().cloned().collect())
    }

    async fn update_last_link(&self, url: &str, link: &str) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        state.check_writable()?;
        match state.sites.get_mut(url) {
            Some(site) => {
                site.last_link = Some(link.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn post_exists(&self, site: &str, link: &str) -> Result<bool, AppError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .posts
            .iter()
            .any(|(s, l)| s == site && l == link))
    }

    async fn record_post_if_new(&self, site: &str, link: &str) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        state.check_writable()?;
        if !state.sites.contains_key(site) {
            return Err(AppError::DatabaseError(format!(
                "FOREIGN KEY constraint failed: unknown site {site}"
            )));
        }
        if state.posts.iter().any(|(s, l)| s == site && l == link) {
            return Ok(false);
        }
        state.posts.push((site.to_string(), link.to_string()));
        Ok(true)
    }

    async fn existing_posts(&self) -> Result<BTreeMap<String, Vec<String>>, AppError> {
        let state = self.state.lock().unwrap();
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (site, link) in &state.posts {
            grouped.entry(site.clone()).or_default().push(link.clone());
        }
        Ok(grouped)
    }

    async fn record_post_and_enqueue(
        &self,
        site: &str,
        link: &str,
        body: &str,
    ) -> Result<Option<i64>, AppError> {
        let mut state = self.state.lock().unwrap();
        state.check_writable()?;
        if !state.sites.contains_key(site) {
            return Err(AppError::DatabaseError(format!(
                "FOREIGN KEY constraint failed: unknown site {site}"
            )));
        }
        if state.posts.iter().any(|(s, l)| s == site && l == link) {
            return Ok(None);
        }
        state.check_mail_insertable()?;
        state.posts.push((site.to_string(), link.to_string()));
        Ok(Some(state.push_mail(body)))
    }

    async fn enqueue_mail(&self, body: &str) -> Result<i64, AppError> {
        let mut state = self.state.lock().unwrap();
        state.check_mail_insertable()?;
        Ok(state.push_mail(body))
    }

    async fn fetch_pending_mail(&self) -> Result<Vec<PendingMail>, AppError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .mails
            .iter()
            .filter(|m| !m.is_sent)
            .map(|m| PendingMail {
                id: m.id,
                body: m.body.clone(),
            })
            .collect())
    }

    async fn mark_sent(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.check_writable()?;
        if let Some(mail) = state.mails.iter_mut().find(|m| m.id == id) {
            mail.is_sent = true;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock run reporter that records event labels.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl RunReporter for MockReporter {
    fn report(&self, event: RunEvent<'_>) {
        let label = match &event {
            RunEvent::RunStarted { .. } => "RunStarted",
            RunEvent::SiteCrawled { .. } => "SiteCrawled",
            RunEvent::SiteFailed { .. } => "SiteFailed",
            RunEvent::PostRecorded { .. } => "PostRecorded",
            RunEvent::MailDelivered { .. } => "MailDelivered",
            RunEvent::MailFailed { .. } => "MailFailed",
            RunEvent::WorkersCancelled { .. } => "WorkersCancelled",
            RunEvent::RunFinished { .. } => "RunFinished",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}
