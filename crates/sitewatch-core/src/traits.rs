use std::collections::BTreeMap;
use std::future::Future;

use crate::error::AppError;
use crate::models::{Envelope, PendingMail, Site};

/// Fetches a page and returns the href of every anchor on it.
///
/// A non-success response must be reported as an error, never as an empty
/// link list.
pub trait LinkFetcher: Send + Sync + Clone {
    fn fetch_links(&self, url: &str) -> impl Future<Output = Result<Vec<String>, AppError>> + Send;
}

/// Delivers one rendered notification.
pub trait Mailer: Send + Sync + Clone {
    fn deliver(
        &self,
        envelope: &Envelope,
        body: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Persistent state: watched sites, seen posts, and the mail queue.
///
/// Every method is its own transaction. Implementations must enforce the
/// uniqueness of (site, link) in `record_post_if_new` and
/// `record_post_and_enqueue` atomically, and must cascade `remove_site` to
/// the site's posts.
pub trait WatchStore: Send + Sync + Clone {
    fn site_exists(&self, url: &str) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Register a site. Fails with [`AppError::DuplicateKey`] if it exists.
    fn add_site(
        &self,
        url: &str,
        initial_link: Option<&str>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Remove a site and its posts. Returns false if the site was unknown.
    fn remove_site(&self, url: &str) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn list_sites(&self) -> impl Future<Output = Result<Vec<Site>, AppError>> + Send;

    /// Overwrite the informational `last_link`. Returns false if the site was unknown.
    fn update_last_link(
        &self,
        url: &str,
        link: &str,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn post_exists(
        &self,
        site: &str,
        link: &str,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Insert (site, link) if absent. Returns true only for the call that inserted.
    fn record_post_if_new(
        &self,
        site: &str,
        link: &str,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Insert (site, link) and queue `body` in one transaction.
    ///
    /// Returns the mail id when the post was new, `None` when it was already
    /// recorded. If either insert fails neither row is kept.
    fn record_post_and_enqueue(
        &self,
        site: &str,
        link: &str,
        body: &str,
    ) -> impl Future<Output = Result<Option<i64>, AppError>> + Send;

    /// All recorded posts grouped by site.
    fn existing_posts(
        &self,
    ) -> impl Future<Output = Result<BTreeMap<String, Vec<String>>, AppError>> + Send;

    /// Queue a mail as unsent. Returns its id.
    fn enqueue_mail(&self, body: &str) -> impl Future<Output = Result<i64, AppError>> + Send;

    /// Unsent mail in ascending id order.
    fn fetch_pending_mail(&self) -> impl Future<Output = Result<Vec<PendingMail>, AppError>> + Send;

    fn mark_sent(&self, id: i64) -> impl Future<Output = Result<(), AppError>> + Send;
}
