use std::collections::BTreeMap;

use url::Url;

use crate::error::AppError;
use crate::models::Site;
use crate::traits::{LinkFetcher, WatchStore};

/// Outcome of asking to watch a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExploreOutcome {
    /// The site was registered, with the first link found on its root page.
    Added { last_link: Option<String> },
    /// The site was already being watched; nothing changed.
    AlreadyWatched,
}

/// Registration and removal of watched sites.
#[derive(Clone)]
pub struct SiteRegistry<S: WatchStore> {
    store: S,
}

impl<S: WatchStore> SiteRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Register `url` if it is not watched yet.
    ///
    /// The root page is fetched once to seed `last_link`. A fetch failure
    /// leaves the registry unchanged.
    pub async fn explore<F: LinkFetcher>(
        &self,
        fetcher: &F,
        url: &str,
    ) -> Result<ExploreOutcome, AppError> {
        let url = validate_site_url(url)?.to_string();

        if self.store.site_exists(&url).await? {
            tracing::info!(site = %url, "Site already watched");
            return Ok(ExploreOutcome::AlreadyWatched);
        }

        let links = fetcher.fetch_links(&url).await?;
        let last_link = links.into_iter().next();

        match self.store.add_site(&url, last_link.as_deref()).await {
            Ok(()) => {
                tracing::info!(site = %url, last_link = ?last_link, "Site added");
                Ok(ExploreOutcome::Added { last_link })
            }
            // Registered concurrently between the check and the insert.
            Err(AppError::DuplicateKey(_)) => Ok(ExploreOutcome::AlreadyWatched),
            Err(e) => Err(e),
        }
    }

    /// Stop watching `url`; its posts go with it. Returns false if it was unknown.
    pub async fn remove(&self, url: &str) -> Result<bool, AppError> {
        let key = site_key(url);
        let removed = self.store.remove_site(&key).await?;
        if removed {
            tracing::info!(site = %key, "Site removed");
        } else {
            tracing::warn!(site = %key, "Site was not watched");
        }
        Ok(removed)
    }

    pub async fn list(&self) -> Result<Vec<Site>, AppError> {
        let sites = self.store.list_sites().await?;
        for site in &sites {
            tracing::debug!(site = %site.url, last_link = ?site.last_link, "Retrieved site");
        }
        Ok(sites)
    }

    pub async fn posts(&self) -> Result<BTreeMap<String, Vec<String>>, AppError> {
        self.store.existing_posts().await
    }
}

/// A site must be an absolute http(s) URL. Returns the parsed URL, whose
/// serialized form is the site's identity in the store.
pub fn validate_site_url(url: &str) -> Result<Url, AppError> {
    let parsed = Url::parse(url).map_err(|e| AppError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(AppError::InvalidUrl {
            url: url.to_string(),
            reason: format!("scheme '{scheme}' is not allowed (only http/https)"),
        }),
    }
}

/// Store key for a site argument. Falls back to the raw string so rows
/// written under a non-canonical key can still be addressed.
fn site_key(url: &str) -> String {
    match validate_site_url(url) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => url.to_string(),
    }
}
