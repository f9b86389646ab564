//! Link discovery for watched sites.
//!
//! Each site is walked depth-first from its root URL with an explicit work
//! stack. Every href on every fetched page becomes a [`Discovery`] for that
//! site, and every followable href is fetched in turn. A per-site visited set
//! guarantees no URL is fetched twice in one walk, so link cycles terminate.
//!
//! A failed fetch fails the whole walk for that site: the discoveries
//! gathered so far are dropped and the site contributes nothing to the run.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::AppError;
use crate::fanout::scatter_gather;
use crate::models::Discovery;
use crate::report::{RunEvent, RunReporter};
use crate::traits::LinkFetcher;

/// Crawl behaviour switches.
#[derive(Debug, Clone, Default)]
pub struct CrawlConfig {
    /// Only follow links on the same host as the site root. Off-host links
    /// are still recorded as discoveries.
    pub same_host_only: bool,
}

/// Merged result of crawling every site of a run.
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub discoveries: Vec<Discovery>,
    pub sites_crawled: usize,
    pub failed: Vec<(String, AppError)>,
    pub cancelled: usize,
}

/// Walks sites with a [`LinkFetcher`].
#[derive(Clone)]
pub struct Crawler<F: LinkFetcher> {
    fetcher: F,
    config: CrawlConfig,
}

impl<F> Crawler<F>
where
    F: LinkFetcher + 'static,
{
    pub fn new(fetcher: F) -> Self {
        Self::with_config(fetcher, CrawlConfig::default())
    }

    pub fn with_config(fetcher: F, config: CrawlConfig) -> Self {
        Self { fetcher, config }
    }

    /// Walk one site and return its discoveries, each distinct href once.
    pub async fn crawl_site(&self, site: &str) -> Result<Vec<Discovery>, AppError> {
        let root_host = Url::parse(site)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned));

        let mut visited = HashSet::from([visit_key(site)]);
        let mut recorded = HashSet::new();
        let mut discoveries = Vec::new();
        let mut stack = vec![site.to_string()];

        while let Some(page) = stack.pop() {
            let links = self.fetcher.fetch_links(&page).await?;
            tracing::debug!(%site, %page, links = links.len(), "Fetched page");

            let mut next = Vec::new();
            for href in links {
                if let Some(target) = self.follow_target(&page, &href, root_host.as_deref())
                    && visited.insert(target.clone())
                {
                    next.push(target);
                }
                if recorded.insert(href.clone()) {
                    discoveries.push(Discovery::new(site, href));
                }
            }
            // Reversed so the first link on the page is walked first.
            stack.extend(next.into_iter().rev());
        }

        Ok(discoveries)
    }

    /// Crawl every site concurrently, one task per site.
    ///
    /// A site whose walk fails contributes zero discoveries; its error is
    /// reported and returned in [`CrawlOutcome::failed`], never propagated.
    pub async fn crawl_all<R: RunReporter>(
        &self,
        sites: &[String],
        cancel: &CancellationToken,
        reporter: &R,
    ) -> CrawlOutcome {
        let gathered = scatter_gather(sites.iter().cloned(), cancel, |site| {
            let crawler = self.clone();
            async move {
                match crawler.crawl_site(&site).await {
                    Ok(found) => Ok((site, found)),
                    Err(error) => Err((site, error)),
                }
            }
        })
        .await;

        let mut outcome = CrawlOutcome {
            cancelled: gathered.cancelled,
            ..CrawlOutcome::default()
        };

        for (site, found) in gathered.succeeded {
            reporter.report(RunEvent::SiteCrawled {
                site: &site,
                discoveries: found.len(),
            });
            outcome.sites_crawled += 1;
            outcome.discoveries.extend(found);
        }

        for (site, error) in gathered.failed {
            let message = error.to_string();
            reporter.report(RunEvent::SiteFailed {
                site: &site,
                error: &message,
            });
            outcome.failed.push((site, error));
        }

        if gathered.cancelled > 0 {
            reporter.report(RunEvent::WorkersCancelled {
                phase: "crawl",
                count: gathered.cancelled,
            });
        }

        outcome
    }

    /// Resolve `href` against the page it was found on. Returns `None` for
    /// links that must not be fetched.
    fn follow_target(&self, page: &str, href: &str, root_host: Option<&str>) -> Option<String> {
        let mut target = match Url::parse(page) {
            Ok(base) => base.join(href).ok()?,
            Err(_) => match Url::parse(href) {
                Ok(absolute) => absolute,
                // Neither side is absolute: follow the href as written.
                Err(_) => return Some(href.to_string()),
            },
        };

        if !matches!(target.scheme(), "http" | "https") {
            return None;
        }
        if self.config.same_host_only && target.host_str() != root_host {
            return None;
        }

        target.set_fragment(None);
        Some(target.into())
    }
}

/// Key under which a page is tracked in the visited set.
fn visit_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.into()
        }
        Err(_) => url.to_string(),
    }
}
