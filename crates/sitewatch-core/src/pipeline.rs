use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::crawl::{CrawlConfig, Crawler};
use crate::dedupe::Deduplicator;
use crate::error::AppError;
use crate::models::{Envelope, RunSummary};
use crate::notify::Notifier;
use crate::report::{RunEvent, RunReporter};
use crate::traits::{LinkFetcher, Mailer, WatchStore};

/// Orchestrates one run: load sites → crawl → dedupe → notify.
///
/// The phases run one after the other; only the crawl and notify phases fan
/// out internally. Store errors and cancellation abort the run, a failing
/// site or mail does not.
pub struct WatchService<S, F, M>
where
    S: WatchStore,
    F: LinkFetcher,
    M: Mailer,
{
    store: S,
    crawler: Crawler<F>,
    deduplicator: Deduplicator<S>,
    notifier: Notifier<S, M>,
}

impl<S, F, M> WatchService<S, F, M>
where
    S: WatchStore,
    F: LinkFetcher + 'static,
    M: Mailer + 'static,
{
    pub fn new(store: S, fetcher: F, mailer: M, envelope: Envelope) -> Self {
        Self::with_crawl_config(store, fetcher, mailer, envelope, CrawlConfig::default())
    }

    pub fn with_crawl_config(
        store: S,
        fetcher: F,
        mailer: M,
        envelope: Envelope,
        crawl_config: CrawlConfig,
    ) -> Self {
        Self {
            crawler: Crawler::with_config(fetcher, crawl_config),
            deduplicator: Deduplicator::new(store.clone()),
            notifier: Notifier::new(store.clone(), mailer, envelope),
            store,
        }
    }

    /// Run the full pipeline once.
    pub async fn run<R: RunReporter>(
        &self,
        cancel: &CancellationToken,
        reporter: &R,
    ) -> Result<RunSummary, AppError> {
        let run_id = Uuid::new_v4();

        let sites: Vec<String> = self
            .store
            .list_sites()
            .await?
            .into_iter()
            .map(|site| site.url)
            .collect();
        reporter.report(RunEvent::RunStarted {
            run_id,
            sites: sites.len(),
        });

        let crawled = self.crawler.crawl_all(&sites, cancel, reporter).await;
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let deduped = self
            .deduplicator
            .dedupe(&crawled.discoveries, cancel, reporter)
            .await?;

        let notified = self.notifier.notify(cancel, reporter).await?;
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let summary = RunSummary {
            sites: sites.len(),
            sites_failed: crawled.failed.len(),
            discoveries: crawled.discoveries.len(),
            new_posts: deduped.new_posts,
            mails_delivered: notified.delivered.len(),
            mails_failed: notified.failed.len(),
        };
        reporter.report(RunEvent::RunFinished {
            run_id,
            summary: &summary,
        });

        Ok(summary)
    }
}
