use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::models::{Discovery, render_mail_body};
use crate::report::{RunEvent, RunReporter};
use crate::traits::WatchStore;

/// Result of turning one batch of discoveries into store mutations.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DedupeOutcome {
    pub new_posts: usize,
    pub mail_ids: Vec<i64>,
}

/// Records never-seen links as posts and queues one mail for each.
#[derive(Clone)]
pub struct Deduplicator<S: WatchStore> {
    store: S,
}

impl<S: WatchStore> Deduplicator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Process discoveries in the given order.
    ///
    /// A post and its mail are written together or not at all. A store error
    /// stops processing and is returned; earlier discoveries stay committed.
    /// Cancellation is honoured between discoveries, never between a post
    /// and its mail.
    pub async fn dedupe<R: RunReporter>(
        &self,
        discoveries: &[Discovery],
        cancel: &CancellationToken,
        reporter: &R,
    ) -> Result<DedupeOutcome, AppError> {
        let mut outcome = DedupeOutcome::default();

        for discovery in discoveries {
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }

            let body = render_mail_body(&discovery.site, &discovery.link);
            let Some(mail_id) = self
                .store
                .record_post_and_enqueue(&discovery.site, &discovery.link, &body)
                .await?
            else {
                continue;
            };
            reporter.report(RunEvent::PostRecorded {
                site: &discovery.site,
                link: &discovery.link,
                mail_id,
            });

            outcome.new_posts += 1;
            outcome.mail_ids.push(mail_id);
        }

        Ok(outcome)
    }
}
