use uuid::Uuid;

use crate::models::RunSummary;

/// Events emitted during a run for monitoring/logging.
#[derive(Debug, Clone)]
pub enum RunEvent<'a> {
    RunStarted {
        run_id: Uuid,
        sites: usize,
    },
    SiteCrawled {
        site: &'a str,
        discoveries: usize,
    },
    SiteFailed {
        site: &'a str,
        error: &'a str,
    },
    PostRecorded {
        site: &'a str,
        link: &'a str,
        mail_id: i64,
    },
    MailDelivered {
        mail_id: i64,
    },
    MailFailed {
        mail_id: i64,
        error: &'a str,
    },
    WorkersCancelled {
        phase: &'static str,
        count: usize,
    },
    RunFinished {
        run_id: Uuid,
        summary: &'a RunSummary,
    },
}

/// Trait for receiving run events (decoupled logging).
pub trait RunReporter: Send + Sync {
    fn report(&self, event: RunEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunReporter;

impl RunReporter for TracingRunReporter {
    fn report(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::RunStarted { run_id, sites } => {
                tracing::info!(%run_id, %sites, "Run started");
            }
            RunEvent::SiteCrawled { site, discoveries } => {
                tracing::info!(%site, %discoveries, "Site crawled");
            }
            RunEvent::SiteFailed { site, error } => {
                tracing::warn!(%site, %error, "Site crawl failed");
            }
            RunEvent::PostRecorded {
                site,
                link,
                mail_id,
            } => {
                tracing::info!(%site, %link, %mail_id, "New post recorded");
            }
            RunEvent::MailDelivered { mail_id } => {
                tracing::debug!(%mail_id, "Mail delivered");
            }
            RunEvent::MailFailed { mail_id, error } => {
                tracing::warn!(%mail_id, %error, "Mail delivery failed, will retry next run");
            }
            RunEvent::WorkersCancelled { phase, count } => {
                tracing::warn!(%phase, %count, "Workers cancelled");
            }
            RunEvent::RunFinished { run_id, summary } => {
                tracing::info!(
                    %run_id,
                    sites = summary.sites,
                    sites_failed = summary.sites_failed,
                    discoveries = summary.discoveries,
                    new_posts = summary.new_posts,
                    mails_delivered = summary.mails_delivered,
                    mails_failed = summary.mails_failed,
                    "Run finished"
                );
            }
        }
    }
}
