use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::fanout::scatter_gather;
use crate::models::Envelope;
use crate::report::{RunEvent, RunReporter};
use crate::traits::{Mailer, WatchStore};

/// Result of one delivery pass over the mail queue.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub delivered: Vec<i64>,
    pub failed: Vec<i64>,
    pub cancelled: usize,
}

/// Delivers pending mail and marks successful deliveries as sent.
///
/// Mail whose delivery fails stays pending and is attempted again on the
/// next pass, with no backoff and no attempt limit.
#[derive(Clone)]
pub struct Notifier<S, M>
where
    S: WatchStore,
    M: Mailer,
{
    store: S,
    mailer: M,
    envelope: Envelope,
}

impl<S, M> Notifier<S, M>
where
    S: WatchStore,
    M: Mailer + 'static,
{
    pub fn new(store: S, mailer: M, envelope: Envelope) -> Self {
        Self {
            store,
            mailer,
            envelope,
        }
    }

    /// Attempt every pending mail concurrently, one task per mail.
    ///
    /// Ids are marked sent only after all attempts have finished and only for
    /// attempts that succeeded. If marking fails for some ids the rest are
    /// still marked and the first store error is returned.
    pub async fn notify<R: RunReporter>(
        &self,
        cancel: &CancellationToken,
        reporter: &R,
    ) -> Result<NotifyOutcome, AppError> {
        let pending = self.store.fetch_pending_mail().await?;
        if pending.is_empty() {
            tracing::debug!("No pending mail");
            return Ok(NotifyOutcome::default());
        }
        tracing::info!(count = pending.len(), "Delivering pending mail");

        let gathered = scatter_gather(pending, cancel, |mail| {
            let mailer = self.mailer.clone();
            let envelope = self.envelope.clone();
            async move {
                match mailer.deliver(&envelope, &mail.body).await {
                    Ok(()) => Ok(mail.id),
                    Err(error) => Err((mail.id, error)),
                }
            }
        })
        .await;

        let mut outcome = NotifyOutcome {
            cancelled: gathered.cancelled,
            ..NotifyOutcome::default()
        };

        let mut first_error = None;
        for mail_id in gathered.succeeded {
            match self.store.mark_sent(mail_id).await {
                Ok(()) => {
                    reporter.report(RunEvent::MailDelivered { mail_id });
                    outcome.delivered.push(mail_id);
                }
                Err(e) => {
                    tracing::error!(%mail_id, error = %e, "Delivered mail could not be marked sent");
                    first_error.get_or_insert(e);
                }
            }
        }

        for (mail_id, error) in gathered.failed {
            let message = error.to_string();
            reporter.report(RunEvent::MailFailed {
                mail_id,
                error: &message,
            });
            outcome.failed.push(mail_id);
        }

        if gathered.cancelled > 0 {
            reporter.report(RunEvent::WorkersCancelled {
                phase: "notify",
                count: gathered.cancelled,
            });
        }

        outcome.delivered.sort_unstable();
        outcome.failed.sort_unstable();

        match first_error {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }
}
