pub mod config;
pub mod crawl;
pub mod dedupe;
pub mod error;
pub mod fanout;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::{AppConfig, ClientConfig, CrawlSettings, ServerConfig};
pub use crawl::{CrawlConfig, CrawlOutcome, Crawler};
pub use dedupe::{DedupeOutcome, Deduplicator};
pub use error::AppError;
pub use models::{Discovery, Envelope, PendingMail, RunSummary, Site, render_mail_body};
pub use notify::{NotifyOutcome, Notifier};
pub use pipeline::WatchService;
pub use registry::{ExploreOutcome, SiteRegistry, validate_site_url};
pub use report::{RunEvent, RunReporter, TracingRunReporter};
pub use traits::{LinkFetcher, Mailer, WatchStore};
