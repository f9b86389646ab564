use chrono::{DateTime, Utc};

/// A registered site, identified by its root URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub url: String,
    /// First link seen when the site was registered. Informational only.
    pub last_link: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// A (site, link) pair observed during one crawl, before deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Discovery {
    pub site: String,
    /// The raw href as written on the page.
    pub link: String,
}

impl Discovery {
    pub fn new(site: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            link: link.into(),
        }
    }
}

/// A queued notification that has not been delivered yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMail {
    pub id: i64,
    pub body: String,
}

/// Sender and recipient of every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub to: String,
    pub subject: String,
}

impl Envelope {
    pub const DEFAULT_SUBJECT: &'static str = "New blog post";

    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: Self::DEFAULT_SUBJECT.to_string(),
        }
    }
}

/// Render the body of the notification for a newly seen link.
pub fn render_mail_body(site: &str, link: &str) -> String {
    format!("New blog post {link} on blog {site}")
}

/// Totals reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sites: usize,
    pub sites_failed: usize,
    pub discoveries: usize,
    pub new_posts: usize,
    pub mails_delivered: usize,
    pub mails_failed: usize,
}
