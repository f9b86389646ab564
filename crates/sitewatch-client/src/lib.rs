pub mod fetcher;
pub mod links;
pub mod mailer;

pub use fetcher::ReqwestFetcher;
pub use links::extract_links;
pub use mailer::{SmtpMailer, build_message};
