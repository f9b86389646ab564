use sitewatch_core::models::Envelope;
use sitewatch_core::testutil::{MockFetcher, MockMailer, MockReporter};
use sitewatch_core::traits::WatchStore;
use sitewatch_core::{ExploreOutcome, SiteRegistry, WatchService};
use sitewatch_db::WatchRepository;
use tokio_util::sync::CancellationToken;

use crate::integration::common::setup_test_db;

const SITE: &str = "https://blog.example/";

fn service(
    repo: &WatchRepository,
    fetcher: &MockFetcher,
    mailer: &MockMailer,
) -> WatchService<WatchRepository, MockFetcher, MockMailer> {
    WatchService::new(
        repo.clone(),
        fetcher.clone(),
        mailer.clone(),
        Envelope::new("watcher@example.com", "me@example.com"),
    )
}

fn sent_bodies(mailer: &MockMailer) -> Vec<String> {
    let mut bodies: Vec<_> = mailer.sent().into_iter().map(|(_, body)| body).collect();
    bodies.sort();
    bodies
}

#[tokio::test]
async fn first_run_records_and_mails_every_link() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    repo.add_site(SITE, None).await.unwrap();
    let fetcher = MockFetcher::new().with_page(SITE, &["/p1", "/p2"]);
    let mailer = MockMailer::working();

    let summary = service(&repo, &fetcher, &mailer)
        .run(&CancellationToken::new(), &MockReporter::new())
        .await
        .unwrap();

    assert_eq!(summary.new_posts, 2);
    assert_eq!(summary.mails_delivered, 2);
    assert!(repo.post_exists(SITE, "/p1").await.unwrap());
    assert!(repo.post_exists(SITE, "/p2").await.unwrap());
    assert_eq!(
        sent_bodies(&mailer),
        vec![
            format!("New blog post /p1 on blog {SITE}"),
            format!("New blog post /p2 on blog {SITE}"),
        ]
    );
    assert_eq!(repo.count_pending().await.unwrap(), 0);
}

#[tokio::test]
async fn second_run_over_unchanged_site_inserts_nothing() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    repo.add_site(SITE, None).await.unwrap();
    let fetcher = MockFetcher::new().with_page(SITE, &["/p1", "/p2"]);
    let mailer = MockMailer::working();
    let svc = service(&repo, &fetcher, &mailer);
    let cancel = CancellationToken::new();

    svc.run(&cancel, &MockReporter::new()).await.unwrap();
    let second = svc.run(&cancel, &MockReporter::new()).await.unwrap();

    assert_eq!(second.new_posts, 0);
    assert_eq!(second.mails_delivered, 0);
    assert_eq!(mailer.sent().len(), 2);
}

#[tokio::test]
async fn failed_mail_is_delivered_by_a_later_run() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    repo.add_site(SITE, None).await.unwrap();
    let links: Vec<String> = (1..=7).map(|i| format!("/p{i}")).collect();
    let refs: Vec<&str> = links.iter().map(String::as_str).collect();
    let fetcher = MockFetcher::new().with_page(SITE, &refs);
    let mailer =
        MockMailer::working().failing_for(&format!("New blog post /p7 on blog {SITE}"));
    let svc = service(&repo, &fetcher, &mailer);
    let cancel = CancellationToken::new();

    let first = svc.run(&cancel, &MockReporter::new()).await.unwrap();
    assert_eq!(first.mails_failed, 1);
    assert!(!repo.get_mail(7).await.unwrap().unwrap().is_sent);

    mailer.clear_failures();
    let second = svc.run(&cancel, &MockReporter::new()).await.unwrap();
    assert_eq!(second.mails_delivered, 1);
    assert!(repo.get_mail(7).await.unwrap().unwrap().is_sent);
    assert_eq!(repo.count_pending().await.unwrap(), 0);
}

#[tokio::test]
async fn removed_site_is_gone_with_its_posts() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    let registry = SiteRegistry::new(repo.clone());
    let fetcher = MockFetcher::new().with_page(SITE, &["/p1"]);
    registry.explore(&fetcher, SITE).await.unwrap();
    service(&repo, &fetcher, &MockMailer::working())
        .run(&CancellationToken::new(), &MockReporter::new())
        .await
        .unwrap();

    assert!(registry.remove(SITE).await.unwrap());

    assert!(registry.list().await.unwrap().is_empty());
    assert!(!repo.post_exists(SITE, "/p1").await.unwrap());
    assert!(registry.posts().await.unwrap().is_empty());
}

#[tokio::test]
async fn cyclic_site_terminates() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    repo.add_site(SITE, None).await.unwrap();
    let fetcher = MockFetcher::new()
        .with_page(SITE, &["/a"])
        .with_page("https://blog.example/a", &[SITE]);

    let summary = service(&repo, &fetcher, &MockMailer::working())
        .run(&CancellationToken::new(), &MockReporter::new())
        .await
        .unwrap();

    assert_eq!(summary.new_posts, 2);
    assert_eq!(fetcher.fetch_count(SITE), 1);
    assert_eq!(fetcher.fetch_count("https://blog.example/a"), 1);
}

#[tokio::test]
async fn differently_spelled_site_is_watched_and_mailed_once() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    let registry = SiteRegistry::new(repo.clone());
    let fetcher = MockFetcher::new().with_page(SITE, &["/p1"]);

    registry
        .explore(&fetcher, "https://blog.example")
        .await
        .unwrap();
    assert_eq!(
        registry
            .explore(&fetcher, "HTTPS://Blog.Example/")
            .await
            .unwrap(),
        ExploreOutcome::AlreadyWatched
    );

    let mailer = MockMailer::working();
    let summary = service(&repo, &fetcher, &mailer)
        .run(&CancellationToken::new(), &MockReporter::new())
        .await
        .unwrap();

    assert_eq!(summary.sites, 1);
    assert_eq!(summary.new_posts, 1);
    assert_eq!(mailer.sent().len(), 1);
}
