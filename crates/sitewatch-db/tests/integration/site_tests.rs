use sitewatch_core::AppError;
use sitewatch_core::traits::WatchStore;

use crate::integration::common::setup_test_db;

const SITE: &str = "https://blog.example/";

#[tokio::test]
async fn add_and_list_site() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();

    repo.add_site(SITE, Some("/latest")).await.unwrap();

    assert!(repo.site_exists(SITE).await.unwrap());
    let sites = repo.list_sites().await.unwrap();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].url, SITE);
    assert_eq!(sites[0].last_link.as_deref(), Some("/latest"));
}

#[tokio::test]
async fn add_site_without_initial_link() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();

    repo.add_site(SITE, None).await.unwrap();

    let sites = repo.list_sites().await.unwrap();
    assert!(sites[0].last_link.is_none());
}

#[tokio::test]
async fn duplicate_site_is_rejected() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();

    repo.add_site(SITE, None).await.unwrap();
    let err = repo.add_site(SITE, Some("/other")).await.unwrap_err();

    assert!(matches!(err, AppError::DuplicateKey(url) if url == SITE));
    assert_eq!(repo.list_sites().await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_last_link_overwrites() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    repo.add_site(SITE, Some("/old")).await.unwrap();

    assert!(repo.update_last_link(SITE, "/new").await.unwrap());
    assert!(!repo.update_last_link("https://unknown.example/", "/x").await.unwrap());

    let sites = repo.list_sites().await.unwrap();
    assert_eq!(sites[0].last_link.as_deref(), Some("/new"));
}

#[tokio::test]
async fn remove_unknown_site_reports_false() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();

    assert!(!repo.remove_site(SITE).await.unwrap());
}

#[tokio::test]
async fn remove_cascades_to_posts() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    repo.add_site(SITE, None).await.unwrap();
    repo.add_site("https://other.example/", None).await.unwrap();
    repo.record_post_if_new(SITE, "/p1").await.unwrap();
    repo.record_post_if_new(SITE, "/p2").await.unwrap();
    repo.record_post_if_new("https://other.example/", "/x")
        .await
        .unwrap();

    assert!(repo.remove_site(SITE).await.unwrap());

    let urls: Vec<_> = repo
        .list_sites()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.url)
        .collect();
    assert_eq!(urls, vec!["https://other.example/"]);
    assert!(!repo.post_exists(SITE, "/p1").await.unwrap());

    let posts = repo.existing_posts().await.unwrap();
    assert!(!posts.contains_key(SITE));
    assert_eq!(posts["https://other.example/"], vec!["/x"]);
}

#[tokio::test]
async fn list_is_ordered_by_url() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    repo.add_site("https://b.example/", None).await.unwrap();
    repo.add_site("https://a.example/", None).await.unwrap();

    let urls: Vec<_> = repo
        .list_sites()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.url)
        .collect();

    assert_eq!(urls, vec!["https://a.example/", "https://b.example/"]);
}

#[tokio::test]
async fn migrate_is_idempotent_and_healthy() {
    let (db, _dir) = setup_test_db().await;

    db.migrate().await.unwrap();
    db.watch_repo().health_check().await.unwrap();
}
