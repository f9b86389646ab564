use sitewatch_core::AppError;
use sitewatch_core::traits::WatchStore;
use tokio::task::JoinSet;

use crate::integration::common::setup_test_db;

const SITE: &str = "https://blog.example/";

#[tokio::test]
async fn record_post_is_true_only_once() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    repo.add_site(SITE, None).await.unwrap();

    assert!(repo.record_post_if_new(SITE, "/p1").await.unwrap());
    assert!(!repo.record_post_if_new(SITE, "/p1").await.unwrap());

    assert!(repo.post_exists(SITE, "/p1").await.unwrap());
    assert_eq!(repo.existing_posts().await.unwrap()[SITE], vec!["/p1"]);
}

#[tokio::test]
async fn same_link_on_different_sites_is_distinct() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    repo.add_site(SITE, None).await.unwrap();
    repo.add_site("https://other.example/", None).await.unwrap();

    assert!(repo.record_post_if_new(SITE, "/about").await.unwrap());
    assert!(
        repo.record_post_if_new("https://other.example/", "/about")
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn concurrent_inserts_have_a_single_winner() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    repo.add_site(SITE, None).await.unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let repo = repo.clone();
        tasks.spawn(async move { repo.record_post_if_new(SITE, "/race").await });
    }

    let mut winners = 0;
    while let Some(joined) = tasks.join_next().await {
        if joined.unwrap().unwrap() {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(repo.existing_posts().await.unwrap()[SITE].len(), 1);
}

#[tokio::test]
async fn post_for_unknown_site_violates_foreign_key() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();

    let err = repo
        .record_post_if_new("https://ghost.example/", "/p1")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::DatabaseError(_)));
    assert!(repo.existing_posts().await.unwrap().is_empty());
}

#[tokio::test]
async fn existing_posts_groups_by_site() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    repo.add_site(SITE, None).await.unwrap();
    repo.add_site("https://other.example/", None).await.unwrap();
    repo.record_post_if_new(SITE, "/p1").await.unwrap();
    repo.record_post_if_new("https://other.example/", "/x")
        .await
        .unwrap();
    repo.record_post_if_new(SITE, "/p2").await.unwrap();

    let posts = repo.existing_posts().await.unwrap();

    assert_eq!(posts.len(), 2);
    assert_eq!(posts[SITE], vec!["/p1", "/p2"]);
    assert_eq!(posts["https://other.example/"], vec!["/x"]);
}

#[tokio::test]
async fn post_and_mail_are_recorded_together() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    repo.add_site(SITE, None).await.unwrap();

    let id = repo
        .record_post_and_enqueue(SITE, "/p1", "New blog post /p1")
        .await
        .unwrap()
        .unwrap();

    assert!(repo.post_exists(SITE, "/p1").await.unwrap());
    assert_eq!(repo.get_mail(id).await.unwrap().unwrap().body, "New blog post /p1");
    assert_eq!(
        repo.record_post_and_enqueue(SITE, "/p1", "New blog post /p1")
            .await
            .unwrap(),
        None
    );
    assert_eq!(repo.count_pending().await.unwrap(), 1);
}

#[tokio::test]
async fn failed_mail_insert_rolls_back_the_post() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    repo.add_site(SITE, None).await.unwrap();
    sqlx::query("ALTER TABLE mails RENAME TO mails_parked")
        .execute(db.pool())
        .await
        .unwrap();

    let err = repo
        .record_post_and_enqueue(SITE, "/p1", "New blog post /p1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DatabaseError(_)));
    assert!(!repo.post_exists(SITE, "/p1").await.unwrap());

    sqlx::query("ALTER TABLE mails_parked RENAME TO mails")
        .execute(db.pool())
        .await
        .unwrap();
    let id = repo
        .record_post_and_enqueue(SITE, "/p1", "New blog post /p1")
        .await
        .unwrap();

    assert!(id.is_some());
    assert!(repo.post_exists(SITE, "/p1").await.unwrap());
    assert_eq!(repo.count_pending().await.unwrap(), 1);
}
