use sitewatch_core::traits::WatchStore;

use crate::integration::common::setup_test_db;

#[tokio::test]
async fn enqueued_mail_is_pending() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();

    let id = repo.enqueue_mail("New blog post /p1 on blog S").await.unwrap();

    let mail = repo.get_mail(id).await.unwrap().expect("Mail should exist");
    assert_eq!(mail.body, "New blog post /p1 on blog S");
    assert!(!mail.is_sent);
    assert!(mail.sent_at.is_none());
    assert_eq!(repo.count_pending().await.unwrap(), 1);
}

#[tokio::test]
async fn ids_are_increasing_and_pending_is_ordered() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();

    let a = repo.enqueue_mail("a").await.unwrap();
    let b = repo.enqueue_mail("b").await.unwrap();
    let c = repo.enqueue_mail("c").await.unwrap();
    assert!(a < b && b < c);

    let pending: Vec<_> = repo
        .fetch_pending_mail()
        .await
        .unwrap()
        .into_iter()
        .map(|m| (m.id, m.body))
        .collect();
    assert_eq!(
        pending,
        vec![(a, "a".to_string()), (b, "b".to_string()), (c, "c".to_string())]
    );
}

#[tokio::test]
async fn mark_sent_removes_from_pending() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    let first = repo.enqueue_mail("first").await.unwrap();
    let second = repo.enqueue_mail("second").await.unwrap();

    repo.mark_sent(first).await.unwrap();

    let pending = repo.fetch_pending_mail().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second);

    let sent = repo.get_mail(first).await.unwrap().unwrap();
    assert!(sent.is_sent);
    assert!(sent.sent_at.is_some());
}

#[tokio::test]
async fn mark_sent_twice_keeps_first_timestamp() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();
    let id = repo.enqueue_mail("once").await.unwrap();

    repo.mark_sent(id).await.unwrap();
    let first = repo.get_mail(id).await.unwrap().unwrap().sent_at;
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    repo.mark_sent(id).await.unwrap();

    assert_eq!(repo.get_mail(id).await.unwrap().unwrap().sent_at, first);
}

#[tokio::test]
async fn mark_sent_unknown_id_is_a_noop() {
    let (db, _dir) = setup_test_db().await;
    let repo = db.watch_repo();

    repo.mark_sent(42).await.unwrap();
    assert!(repo.get_mail(42).await.unwrap().is_none());
}
