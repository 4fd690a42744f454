//! Watch page flows against the reference API: loading, reactions,
//! subscriptions and comments.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use datastore::Repository;
use engagement::{CommentThreadManager, EngagementError, WatchPage};

#[tokio::test]
async fn open_loads_video_channel_and_thread() {
    let server = common::spawn_server().await;
    let page = WatchPage::new(server.client(), common::anonymous());

    let video = page.open("test-video-1").await.unwrap();
    assert_eq!(video.title, "Getting Started with Rust");

    let channel = page.channel_state();
    assert_eq!(channel.ready().unwrap().name, "Mock Channel");

    let ids: Vec<String> = page.thread().comments().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, ["comment-id-2", "comment-id-1", "comment-id-0"]);
}

#[tokio::test]
async fn open_unknown_video_reports_not_found() {
    let server = common::spawn_server().await;
    let page = WatchPage::new(server.client(), common::anonymous());

    let err = page.open("no-such-video").await.unwrap_err();
    assert_matches!(err, EngagementError::Remote { status: Some(404), .. });
    assert!(page.video_state().error().is_some());
}

#[tokio::test]
async fn like_then_dislike_moves_the_user_between_sets() {
    let server = common::spawn_server().await;
    let page = WatchPage::new(server.client(), server.signed_in("user-2@example.com").await);
    page.open("test-video-1").await.unwrap();

    let video = page.like().await.unwrap();
    assert!(video.is_liked_by("user-2"));

    let video = page.dislike().await.unwrap();
    assert!(video.is_disliked_by("user-2"));
    assert!(!video.is_liked_by("user-2"));

    // Liking twice keeps one entry; there is no undo.
    page.like().await.unwrap();
    let video = page.like().await.unwrap();
    assert_eq!(video.likes.len(), 1);

    let stored = server.repo.get_video("test-video-1").unwrap();
    assert_eq!(stored.likes, video.likes);
    assert_eq!(stored.dislikes, video.dislikes);
}

#[tokio::test]
async fn like_without_credential_never_reaches_the_server() {
    let server = common::spawn_server().await;
    let page = WatchPage::new(server.client(), common::anonymous());
    page.open("test-video-1").await.unwrap();
    server.fail("/api/users/like", 500, 1);

    assert_matches!(page.like().await, Err(EngagementError::AuthMissing));
    assert!(page.reactions().video().unwrap().likes.is_empty());
    // The fault was not consumed, so no request was sent.
    assert!(server.faults.take("/api/users/like/test-video-1").is_some());
}

#[tokio::test]
async fn rejected_reaction_changes_nothing() {
    let server = common::spawn_server().await;
    let page = WatchPage::new(server.client(), server.signed_in("user-2@example.com").await);
    page.open("test-video-1").await.unwrap();
    server.fail("/api/users/like", 500, 1);

    assert_matches!(
        page.like().await,
        Err(EngagementError::Remote { status: Some(500), .. })
    );
    assert!(!page.reactions().video().unwrap().is_liked_by("user-2"));
    assert!(!page.reactions().is_pending("test-video-1"));
}

#[tokio::test]
async fn repeated_like_while_pending_is_refused() {
    let server = common::spawn_server().await;
    let page = WatchPage::new(server.client(), server.signed_in("user-2@example.com").await);
    page.open("test-video-1").await.unwrap();
    server.delay("/api/users/like", 200);

    let (first, second) = tokio::join!(page.like(), page.like());
    assert!(first.unwrap().is_liked_by("user-2"));
    assert_matches!(second, Err(EngagementError::InFlight));
    assert!(!page.reactions().is_pending("test-video-1"));
}

#[tokio::test]
async fn subscription_toggles_both_ways() {
    let server = common::spawn_server().await;
    let session = server.signed_in("test@example.com").await;
    let page = WatchPage::new(server.client(), session.clone());
    page.open("test-video-1").await.unwrap();
    assert!(!page.is_subscribed_to_channel());

    assert!(page.toggle_subscription().await.unwrap());
    assert!(session.current_user().unwrap().is_subscribed("channel-1"));
    assert!(server.repo.get_user("user-1").unwrap().is_subscribed("channel-1"));
    assert_eq!(server.repo.get_user("channel-1").unwrap().subscribers, 1);

    assert!(!page.toggle_subscription().await.unwrap());
    assert!(!page.is_subscribed_to_channel());
    assert_eq!(server.repo.get_user("channel-1").unwrap().subscribers, 0);
    // Existing subscriptions are untouched.
    assert!(page.subscriptions().is_subscribed("channel-2"));
}

#[tokio::test]
async fn failed_subscription_keeps_membership() {
    let server = common::spawn_server().await;
    let page = WatchPage::new(server.client(), server.signed_in("test@example.com").await);
    page.open("test-video-2").await.unwrap();
    assert!(page.is_subscribed_to_channel());
    server.fail("/api/users/unsub", 503, 1);

    assert_matches!(
        page.toggle_subscription().await,
        Err(EngagementError::Remote { status: Some(503), .. })
    );
    assert!(page.is_subscribed_to_channel());
}

#[tokio::test]
async fn posted_comment_is_the_servers_copy() {
    let server = common::spawn_server().await;
    let page = WatchPage::new(server.client(), server.signed_in("user-2@example.com").await);
    page.open("test-video-1").await.unwrap();

    let posted = page.post_comment("great video").await.unwrap();
    assert!(!posted.id.is_empty());
    assert_eq!(posted.user_id.name(), Some("Other User"));

    let comments = page.thread().comments();
    assert_eq!(comments.len(), 4);
    assert_eq!(comments[0], posted);
    assert_eq!(page.thread().draft(), "");
}

#[tokio::test]
async fn failed_post_preserves_draft_for_retry() {
    let server = common::spawn_server().await;
    let page = WatchPage::new(server.client(), server.signed_in("user-2@example.com").await);
    page.open("test-video-1").await.unwrap();
    server.fail("/api/comments", 500, 1);

    let err = page.post_comment("keep me").await.unwrap_err();
    assert_matches!(err, EngagementError::Remote { status: Some(500), .. });
    assert_eq!(page.thread().draft(), "keep me");
    assert_eq!(page.thread().comments().len(), 3);

    let draft = page.thread().draft();
    page.post_comment(&draft).await.unwrap();
    assert_eq!(page.thread().draft(), "");
    assert_eq!(page.thread().comments()[0].desc, "keep me");
}

#[tokio::test]
async fn blank_comment_is_rejected_locally() {
    let server = common::spawn_server().await;
    let page = WatchPage::new(server.client(), server.signed_in("user-2@example.com").await);
    page.open("test-video-1").await.unwrap();

    assert_matches!(page.post_comment("   ").await, Err(EngagementError::InvalidInput(_)));
    assert_eq!(server.repo.get_comments("test-video-1").len(), 3);
}

#[tokio::test]
async fn failed_thread_load_still_accepts_a_post() {
    let server = common::spawn_server().await;
    server.fail("/api/comments/test-video-1", 500, 1);
    let page = WatchPage::new(server.client(), server.signed_in("user-2@example.com").await);

    page.open("test-video-1").await.unwrap();
    assert!(page.thread().state().error().is_some());
    assert!(page.thread().comments().is_empty());

    let posted = page.post_comment("first after outage").await.unwrap();
    assert_eq!(page.thread().comments(), vec![posted]);
}

#[tokio::test]
async fn stale_thread_load_is_discarded() {
    let server = common::spawn_server().await;
    let client = server.client();
    let thread = CommentThreadManager::new();
    server.delay("/api/comments/test-video-1", 300);

    let (slow, fast) = tokio::join!(thread.load_thread(&client, "test-video-1"), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        thread.load_thread(&client, "test-video-2").await
    });

    assert_matches!(slow, Err(EngagementError::Superseded { .. }));
    assert!(fast.unwrap().is_empty());
    assert_eq!(thread.active_video_id().as_deref(), Some("test-video-2"));
    assert!(thread.comments().is_empty());
}

#[tokio::test]
async fn reload_replaces_the_thread() {
    let server = common::spawn_server().await;
    let client = server.client();
    let thread = CommentThreadManager::new();

    thread.load_thread(&client, "test-video-1").await.unwrap();
    server.repo.add_comment(domain::Comment {
        id: "comment-id-new".to_string(),
        video_id: "test-video-1".to_string(),
        user_id: domain::CommentAuthor::Id("user-2".to_string()),
        desc: "late".to_string(),
        created_at: Default::default(),
    });
    thread.load_thread(&client, "test-video-1").await.unwrap();

    let comments = thread.comments();
    assert_eq!(comments.len(), 4);
    assert_eq!(comments[0].id, "comment-id-new");
}

#[tokio::test]
async fn comment_posted_during_reload_is_not_lost() {
    let server = common::spawn_server().await;
    let client = server.client();
    let session = server.signed_in("user-2@example.com").await;
    let thread = CommentThreadManager::new();

    let reload = thread.begin_load("test-video-1");
    let before_post = client.fetch_comments("test-video-1").await.unwrap();
    let posted = thread
        .post_comment(&client, &session.raw_token(), "test-video-1", "hello")
        .await
        .unwrap();
    assert!(thread.settle_load(&reload, Ok(before_post)));

    let held = thread.comments();
    assert_eq!(held.len(), 4);
    assert_eq!(held[0], posted);
    assert_eq!(thread.draft(), "");
}

#[tokio::test]
async fn pages_sharing_a_session_agree_on_subscription() {
    let server = common::spawn_server().await;
    let session = server.signed_in("test@example.com").await;
    let first = WatchPage::new(server.client(), session.clone());
    let second = WatchPage::new(server.client(), session.clone());
    first.open("test-video-1").await.unwrap();
    second.open("test-video-1").await.unwrap();
    server.delay("/api/users/sub", 200);

    let (a, b) = tokio::join!(first.toggle_subscription(), second.toggle_subscription());
    let results = [a, b];
    assert_eq!(results.iter().filter(|r| matches!(r, Ok(true))).count(), 1);
    assert_eq!(
        results.iter().filter(|r| matches!(r, Err(EngagementError::InFlight))).count(),
        1
    );

    let remote = server.repo.get_user("user-1").unwrap().is_subscribed("channel-1");
    assert!(remote);
    assert_eq!(session.current_user().unwrap().is_subscribed("channel-1"), remote);
    assert!(first.is_subscribed_to_channel() && second.is_subscribed_to_channel());
    assert_eq!(server.repo.get_user("channel-1").unwrap().subscribers, 1);
}

#[tokio::test]
async fn reaction_is_credited_to_the_sender_after_sign_out() {
    let server = common::spawn_server().await;
    let session = server.signed_in("user-2@example.com").await;
    let page = WatchPage::new(server.client(), session.clone());
    page.open("test-video-1").await.unwrap();
    server.delay("/api/users/like", 200);

    let (liked, signed_out) = tokio::join!(page.like(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.sign_out()
    });
    signed_out.unwrap();

    let video = liked.unwrap();
    assert!(video.is_liked_by("user-2"));
    assert!(server.repo.get_video("test-video-1").unwrap().is_liked_by("user-2"));
}

#[tokio::test]
async fn comment_authors_are_resolved_with_fallback() {
    let server = common::spawn_server().await;
    server.repo.add_comment(domain::Comment {
        id: "comment-id-orphan".to_string(),
        video_id: "test-video-1".to_string(),
        user_id: domain::CommentAuthor::Id("deleted-user".to_string()),
        desc: "who wrote this".to_string(),
        created_at: Default::default(),
    });
    let page = WatchPage::new(server.client(), server.signed_in("user-2@example.com").await);
    page.open("test-video-1").await.unwrap();
    page.post_comment("mine").await.unwrap();

    let comments = page.comments_with_authors().await;
    assert_eq!(comments.len(), 5);
    assert_eq!(comments[0].author_name, "Other User");
    assert_eq!(comments[0].author_img_url, domain::DEFAULT_AUTHOR_AVATAR);

    let orphan = comments
        .iter()
        .find(|c| c.comment.id == "comment-id-orphan")
        .unwrap();
    assert_eq!(orphan.author_name, domain::UNKNOWN_AUTHOR_NAME);
    assert_eq!(orphan.author_img_url, domain::DEFAULT_AUTHOR_AVATAR);

    let seeded = comments.iter().find(|c| c.comment.id == "comment-id-0").unwrap();
    assert_eq!(seeded.author_name, "Test User");
}
