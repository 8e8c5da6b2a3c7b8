mod support;

use axum::http::StatusCode;
use support::{TestApp, body_text, card_count, location};

#[tokio::test]
async fn followed_authors_appear_in_follow_feed_only_for_followers() {
    let app = TestApp::new();
    let author = app.user("leo");
    let follower = app.user("mia");
    let stranger = app.user("bob");
    app.store.insert_post(&author, "Only for subscribers", None);

    let follower_cookie = app.login(&follower).await;
    let stranger_cookie = app.login(&stranger).await;

    let response = app.post_form("/profile/leo/follow/", "", Some(&follower_cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response).as_deref(), Some("/profile/leo/"));

    let follower_feed = body_text(app.get("/follow/", Some(&follower_cookie)).await).await;
    assert!(follower_feed.contains("Only for subscribers"));
    assert_eq!(card_count(&follower_feed), 1);

    let stranger_feed = body_text(app.get("/follow/", Some(&stranger_cookie)).await).await;
    assert!(!stranger_feed.contains("Only for subscribers"));
    assert_eq!(card_count(&stranger_feed), 0);
}

#[tokio::test]
async fn following_is_idempotent() {
    let app = TestApp::new();
    let author = app.user("leo");
    let follower = app.user("mia");
    let cookie = app.login(&follower).await;

    app.get("/profile/leo/follow/", Some(&cookie)).await;
    app.get("/profile/leo/follow/", Some(&cookie)).await;

    let follows = app.store.follows();
    assert_eq!(follows.len(), 1);
    assert_eq!((follows[0].user_id, follows[0].author_id), (follower.id, author.id));
}

#[tokio::test]
async fn following_yourself_creates_nothing() {
    let app = TestApp::new();
    let user = app.user("leo");
    let cookie = app.login(&user).await;

    let response = app.get("/profile/leo/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response).as_deref(), Some("/profile/leo/"));
    assert!(app.store.follows().is_empty());
}

#[tokio::test]
async fn unfollow_removes_the_relation() {
    let app = TestApp::new();
    let author = app.user("leo");
    let follower = app.user("mia");
    app.store.insert_post(&author, "Subscribed content", None);
    let cookie = app.login(&follower).await;

    app.get("/profile/leo/follow/", Some(&cookie)).await;
    let profile = body_text(app.get("/profile/leo/", Some(&cookie)).await).await;
    assert!(profile.contains("/profile/leo/unfollow/"));

    let response = app.get("/profile/leo/unfollow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response).as_deref(), Some("/"));
    assert!(app.store.follows().is_empty());

    let feed = body_text(app.get("/follow/", Some(&cookie)).await).await;
    assert_eq!(card_count(&feed), 0);
}

#[tokio::test]
async fn following_unknown_author_is_not_found() {
    let app = TestApp::new();
    let user = app.user("mia");
    let cookie = app.login(&user).await;

    let response = app.get("/profile/ghost/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_follow_controls_depend_on_viewer() {
    let app = TestApp::new();
    let author = app.user("leo");
    let reader = app.user("mia");

    let anonymous = body_text(app.get("/profile/leo/", None).await).await;
    assert!(!anonymous.contains("/profile/leo/follow/"));

    let own_cookie = app.login(&author).await;
    let own = body_text(app.get("/profile/leo/", Some(&own_cookie)).await).await;
    assert!(!own.contains("/profile/leo/follow/"));

    let reader_cookie = app.login(&reader).await;
    let other = body_text(app.get("/profile/leo/", Some(&reader_cookie)).await).await;
    assert!(other.contains("/profile/leo/follow/"));
}
