use sqlx::PgPool;
use yatube::application::repos::{
    CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, CreateUserParams,
    FollowsRepo, GroupsRepo, PostScope, PostsRepo, RepoError, UsersRepo,
};
use yatube::domain::entities::{GroupRecord, PostRecord, UserRecord};
use yatube::infra::db::PostgresRepositories;

async fn user(repos: &PostgresRepositories, username: &str) -> UserRecord {
    repos
        .create_user(CreateUserParams {
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: format!("{username}@example.com"),
            password_hash: "!".to_string(),
        })
        .await
        .expect("create user")
}

async fn group(repos: &PostgresRepositories, slug: &str) -> GroupRecord {
    repos
        .create_group(CreateGroupParams {
            title: slug.to_uppercase(),
            slug: slug.to_string(),
            description: String::new(),
        })
        .await
        .expect("create group")
}

async fn post(
    repos: &PostgresRepositories,
    author: &UserRecord,
    text: &str,
    group: Option<&GroupRecord>,
) -> PostRecord {
    repos
        .create_post(CreatePostParams {
            author_id: author.id,
            group_id: group.map(|group| group.id),
            text: text.to_string(),
            image: None,
        })
        .await
        .expect("create post")
}

async fn texts(repos: &PostgresRepositories, scope: PostScope, limit: u32) -> Vec<String> {
    repos
        .list_posts(scope, limit, 0)
        .await
        .expect("list posts")
        .into_iter()
        .map(|entry| entry.post.text)
        .collect()
}

#[sqlx::test(migrations = "./migrations")]
async fn follow_feed_only_shows_followed_authors(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let reader = user(&repos, "reader").await;
    let stranger = user(&repos, "stranger").await;
    let leo = user(&repos, "leo").await;
    let anna = user(&repos, "anna").await;

    post(&repos, &leo, "from leo", None).await;
    post(&repos, &anna, "from anna", None).await;

    assert!(repos.follow(reader.id, leo.id).await.expect("follow"));

    let feed = texts(&repos, PostScope::FollowedBy(reader.id), 10).await;
    assert_eq!(feed, vec!["from leo".to_string()]);
    assert_eq!(
        repos
            .count_posts(PostScope::FollowedBy(reader.id))
            .await
            .expect("count"),
        1
    );

    assert!(
        texts(&repos, PostScope::FollowedBy(stranger.id), 10)
            .await
            .is_empty()
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn following_twice_keeps_one_row(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let reader = user(&repos, "reader").await;
    let leo = user(&repos, "leo").await;

    assert!(repos.follow(reader.id, leo.id).await.expect("first follow"));
    assert!(!repos.follow(reader.id, leo.id).await.expect("second follow"));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows")
        .fetch_one(&pool)
        .await
        .expect("count follows");
    assert_eq!(rows, 1);
    assert!(repos.is_following(reader.id, leo.id).await.expect("lookup"));

    assert!(repos.unfollow(reader.id, leo.id).await.expect("unfollow"));
    assert!(!repos.unfollow(reader.id, leo.id).await.expect("unfollow again"));
    assert!(!repos.is_following(reader.id, leo.id).await.expect("lookup"));
}

#[sqlx::test(migrations = "./migrations")]
async fn self_follow_violates_the_schema(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;

    let err = repos
        .follow(leo.id, leo.id)
        .await
        .expect_err("self follow must fail");
    assert!(
        matches!(&err, RepoError::Integrity { message } if message.contains("follows_no_self_follow")),
        "unexpected error: {err:?}"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn second_page_of_fifteen_has_five_oldest(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;
    for index in 0..15 {
        post(&repos, &leo, &format!("Post {index}"), None).await;
    }

    assert_eq!(
        repos.count_posts(PostScope::Author(leo.id)).await.expect("count"),
        15
    );

    let first = texts(&repos, PostScope::All, 10).await;
    assert_eq!(first.len(), 10);
    assert_eq!(first[0], "Post 14");

    let second: Vec<String> = repos
        .list_posts(PostScope::Author(leo.id), 10, 10)
        .await
        .expect("second page")
        .into_iter()
        .map(|entry| entry.post.text)
        .collect();
    assert_eq!(
        second,
        (0..5).rev().map(|index| format!("Post {index}")).collect::<Vec<_>>()
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn group_scope_and_group_removal(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let leo = user(&repos, "leo").await;
    let cats = group(&repos, "cats").await;
    let dogs = group(&repos, "dogs").await;

    let in_cats = post(&repos, &leo, "meow", Some(&cats)).await;
    post(&repos, &leo, "woof", Some(&dogs)).await;

    assert_eq!(
        texts(&repos, PostScope::Group(cats.id), 10).await,
        vec!["meow".to_string()]
    );
    let found = repos
        .find_group_by_slug("cats")
        .await
        .expect("lookup")
        .expect("group exists");
    assert_eq!(found.id, cats.id);

    sqlx::query("DELETE FROM post_groups WHERE id = $1")
        .bind(cats.id)
        .execute(&pool)
        .await
        .expect("delete group");

    let entry = repos
        .find_post(in_cats.id)
        .await
        .expect("lookup")
        .expect("post survives its group");
    assert_eq!(entry.post.group_id, None);
    assert!(entry.group.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn comments_list_oldest_first_and_need_a_post(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;
    let anna = user(&repos, "anna").await;
    let target = post(&repos, &leo, "hello", None).await;

    for text in ["first", "second"] {
        repos
            .create_comment(CreateCommentParams {
                post_id: target.id,
                author_id: anna.id,
                text: text.to_string(),
            })
            .await
            .expect("create comment");
    }

    let comments: Vec<String> = repos
        .list_comments(target.id)
        .await
        .expect("list comments")
        .into_iter()
        .map(|entry| entry.comment.text)
        .collect();
    assert_eq!(comments, vec!["first".to_string(), "second".to_string()]);

    let err = repos
        .create_comment(CreateCommentParams {
            post_id: target.id + 1000,
            author_id: anna.id,
            text: "orphan".to_string(),
        })
        .await
        .expect_err("missing post must fail");
    assert!(matches!(err, RepoError::InvalidInput { .. }), "unexpected error: {err:?}");
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_usernames_are_reported(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    user(&repos, "leo").await;

    let err = repos
        .create_user(CreateUserParams {
            username: "leo".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password_hash: "!".to_string(),
        })
        .await
        .expect_err("duplicate username");
    assert!(matches!(err, RepoError::Duplicate { .. }), "unexpected error: {err:?}");
    assert!(
        repos
            .find_user_by_username("leo")
            .await
            .expect("lookup")
            .is_some()
    );
}
