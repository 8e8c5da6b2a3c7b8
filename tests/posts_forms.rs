mod support;

use axum::http::StatusCode;
use support::{MultipartPart, TestApp, body_text, location, template_marker};

const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00\x00\x00\x00\x00\xff\xff\xff!\xf9\x04\x01\x00\x00\x00\x00,\x00\x00\x00\x00\x01\x00\x01\x00\x00\x02\x02D\x01\x00;";

#[tokio::test]
async fn create_post_redirects_to_profile() {
    let app = TestApp::new();
    let author = app.user("leo");
    let group = app.store.insert_group("Cats", "cats");
    let cookie = app.login(&author).await;

    let response = app
        .post_form(
            "/create/",
            &format!("text=Brand+new+post&group={}", group.id),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response).as_deref(), Some("/profile/leo/"));

    let posts = app.store.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].text, "Brand new post");
    assert_eq!(posts[0].group_id, Some(group.id));
    assert_eq!(posts[0].author_id, author.id);
}

#[tokio::test]
async fn invalid_post_form_is_rerendered() {
    let app = TestApp::new();
    let author = app.user("leo");
    let cookie = app.login(&author).await;

    let blank = app.post_form("/create/", "text=+++", Some(&cookie)).await;
    assert_eq!(blank.status(), StatusCode::OK);
    let html = body_text(blank).await;
    assert!(html.contains(&template_marker("posts/create_post.html")));
    assert!(html.contains("This field is required."));

    let unknown_group = app
        .post_form("/create/", "text=Hello&group=404", Some(&cookie))
        .await;
    assert_eq!(unknown_group.status(), StatusCode::OK);
    assert!(body_text(unknown_group).await.contains("Select a valid choice."));

    assert!(app.store.posts().is_empty());
}

#[tokio::test]
async fn multipart_post_stores_the_image() {
    let app = TestApp::new();
    let author = app.user("leo");
    let cookie = app.login(&author).await;

    let response = app
        .post_multipart(
            "/create/",
            &[
                MultipartPart::Text {
                    name: "text",
                    value: "Post with a picture",
                },
                MultipartPart::Text {
                    name: "group",
                    value: "",
                },
                MultipartPart::File {
                    name: "image",
                    filename: "small.gif",
                    content_type: "image/gif",
                    data: GIF,
                },
            ],
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let posts = app.store.posts();
    let image = posts[0].image.clone().expect("image should be stored");
    assert!(image.starts_with("posts/"));
    assert_eq!(&app.media.read(&image).await.expect("stored file")[..], GIF);

    let media = app.get(&format!("/media/{image}"), None).await;
    assert_eq!(media.status(), StatusCode::OK);
    assert_eq!(
        media.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("image/gif")
    );

    let detail = body_text(app.get(&format!("/posts/{}/", posts[0].id), None).await).await;
    assert!(detail.contains(&format!("/media/{image}")));
}

#[tokio::test]
async fn non_image_uploads_are_rejected() {
    let app = TestApp::new();
    let author = app.user("leo");
    let cookie = app.login(&author).await;

    let response = app
        .post_multipart(
            "/create/",
            &[
                MultipartPart::Text {
                    name: "text",
                    value: "Post with a script",
                },
                MultipartPart::File {
                    name: "image",
                    filename: "notes.txt",
                    content_type: "text/plain",
                    data: b"not an image",
                },
            ],
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(&template_marker("posts/create_post.html")));
    assert!(app.store.posts().is_empty());
}

#[tokio::test]
async fn image_named_uploads_must_decode() {
    let app = TestApp::new();
    let author = app.user("leo");
    let cookie = app.login(&author).await;

    let response = app
        .post_multipart(
            "/create/",
            &[
                MultipartPart::Text {
                    name: "text",
                    value: "Post with a fake picture",
                },
                MultipartPart::File {
                    name: "image",
                    filename: "fake.gif",
                    content_type: "image/gif",
                    data: b"definitely not a gif",
                },
            ],
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains(&template_marker("posts/create_post.html")));
    assert!(body.contains("Upload a valid image."));
    assert!(app.store.posts().is_empty());
}

#[tokio::test]
async fn author_can_edit_own_post() {
    let app = TestApp::new();
    let author = app.user("leo");
    let post = app.store.insert_post(&author, "Original text", None);
    let cookie = app.login(&author).await;

    let form = body_text(app.get(&format!("/posts/{}/edit/", post.id), Some(&cookie)).await).await;
    assert!(form.contains("Original text"));

    let response = app
        .post_form(&format!("/posts/{}/edit/", post.id), "text=Edited+text", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some(format!("/posts/{}/", post.id)));
    assert_eq!(app.store.post(post.id).expect("post").text, "Edited text");
}

#[tokio::test]
async fn non_author_cannot_edit() {
    let app = TestApp::new();
    let author = app.user("leo");
    let intruder = app.user("mallory");
    let post = app.store.insert_post(&author, "Original text", None);
    let cookie = app.login(&intruder).await;

    let edit_path = format!("/posts/{}/edit/", post.id);
    let detail_path = format!("/posts/{}/", post.id);

    let form = app.get(&edit_path, Some(&cookie)).await;
    assert_eq!(form.status(), StatusCode::FOUND);
    assert_eq!(location(&form), Some(detail_path.clone()));

    let submit = app.post_form(&edit_path, "text=Hijacked", Some(&cookie)).await;
    assert_eq!(submit.status(), StatusCode::FOUND);
    assert_eq!(location(&submit), Some(detail_path));
    assert_eq!(app.store.post(post.id).expect("post").text, "Original text");
}

#[tokio::test]
async fn editing_missing_post_is_not_found() {
    let app = TestApp::new();
    let author = app.user("leo");
    let cookie = app.login(&author).await;

    let response = app.get("/posts/12345/edit/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_are_stored_and_blank_ones_ignored() {
    let app = TestApp::new();
    let author = app.user("leo");
    let reader = app.user("mia");
    let post = app.store.insert_post(&author, "Discuss", None);
    let cookie = app.login(&reader).await;
    let comment_path = format!("/posts/{}/comment/", post.id);

    let blank = app.post_form(&comment_path, "text=", Some(&cookie)).await;
    assert_eq!(blank.status(), StatusCode::FOUND);
    assert!(app.store.comments().is_empty());

    let valid = app.post_form(&comment_path, "text=Great+read", Some(&cookie)).await;
    assert_eq!(valid.status(), StatusCode::FOUND);
    assert_eq!(location(&valid), Some(format!("/posts/{}/", post.id)));

    let comments = app.store.comments();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "Great read");
    assert_eq!(comments[0].author_id, reader.id);

    let missing = app.post_form("/posts/999/comment/", "text=Hi", Some(&cookie)).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
