use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::application::error::{ErrorReport, HttpError};
use crate::application::forms::FieldErrors;
use crate::application::pagination::Page;
use crate::application::posts::PostFormState;
use crate::domain::entities::{CommentEntry, GroupRecord, PostEntry, UserRecord};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:short] [year]");
const SITE_NAME: &str = "Yatube";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(viewer: Option<&UserRecord>) -> Response {
    let view = LayoutContext::new(viewer, "Page not found", ErrorPageView::not_found());
    let mut response = render_template_response(NotFoundTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Signed-in user shown in the header.
#[derive(Clone, Default)]
pub struct ViewerNav {
    pub signed_in: bool,
    pub username: String,
    pub full_name: String,
}

impl ViewerNav {
    pub fn from_user(user: Option<&UserRecord>) -> Self {
        match user {
            Some(user) => Self {
                signed_in: true,
                username: user.username.clone(),
                full_name: user.display_name(),
            },
            None => Self::default(),
        }
    }
}

pub struct LayoutContext<T> {
    pub site_name: &'static str,
    pub title: String,
    pub viewer: ViewerNav,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(viewer: Option<&UserRecord>, title: impl Into<String>, content: T) -> Self {
        Self {
            site_name: SITE_NAME,
            title: title.into(),
            viewer: ViewerNav::from_user(viewer),
            content,
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub author_username: String,
    pub author_name: String,
    pub published: String,
    pub has_group: bool,
    pub group_slug: String,
    pub group_title: String,
    pub has_image: bool,
    pub image_url: String,
}

impl From<&PostEntry> for PostCard {
    fn from(entry: &PostEntry) -> Self {
        let (has_group, group_slug, group_title) = match &entry.group {
            Some(group) => (true, group.slug.clone(), group.title.clone()),
            None => (false, String::new(), String::new()),
        };
        let image_url = entry
            .post
            .image
            .as_deref()
            .map(media_url)
            .unwrap_or_default();
        Self {
            id: entry.post.id,
            text: entry.post.text.clone(),
            author_username: entry.author.username.clone(),
            author_name: entry.author.full_name.clone(),
            published: format_date(entry.post.created_at),
            has_group,
            group_slug,
            group_title,
            has_image: !image_url.is_empty(),
            image_url,
        }
    }
}

#[derive(Clone)]
pub struct PaginatorView {
    /// More than one page exists.
    pub show: bool,
    pub number: u32,
    pub num_pages: u32,
    pub has_previous: bool,
    pub previous: u32,
    pub has_next: bool,
    pub next: u32,
    pub pages: Vec<PageLink>,
}

#[derive(Clone)]
pub struct PageLink {
    pub number: u32,
    pub current: bool,
}

impl<T> From<&Page<T>> for PaginatorView {
    fn from(page: &Page<T>) -> Self {
        Self {
            show: page.num_pages > 1,
            number: page.number,
            num_pages: page.num_pages,
            has_previous: page.has_previous(),
            previous: page.previous_number().unwrap_or(1),
            has_next: page.has_next(),
            next: page.next_number().unwrap_or(page.num_pages),
            pages: (1..=page.num_pages)
                .map(|number| PageLink {
                    number,
                    current: number == page.number,
                })
                .collect(),
        }
    }
}

#[derive(Clone)]
pub struct FeedView {
    pub cards: Vec<PostCard>,
    pub paginator: PaginatorView,
}

impl From<&Page<PostEntry>> for FeedView {
    fn from(page: &Page<PostEntry>) -> Self {
        Self {
            cards: page.items.iter().map(PostCard::from).collect(),
            paginator: PaginatorView::from(page),
        }
    }
}

/// Plain listing: the main feed and the follow feed.
pub struct ListingView {
    pub feed: FeedView,
}

pub struct GroupFeedView {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub feed: FeedView,
}

pub struct ProfileView {
    pub username: String,
    pub full_name: String,
    pub post_count: u64,
    pub can_follow: bool,
    pub following: bool,
    pub feed: FeedView,
}

pub struct CommentView {
    pub author_username: String,
    pub author_name: String,
    pub text: String,
    pub published: String,
}

impl From<&CommentEntry> for CommentView {
    fn from(entry: &CommentEntry) -> Self {
        Self {
            author_username: entry.author.username.clone(),
            author_name: entry.author.full_name.clone(),
            text: entry.comment.text.clone(),
            published: format_date(entry.comment.created_at),
        }
    }
}

pub struct PostDetailView {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub can_comment: bool,
}

pub struct GroupOption {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

pub struct PostFormView {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub no_group_selected: bool,
    pub has_image: bool,
    pub image_url: String,
    pub text_errors: Vec<String>,
    pub group_errors: Vec<String>,
    pub image_errors: Vec<String>,
    pub form_errors: Vec<String>,
}

impl PostFormView {
    /// `editing` carries the post id and its current image, if any.
    pub fn new(
        state: &PostFormState,
        groups: &[GroupRecord],
        editing: Option<(i64, Option<&str>)>,
    ) -> Self {
        let selected = state
            .group
            .as_deref()
            .map(str::trim)
            .and_then(|value| value.parse::<i64>().ok());
        let (is_edit, action, image) = match editing {
            Some((id, image)) => (true, format!("/posts/{id}/edit/"), image),
            None => (false, "/create/".to_string(), None),
        };
        let image_url = image.map(media_url).unwrap_or_default();
        Self {
            is_edit,
            action,
            text: state.text.clone(),
            groups: groups
                .iter()
                .map(|group| GroupOption {
                    id: group.id,
                    title: group.title.clone(),
                    selected: Some(group.id) == selected,
                })
                .collect(),
            no_group_selected: selected.is_none(),
            has_image: !image_url.is_empty(),
            image_url,
            text_errors: state.errors.for_field("text"),
            group_errors: state.errors.for_field("group"),
            image_errors: state.errors.for_field("image"),
            form_errors: state.errors.non_field(),
        }
    }
}

pub struct LoginView {
    pub username: String,
    pub next: String,
    pub invalid: bool,
}

#[derive(Default)]
pub struct SignupView {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username_errors: Vec<String>,
    pub email_errors: Vec<String>,
    pub password_errors: Vec<String>,
}

impl SignupView {
    pub fn new(
        username: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
        errors: &FieldErrors,
    ) -> Self {
        Self {
            username: username.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            username_errors: errors.for_field("username"),
            email_errors: errors.for_field("email"),
            password_errors: errors.for_field("password2"),
        }
    }
}

pub struct ErrorPageView {
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            message: "The page you requested does not exist.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<ListingView>,
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupListTemplate {
    pub view: LayoutContext<GroupFeedView>,
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<ListingView>,
}

#[derive(Template)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}

#[derive(Template)]
#[template(path = "users/signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupView>,
}

#[derive(Template)]
#[template(path = "users/logged_out.html")]
pub struct LoggedOutTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "core/404.html")]
pub struct NotFoundTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub fn media_url(stored_path: &str) -> String {
    format!("/media/{stored_path}")
}

pub fn format_date(value: OffsetDateTime) -> String {
    value
        .format(DATE_FORMAT)
        .unwrap_or_else(|_| value.date().to_string())
}

/// First 30 characters of a post, used as the detail page title.
pub fn post_title(text: &str) -> String {
    text.chars().take(30).collect()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn dates_render_day_month_year() {
        assert_eq!(format_date(datetime!(2024-03-07 10:00 UTC)), "07 Mar 2024");
    }

    #[test]
    fn post_titles_are_truncated_by_character() {
        assert_eq!(post_title("short"), "short");
        assert_eq!(post_title(&"я".repeat(40)).chars().count(), 30);
    }

    #[test]
    fn paginator_view_tracks_neighbours() {
        let paginator = crate::application::pagination::Paginator::default();
        let page = Page::new(paginator.window(25, Some("2")), vec![(); 10]);
        let view = PaginatorView::from(&page);
        assert!(view.show);
        assert_eq!((view.previous, view.number, view.next), (1, 2, 3));
        let numbers: Vec<u32> = view.pages.iter().map(|link| link.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(view.pages[1].current);
    }
}
