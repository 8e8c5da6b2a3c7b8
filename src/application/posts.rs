//! Write side of posts and comments.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::application::forms::FieldErrors;
use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostScope, PostsRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentEntry, CommentRecord, GroupRecord, PostEntry, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::posts::{self as rules, INVALID_GROUP_MESSAGE};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// File field of a post form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Raw post form fields as submitted.
#[derive(Debug, Clone, Default)]
pub struct PostSubmission {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<ImageUpload>,
}

/// Values to re-render a post form with.
#[derive(Debug, Clone, Default)]
pub struct PostFormState {
    pub text: String,
    pub group: Option<String>,
    pub errors: FieldErrors,
}

#[derive(Debug, Clone)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ValidatedPost {
    pub draft: PostDraft,
    pub image: Option<ImageUpload>,
}

#[derive(Debug)]
pub enum ValidationOutcome {
    Valid(ValidatedPost),
    Invalid(PostFormState),
}

#[derive(Debug)]
pub enum EditAccess {
    Owner(PostEntry),
    NotOwner(PostEntry),
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub entry: PostEntry,
    pub comments: Vec<CommentEntry>,
    pub author_post_count: u64,
}

#[derive(Debug)]
pub enum CommentOutcome {
    Added(CommentRecord),
    Rejected(DomainError),
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        Self {
            posts,
            groups,
            comments,
        }
    }

    pub async fn group_choices(&self) -> Result<Vec<GroupRecord>, RepoError> {
        self.groups.list_groups().await
    }

    /// Check a submission. Every field is validated so the form shows all problems at once.
    pub async fn validate(
        &self,
        submission: PostSubmission,
    ) -> Result<ValidationOutcome, RepoError> {
        let mut errors = FieldErrors::default();

        let text = match rules::normalize_post_text(&submission.text) {
            Ok(text) => Some(text),
            Err(err) => {
                errors.push_domain(&err);
                None
            }
        };

        let group_id = match rules::parse_group_choice(submission.group.as_deref()) {
            Ok(Some(id)) => {
                if self.groups.find_group(id).await?.is_some() {
                    Some(id)
                } else {
                    errors.push("group", INVALID_GROUP_MESSAGE);
                    None
                }
            }
            Ok(None) => None,
            Err(err) => {
                errors.push_domain(&err);
                None
            }
        };

        if let Some(image) = &submission.image
            && let Err(err) = rules::check_image(
                &image.filename,
                image.content_type.as_deref(),
                &image.data,
            )
        {
            errors.push_domain(&err);
        }

        match text {
            Some(text) if errors.is_empty() => Ok(ValidationOutcome::Valid(ValidatedPost {
                draft: PostDraft { text, group_id },
                image: submission.image,
            })),
            _ => Ok(ValidationOutcome::Invalid(PostFormState {
                text: submission.text,
                group: submission.group,
                errors,
            })),
        }
    }

    pub async fn create(
        &self,
        author_id: i64,
        draft: PostDraft,
        image: Option<String>,
    ) -> Result<PostRecord, RepoError> {
        let post = self
            .posts
            .create_post(CreatePostParams {
                author_id,
                group_id: draft.group_id,
                text: draft.text,
                image,
            })
            .await?;
        tracing::info!(
            target = "yatube::application::posts",
            post_id = post.id,
            author_id,
            "post created"
        );
        Ok(post)
    }

    pub async fn authorize_edit(&self, post_id: i64, user_id: i64) -> Result<EditAccess, PostError> {
        let entry = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(PostError::NotFound)?;
        if entry.post.author_id == user_id {
            Ok(EditAccess::Owner(entry))
        } else {
            Ok(EditAccess::NotOwner(entry))
        }
    }

    /// Form values for an existing post.
    pub fn edit_form(entry: &PostEntry) -> PostFormState {
        PostFormState {
            text: entry.post.text.clone(),
            group: entry.post.group_id.map(|id| id.to_string()),
            errors: FieldErrors::default(),
        }
    }

    /// Apply an edit. Without a new upload the stored image is kept.
    pub async fn update(
        &self,
        existing: &PostEntry,
        draft: PostDraft,
        image: Option<String>,
    ) -> Result<PostRecord, RepoError> {
        let image = image.or_else(|| existing.post.image.clone());
        let post = self
            .posts
            .update_post(UpdatePostParams {
                id: existing.post.id,
                group_id: draft.group_id,
                text: draft.text,
                image,
            })
            .await?;
        tracing::info!(
            target = "yatube::application::posts",
            post_id = post.id,
            "post updated"
        );
        Ok(post)
    }

    pub async fn detail(&self, post_id: i64) -> Result<PostDetail, PostError> {
        let entry = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(PostError::NotFound)?;
        let comments = self.comments.list_comments(post_id).await?;
        let author_post_count = self
            .posts
            .count_posts(PostScope::Author(entry.post.author_id))
            .await?;
        Ok(PostDetail {
            entry,
            comments,
            author_post_count,
        })
    }

    pub async fn add_comment(
        &self,
        post_id: i64,
        author_id: i64,
        raw_text: &str,
    ) -> Result<CommentOutcome, PostError> {
        if self.posts.find_post(post_id).await?.is_none() {
            return Err(PostError::NotFound);
        }
        let text = match rules::normalize_comment_text(raw_text) {
            Ok(text) => text,
            Err(err) => return Ok(CommentOutcome::Rejected(err)),
        };
        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id,
                text,
            })
            .await?;
        Ok(CommentOutcome::Added(comment))
    }
}
