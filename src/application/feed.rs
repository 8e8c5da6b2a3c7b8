use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::{Page, Paginator};
use crate::application::repos::{FollowsRepo, GroupsRepo, PostScope, PostsRepo, RepoError, UsersRepo};
use crate::domain::entities::{GroupRecord, PostEntry, UserRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group")]
    UnknownGroup,
    #[error("unknown author")]
    UnknownAuthor,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<PostEntry>,
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: UserRecord,
    pub page: Page<PostEntry>,
    /// Whether the signed-in viewer follows this author.
    pub following: bool,
    /// Whether follow controls apply (signed in and not the author).
    pub can_follow: bool,
}

impl ProfileFeed {
    pub fn post_count(&self) -> u64 {
        self.page.total
    }
}

/// Read side of every paginated post listing.
#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
        paginator: Paginator,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
            paginator,
        }
    }

    pub async fn index(&self, page: Option<&str>) -> Result<Page<PostEntry>, FeedError> {
        self.load(PostScope::All, page).await
    }

    pub async fn group_feed(&self, slug: &str, page: Option<&str>) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or(FeedError::UnknownGroup)?;
        let page = self.load(PostScope::Group(group.id), page).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<&UserRecord>,
        page: Option<&str>,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or(FeedError::UnknownAuthor)?;
        let page = self.load(PostScope::Author(author.id), page).await?;

        let (following, can_follow) = match viewer {
            Some(viewer) if viewer.id != author.id => {
                (self.follows.is_following(viewer.id, author.id).await?, true)
            }
            _ => (false, false),
        };

        Ok(ProfileFeed {
            author,
            page,
            following,
            can_follow,
        })
    }

    /// Posts from the authors `user_id` follows.
    pub async fn follow_feed(
        &self,
        user_id: i64,
        page: Option<&str>,
    ) -> Result<Page<PostEntry>, FeedError> {
        self.load(PostScope::FollowedBy(user_id), page).await
    }

    async fn load(&self, scope: PostScope, page: Option<&str>) -> Result<Page<PostEntry>, FeedError> {
        let total = self.posts.count_posts(scope).await?;
        let window = self.paginator.window(total, page);
        let items = self
            .posts
            .list_posts(scope, window.limit, window.offset)
            .await?;
        Ok(Page::new(window, items))
    }
}
