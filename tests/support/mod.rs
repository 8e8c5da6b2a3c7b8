//! In-memory repositories and a router harness for the HTTP tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime, macros::datetime};
use tower::ServiceExt;
use yatube::{
    application::{
        accounts::{AccountService, hash_password},
        feed::FeedService,
        follows::FollowService,
        pagination::Paginator,
        posts::PostService,
        repos::{
            CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams,
            CreateUserParams, FollowsRepo, GroupsRepo, HealthRepo, PostScope, PostsRepo,
            RepoError, RepositorySet, SessionsRepo, UpdatePostParams, UsersRepo,
        },
    },
    cache::{PageCache, PageCacheConfig},
    domain::entities::{
        AuthorRef, CommentEntry, CommentRecord, FollowRecord, GroupRecord, GroupRef, PostEntry,
        PostRecord, SessionRecord, UserRecord,
    },
    infra::{
        http::{AdminState, HttpState, SessionCookie, build_admin_router, build_router},
        uploads::MediaStorage,
    },
};

pub const SESSION_COOKIE: &str = "sessionid";
pub const PASSWORD: &str = "correct-horse-battery";

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    follows: Vec<FollowRecord>,
    sessions: Vec<SessionRecord>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn author_ref(&self, author_id: i64) -> Option<AuthorRef> {
        self.users.iter().find(|user| user.id == author_id).map(|user| AuthorRef {
            id: user.id,
            username: user.username.clone(),
            full_name: user.display_name(),
        })
    }

    fn entry(&self, post: &PostRecord) -> Option<PostEntry> {
        let author = self.author_ref(post.author_id)?;
        let group = post.group_id.and_then(|group_id| {
            self.groups.iter().find(|group| group.id == group_id).map(|group| GroupRef {
                id: group.id,
                slug: group.slug.clone(),
                title: group.title.clone(),
            })
        });
        Some(PostEntry {
            post: post.clone(),
            author,
            group,
        })
    }

    fn in_scope(&self, post: &PostRecord, scope: PostScope) -> bool {
        match scope {
            PostScope::All => true,
            PostScope::Group(group_id) => post.group_id == Some(group_id),
            PostScope::Author(author_id) => post.author_id == author_id,
            PostScope::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|follow| follow.user_id == user_id && follow.author_id == post.author_id),
        }
    }
}

/// Every repository trait over one mutex-guarded state.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    pub healthy: Mutex<bool>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory store poisoned")
    }

    /// Posts get strictly increasing timestamps so ordering is deterministic.
    fn timestamp(id: i64) -> OffsetDateTime {
        datetime!(2024-01-01 00:00 UTC) + Duration::minutes(id)
    }

    pub fn insert_user(&self, username: &str, password_hash: &str) -> UserRecord {
        let mut state = self.lock();
        let id = state.next_id();
        let user = UserRecord {
            id,
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password_hash: password_hash.to_string(),
            created_at: Self::timestamp(id),
        };
        state.users.push(user.clone());
        user
    }

    pub fn insert_group(&self, title: &str, slug: &str) -> GroupRecord {
        let mut state = self.lock();
        let id = state.next_id();
        let group = GroupRecord {
            id,
            title: title.to_string(),
            slug: slug.to_string(),
            description: format!("About {title}"),
        };
        state.groups.push(group.clone());
        group
    }

    pub fn insert_post(&self, author: &UserRecord, text: &str, group: Option<&GroupRecord>) -> PostRecord {
        let mut state = self.lock();
        let id = state.next_id();
        let post = PostRecord {
            id,
            author_id: author.id,
            group_id: group.map(|group| group.id),
            text: text.to_string(),
            image: None,
            created_at: Self::timestamp(id),
        };
        state.posts.push(post.clone());
        post
    }

    pub fn post(&self, id: i64) -> Option<PostRecord> {
        self.lock().posts.iter().find(|post| post.id == id).cloned()
    }

    /// Remove a post and its comments, as the database cascade does.
    pub fn delete_post(&self, id: i64) {
        let mut state = self.lock();
        state.posts.retain(|post| post.id != id);
        state.comments.retain(|comment| comment.post_id != id);
    }

    pub fn posts(&self) -> Vec<PostRecord> {
        self.lock().posts.clone()
    }

    pub fn comments(&self) -> Vec<CommentRecord> {
        self.lock().comments.clone()
    }

    pub fn follows(&self) -> Vec<FollowRecord> {
        self.lock().follows.clone()
    }

    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock().expect("health flag poisoned") = healthy;
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let state = self.lock();
        Ok(state.posts.iter().filter(|post| state.in_scope(post, scope)).count() as u64)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostEntry>, RepoError> {
        let state = self.lock();
        let mut posts: Vec<&PostRecord> = state
            .posts
            .iter()
            .filter(|post| state.in_scope(post, scope))
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .filter_map(|post| state.entry(post))
            .collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostEntry>, RepoError> {
        let state = self.lock();
        Ok(state
            .posts
            .iter()
            .find(|post| post.id == id)
            .and_then(|post| state.entry(post)))
    }

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.lock();
        let id = state.next_id();
        let post = PostRecord {
            id,
            author_id: params.author_id,
            group_id: params.group_id,
            text: params.text,
            image: params.image,
            created_at: Self::timestamp(id),
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.lock();
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.group_id = params.group_id;
        post.text = params.text;
        post.image = params.image;
        Ok(post.clone())
    }
}

#[async_trait]
impl GroupsRepo for MemoryStore {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.lock().groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn find_group(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self.lock().groups.iter().find(|group| group.id == id).cloned())
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self.lock().groups.iter().find(|group| group.slug == slug).cloned())
    }

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.lock();
        if state.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "post_groups_slug_key".to_string(),
            });
        }
        let id = state.next_id();
        let group = GroupRecord {
            id,
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        state.groups.push(group.clone());
        Ok(group)
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentEntry>, RepoError> {
        let state = self.lock();
        Ok(state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .filter_map(|comment| {
                state.author_ref(comment.author_id).map(|author| CommentEntry {
                    comment: comment.clone(),
                    author,
                })
            })
            .collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.lock();
        let id = state.next_id();
        let comment = CommentRecord {
            id,
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: Self::timestamp(id),
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FollowsRepo for MemoryStore {
    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        Ok(self
            .lock()
            .follows
            .iter()
            .any(|follow| follow.user_id == user_id && follow.author_id == author_id))
    }

    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        if user_id == author_id {
            return Err(RepoError::Integrity {
                message: "follows_no_self_follow".to_string(),
            });
        }
        let mut state = self.lock();
        if state
            .follows
            .iter()
            .any(|follow| follow.user_id == user_id && follow.author_id == author_id)
        {
            return Ok(false);
        }
        let id = state.next_id();
        state.follows.push(FollowRecord {
            id,
            user_id,
            author_id,
        });
        Ok(true)
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut state = self.lock();
        let before = state.follows.len();
        state
            .follows
            .retain(|follow| !(follow.user_id == user_id && follow.author_id == author_id));
        Ok(state.follows.len() != before)
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.lock().users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.lock();
        if state.users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let id = state.next_id();
        let user = UserRecord {
            id,
            username: params.username,
            first_name: params.first_name,
            last_name: params.last_name,
            email: params.email,
            password_hash: params.password_hash,
            created_at: Self::timestamp(id),
        };
        state.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl SessionsRepo for MemoryStore {
    async fn create_session(&self, session: SessionRecord) -> Result<(), RepoError> {
        self.lock().sessions.push(session);
        Ok(())
    }

    async fn find_session_user(
        &self,
        token_hash: &[u8],
        now: OffsetDateTime,
    ) -> Result<Option<UserRecord>, RepoError> {
        let state = self.lock();
        let Some(session) = state
            .sessions
            .iter()
            .find(|session| session.token_hash == token_hash && session.expires_at > now)
        else {
            return Ok(None);
        };
        Ok(state.users.iter().find(|user| user.id == session.user_id).cloned())
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<(), RepoError> {
        self.lock()
            .sessions
            .retain(|session| session.token_hash != token_hash);
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        if *self.healthy.lock().expect("health flag poisoned") {
            Ok(())
        } else {
            Err(RepoError::Timeout)
        }
    }
}

/// Public and admin routers over a fresh in-memory store.
pub struct TestApp {
    pub router: Router,
    pub admin: Router,
    pub store: Arc<MemoryStore>,
    pub accounts: Arc<AccountService>,
    pub cache: Arc<PageCache>,
    pub media: Arc<MediaStorage>,
    _media_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_cache(PageCacheConfig::default())
    }

    pub fn with_cache(cache_config: PageCacheConfig) -> Self {
        let store = Arc::new(MemoryStore::default());
        store.set_healthy(true);
        let repos = RepositorySet::from_shared(store.clone());

        let media_dir = tempfile::tempdir().expect("media tempdir");
        let media =
            Arc::new(MediaStorage::new(media_dir.path().to_path_buf()).expect("media storage"));
        let cache = Arc::new(PageCache::new(cache_config));
        let accounts = Arc::new(AccountService::new(
            repos.users.clone(),
            repos.sessions.clone(),
            Duration::days(14),
        ));

        let http_state = HttpState {
            feed: Arc::new(FeedService::new(
                repos.posts.clone(),
                repos.groups.clone(),
                repos.users.clone(),
                repos.follows.clone(),
                Paginator::default(),
            )),
            posts: Arc::new(PostService::new(
                repos.posts.clone(),
                repos.groups.clone(),
                repos.comments.clone(),
            )),
            follows: Arc::new(FollowService::new(
                repos.follows.clone(),
                repos.users.clone(),
            )),
            accounts: accounts.clone(),
            health: repos.health.clone(),
            media: media.clone(),
            page_cache: Some(cache.clone()),
            session_cookie: SessionCookie {
                name: SESSION_COOKIE.to_string(),
                secure: false,
            },
            body_limit_bytes: 5 * 1024 * 1024,
        };
        let admin_state = AdminState {
            health: repos.health.clone(),
            page_cache: Some(cache.clone()),
        };

        Self {
            router: build_router(http_state),
            admin: build_admin_router(admin_state),
            store,
            accounts,
            cache,
            media,
            _media_dir: media_dir,
        }
    }

    /// A user without a usable password; sign in with [`TestApp::login`].
    pub fn user(&self, username: &str) -> UserRecord {
        self.store.insert_user(username, "!")
    }

    /// A user whose password is [`PASSWORD`].
    pub fn user_with_password(&self, username: &str) -> UserRecord {
        let hash = hash_password(PASSWORD).expect("hash password");
        self.store.insert_user(username, &hash)
    }

    /// `Cookie` header value for a fresh session of `user`.
    pub async fn login(&self, user: &UserRecord) -> String {
        let session = self
            .accounts
            .start_session(user.id)
            .await
            .expect("start session");
        format!("{SESSION_COOKIE}={}", session.token)
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::empty()).expect("request should build");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond")
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .expect("request should build");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond")
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        parts: &[MultipartPart<'_>],
        cookie: Option<&str>,
    ) -> Response<Body> {
        const BOUNDARY: &str = "yatube-test-boundary";
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                MultipartPart::Text { name, value } => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                MultipartPart::File {
                    name,
                    filename,
                    content_type,
                    data,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder().method("POST").uri(uri).header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::from(body)).expect("request should build");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond")
    }

    pub async fn admin_request(&self, method: &str, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request should build");
        self.admin
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond")
    }
}

pub enum MultipartPart<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("body should be utf-8")
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Template marker rendered by every page.
pub fn template_marker(name: &str) -> String {
    format!("data-template=\"{name}\"")
}

/// Number of post cards on a rendered listing.
pub fn card_count(html: &str) -> usize {
    html.matches("class=\"post-card\"").count()
}
