//! In-memory repositories and a router harness for integration tests.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION},
    },
};
use time::{Duration, OffsetDateTime, macros::datetime};
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use yatube::application::{
    authoring::PostService,
    follows::FollowService,
    pagination::{PageWindow, Paginator},
    posts::PostQueryService,
    repos::{
        CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams,
        CreateSessionParams, CreateUserParams, FollowsRepo, GroupsRepo, HealthProbe, PostScope,
        PostsRepo, PostsWriteRepo, RepoError, SessionsRepo, UpdatePostParams, UsersRepo,
    },
    sessions::SessionService,
};
use yatube::cache::{ManualClock, PageCache, PageCacheConfig};
use yatube::config::AuthSettings;
use yatube::domain::entities::{
    AuthorRef, CommentRecord, GroupRecord, GroupRef, PostRecord, SessionRecord, UserRecord,
};
use yatube::infra::http::{HttpState, build_router};

const EPOCH: OffsetDateTime = datetime!(2024-01-01 00:00 UTC);

#[derive(Debug, Clone)]
struct StoredPost {
    id: i64,
    author_id: i64,
    text: String,
    group_id: Option<i64>,
    image: Option<String>,
    created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
struct StoredComment {
    id: i64,
    post_id: i64,
    author_id: i64,
    text: String,
    created_at: OffsetDateTime,
}

#[derive(Default)]
struct StoreState {
    next_id: i64,
    tick: i64,
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<StoredPost>,
    comments: Vec<StoredComment>,
    follows: BTreeSet<(i64, i64)>,
    sessions: Vec<SessionRecord>,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Every write lands one second after the previous one.
    fn next_timestamp(&mut self) -> OffsetDateTime {
        self.tick += 1;
        EPOCH + Duration::seconds(self.tick)
    }

    fn user(&self, id: i64) -> Result<&UserRecord, RepoError> {
        self.users
            .iter()
            .find(|user| user.id == id)
            .ok_or(RepoError::Integrity {
                message: format!("user `{id}` missing"),
            })
    }

    fn materialize(&self, post: &StoredPost) -> Result<PostRecord, RepoError> {
        let author = self.user(post.author_id)?;
        let group = post
            .group_id
            .and_then(|id| self.groups.iter().find(|group| group.id == id))
            .map(|group| GroupRef {
                id: group.id,
                slug: group.slug.clone(),
                title: group.title.clone(),
            });
        Ok(PostRecord {
            id: post.id,
            text: post.text.clone(),
            image: post.image.clone(),
            created_at: post.created_at,
            author: AuthorRef {
                id: author.id,
                username: author.username.clone(),
            },
            group,
        })
    }

    fn in_scope(&self, post: &StoredPost, scope: PostScope) -> bool {
        match scope {
            PostScope::All => true,
            PostScope::Group(group_id) => post.group_id == Some(group_id),
            PostScope::Author(author_id) => post.author_id == author_id,
            PostScope::FollowedBy(user_id) => self.follows.contains(&(user_id, post.author_id)),
        }
    }

    fn scoped_newest_first(&self, scope: PostScope) -> Vec<&StoredPost> {
        let mut posts: Vec<_> = self
            .posts
            .iter()
            .filter(|post| self.in_scope(post, scope))
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        posts
    }
}

/// Repository double backed by plain collections.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    unhealthy: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn add_user(&self, username: &str) -> UserRecord {
        self.create_user(CreateUserParams {
            username: username.to_string(),
        })
        .await
        .expect("user should be created")
    }

    pub async fn add_group(&self, title: &str, slug: &str) -> GroupRecord {
        self.create_group(CreateGroupParams {
            title: title.to_string(),
            slug: slug.to_string(),
            description: format!("{title} description"),
        })
        .await
        .expect("group should be created")
    }

    pub async fn add_post(
        &self,
        author: &UserRecord,
        text: &str,
        group: Option<&GroupRecord>,
    ) -> PostRecord {
        self.create_post(CreatePostParams {
            author_id: author.id,
            text: text.to_string(),
            group_id: group.map(|group| group.id),
            image: None,
        })
        .await
        .expect("post should be created")
    }

    pub async fn post_count(&self) -> usize {
        self.state.lock().await.posts.len()
    }

    pub async fn comment_count(&self) -> usize {
        self.state.lock().await.comments.len()
    }

    pub async fn follow_count(&self) -> usize {
        self.state.lock().await.follows.len()
    }

    pub async fn set_unhealthy(&self, unhealthy: bool) {
        *self.unhealthy.lock().await = unhealthy;
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|u| u.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let user = UserRecord {
            id: state.next_id(),
            username: params.username,
            created_at: state.next_timestamp(),
        };
        state.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl GroupsRepo for MemoryStore {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.state.lock().await.groups.clone();
        groups.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        Ok(groups)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.groups.iter().find(|g| g.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.groups.iter().find(|g| g.id == id).cloned())
    }

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.groups.iter().any(|g| g.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }
        let group = GroupRecord {
            id: state.next_id(),
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        state.groups.push(group.clone());
        Ok(group)
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let state = self.state.lock().await;
        Ok(state.scoped_newest_first(scope).len() as u64)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        window: PageWindow,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        state
            .scoped_newest_first(scope)
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .map(|post| state.materialize(post))
            .collect()
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        state
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| state.materialize(post))
            .transpose()
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        state.user(params.author_id)?;
        let post = StoredPost {
            id: state.next_id(),
            author_id: params.author_id,
            text: params.text,
            group_id: params.group_id,
            image: params.image,
            created_at: state.next_timestamp(),
        };
        state.posts.push(post.clone());
        state.materialize(&post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image = params.image;
        let post = post.clone();
        state.materialize(&post)
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let state = self.state.lock().await;
        state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| {
                let author = state.user(comment.author_id)?;
                Ok(CommentRecord {
                    id: comment.id,
                    post_id: comment.post_id,
                    text: comment.text.clone(),
                    created_at: comment.created_at,
                    author: AuthorRef {
                        id: author.id,
                        username: author.username.clone(),
                    },
                })
            })
            .collect()
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        let author = state.user(params.author_id)?.clone();
        let comment = StoredComment {
            id: state.next_id(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: state.next_timestamp(),
        };
        state.comments.push(comment.clone());
        Ok(CommentRecord {
            id: comment.id,
            post_id: comment.post_id,
            text: comment.text,
            created_at: comment.created_at,
            author: AuthorRef {
                id: author.id,
                username: author.username,
            },
        })
    }
}

#[async_trait]
impl FollowsRepo for MemoryStore {
    async fn insert_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        if user_id == author_id {
            return Err(RepoError::Integrity {
                message: "follows_no_self_follow".to_string(),
            });
        }
        Ok(self.state.lock().await.follows.insert((user_id, author_id)))
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        Ok(self.state.lock().await.follows.remove(&(user_id, author_id)))
    }

    async fn follow_exists(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        Ok(self.state.lock().await.follows.contains(&(user_id, author_id)))
    }

    async fn list_followed(&self, user_id: i64) -> Result<Vec<UserRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut authors: Vec<UserRecord> = state
            .follows
            .iter()
            .filter(|(follower, _)| *follower == user_id)
            .filter_map(|(_, author)| state.users.iter().find(|u| u.id == *author).cloned())
            .collect();
        authors.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(authors)
    }
}

#[async_trait]
impl SessionsRepo for MemoryStore {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let mut state = self.state.lock().await;
        let record = SessionRecord {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            created_at: OffsetDateTime::now_utc(),
            expires_at: params.expires_at,
            revoked_at: None,
        };
        state.sessions.push(record.clone());
        Ok(record)
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<SessionRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.sessions.iter().find(|s| s.prefix == prefix).cloned())
    }

    async fn revoke_session(
        &self,
        prefix: &str,
        revoked_at: OffsetDateTime,
    ) -> Result<SessionRecord, RepoError> {
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.prefix == prefix && s.revoked_at.is_none())
            .ok_or(RepoError::NotFound)?;
        session.revoked_at = Some(revoked_at);
        Ok(session.clone())
    }
}

#[async_trait]
impl HealthProbe for MemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        if *self.unhealthy.lock().await {
            Err(RepoError::Timeout)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

/// Router wired to a [`MemoryStore`] and a manual clock.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub cache: Arc<PageCache>,
    pub sessions: Arc<SessionService>,
    pub posts: Arc<PostQueryService>,
    pub follows: Arc<FollowService>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_page_size(10)
    }

    pub fn with_page_size(page_size: u32) -> Self {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(PageCache::new(
            PageCacheConfig {
                ttl: std::time::Duration::from_secs(20),
                ..Default::default()
            },
            clock.clone(),
        ));

        let users: Arc<dyn UsersRepo> = store.clone();
        let groups: Arc<dyn GroupsRepo> = store.clone();
        let posts_repo: Arc<dyn PostsRepo> = store.clone();
        let writer: Arc<dyn PostsWriteRepo> = store.clone();
        let comments: Arc<dyn CommentsRepo> = store.clone();
        let follows_repo: Arc<dyn FollowsRepo> = store.clone();
        let sessions_repo: Arc<dyn SessionsRepo> = store.clone();
        let health: Arc<dyn HealthProbe> = store.clone();

        let paginator = Paginator::new(
            std::num::NonZeroU32::new(page_size).expect("page size must be positive"),
        );
        let posts = Arc::new(PostQueryService::new(
            users.clone(),
            groups.clone(),
            posts_repo.clone(),
            comments.clone(),
            paginator,
        ));
        let authoring = Arc::new(PostService::new(groups, posts_repo, writer, comments));
        let follows = Arc::new(FollowService::new(users.clone(), follows_repo));
        let sessions = Arc::new(SessionService::new(users, sessions_repo));

        let router = build_router(HttpState {
            posts: posts.clone(),
            authoring,
            follows: follows.clone(),
            sessions: sessions.clone(),
            health,
            page_cache: Some(cache.clone()),
            auth: AuthSettings::default(),
        });

        Self {
            store,
            clock,
            cache,
            sessions,
            posts,
            follows,
            router,
        }
    }

    /// Issue a session for `user` and return the token.
    pub async fn login(&self, user: &UserRecord) -> String {
        self.sessions
            .issue(&user.username, None)
            .await
            .expect("session should be issued")
            .token
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(COOKIE, format!("yatube_session={token}"));
        }
        self.send(builder.body(Body::empty()).expect("request should build"))
            .await
    }

    pub async fn post_form(&self, uri: &str, body: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(token) = token {
            builder = builder.header(COOKIE, format!("yatube_session={token}"));
        }
        self.send(
            builder
                .body(Body::from(body.to_string()))
                .expect("request should build"),
        )
        .await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        TestResponse {
            status,
            location,
            body: String::from_utf8(bytes.to_vec()).expect("body should be utf-8"),
        }
    }
}

/// Number of rendered post cards in an HTML listing.
pub fn post_cards(body: &str) -> usize {
    body.matches("<article class=\"post\">").count()
}
