use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;

use crate::{
    application::{
        authoring::PostService,
        error::HttpError,
        follows::FollowService,
        pagination::PageNumber,
        posts::PostQueryService,
        repos::HealthProbe,
        sessions::SessionService,
        viewer::Viewer,
    },
    cache::{PageCache, page_cache_layer},
    config::AuthSettings,
    presentation::views::{
        GroupPageView, GroupTemplate, IndexTemplate, IndexView, LayoutChrome, LayoutContext,
        ListingView, PostDetailTemplate, PostDetailView, ProfileTemplate, ProfileView,
        render_not_found_response, render_template_response,
    },
};

use super::{
    authoring, db_health_response, follows,
    middleware::{log_responses, resolve_viewer, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub posts: Arc<PostQueryService>,
    pub authoring: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub sessions: Arc<SessionService>,
    pub health: Arc<dyn HealthProbe>,
    pub page_cache: Option<Arc<PageCache>>,
    pub auth: AuthSettings,
}

pub fn build_router(state: HttpState) -> Router {
    // Only the index is viewer-independent enough to share between visitors.
    let cached_routes = Router::new().route("/", get(index));
    let cached_routes = if let Some(cache) = state.page_cache.clone() {
        cached_routes.layer(middleware::from_fn_with_state(cache, page_cache_layer))
    } else {
        cached_routes
    };

    let routes = Router::new()
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route("/profile/{username}/follow/", get(follows::profile_follow))
        .route("/profile/{username}/unfollow/", get(follows::profile_unfollow))
        .route("/follow/", get(follows::follow_index))
        .route("/posts/{post_id}/", get(post_detail))
        .route(
            "/posts/{post_id}/edit/",
            get(authoring::edit_form).post(authoring::edit_submit),
        )
        .route("/posts/{post_id}/comment/", post(authoring::add_comment))
        .route(
            "/create/",
            get(authoring::create_form).post(authoring::create_submit),
        )
        .route("/_health/db", get(public_health))
        .fallback(fallback);

    cached_routes
        .merge(routes)
        .layer(middleware::from_fn_with_state(state.clone(), resolve_viewer))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    pub(super) fn number(&self) -> PageNumber {
        PageNumber::from_query(self.page.as_deref())
    }
}

/// Post ids that do not parse cannot name a post, so they are a 404 like any
/// other unknown id.
pub(super) fn parse_post_id(raw: &str) -> Result<i64, HttpError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            HttpError::not_found(
                "infra::http::public::parse_post_id",
                format!("`{raw}` is not a post id"),
            )
        })
}

async fn index(State(state): State<HttpState>, Query(query): Query<PageQuery>) -> Response {
    match state.posts.list_all(query.number()).await {
        Ok(page) => {
            let content = IndexView {
                listing: ListingView::new(&page, "/", "No posts yet."),
            };
            let view = LayoutContext::new(LayoutChrome::site(""), content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn group_posts(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.posts.list_by_group(&slug, query.number()).await {
        Ok(listing) => {
            let content = GroupPageView::new(&listing.group, &listing.page);
            let view = LayoutContext::new(LayoutChrome::site(&listing.group.title), content);
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn profile(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let listing = match state.posts.list_by_author(&username, query.number()).await {
        Ok(listing) => listing,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let following = match viewer.user() {
        Some(user) if user.id != listing.author.id => {
            match state.follows.is_following(user, &listing.author).await {
                Ok(flag) => Some(flag),
                Err(err) => return HttpError::from(err).into_response(),
            }
        }
        _ => None,
    };

    let content = ProfileView::new(&listing.author, &listing.page, following);
    let view = LayoutContext::new(LayoutChrome::site(&listing.author.username), content);
    render_template_response(ProfileTemplate { view }, StatusCode::OK)
}

async fn post_detail(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(raw_id): Path<String>,
) -> Response {
    let post_id = match parse_post_id(&raw_id) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match state.posts.post_detail(post_id).await {
        Ok(detail) => {
            let content = PostDetailView::new(&detail.post, &detail.comments, viewer.user());
            render_post_detail(content)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) fn render_post_detail(content: PostDetailView) -> Response {
    let title = content.post.text.chars().take(30).collect::<String>();
    let view = LayoutContext::new(LayoutChrome::site(&title), content);
    render_template_response(PostDetailTemplate { view }, StatusCode::OK)
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn fallback() -> Response {
    render_not_found_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_post_ids_are_not_found() {
        assert_eq!(parse_post_id("12").ok(), Some(12));
        for raw in ["abc", "0", "-4", ""] {
            let err = parse_post_id(raw).unwrap_err();
            assert_eq!(err.status(), StatusCode::NOT_FOUND, "{raw}");
        }
    }
}
