//! Follow graph routes and the personal feed.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::{
    application::{error::HttpError, follows::FollowError},
    presentation::views::{
        FeedTemplate, FeedView, LayoutChrome, LayoutContext, render_template_response,
    },
};

use super::{CurrentUser, HttpState, found, profile_location, public::PageQuery};

pub(super) async fn follow_index(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = match state.posts.list_feed(&user, query.number()).await {
        Ok(page) => page,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let followed = match state.follows.followed_authors(&user).await {
        Ok(followed) => followed,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let content = FeedView::new(&followed, &page);
    let view = LayoutContext::new(LayoutChrome::site("Following"), content);
    render_template_response(FeedTemplate { view }, StatusCode::OK)
}

pub(super) async fn profile_follow(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Response {
    let author = match state.follows.find_author(&username).await {
        Ok(author) => author,
        Err(err) => return HttpError::from(err).into_response(),
    };

    match state.follows.follow(&user, &author).await {
        Ok(outcome) => {
            debug!(target = "yatube::http::follows", author = author.id, ?outcome, "follow");
        }
        Err(FollowError::Rejected(reason)) => {
            debug!(target = "yatube::http::follows", reason = %reason, "follow refused");
        }
        Err(err) => return HttpError::from(err).into_response(),
    }

    found(&profile_location(&author.username))
}

pub(super) async fn profile_unfollow(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Response {
    let author = match state.follows.find_author(&username).await {
        Ok(author) => author,
        Err(err) => return HttpError::from(err).into_response(),
    };

    match state.follows.unfollow(&user, &author).await {
        Ok(outcome) => {
            debug!(target = "yatube::http::follows", author = author.id, ?outcome, "unfollow");
            found(&profile_location(&author.username))
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}
