//! Form handlers for writing posts and comments.

use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    application::{authoring::PostWriteError, error::HttpError},
    domain::{
        entities::{PostRecord, UserRecord},
        posts::{CommentInput, FieldErrors, PostInput},
    },
    presentation::views::{
        LayoutChrome, LayoutContext, PostDetailView, PostFormTemplate, PostFormValues,
        PostFormView, post_href, render_template_response,
    },
};

use super::{
    CurrentUser, HttpState, found, profile_location,
    public::{parse_post_id, render_post_detail},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PostForm {
    text: String,
    group: String,
    image: String,
}

impl PostForm {
    fn parse(&self) -> Result<PostInput, FieldErrors> {
        PostInput::parse(&self.text, Some(&self.group), Some(&self.image))
    }

    fn into_values(self) -> PostFormValues {
        PostFormValues {
            text: self.text,
            group: self.group,
            image: self.image,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentForm {
    text: String,
}

enum FormTarget {
    Create,
    Edit(i64),
}

pub(super) async fn create_form(
    State(state): State<HttpState>,
    CurrentUser(_user): CurrentUser,
) -> Response {
    render_post_form(&state, FormTarget::Create, PostFormValues::default(), None).await
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<PostForm>,
) -> Response {
    let input = match form.parse() {
        Ok(input) => input,
        Err(errors) => {
            return render_post_form(&state, FormTarget::Create, form.into_values(), Some(errors))
                .await;
        }
    };

    match state.authoring.create_post(&user, input).await {
        Ok(_) => found(&profile_location(&user.username)),
        Err(PostWriteError::Invalid(errors)) => {
            render_post_form(&state, FormTarget::Create, form.into_values(), Some(errors)).await
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
) -> Response {
    let post = match load_editable(&state, &user, &raw_id).await {
        Ok(post) => post,
        Err(response) => return response,
    };

    let values = PostFormValues::from_record(&post);
    render_post_form(&state, FormTarget::Edit(post.id), values, None).await
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
    Form(form): Form<PostForm>,
) -> Response {
    let post = match load_editable(&state, &user, &raw_id).await {
        Ok(post) => post,
        Err(response) => return response,
    };

    let input = match form.parse() {
        Ok(input) => input,
        Err(errors) => {
            return render_post_form(
                &state,
                FormTarget::Edit(post.id),
                form.into_values(),
                Some(errors),
            )
            .await;
        }
    };

    match state.authoring.edit_post(&user, post.id, input).await {
        Ok(updated) => found(&post_href(updated.id)),
        Err(PostWriteError::Invalid(errors)) => {
            render_post_form(
                &state,
                FormTarget::Edit(post.id),
                form.into_values(),
                Some(errors),
            )
            .await
        }
        Err(PostWriteError::NotAuthor { post_id, .. }) => found(&post_href(post_id)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let post_id = match parse_post_id(&raw_id) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    let input = match CommentInput::parse(&form.text) {
        Ok(input) => input,
        Err(errors) => {
            debug!(target = "yatube::http::comments", post_id, "comment rejected");
            return match state.posts.post_detail(post_id).await {
                Ok(detail) => render_post_detail(
                    PostDetailView::new(&detail.post, &detail.comments, Some(&user))
                        .with_comment_errors(&form.text, &errors),
                ),
                Err(err) => HttpError::from(err).into_response(),
            };
        }
    };

    match state.authoring.add_comment(&user, post_id, input).await {
        Ok(_) => found(&post_href(post_id)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

/// Load a post its author may edit. Anyone else is sent back to the post.
async fn load_editable(
    state: &HttpState,
    user: &UserRecord,
    raw_id: &str,
) -> Result<PostRecord, Response> {
    let post_id = parse_post_id(raw_id).map_err(IntoResponse::into_response)?;

    match state.authoring.ensure_editable(user, post_id).await {
        Ok(post) => Ok(post),
        Err(PostWriteError::NotAuthor { post_id, user_id }) => {
            debug!(
                target = "yatube::http::posts",
                post_id, user_id, "edit refused for non-author"
            );
            Err(found(&post_href(post_id)))
        }
        Err(err) => Err(HttpError::from(err).into_response()),
    }
}

async fn render_post_form(
    state: &HttpState,
    target: FormTarget,
    values: PostFormValues,
    errors: Option<FieldErrors>,
) -> Response {
    let groups = match state.authoring.list_groups().await {
        Ok(groups) => groups,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let (title, content) = match target {
        FormTarget::Create => ("New post", PostFormView::create(&groups, values)),
        FormTarget::Edit(post_id) => ("Edit post", PostFormView::edit(post_id, &groups, values)),
    };
    let content = match errors {
        Some(errors) => content.with_errors(&errors),
        None => content,
    };

    let view = LayoutContext::new(LayoutChrome::site(title), content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}
