use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};
use crate::domain::posts::{
    FieldErrors, GROUP_FIELD, HUMAN_DATETIME_FORMAT, IMAGE_FIELD, TEXT_FIELD,
};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

const SITE_TITLE: &str = "Yatube";

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

/// Render the shared error page. Never fails: a template error degrades to
/// a plain-text body with the same status.
pub fn render_error_page(status: StatusCode, message: &str) -> Response {
    let content = ErrorPageView::new(status, message);
    let template = ErrorTemplate {
        view: LayoutContext::new(LayoutChrome::site(&content.title), content),
    };
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(_) => (status, message.to_string()).into_response(),
    }
}

pub fn render_not_found_response() -> Response {
    let mut response = render_error_page(StatusCode::NOT_FOUND, "Page not found");
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
}

/// Layout pieces shared by every page.
///
/// Nothing here depends on who is asking, so pages that go through the page
/// cache can be served to any visitor.
#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: String,
    pub navigation: Vec<NavigationLinkView>,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    pub fn site(title: &str) -> Self {
        let navigation = [("Home", "/"), ("Following", "/follow/"), ("New post", "/create/")]
            .into_iter()
            .map(|(label, href)| NavigationLinkView {
                label: label.to_string(),
                href: href.to_string(),
            })
            .collect();

        let title = if title.is_empty() {
            SITE_TITLE.to_string()
        } else {
            format!("{title} | {SITE_TITLE}")
        };

        Self {
            brand: SITE_TITLE.to_string(),
            navigation,
            meta: PageMetaView { title },
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: String,
    pub navigation: Vec<NavigationLinkView>,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            meta: chrome.meta,
            content,
        }
    }
}

#[derive(Clone)]
pub struct GroupLinkView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub image: Option<String>,
    pub author: String,
    pub author_href: String,
    pub group: Option<GroupLinkView>,
    pub published: String,
    pub iso_date: String,
    pub detail_href: String,
}

impl PostCard {
    pub fn from_record(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            text: post.text.clone(),
            image: post.image.clone(),
            author: post.author.username.clone(),
            author_href: profile_href(&post.author.username),
            group: post.group.as_ref().map(|group| GroupLinkView {
                title: group.title.clone(),
                href: group_href(&group.slug),
            }),
            published: human_date(post.created_at),
            iso_date: iso_date(post.created_at),
            detail_href: post_href(post.id),
        }
    }
}

#[derive(Clone)]
pub struct PageLinkView {
    pub number: u32,
    pub href: String,
    pub is_current: bool,
}

#[derive(Clone)]
pub struct PaginatorView {
    pub number: u32,
    pub page_count: u64,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub pages: Vec<PageLinkView>,
}

impl PaginatorView {
    pub fn new<T>(page: &Page<T>, base_path: &str) -> Self {
        let href = |number: u32| format!("{base_path}?page={number}");
        let page_count = page.page_count();
        let pages = (1..=page_count)
            .filter_map(|n| u32::try_from(n).ok())
            .map(|number| PageLinkView {
                number,
                href: href(number),
                is_current: number == page.number,
            })
            .collect();

        Self {
            number: page.number,
            page_count,
            previous_href: page.previous_number().map(href),
            next_href: page.next_number().map(href),
            pages,
        }
    }

    pub fn is_paginated(&self) -> bool {
        self.page_count > 1
    }
}

#[derive(Clone)]
pub struct ListingView {
    pub posts: Vec<PostCard>,
    pub total: u64,
    pub paginator: PaginatorView,
    pub empty_message: &'static str,
}

impl ListingView {
    pub fn new(page: &Page<PostRecord>, base_path: &str, empty_message: &'static str) -> Self {
        Self {
            posts: page.items.iter().map(PostCard::from_record).collect(),
            total: page.total,
            paginator: PaginatorView::new(page, base_path),
            empty_message,
        }
    }

    pub fn has_posts(&self) -> bool {
        !self.posts.is_empty()
    }
}

pub struct IndexView {
    pub listing: ListingView,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexView>,
}

pub struct GroupPageView {
    pub title: String,
    pub description: String,
    pub listing: ListingView,
}

impl GroupPageView {
    pub fn new(group: &GroupRecord, page: &Page<PostRecord>) -> Self {
        Self {
            title: group.title.clone(),
            description: group.description.clone(),
            listing: ListingView::new(
                page,
                &group_href(&group.slug),
                "No posts in this group yet.",
            ),
        }
    }
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupPageView>,
}

/// Follow controls shown on a profile to a signed-in visitor other than the author.
pub struct FollowControlView {
    pub following: bool,
    pub follow_href: String,
    pub unfollow_href: String,
}

pub struct ProfileView {
    pub username: String,
    pub post_count: u64,
    pub follow: Option<FollowControlView>,
    pub listing: ListingView,
}

impl ProfileView {
    pub fn new(author: &UserRecord, page: &Page<PostRecord>, following: Option<bool>) -> Self {
        let base = profile_href(&author.username);
        Self {
            username: author.username.clone(),
            post_count: page.total,
            follow: following.map(|following| FollowControlView {
                following,
                follow_href: format!("{base}follow/"),
                unfollow_href: format!("{base}unfollow/"),
            }),
            listing: ListingView::new(page, &base, "This author has not posted yet."),
        }
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

pub struct AuthorLinkView {
    pub username: String,
    pub href: String,
}

pub struct FeedView {
    pub followed: Vec<AuthorLinkView>,
    pub listing: ListingView,
}

impl FeedView {
    pub fn new(followed: &[UserRecord], page: &Page<PostRecord>) -> Self {
        Self {
            followed: followed
                .iter()
                .map(|user| AuthorLinkView {
                    username: user.username.clone(),
                    href: profile_href(&user.username),
                })
                .collect(),
            listing: ListingView::new(
                page,
                "/follow/",
                "Follow some authors to see their posts here.",
            ),
        }
    }
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FeedTemplate {
    pub view: LayoutContext<FeedView>,
}

pub struct CommentView {
    pub author: String,
    pub author_href: String,
    pub text: String,
    pub published: String,
    pub iso_date: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            author: comment.author.username.clone(),
            author_href: profile_href(&comment.author.username),
            text: comment.text.clone(),
            published: human_date(comment.created_at),
            iso_date: iso_date(comment.created_at),
        }
    }
}

pub struct CommentFormView {
    pub action: String,
    pub text: String,
    pub errors: Vec<String>,
}

pub struct PostDetailView {
    pub post: PostCard,
    pub edit_href: Option<String>,
    pub comments: Vec<CommentView>,
    pub comment_form: Option<CommentFormView>,
}

impl PostDetailView {
    pub fn new(post: &PostRecord, comments: &[CommentRecord], viewer: Option<&UserRecord>) -> Self {
        let edit_href = viewer
            .filter(|user| post.is_authored_by(user))
            .map(|_| format!("{}edit/", post_href(post.id)));
        let comment_form = viewer.map(|_| CommentFormView {
            action: format!("{}comment/", post_href(post.id)),
            text: String::new(),
            errors: Vec::new(),
        });

        Self {
            post: PostCard::from_record(post),
            edit_href,
            comments: comments.iter().map(CommentView::from).collect(),
            comment_form,
        }
    }

    /// Keep what the visitor typed and show why it was refused.
    pub fn with_comment_errors(mut self, text: &str, errors: &FieldErrors) -> Self {
        if let Some(form) = self.comment_form.as_mut() {
            form.text = text.to_string();
            form.errors = errors
                .messages_for(TEXT_FIELD)
                .into_iter()
                .map(str::to_string)
                .collect();
        }
        self
    }
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

pub struct GroupOptionView {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

/// Values echoed back into the post form.
#[derive(Debug, Clone, Default)]
pub struct PostFormValues {
    pub text: String,
    pub group: String,
    pub image: String,
}

impl PostFormValues {
    pub fn from_record(post: &PostRecord) -> Self {
        Self {
            text: post.text.clone(),
            group: post
                .group
                .as_ref()
                .map(|group| group.id.to_string())
                .unwrap_or_default(),
            image: post.image.clone().unwrap_or_default(),
        }
    }
}

pub struct PostFormView {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub image: String,
    pub groups: Vec<GroupOptionView>,
    pub text_errors: Vec<String>,
    pub group_errors: Vec<String>,
    pub image_errors: Vec<String>,
}

impl PostFormView {
    pub fn create(groups: &[GroupRecord], values: PostFormValues) -> Self {
        Self::build("/create/".to_string(), false, groups, values)
    }

    pub fn edit(post_id: i64, groups: &[GroupRecord], values: PostFormValues) -> Self {
        Self::build(format!("{}edit/", post_href(post_id)), true, groups, values)
    }

    pub fn with_errors(mut self, errors: &FieldErrors) -> Self {
        let collect = |field: &str| {
            errors
                .messages_for(field)
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        self.text_errors = collect(TEXT_FIELD);
        self.group_errors = collect(GROUP_FIELD);
        self.image_errors = collect(IMAGE_FIELD);
        self
    }

    fn build(
        action: String,
        is_edit: bool,
        groups: &[GroupRecord],
        values: PostFormValues,
    ) -> Self {
        let selected = values.group.trim().parse::<i64>().ok();
        Self {
            is_edit,
            action,
            text: values.text,
            image: values.image,
            groups: groups
                .iter()
                .map(|group| GroupOptionView {
                    id: group.id,
                    title: group.title.clone(),
                    selected: selected == Some(group.id),
                })
                .collect(),
            text_errors: Vec::new(),
            group_errors: Vec::new(),
            image_errors: Vec::new(),
        }
    }
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

pub struct ErrorPageView {
    pub status: u16,
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status: status.as_u16(),
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub fn profile_href(username: &str) -> String {
    format!("/profile/{username}/")
}

pub fn group_href(slug: &str) -> String {
    format!("/group/{slug}/")
}

pub fn post_href(id: i64) -> String {
    format!("/posts/{id}/")
}

fn human_date(at: OffsetDateTime) -> String {
    at.format(HUMAN_DATETIME_FORMAT).unwrap_or_default()
}

fn iso_date(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_default()
}
