//! User and group management used by the administrative CLI.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{
    CreateGroupParams, CreateUserParams, GroupsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{GroupRecord, UserRecord};
use crate::domain::handles::{HandleError, validate_username};
use crate::domain::slug::{SlugError, derive_slug, validate_slug};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("invalid username: {0}")]
    Username(#[from] HandleError),
    #[error("invalid slug: {0}")]
    Slug(#[from] SlugError),
    #[error("group title must not be empty")]
    EmptyTitle,
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupCreation {
    Created(GroupRecord),
    /// A group already owns the slug; nothing was written.
    Existing(GroupRecord),
}

impl GroupCreation {
    pub fn group(&self) -> &GroupRecord {
        match self {
            GroupCreation::Created(group) | GroupCreation::Existing(group) => group,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddGroupCommand {
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct DirectoryService {
    users: Arc<dyn UsersRepo>,
    groups: Arc<dyn GroupsRepo>,
}

impl DirectoryService {
    pub fn new(users: Arc<dyn UsersRepo>, groups: Arc<dyn GroupsRepo>) -> Self {
        Self { users, groups }
    }

    pub async fn add_user(&self, username: &str) -> Result<UserRecord, AdminError> {
        let username = username.trim();
        validate_username(username)?;

        let user = self
            .users
            .create_user(CreateUserParams {
                username: username.to_string(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AdminError::UsernameTaken(username.to_string()),
                other => AdminError::Repo(other),
            })?;

        info!(
            target = "yatube::directory",
            user_id = user.id,
            username = %user.username,
            "user created"
        );
        Ok(user)
    }

    pub async fn add_group(&self, command: AddGroupCommand) -> Result<GroupCreation, AdminError> {
        let title = command.title.trim().to_string();
        if title.is_empty() {
            return Err(AdminError::EmptyTitle);
        }

        let slug = match command.slug.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => {
                validate_slug(explicit)?;
                explicit.to_string()
            }
            _ => derive_slug(&title)?,
        };

        if let Some(existing) = self.groups.find_by_slug(&slug).await? {
            return Ok(GroupCreation::Existing(existing));
        }

        let created = self
            .groups
            .create_group(CreateGroupParams {
                title,
                slug: slug.clone(),
                description: command.description.trim().to_string(),
            })
            .await;

        match created {
            Ok(group) => {
                info!(
                    target = "yatube::directory",
                    group_id = group.id,
                    slug = %group.slug,
                    "group created"
                );
                Ok(GroupCreation::Created(group))
            }
            // Lost a race against a concurrent insert of the same slug.
            Err(RepoError::Duplicate { .. }) => self
                .groups
                .find_by_slug(&slug)
                .await?
                .map(GroupCreation::Existing)
                .ok_or(AdminError::Repo(RepoError::NotFound)),
            Err(err) => Err(err.into()),
        }
    }
}
