use crate::domain::entities::UserRecord;

/// Identity behind the current request, resolved once by middleware.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Viewer {
    #[default]
    Anonymous,
    Authenticated(UserRecord),
}

impl Viewer {
    pub fn user(&self) -> Option<&UserRecord> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::Authenticated(_))
    }
}
