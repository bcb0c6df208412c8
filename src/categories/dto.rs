use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{repo_types::Category, resolver::Resolution};

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Predefined,
    User,
}

/// Either namespace in one shape; predefined entries have no id, owner or
/// timestamp.
#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub name: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    pub kind: CategoryKind,
}

impl CategoryView {
    pub fn predefined(name: &str) -> Self {
        Self {
            id: None,
            user_id: None,
            name: name.to_string(),
            created_at: None,
            kind: CategoryKind::Predefined,
        }
    }
}

impl From<Category> for CategoryView {
    fn from(c: Category) -> Self {
        Self {
            id: Some(c.id),
            user_id: Some(c.user_id),
            name: c.name,
            created_at: Some(c.created_at),
            kind: CategoryKind::User,
        }
    }
}

impl CategoryView {
    pub fn from_resolution(resolution: Resolution) -> Option<Self> {
        match resolution {
            Resolution::Predefined(name) => Some(Self::predefined(name)),
            Resolution::User(category) => Some(category.into()),
            Resolution::Missing => None,
        }
    }
}
