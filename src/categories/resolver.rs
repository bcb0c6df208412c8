//! Category Resolver: arbitrates between the predefined list and the
//! caller's own categories. Predefined names always win.

use tracing::{info, warn};

use super::{dto::CategoryKind, predefined, repo_types::Category};
use crate::{auth::Caller, backend::StoreClient, error::AppError};

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Predefined(&'static str),
    User(Category),
    Missing,
}

impl Resolution {
    pub fn kind(&self) -> Option<CategoryKind> {
        match self {
            Resolution::Predefined(_) => Some(CategoryKind::Predefined),
            Resolution::User(_) => Some(CategoryKind::User),
            Resolution::Missing => None,
        }
    }

    /// Lowercase name as stored on expenses.
    pub fn name(&self) -> Option<&str> {
        match self {
            Resolution::Predefined(name) => Some(*name),
            Resolution::User(c) => Some(&c.name),
            Resolution::Missing => None,
        }
    }
}

pub(crate) fn normalize_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim().to_lowercase();
    if name.is_empty() {
        return Err(AppError::bad_request("Category name must not be empty"));
    }
    Ok(name)
}

/// Non-strict resolution; `Missing` is not an error.
pub async fn lookup(
    store: &dyn StoreClient,
    caller: &Caller,
    name: &str,
) -> Result<Resolution, AppError> {
    if let Some(name) = predefined::find(name) {
        return Ok(Resolution::Predefined(name));
    }
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Ok(Resolution::Missing);
    }
    let found = Category::find(store, caller.user.id, &name, &caller.credential()).await?;
    Ok(found.map(Resolution::User).unwrap_or(Resolution::Missing))
}

/// Strict resolution; `Missing` becomes `NotFound`.
pub async fn require(
    store: &dyn StoreClient,
    caller: &Caller,
    name: &str,
) -> Result<Resolution, AppError> {
    match lookup(store, caller, name).await? {
        Resolution::Missing => {
            warn!(user_id = %caller.user.id, category = %name, "category not found");
            Err(AppError::not_found("Category not found"))
        }
        found => Ok(found),
    }
}

pub async fn create(
    store: &dyn StoreClient,
    caller: &Caller,
    name: &str,
) -> Result<Category, AppError> {
    let name = normalize_name(name)?;
    match lookup(store, caller, &name).await? {
        Resolution::Predefined(_) => {
            return Err(AppError::conflict(
                "Category name already exists in predefined categories.",
            ))
        }
        Resolution::User(_) => {
            return Err(AppError::conflict(
                "Category name already exists in your custom categories.",
            ))
        }
        Resolution::Missing => {}
    }

    let category = Category::create(store, caller.user.id, &name, &caller.credential()).await?;
    info!(user_id = %caller.user.id, category = %category.name, "category created");
    Ok(category)
}

/// Predefined entries first, then the caller's own.
pub async fn list(store: &dyn StoreClient, caller: &Caller) -> Result<Vec<Resolution>, AppError> {
    let mut all: Vec<Resolution> = predefined::PREDEFINED
        .iter()
        .copied()
        .map(Resolution::Predefined)
        .collect();
    let own = Category::list_by_user(store, caller.user.id, &caller.credential()).await?;
    all.extend(own.into_iter().map(Resolution::User));
    Ok(all)
}

pub async fn delete(store: &dyn StoreClient, caller: &Caller, name: &str) -> Result<(), AppError> {
    let category = match require(store, caller, name).await? {
        Resolution::User(category) => category,
        _ => {
            warn!(user_id = %caller.user.id, category = %name, "attempt to delete predefined category");
            return Err(AppError::forbidden("Cannot delete predefined category."));
        }
    };

    let credential = caller.credential();
    if Category::is_referenced(store, caller.user.id, &category.name, &credential).await? {
        warn!(user_id = %caller.user.id, category = %category.name, "category still in use");
        return Err(AppError::conflict(
            "Category is linked to one or more expenses. Please update the expenses before deleting the category.",
        ));
    }

    Category::delete(store, category.id, &credential).await?;
    info!(user_id = %caller.user.id, category = %category.name, "category deleted");
    Ok(())
}
