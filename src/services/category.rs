use crate::database::DbPool;
use crate::models::category::Category;
use crate::utils::error::{AppError, AppResult};
use crate::utils::permissions::require_site_admin;
use crate::utils::validation::{validate_category_name, validate_description};
use sqlx::Row;

pub async fn list_categories(pool: &DbPool) -> AppResult<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
        .fetch_all(pool.as_ref())
        .await?;

    Ok(categories)
}

pub async fn find_category_by_name(pool: &DbPool, name: &str) -> AppResult<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE name = ?")
        .bind(name)
        .fetch_optional(pool.as_ref())
        .await?;

    Ok(category)
}

pub async fn create_category(
    pool: &DbPool,
    requester_username: &str,
    name: String,
    description: Option<String>,
) -> AppResult<Category> {
    require_site_admin(pool, requester_username).await?;
    validate_category_name(&name)?;
    if let Some(description) = &description {
        validate_description(description)?;
    }

    let exists = sqlx::query("SELECT COUNT(*) as count FROM categories WHERE name = ?")
        .bind(&name)
        .fetch_one(pool.as_ref())
        .await?
        .get::<i64, _>("count");

    if exists > 0 {
        return Err(AppError::BadRequest(
            "Category name already exists".to_string(),
        ));
    }

    let id = sqlx::query("INSERT INTO categories (name, description) VALUES (?, ?)")
        .bind(&name)
        .bind(&description)
        .execute(pool.as_ref())
        .await?
        .last_insert_rowid();

    tracing::info!(
        "Category '{}' created by {} (id={})",
        name,
        requester_username,
        id
    );

    Ok(Category {
        id,
        name,
        description,
    })
}
