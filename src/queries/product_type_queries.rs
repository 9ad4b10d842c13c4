use sqlx::PgPool;

use crate::{
    config::TypeDeletePolicy,
    error::{AppError, Result},
    models::ProductType,
};

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<ProductType>> {
    let product_type =
        sqlx::query_as::<_, ProductType>("SELECT * FROM product_types WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(product_type)
}

pub async fn get_all(pool: &PgPool) -> Result<Vec<ProductType>> {
    let product_types =
        sqlx::query_as::<_, ProductType>("SELECT * FROM product_types ORDER BY id ASC")
            .fetch_all(pool)
            .await?;

    Ok(product_types)
}

pub async fn create_product_type(
    pool: &PgPool,
    title: &str,
    icon_url: &str,
) -> Result<ProductType> {
    let product_type = sqlx::query_as::<_, ProductType>(
        "INSERT INTO product_types (title, icon_url) VALUES ($1, $2) RETURNING *",
    )
    .bind(title)
    .bind(icon_url)
    .fetch_one(pool)
    .await?;

    Ok(product_type)
}

/// Partial update; absent fields keep their stored value.
pub async fn update_product_type(
    pool: &PgPool,
    id: i32,
    title: Option<&str>,
    icon_url: Option<&str>,
) -> Result<Option<ProductType>> {
    let product_type = sqlx::query_as::<_, ProductType>(
        "UPDATE product_types
         SET
             title = COALESCE($1, title),
             icon_url = COALESCE($2, icon_url),
             updated_at = NOW()
         WHERE id = $3
         RETURNING *",
    )
    .bind(title)
    .bind(icon_url)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(product_type)
}

/// Delete a product type under the configured referential policy.
/// `Restrict` rejects the delete while products still reference the
/// type; `Cascade` removes those products and their child rows in the
/// same transaction.
pub async fn delete_product_type(pool: &PgPool, id: i32, policy: TypeDeletePolicy) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query_scalar::<_, i32>("SELECT id FROM product_types WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product type with ID {} not found", id)))?;

    let dependents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE type_id = $1")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    if dependents > 0 {
        match policy {
            TypeDeletePolicy::Restrict => {
                return Err(AppError::Conflict(format!(
                    "Product type {} is still referenced by {} products",
                    id, dependents
                )));
            }
            TypeDeletePolicy::Cascade => {
                sqlx::query(
                    "DELETE FROM product_images
                     WHERE product_id IN (SELECT id FROM products WHERE type_id = $1)",
                )
                .bind(id)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    "DELETE FROM product_colors
                     WHERE product_id IN (SELECT id FROM products WHERE type_id = $1)",
                )
                .bind(id)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    "DELETE FROM short_info_items
                     WHERE product_id IN (SELECT id FROM products WHERE type_id = $1)",
                )
                .bind(id)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    "DELETE FROM additional_info_items
                     WHERE product_id IN (SELECT id FROM products WHERE type_id = $1)",
                )
                .bind(id)
                .execute(&mut *tx)
                .await?;

                sqlx::query("DELETE FROM products WHERE type_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    sqlx::query("DELETE FROM product_types WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}
