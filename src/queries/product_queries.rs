use std::collections::HashMap;

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, Result},
    models::{
        AdditionalInfoInput, AdditionalInfoItem, Color, ColorInput, CreateProductRequest,
        Hydration, ImagePatch, Product, ProductDetail, ProductImage, ProductListItem,
        ProductListResponse, ProductPatch, ProductQuery, ProductType, ShortInfoInput,
        ShortInfoItem,
    },
};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

/// Clamped LIMIT/OFFSET for a listing request. Non-positive page sizes
/// fall back to the default, page numbers below 1 are treated as the
/// first page, so the offset can never go negative.
fn page_bounds(params: &ProductQuery) -> (i64, i64) {
    let items_per_page = match params.items_per_page {
        Some(n) if n > 0 => n.min(MAX_PAGE_SIZE),
        _ => DEFAULT_PAGE_SIZE,
    };
    let page = params.page.unwrap_or(1).max(1);

    (items_per_page, (page - 1) * items_per_page)
}

fn push_filters(query: &mut QueryBuilder<Postgres>, params: &ProductQuery) {
    if let Some(type_id) = params.type_id {
        query.push(" AND type_id = ");
        query.push_bind(type_id);
    }

    if let Some(ref brands) = params.brands {
        if !brands.is_empty() {
            query.push(" AND brand = ANY(");
            query.push_bind(brands.clone());
            query.push(")");
        }
    }

    if let Some(ref memory_amounts) = params.memory_amounts {
        if !memory_amounts.is_empty() {
            query.push(" AND memory_amount = ANY(");
            query.push_bind(memory_amounts.clone());
            query.push(")");
        }
    }

    if let Some(price_from) = params.price_from {
        query.push(" AND price >= ");
        query.push_bind(price_from);
    }

    if let Some(price_to) = params.price_to {
        query.push(" AND price <= ");
        query.push_bind(price_to);
    }
}

pub async fn list_products(pool: &PgPool, params: &ProductQuery) -> Result<ProductListResponse> {
    // Count over the same predicate before pagination is applied, so
    // `total` stays correct no matter which page was requested.
    let mut count_query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM products WHERE 1=1");
    push_filters(&mut count_query, params);

    let total: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

    let (limit, offset) = page_bounds(params);

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM products WHERE 1=1");
    push_filters(&mut query, params);
    query.push(" ORDER BY id ASC");
    query.push(" LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(offset);

    let products = query.build_query_as::<Product>().fetch_all(pool).await?;

    if products.is_empty() {
        return Ok(ProductListResponse {
            data: Vec::new(),
            total,
        });
    }

    let product_ids: Vec<i32> = products.iter().map(|p| p.id).collect();
    let images = find_images_by_product_ids(pool, &product_ids).await?;

    // Images arrive ordered per product, so the first seen is the cover
    let mut covers: HashMap<i32, String> = HashMap::new();
    for image in images {
        covers.entry(image.product_id).or_insert(image.url);
    }

    let data = products
        .into_iter()
        .map(|product| ProductListItem {
            image: covers.remove(&product.id),
            id: product.id,
            title: product.title,
            price: product.price,
        })
        .collect();

    Ok(ProductListResponse { data, total })
}

pub async fn find_images_by_product_ids(
    executor: impl sqlx::PgExecutor<'_>,
    product_ids: &[i32],
) -> Result<Vec<ProductImage>> {
    let images = sqlx::query_as::<_, ProductImage>(
        "SELECT * FROM product_images
         WHERE product_id = ANY($1)
         ORDER BY product_id, position ASC, id ASC",
    )
    .bind(product_ids)
    .fetch_all(executor)
    .await?;

    Ok(images)
}

/// Load a product and the child sets requested by `hydration`.
pub async fn get_product(
    pool: &PgPool,
    id: i32,
    hydration: Hydration,
) -> Result<Option<ProductDetail>> {
    let mut conn = pool.acquire().await?;

    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match product {
        Some(product) => Ok(Some(fetch_detail(&mut conn, product, hydration).await?)),
        None => Ok(None),
    }
}

async fn fetch_detail(
    conn: &mut PgConnection,
    product: Product,
    hydration: Hydration,
) -> Result<ProductDetail> {
    let product_type =
        sqlx::query_as::<_, ProductType>("SELECT * FROM product_types WHERE id = $1")
            .bind(product.type_id)
            .fetch_one(&mut *conn)
            .await?;

    let images = if hydration == Hydration::Scalars {
        Vec::new()
    } else {
        sqlx::query_as::<_, ProductImage>(
            "SELECT * FROM product_images WHERE product_id = $1 ORDER BY position ASC, id ASC",
        )
        .bind(product.id)
        .fetch_all(&mut *conn)
        .await?
    };

    let (color, short_info, additional_info) = if hydration == Hydration::Full {
        let color = sqlx::query_as::<_, Color>("SELECT * FROM product_colors WHERE product_id = $1")
            .bind(product.id)
            .fetch_optional(&mut *conn)
            .await?;

        let short_info = sqlx::query_as::<_, ShortInfoItem>(
            "SELECT * FROM short_info_items WHERE product_id = $1 ORDER BY id ASC",
        )
        .bind(product.id)
        .fetch_all(&mut *conn)
        .await?;

        let additional_info = sqlx::query_as::<_, AdditionalInfoItem>(
            "SELECT * FROM additional_info_items WHERE product_id = $1 ORDER BY id ASC",
        )
        .bind(product.id)
        .fetch_all(&mut *conn)
        .await?;

        (color, short_info, additional_info)
    } else {
        (None, Vec::new(), Vec::new())
    };

    Ok(ProductDetail {
        product,
        product_type,
        images,
        color,
        short_info,
        additional_info,
    })
}

async fn ensure_type_exists(conn: &mut PgConnection, type_id: i32) -> Result<()> {
    sqlx::query_scalar::<_, i32>("SELECT id FROM product_types WHERE id = $1")
        .bind(type_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product type with ID {} not found", type_id)))?;

    Ok(())
}

/// Persist a product and all of its child rows as one transaction. The
/// type check runs first, so an unknown type leaves nothing behind.
pub async fn create_product(
    pool: &PgPool,
    req: CreateProductRequest,
    image_urls: &[String],
) -> Result<ProductDetail> {
    let mut tx = pool.begin().await?;

    ensure_type_exists(&mut tx, req.type_id).await?;

    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (title, price, brand, memory_amount, type_id, selectable_values)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(&req.title)
    .bind(req.price)
    .bind(&req.brand)
    .bind(req.memory_amount)
    .bind(req.type_id)
    .bind(&req.selectable_values)
    .fetch_one(&mut *tx)
    .await?;

    insert_images(&mut tx, product.id, image_urls).await?;

    if let Some(ref color) = req.color {
        insert_color(&mut tx, product.id, color).await?;
    }

    insert_short_info(&mut tx, product.id, &req.short_info).await?;
    insert_additional_info(&mut tx, product.id, &req.additional_info).await?;

    let detail = fetch_detail(&mut tx, product, Hydration::Full).await?;

    tx.commit().await?;

    Ok(detail)
}

/// Apply a partial update inside one transaction. A present `type_id`
/// is re-checked against product_types; any failure rolls the whole
/// update back, scalar changes included.
pub async fn update_product(
    pool: &PgPool,
    id: i32,
    patch: ProductPatch,
    images: ImagePatch,
) -> Result<ProductDetail> {
    let mut tx = pool.begin().await?;

    sqlx::query_scalar::<_, i32>("SELECT id FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found", id)))?;

    if let Some(type_id) = patch.type_id {
        ensure_type_exists(&mut tx, type_id).await?;
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("UPDATE products SET updated_at = NOW()");

    if let Some(ref title) = patch.title {
        query_builder.push(", title = ");
        query_builder.push_bind(title);
    }

    if let Some(type_id) = patch.type_id {
        query_builder.push(", type_id = ");
        query_builder.push_bind(type_id);
    }

    if let Some(price) = patch.price {
        query_builder.push(", price = ");
        query_builder.push_bind(price);
    }

    if let Some(ref brand) = patch.brand {
        query_builder.push(", brand = ");
        query_builder.push_bind(brand);
    }

    if let Some(memory_amount) = patch.memory_amount {
        query_builder.push(", memory_amount = ");
        query_builder.push_bind(memory_amount);
    }

    if let Some(ref selectable_values) = patch.selectable_values {
        query_builder.push(", selectable_values = ");
        query_builder.push_bind(selectable_values.clone());
    }

    query_builder.push(" WHERE id = ");
    query_builder.push_bind(id);
    query_builder.build().execute(&mut *tx).await?;

    match images {
        ImagePatch::Keep => {}
        ImagePatch::Replace(urls) => {
            sqlx::query("DELETE FROM product_images WHERE product_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_images(&mut tx, id, &urls).await?;
        }
        ImagePatch::Clear => {
            sqlx::query("DELETE FROM product_images WHERE product_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
    }

    if let Some(ref color) = patch.color {
        sqlx::query("DELETE FROM product_colors WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_color(&mut tx, id, color).await?;
    }

    if let Some(ref items) = patch.short_info {
        sqlx::query("DELETE FROM short_info_items WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_short_info(&mut tx, id, items).await?;
    }

    if let Some(ref items) = patch.additional_info {
        sqlx::query("DELETE FROM additional_info_items WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_additional_info(&mut tx, id, items).await?;
    }

    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    let detail = fetch_detail(&mut tx, product, Hydration::Full).await?;

    tx.commit().await?;

    Ok(detail)
}

/// Delete a product and its owned rows. Children go first so no orphan
/// can survive a partial failure; the schema cascade is a backstop.
pub async fn delete_product(pool: &PgPool, id: i32) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query_scalar::<_, i32>("SELECT id FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found", id)))?;

    sqlx::query("DELETE FROM product_images WHERE product_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM product_colors WHERE product_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM short_info_items WHERE product_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM additional_info_items WHERE product_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}

async fn insert_images(conn: &mut PgConnection, product_id: i32, urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO product_images (product_id, url, position) ");

    query_builder.push_values(urls.iter().enumerate(), |mut b, (position, url)| {
        b.push_bind(product_id)
            .push_bind(url)
            .push_bind(position as i32);
    });

    query_builder.build().execute(&mut *conn).await?;

    Ok(())
}

async fn insert_color(conn: &mut PgConnection, product_id: i32, color: &ColorInput) -> Result<()> {
    sqlx::query("INSERT INTO product_colors (product_id, title, color_value) VALUES ($1, $2, $3)")
        .bind(product_id)
        .bind(&color.title)
        .bind(&color.color_value)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn insert_short_info(
    conn: &mut PgConnection,
    product_id: i32,
    items: &[ShortInfoInput],
) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO short_info_items (product_id, title, icon, value) ");

    query_builder.push_values(items, |mut b, item| {
        b.push_bind(product_id)
            .push_bind(&item.title)
            .push_bind(&item.icon)
            .push_bind(&item.value);
    });

    query_builder.build().execute(&mut *conn).await?;

    Ok(())
}

async fn insert_additional_info(
    conn: &mut PgConnection,
    product_id: i32,
    items: &[AdditionalInfoInput],
) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO additional_info_items (product_id, title, value) ");

    query_builder.push_values(items, |mut b, item| {
        b.push_bind(product_id)
            .push_bind(&item.title)
            .push_bind(&item.value);
    });

    query_builder.build().execute(&mut *conn).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_with(items_per_page: Option<i64>, page: Option<i64>) -> ProductQuery {
        ProductQuery {
            items_per_page,
            page,
            ..Default::default()
        }
    }

    #[test]
    fn page_bounds_defaults() {
        assert_eq!(page_bounds(&query_with(None, None)), (10, 0));
    }

    #[test]
    fn page_bounds_clamps_invalid_values() {
        // non-positive page size falls back to the default
        assert_eq!(page_bounds(&query_with(Some(0), Some(3))), (10, 20));
        assert_eq!(page_bounds(&query_with(Some(-5), None)), (10, 0));
        // page numbers below 1 are treated as the first page
        assert_eq!(page_bounds(&query_with(Some(20), Some(0))), (20, 0));
        assert_eq!(page_bounds(&query_with(Some(20), Some(-2))), (20, 0));
    }

    #[test]
    fn page_bounds_caps_page_size() {
        assert_eq!(page_bounds(&query_with(Some(500), Some(2))), (100, 100));
    }

    #[test]
    fn page_bounds_regular_pagination() {
        assert_eq!(page_bounds(&query_with(Some(25), Some(4))), (25, 75));
    }
}
