use catalog_back::error::AppError;
use catalog_back::models::{
    AdditionalInfoInput, ColorInput, CreateProductRequest, Hydration, ImagePatch, ProductPatch,
    ProductQuery, ShortInfoInput,
};
use catalog_back::queries::{product_queries, product_type_queries};
use rust_decimal::Decimal;
use sqlx::PgPool;

async fn seed_type(pool: &PgPool, title: &str) -> i32 {
    product_type_queries::create_product_type(pool, title, "/uploads/icon.png")
        .await
        .expect("create product type")
        .id
}

fn request(title: &str, type_id: i32, price: i64) -> CreateProductRequest {
    CreateProductRequest {
        title: title.to_string(),
        type_id,
        price: Decimal::from(price),
        brand: None,
        memory_amount: None,
        selectable_values: None,
        color: None,
        short_info: Vec::new(),
        additional_info: Vec::new(),
    }
}

async fn seed_product(
    pool: &PgPool,
    type_id: i32,
    title: &str,
    price: i64,
    brand: Option<&str>,
    memory_amount: Option<i32>,
    images: &[&str],
) -> i32 {
    let mut req = request(title, type_id, price);
    req.brand = brand.map(str::to_string);
    req.memory_amount = memory_amount;

    let urls: Vec<String> = images.iter().map(|s| s.to_string()).collect();

    product_queries::create_product(pool, req, &urls)
        .await
        .expect("create product")
        .product
        .id
}

async fn count_rows(pool: &PgPool, table: &str, product_id: i32) -> i64 {
    sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE product_id = $1",
        table
    ))
    .bind(product_id)
    .fetch_one(pool)
    .await
    .expect("count rows")
}

fn filter() -> ProductQuery {
    ProductQuery::default()
}

#[sqlx::test]
async fn list_total_is_independent_of_pagination(pool: PgPool) {
    let type_id = seed_type(&pool, "Phone").await;
    for i in 0..5 {
        seed_product(&pool, type_id, &format!("P{}", i), 100, None, None, &[]).await;
    }

    let result = product_queries::list_products(
        &pool,
        &ProductQuery {
            items_per_page: Some(2),
            page: Some(3),
            ..filter()
        },
    )
    .await
    .expect("list");
    assert_eq!(result.total, 5);
    assert_eq!(result.data.len(), 1);

    // A page past the end still reports the full count
    let result = product_queries::list_products(
        &pool,
        &ProductQuery {
            items_per_page: Some(2),
            page: Some(10),
            ..filter()
        },
    )
    .await
    .expect("list");
    assert_eq!(result.total, 5);
    assert!(result.data.is_empty());
}

#[sqlx::test]
async fn list_clamps_invalid_pagination(pool: PgPool) {
    let type_id = seed_type(&pool, "Phone").await;
    for i in 0..3 {
        seed_product(&pool, type_id, &format!("P{}", i), 100, None, None, &[]).await;
    }

    // page 0 and a non-positive page size behave like the defaults
    let result = product_queries::list_products(
        &pool,
        &ProductQuery {
            items_per_page: Some(0),
            page: Some(0),
            ..filter()
        },
    )
    .await
    .expect("list");
    assert_eq!(result.total, 3);
    assert_eq!(result.data.len(), 3);
}

#[sqlx::test]
async fn list_applies_conjunctive_filters(pool: PgPool) {
    let phones = seed_type(&pool, "Phone").await;
    let laptops = seed_type(&pool, "Laptop").await;

    let p1 = seed_product(&pool, phones, "A64", 100, Some("Apple"), Some(64), &[]).await;
    let p2 = seed_product(&pool, phones, "S128", 200, Some("Samsung"), Some(128), &[]).await;
    let p3 = seed_product(&pool, phones, "A256", 300, Some("Apple"), Some(256), &[]).await;
    let p4 = seed_product(&pool, phones, "NoBrand", 150, None, None, &[]).await;
    seed_product(&pool, laptops, "Book", 500, Some("Apple"), None, &[]).await;

    let result = product_queries::list_products(
        &pool,
        &ProductQuery {
            type_id: Some(phones),
            ..filter()
        },
    )
    .await
    .expect("list");
    assert_eq!(result.total, 4);

    let result = product_queries::list_products(
        &pool,
        &ProductQuery {
            type_id: Some(phones),
            brands: Some(vec!["Apple".to_string()]),
            ..filter()
        },
    )
    .await
    .expect("list");
    assert_eq!(result.total, 2);
    let ids: Vec<i32> = result.data.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![p1, p3]);

    let result = product_queries::list_products(
        &pool,
        &ProductQuery {
            brands: Some(vec!["Apple".to_string(), "Samsung".to_string()]),
            memory_amounts: Some(vec![64, 128]),
            ..filter()
        },
    )
    .await
    .expect("list");
    let ids: Vec<i32> = result.data.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![p1, p2]);

    // Price bounds are inclusive
    let result = product_queries::list_products(
        &pool,
        &ProductQuery {
            type_id: Some(phones),
            price_from: Some(Decimal::from(150)),
            price_to: Some(Decimal::from(300)),
            ..filter()
        },
    )
    .await
    .expect("list");
    assert_eq!(result.total, 3);
    let ids: Vec<i32> = result.data.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![p2, p3, p4]);
}

#[sqlx::test]
async fn list_projects_first_image_as_cover(pool: PgPool) {
    let type_id = seed_type(&pool, "Phone").await;

    let with_images = seed_product(
        &pool,
        type_id,
        "X",
        100,
        None,
        None,
        &["/uploads/1-a.jpg", "/uploads/1-b.jpg"],
    )
    .await;
    let without_images = seed_product(&pool, type_id, "Y", 100, None, None, &[]).await;

    let result = product_queries::list_products(&pool, &filter())
        .await
        .expect("list");
    assert_eq!(result.total, 2);

    let first = result.data.iter().find(|p| p.id == with_images).unwrap();
    assert_eq!(first.image.as_deref(), Some("/uploads/1-a.jpg"));

    let second = result.data.iter().find(|p| p.id == without_images).unwrap();
    assert_eq!(second.image, None);
}

#[sqlx::test]
async fn create_with_unknown_type_persists_nothing(pool: PgPool) {
    let err = product_queries::create_product(
        &pool,
        request("X", 999, 100),
        &["/uploads/a.jpg".to_string()],
    )
    .await
    .expect_err("unknown type must fail");

    assert!(matches!(err, AppError::NotFound(_)), "got {:?}", err);

    let products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(products, 0);

    let images: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_images")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(images, 0);

    let result = product_queries::list_products(&pool, &filter())
        .await
        .expect("list");
    assert_eq!(result.total, 0);
}

#[sqlx::test]
async fn create_persists_the_whole_graph(pool: PgPool) {
    let type_id = seed_type(&pool, "Phone").await;

    let mut req = request("X", type_id, 100);
    req.brand = Some("Apple".to_string());
    req.memory_amount = Some(128);
    req.selectable_values = Some(vec!["64GB".to_string(), "128GB".to_string()]);
    req.color = Some(ColorInput {
        title: "Midnight".to_string(),
        color_value: "#191970".to_string(),
    });
    req.short_info = vec![
        ShortInfoInput {
            title: "Display".to_string(),
            icon: "/uploads/display.png".to_string(),
            value: "6.1\"".to_string(),
        },
        ShortInfoInput {
            title: "Battery".to_string(),
            icon: "/uploads/battery.png".to_string(),
            value: "3200 mAh".to_string(),
        },
    ];
    req.additional_info = vec![AdditionalInfoInput {
        title: "Warranty".to_string(),
        value: "2 years".to_string(),
    }];

    let urls = vec!["/uploads/a.jpg".to_string(), "/uploads/b.jpg".to_string()];
    let detail = product_queries::create_product(&pool, req, &urls)
        .await
        .expect("create");

    assert_eq!(detail.product.title, "X");
    assert_eq!(detail.product.price, Decimal::from(100));
    assert_eq!(detail.product_type.id, type_id);
    assert_eq!(detail.product_type.title, "Phone");

    let image_urls: Vec<&str> = detail.images.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(image_urls, vec!["/uploads/a.jpg", "/uploads/b.jpg"]);
    let positions: Vec<i32> = detail.images.iter().map(|i| i.position).collect();
    assert_eq!(positions, vec![0, 1]);

    assert_eq!(detail.color.as_ref().unwrap().title, "Midnight");
    assert_eq!(detail.short_info.len(), 2);
    assert_eq!(detail.additional_info.len(), 1);

    // The same graph comes back through a fresh read
    let reread = product_queries::get_product(&pool, detail.product.id, Hydration::Full)
        .await
        .expect("get")
        .expect("must exist");
    assert_eq!(reread.images.len(), 2);
    assert_eq!(reread.short_info.len(), 2);
}

#[sqlx::test]
async fn get_product_respects_hydration_level(pool: PgPool) {
    let type_id = seed_type(&pool, "Phone").await;

    let mut req = request("X", type_id, 100);
    req.color = Some(ColorInput {
        title: "Red".to_string(),
        color_value: "#ff0000".to_string(),
    });
    req.short_info = vec![ShortInfoInput {
        title: "Display".to_string(),
        icon: "/uploads/display.png".to_string(),
        value: "6.1\"".to_string(),
    }];

    let id = product_queries::create_product(&pool, req, &["/uploads/a.jpg".to_string()])
        .await
        .expect("create")
        .product
        .id;

    let scalars = product_queries::get_product(&pool, id, Hydration::Scalars)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(scalars.product_type.id, type_id);
    assert!(scalars.images.is_empty());
    assert!(scalars.color.is_none());
    assert!(scalars.short_info.is_empty());

    let with_images = product_queries::get_product(&pool, id, Hydration::WithImages)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(with_images.images.len(), 1);
    assert!(with_images.color.is_none());

    let full = product_queries::get_product(&pool, id, Hydration::Full)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(full.images.len(), 1);
    assert!(full.color.is_some());
    assert_eq!(full.short_info.len(), 1);
}

#[sqlx::test]
async fn update_applies_partial_scalars_only(pool: PgPool) {
    let type_id = seed_type(&pool, "Phone").await;
    let id = seed_product(
        &pool,
        type_id,
        "Old",
        100,
        Some("Apple"),
        Some(64),
        &["/uploads/a.jpg"],
    )
    .await;

    let patch = ProductPatch {
        title: Some("New".to_string()),
        price: Some(Decimal::from(250)),
        ..Default::default()
    };

    let detail = product_queries::update_product(&pool, id, patch, ImagePatch::Keep)
        .await
        .expect("update");

    assert_eq!(detail.product.title, "New");
    assert_eq!(detail.product.price, Decimal::from(250));
    // Untouched fields keep their values
    assert_eq!(detail.product.brand.as_deref(), Some("Apple"));
    assert_eq!(detail.product.memory_amount, Some(64));
    assert_eq!(detail.product.type_id, type_id);
    assert_eq!(detail.images.len(), 1);
}

#[sqlx::test]
async fn update_replaces_images_in_supplied_order(pool: PgPool) {
    let type_id = seed_type(&pool, "Phone").await;
    let id = seed_product(
        &pool,
        type_id,
        "X",
        100,
        None,
        None,
        &["/uploads/a.jpg", "/uploads/b.jpg", "/uploads/c.jpg"],
    )
    .await;

    let new_urls = vec!["/uploads/d.jpg".to_string(), "/uploads/e.jpg".to_string()];
    let detail =
        product_queries::update_product(&pool, id, ProductPatch::default(), ImagePatch::Replace(new_urls))
            .await
            .expect("update");

    let urls: Vec<&str> = detail.images.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(urls, vec!["/uploads/d.jpg", "/uploads/e.jpg"]);

    assert_eq!(count_rows(&pool, "product_images", id).await, 2);
}

#[sqlx::test]
async fn update_distinguishes_keep_and_clear(pool: PgPool) {
    let type_id = seed_type(&pool, "Phone").await;
    let id = seed_product(&pool, type_id, "X", 100, None, None, &["/uploads/a.jpg"]).await;

    let detail = product_queries::update_product(&pool, id, ProductPatch::default(), ImagePatch::Keep)
        .await
        .expect("update");
    assert_eq!(detail.images.len(), 1);

    let detail = product_queries::update_product(&pool, id, ProductPatch::default(), ImagePatch::Clear)
        .await
        .expect("update");
    assert!(detail.images.is_empty());
    assert_eq!(count_rows(&pool, "product_images", id).await, 0);
}

#[sqlx::test]
async fn update_with_unknown_type_rolls_back_whole_update(pool: PgPool) {
    let type_id = seed_type(&pool, "Phone").await;
    let id = seed_product(&pool, type_id, "Old", 100, None, None, &["/uploads/a.jpg"]).await;

    let patch = ProductPatch {
        title: Some("New".to_string()),
        type_id: Some(999),
        ..Default::default()
    };

    let err = product_queries::update_product(
        &pool,
        id,
        patch,
        ImagePatch::Replace(vec!["/uploads/b.jpg".to_string()]),
    )
    .await
    .expect_err("unknown type must abort the update");
    assert!(matches!(err, AppError::NotFound(_)), "got {:?}", err);

    let detail = product_queries::get_product(&pool, id, Hydration::Full)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(detail.product.title, "Old");
    assert_eq!(detail.images.len(), 1);
    assert_eq!(detail.images[0].url, "/uploads/a.jpg");
}

#[sqlx::test]
async fn update_replaces_nested_collections_when_present(pool: PgPool) {
    let type_id = seed_type(&pool, "Phone").await;

    let mut req = request("X", type_id, 100);
    req.short_info = vec![
        ShortInfoInput {
            title: "Display".to_string(),
            icon: "/uploads/display.png".to_string(),
            value: "6.1\"".to_string(),
        },
        ShortInfoInput {
            title: "Battery".to_string(),
            icon: "/uploads/battery.png".to_string(),
            value: "3200 mAh".to_string(),
        },
    ];
    let id = product_queries::create_product(&pool, req, &[])
        .await
        .expect("create")
        .product
        .id;

    let patch = ProductPatch {
        short_info: Some(vec![ShortInfoInput {
            title: "Weight".to_string(),
            icon: "/uploads/weight.png".to_string(),
            value: "174 g".to_string(),
        }]),
        ..Default::default()
    };

    let detail = product_queries::update_product(&pool, id, patch, ImagePatch::Keep)
        .await
        .expect("update");
    assert_eq!(detail.short_info.len(), 1);
    assert_eq!(detail.short_info[0].title, "Weight");
    assert_eq!(count_rows(&pool, "short_info_items", id).await, 1);
}

#[sqlx::test]
async fn update_unknown_product_is_not_found(pool: PgPool) {
    let err = product_queries::update_product(&pool, 42, ProductPatch::default(), ImagePatch::Keep)
        .await
        .expect_err("unknown product must fail");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test]
async fn delete_product_leaves_no_orphans(pool: PgPool) {
    let type_id = seed_type(&pool, "Phone").await;

    let mut req = request("X", type_id, 100);
    req.color = Some(ColorInput {
        title: "Red".to_string(),
        color_value: "#ff0000".to_string(),
    });
    req.short_info = vec![ShortInfoInput {
        title: "Display".to_string(),
        icon: "/uploads/display.png".to_string(),
        value: "6.1\"".to_string(),
    }];
    req.additional_info = vec![AdditionalInfoInput {
        title: "Warranty".to_string(),
        value: "2 years".to_string(),
    }];

    let id = product_queries::create_product(&pool, req, &["/uploads/a.jpg".to_string()])
        .await
        .expect("create")
        .product
        .id;

    product_queries::delete_product(&pool, id)
        .await
        .expect("delete");

    for table in [
        "product_images",
        "product_colors",
        "short_info_items",
        "additional_info_items",
    ] {
        assert_eq!(count_rows(&pool, table, id).await, 0, "orphans in {}", table);
    }

    let gone = product_queries::get_product(&pool, id, Hydration::Scalars)
        .await
        .expect("get");
    assert!(gone.is_none());

    let err = product_queries::delete_product(&pool, id)
        .await
        .expect_err("second delete must fail");
    assert!(matches!(err, AppError::NotFound(_)));
}
