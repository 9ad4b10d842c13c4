pub mod product_queries;
pub mod product_type_queries;
