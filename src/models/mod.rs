mod product;
mod product_type;

pub use product::*;
pub use product_type::*;
