pub mod schema;
pub mod tuple;
