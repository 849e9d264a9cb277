mod schema;

pub use schema::{Database, GraphInfo};
