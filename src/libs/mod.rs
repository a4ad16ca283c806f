pub mod config;
pub mod dispatch;
pub mod error;
pub mod explorer;
pub mod introspect;
pub mod query_builder;
pub mod row;
pub mod schema;
pub mod server;
pub mod value;

// Re-export them for easier access from main.rs
pub use config::*;
pub use dispatch::*;
pub use error::*;
pub use explorer::*;
pub use introspect::*;
pub use query_builder::*;
pub use row::*;
pub use schema::*;
pub use value::*;
