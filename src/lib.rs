pub mod models;
pub mod errors;
pub mod extractor;
pub mod client;
pub mod schema;
pub mod analyzer;
pub mod sensitivity;
pub mod policy;
pub mod reporting;

// Re-export commonly used items
pub use models::*;
pub use errors::*;
pub use extractor::*;
pub use client::*;
pub use schema::*;
pub use analyzer::*;
pub use sensitivity::*;
pub use policy::*;
pub use reporting::*;
