pub mod query;
pub mod template;
