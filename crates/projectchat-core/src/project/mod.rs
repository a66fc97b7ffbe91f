mod builder;
mod store;

pub use builder::ContextBuilder;
pub use store::{Project, ProjectRecord, ProjectStore};
