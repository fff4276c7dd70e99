pub mod discovery;
pub mod jinja;

pub use discovery::{GraphDiscovery, SqlParser};
pub use jinja::JinjaRenderer;
