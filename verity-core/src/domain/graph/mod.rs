pub mod dag;

pub use dag::DependencyGraph;
