pub mod duckdb;

pub use duckdb::DuckDbClient;
