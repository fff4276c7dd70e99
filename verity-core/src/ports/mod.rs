pub mod warehouse;

pub use warehouse::{ColumnSchema, Row, WarehouseClient};
