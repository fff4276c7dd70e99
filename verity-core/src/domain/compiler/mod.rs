pub mod lineage;
pub mod quoter;

pub use lineage::extract_column_lineage;
pub use quoter::UniversalQuoter;
