pub mod batch;
pub mod filter;
pub mod summary;
