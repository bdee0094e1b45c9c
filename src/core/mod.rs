//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod fund;
pub mod log;
pub mod resolver;
pub mod source;

// Re-export main types for cleaner imports
pub use cache::Cache;
pub use fund::{FundCode, FundEntry, FundError, ResolvedFundData};
pub use resolver::FundResolver;
pub use source::FundSource;
