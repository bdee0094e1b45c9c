pub mod fund_list;
pub mod memory;

pub use fund_list::FundListStore;
pub use memory::MemoryCache;
