//! In-memory implementations of the persistence ports

mod in_memory_order;
mod in_memory_trade;

pub use in_memory_order::InMemoryOrderRepository;
pub use in_memory_trade::InMemoryTradeRepository;
