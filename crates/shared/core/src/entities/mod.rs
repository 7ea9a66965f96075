mod order;
mod order_book;
mod order_status;
mod order_type;
mod performance_metrics;
mod side;
mod trade;

pub use order::Order;
pub use order_book::OrderBook;
pub use order_status::OrderStatus;
pub use order_type::OrderType;
pub use performance_metrics::PerformanceMetrics;
pub use side::Side;
pub use trade::Trade;
