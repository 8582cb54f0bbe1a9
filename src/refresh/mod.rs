mod coordinator;
mod exchange;

pub use coordinator::RefreshCoordinator;
pub use exchange::RefreshExchange;
