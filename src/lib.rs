pub mod config;
pub mod dispatch;
pub mod engine;
pub mod journal;
pub mod model;
pub mod notify;
pub mod observability;
pub mod record;
pub mod runtime;
pub mod store;
pub mod time;
