pub mod attempts;
pub mod client;
pub mod connect;
pub mod entities;
pub mod migration_events;
