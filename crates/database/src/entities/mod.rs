//! `SeaORM` Entity definitions for the distributor schema.

pub mod prelude;

pub mod distribution_attempts;
pub mod migration_events;
pub mod sea_orm_active_enums;
