pub use super::distribution_attempts::Entity as DistributionAttempts;
pub use super::migration_events::Entity as MigrationEvents;
