use database::entities::sea_orm_active_enums::DistributionStatus;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u64 = 50;
pub const MAX_PER_PAGE: u64 = 1000;

pub fn items_count(count: Option<u64>) -> u64 {
    count.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
}

pub trait Pagination: Serialize {}

#[derive(Deserialize, Serialize, Clone)]
pub struct PlaceholderPagination {
    pub items_count: Option<u64>,
}

impl Pagination for PlaceholderPagination {}

/// Keyset pagination over confirmed migrations, newest first. `cursor_id` is the id of
/// the last item of the previous page.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct MigrationsPagination {
    pub items_count: Option<u64>,
    pub cursor_id: Option<i64>,
    pub distribution_status: Option<DistributionStatus>,
}

impl Pagination for MigrationsPagination {}
