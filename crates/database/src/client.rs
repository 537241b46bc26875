use sea_orm::DatabaseConnection;

#[derive(Clone, Debug)]
pub struct DbClient {
    pub primary: DatabaseConnection,
}

impl DbClient {
    pub fn new(primary: DatabaseConnection) -> Self {
        Self { primary }
    }
}
