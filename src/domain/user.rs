use uuid::Uuid;

/// Owner of pension plans, addressed externally by `key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub email: String,
}
