// src/models/company.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Membership statuses stored in the 'members.status' column.
/// Plain strings, matching how roles are stored on users.
pub mod status {
    pub const INVITED: &str = "invited";
    pub const APPLYING: &str = "applying";
    pub const ACTIVE: &str = "is_active";
    pub const DEACTIVATED: &str = "deactivated";
    pub const ADMIN: &str = "is_admin";
}

/// Represents the 'companies' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'members' table: user x company x status.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub user_id: i64,
    pub company_id: i64,
    pub status: String,
}

/// DTO for creating a new company.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 200))]
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

/// DTO for updating a company. Absent fields are left untouched.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

/// DTO for inviting a user into a company.
#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub user_id: i64,
}

/// DTO for a member status change (promote/deactivate/reactivate).
#[derive(Debug, Deserialize)]
pub struct MemberStatusRequest {
    pub status: String,
}
