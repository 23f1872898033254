//! Credential, role and caller identity models

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Caller role, stored as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    LibraryAgent,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::LibraryAgent => "library_agent",
            Role::Student => "student",
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::LibraryAgent)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "library_agent" | "libraryagent" => Ok(Role::LibraryAgent),
            "student" => Ok(Role::Student),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// SQLx conversion for Role
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Stored credential row
#[derive(Debug, Clone, FromRow)]
pub struct Credential {
    pub credential_id: i32,
    pub username: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub role: Role,
    pub student_id: Option<i32>,
}

impl Credential {
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            role: self.role,
            student_id: self.student_id,
        }
    }
}

/// Resolved caller behind a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub username: String,
    pub role: Role,
    pub student_id: Option<i32>,
}

impl Identity {
    /// Admins and library agents run the lending desk
    pub fn require_staff(&self) -> AppResult<()> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Library staff role required".to_string()))
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator role required".to_string()))
        }
    }

    /// Staff may act on any student, a student only on themself
    pub fn require_student_access(&self, student_id: i32) -> AppResult<()> {
        if self.role.is_staff() || self.student_id == Some(student_id) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Not allowed to access student {}",
                student_id
            )))
        }
    }
}
