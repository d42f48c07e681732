//! Domain error taxonomy.
//!
//! # Purpose
//! One consolidated error type for every service and repository contract.
//! Services return these verbatim; transport planes map them to their own
//! user-facing codes. Storage failures wrap the underlying cause.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("user not found")]
    UserNotFound,
    #[error("tenant not found")]
    TenantNotFound,
    #[error("client not found")]
    ClientNotFound,
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("authorization code not found")]
    CodeNotFound,
    #[error("token not found")]
    TokenNotFound,
    #[error("role not found")]
    RoleNotFound,
    #[error("project not found")]
    ProjectNotFound,
    #[error("assignment not found")]
    AssignmentNotFound,

    #[error("user already exists")]
    UserAlreadyExists,
    #[error("tenant already exists")]
    TenantAlreadyExists,
    #[error("client already exists")]
    ClientAlreadyExists,
    #[error("role already exists")]
    RoleAlreadyExists,
    #[error("project already exists")]
    ProjectAlreadyExists,
    #[error("assignment already exists")]
    AssignmentAlreadyExists,
    #[error("membership already exists")]
    MembershipAlreadyExists,
    #[error("authorization code already used")]
    CodeAlreadyUsed,
    #[error("token revoked")]
    TokenRevoked,

    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is locked")]
    AccountLocked,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("security violation: {0}")]
    SecurityViolation(String),
    #[error("access denied")]
    AccessDenied,

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl Error {
    /// Shorthand for validation failures.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }
}
