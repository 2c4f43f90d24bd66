//! Role hierarchy checks.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Roles from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Tenant = 1,
    Owner = 2,
    Agency = 3,
    TrustedVerifier = 4,
    Admin = 5,
    SuperAdmin = 6,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Tenant,
        Role::Owner,
        Role::Agency,
        Role::TrustedVerifier,
        Role::Admin,
        Role::SuperAdmin,
    ];

    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Tenant => "tenant",
            Role::Owner => "owner",
            Role::Agency => "agency",
            Role::TrustedVerifier => "trusted-verifier",
            Role::Admin => "admin",
            Role::SuperAdmin => "super-admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Rank of a role name; unknown names rank 0.
pub fn rank(role: &str) -> u8 {
    role.parse::<Role>().map_or(0, Role::rank)
}

/// An unknown caller role ranks below every real role. An unknown required
/// role refuses everyone.
pub fn is_authorized(caller_role: &str, required_role: &str) -> bool {
    match required_role.parse::<Role>() {
        Ok(required) => rank(caller_role) >= required.rank(),
        Err(e) => {
            tracing::warn!(
                error = %e,
                caller_role = %caller_role,
                "Required role is not recognised"
            );
            false
        }
    }
}
