use serde::{Deserialize, Serialize};
use std::fmt;

/// Role attached to an admin account, carried into issued sessions.
///
/// Accounts are provisioned out of band; there is no self-service role
/// escalation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(i16)]
pub enum AdminRole {
    #[default]
    Admin = 0,
    SuperAdmin = 1,
}

impl AdminRole {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn code(&self) -> &'static str {
        use AdminRole::*;
        match self {
            Admin => "admin",
            SuperAdmin => "super_admin",
        }
    }

    #[inline]
    pub const fn is_super_admin(&self) -> bool {
        matches!(self, AdminRole::SuperAdmin)
    }

    #[inline]
    pub fn from_id(id: i16) -> Self {
        use AdminRole::*;
        match id {
            0 => Admin,
            1 => SuperAdmin,
            _ => {
                tracing::error!("Invalid AdminRole id: {}", id);
                unreachable!("Invalid AdminRole id: {}", id)
            }
        }
    }

    #[inline]
    pub fn from_code(code: &str) -> Self {
        use AdminRole::*;
        match code {
            "admin" => Admin,
            "super_admin" => SuperAdmin,
            _ => {
                tracing::error!("Invalid AdminRole code: {}", code);
                unreachable!("Invalid AdminRole code: {}", code)
            }
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
