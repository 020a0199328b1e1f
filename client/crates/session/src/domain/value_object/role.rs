use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-side role of an HR portal user.
///
/// The server answers one yes/no question per role; the flags are kept
/// independent of each other on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Employee,
    #[serde(rename = "HR")]
    Hr,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Hr, Role::Employee];

    #[inline]
    pub const fn code(&self) -> &'static str {
        use Role::*;
        match self {
            Employee => "employee",
            Hr => "hr",
            Admin => "admin",
        }
    }

    /// Path segment of the role check endpoint (`/users/{segment}/{email}`)
    #[inline]
    pub const fn endpoint_segment(&self) -> &'static str {
        self.code()
    }

    /// Field carrying the yes/no answer in the role check response
    #[inline]
    pub const fn flag_field(&self) -> &'static str {
        use Role::*;
        match self {
            Employee => "isEmployee",
            Hr => "isHR",
            Admin => "isAdmin",
        }
    }

    /// The `roleValue` string the server stores
    #[inline]
    pub const fn role_value(&self) -> &'static str {
        use Role::*;
        match self {
            Employee => "Employee",
            Hr => "HR",
            Admin => "Admin",
        }
    }

    /// Higher wins when a caller wants a single effective role
    #[inline]
    pub const fn precedence(&self) -> u8 {
        use Role::*;
        match self {
            Employee => 1,
            Hr => 2,
            Admin => 3,
        }
    }

    /// Roles a new user may pick for themselves at registration
    #[inline]
    pub const fn is_self_selectable(&self) -> bool {
        matches!(self, Role::Employee | Role::Hr)
    }

    pub fn from_role_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "employee" => Some(Role::Employee),
            "hr" => Some(Role::Hr),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
