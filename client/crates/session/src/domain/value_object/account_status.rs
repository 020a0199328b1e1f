use super::role::Role;

/// Server answer to "does this email have an account, and may it sign in?"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountStatus {
    pub exists: bool,
    pub role_value: Option<String>,
    pub is_verified: bool,
    pub is_fired: bool,
}

impl AccountStatus {
    pub fn unknown_account() -> Self {
        Self::default()
    }

    /// Parsed server role; unrecognized values read as no role.
    pub fn role(&self) -> Option<Role> {
        self.role_value.as_deref().and_then(Role::from_role_value)
    }

    /// A terminated account is refused regardless of `exists`.
    pub fn is_terminated(&self) -> bool {
        self.is_fired
    }
}
