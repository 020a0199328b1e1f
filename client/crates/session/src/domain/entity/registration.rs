//! Registration Details
//!
//! Data a first-time user supplies before the HR server creates their
//! account record.

use crate::domain::value_object::role::Role;
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationDetails {
    pub role: Role,
    pub bank_account_no: String,
    pub salary: Option<u64>,
    pub designation: Option<String>,
}

impl RegistrationDetails {
    pub fn new(role: Role, bank_account_no: impl Into<String>) -> Self {
        Self {
            role,
            bank_account_no: bank_account_no.into(),
            salary: None,
            designation: None,
        }
    }

    pub fn with_salary(mut self, salary: u64) -> Self {
        self.salary = Some(salary);
        self
    }

    pub fn with_designation(mut self, designation: impl Into<String>) -> Self {
        self.designation = Some(designation.into());
        self
    }

    pub fn validate(&self) -> AuthResult<()> {
        if !self.role.is_self_selectable() {
            return Err(AuthError::Registration(format!(
                "role '{}' cannot be chosen at registration",
                self.role.role_value()
            )));
        }

        let account_no = self.bank_account_no.trim();
        if account_no.is_empty() {
            return Err(AuthError::Registration(
                "bank account number is required".into(),
            ));
        }
        if !account_no.chars().all(|c| c.is_ascii_digit() || c == '-' || c == ' ') {
            return Err(AuthError::Registration(
                "bank account number may only contain digits".into(),
            ));
        }

        if self.salary == Some(0) {
            return Err(AuthError::Registration("salary must be positive".into()));
        }

        if self
            .designation
            .as_deref()
            .is_some_and(|d| d.trim().is_empty())
        {
            return Err(AuthError::Registration("designation cannot be blank".into()));
        }

        Ok(())
    }
}
