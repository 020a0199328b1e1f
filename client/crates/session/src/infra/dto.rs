//! HR API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

use crate::domain::entity::{
    provider_identity::ProviderIdentity, registration::RegistrationDetails,
};
use crate::domain::value_object::{account_status::AccountStatus, email::Email, role::Role};

// ============================================================================
// Account Check
// ============================================================================

/// `GET /users/check` response. Missing or null fields read as false/none.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCheckResponse {
    #[serde(default)]
    pub exists: Option<bool>,
    #[serde(default)]
    pub role_value: Option<String>,
    #[serde(default)]
    pub is_verified: Option<bool>,
    #[serde(default)]
    pub is_fired: Option<bool>,
}

impl From<AccountCheckResponse> for AccountStatus {
    fn from(dto: AccountCheckResponse) -> Self {
        AccountStatus {
            exists: dto.exists.unwrap_or(false),
            role_value: dto.role_value.filter(|r| !r.trim().is_empty()),
            is_verified: dto.is_verified.unwrap_or(false),
            is_fired: dto.is_fired.unwrap_or(false),
        }
    }
}

// ============================================================================
// Token
// ============================================================================

/// `POST /jwt` request
#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest<'a> {
    pub email: &'a str,
}

/// `POST /jwt` response
#[derive(Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// ============================================================================
// Role Check
// ============================================================================

/// `GET /users/{role}/{email}` response; each endpoint fills one field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleFlagResponse {
    #[serde(rename = "isAdmin", default)]
    pub admin: Option<bool>,
    #[serde(rename = "isHR", alias = "isHr", default)]
    pub hr: Option<bool>,
    #[serde(rename = "isEmployee", default)]
    pub employee: Option<bool>,
}

impl RoleFlagResponse {
    pub fn flag(&self, role: Role) -> Option<bool> {
        match role {
            Role::Admin => self.admin,
            Role::Hr => self.hr,
            Role::Employee => self.employee,
        }
    }
}

// ============================================================================
// Registration
// ============================================================================

/// `POST /users` request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserRequest {
    pub uid: String,
    pub name: Option<String>,
    pub email: String,
    pub photo: Option<String>,
    pub role: Role,
    pub bank_account_no: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    pub is_verified: bool,
}

impl NewUserRequest {
    pub fn new(identity: &ProviderIdentity, email: &Email, details: &RegistrationDetails) -> Self {
        Self {
            uid: identity.uid.clone(),
            name: identity.display_name.clone(),
            email: email.as_str().to_owned(),
            photo: identity.photo_url.clone(),
            role: details.role,
            bank_account_no: details.bank_account_no.trim().to_owned(),
            salary: details.salary,
            designation: details.designation.clone(),
            is_verified: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_check_tolerates_missing_and_null_fields() {
        let dto: AccountCheckResponse =
            serde_json::from_str(r#"{"exists":true,"isFired":null}"#).unwrap();
        let status = AccountStatus::from(dto);
        assert!(status.exists);
        assert!(!status.is_fired);
        assert!(!status.is_verified);

        let dto: AccountCheckResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(AccountStatus::from(dto), AccountStatus::unknown_account());
    }

    #[test]
    fn account_check_reads_role_and_flags() {
        let dto: AccountCheckResponse = serde_json::from_str(
            r#"{"exists":true,"roleValue":"HR","isVerified":true,"isFired":false}"#,
        )
        .unwrap();
        let status = AccountStatus::from(dto);
        assert_eq!(status.role(), Some(Role::Hr));
        assert!(status.is_verified);
    }

    #[test]
    fn role_flags_are_per_endpoint() {
        let dto: RoleFlagResponse = serde_json::from_str(r#"{"isHR":true}"#).unwrap();
        assert_eq!(dto.flag(Role::Hr), Some(true));
        assert_eq!(dto.flag(Role::Admin), None);
    }

    #[test]
    fn new_user_request_shape() {
        let identity = ProviderIdentity::new("u1", Some("a@x.com".into())).with_display_name("Ann");
        let details = RegistrationDetails::new(Role::Employee, "1234").with_salary(30_000);
        let body = serde_json::to_value(NewUserRequest::new(
            &identity,
            &Email::new("a@x.com").unwrap(),
            &details,
        ))
        .unwrap();
        assert_eq!(body["role"], "Employee");
        assert_eq!(body["bankAccountNo"], "1234");
        assert_eq!(body["salary"], 30_000);
        assert_eq!(body["isVerified"], false);
        assert!(body.get("designation").is_none());
    }
}
