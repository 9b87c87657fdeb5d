//! Request/response shapes for the target API. Responses are tolerant:
//! every field the workflow can survive without is optional.

use serde::{Deserialize, Serialize};

/// Mutable per-iteration state for one generated identity.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub organization_id: Option<String>,
}

impl TestUser {
    /// Take over an issued token pair, refresh token included. Returns
    /// `false` (leaving the user untouched) when no access token came back.
    pub fn adopt_tokens(&mut self, token: TokenPair) -> bool {
        match token.access_token {
            Some(access) => {
                self.access_token = Some(access);
                self.refresh_token = token.refresh_token;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: Option<TokenPair>,
    pub user: Option<UserDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingResponse {
    pub organization: Option<OrganizationSummary>,
    pub app: Option<AppSummary>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSummary {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSummary {
    pub id: Option<String>,
    pub name: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    pub form: Option<FormDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDto {
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormsResponse {
    pub forms: Option<PagedResult<FormSummary>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub page_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_uses_camel_case() {
        let request = RegisterRequest {
            first_name: "LoadUser1".into(),
            last_name: "Test42".into(),
            email: "a@b.c".into(),
            password: "secret".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["firstName"], "LoadUser1");
        assert_eq!(json["lastName"], "Test42");
    }

    #[test]
    fn test_auth_response_tolerates_missing_fields() {
        let response: AuthResponse = serde_json::from_str("{}").unwrap();
        assert!(response.token.is_none());
        assert!(response.user.is_none());

        let response: AuthResponse = serde_json::from_str(
            r#"{"token":{"accessToken":"abc"},"user":{"id":"1"}}"#,
        )
        .unwrap();
        assert_eq!(response.token.unwrap().access_token.as_deref(), Some("abc"));
    }

    fn blank_user() -> TestUser {
        TestUser {
            email: "a@b.c".into(),
            password: "secret".into(),
            first_name: "LoadUser1".into(),
            last_name: "Test42".into(),
            access_token: None,
            refresh_token: None,
            organization_id: None,
        }
    }

    #[test]
    fn test_adopt_tokens_carries_both_tokens() {
        let mut user = blank_user();
        assert!(user.adopt_tokens(TokenPair {
            access_token: Some("access-1".into()),
            refresh_token: Some("refresh-1".into()),
        }));
        assert_eq!(user.access_token.as_deref(), Some("access-1"));
        assert_eq!(user.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[test]
    fn test_adopt_tokens_rejects_missing_access_token() {
        let mut user = blank_user();
        assert!(!user.adopt_tokens(TokenPair {
            access_token: None,
            refresh_token: Some("refresh-1".into()),
        }));
        assert!(user.access_token.is_none());
        assert!(user.refresh_token.is_none());
    }

    #[test]
    fn test_paged_result_defaults() {
        let response: FormsResponse =
            serde_json::from_str(r#"{"forms":{"items":[{"id":"f1"}]}}"#).unwrap();
        let page = response.forms.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_count, 0);
    }
}
