use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AuthScheme;

/// Validation error for driver credentials.
///
/// Returned when credential fields are missing, empty, or have an invalid format.
#[derive(Error, Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CredentialValidationError {
    /// A required credential field is missing entirely.
    #[error("Missing required field: {label}")]
    MissingField { field: String, label: String },
    /// A credential field is present but empty/whitespace-only.
    #[error("Field must not be empty: {label}")]
    EmptyField { field: String, label: String },
    /// The credentials do not match what the driver expects.
    #[error("{label}: {reason}")]
    InvalidFormat {
        field: String,
        label: String,
        reason: String,
    },
}

/// Credential container, one variant per [`AuthScheme`].
///
/// Pass this to [`DriverFactory::connect`](crate::DriverFactory::connect) or to a
/// driver's `from_credentials` constructor.
///
/// # Serialization
///
/// Serialized as a tagged enum with `"scheme"` as the tag:
///
/// ```json
/// { "scheme": "accessKey", "access_key_id": "...", "secret_access_key": "..." }
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "camelCase")]
pub enum Credentials {
    /// Single API token (Cloudflare, Equinix Metal).
    ApiToken { token: String },
    /// Access key id and signing secret (Outscale, CloudStack).
    AccessKey {
        access_key_id: String,
        secret_access_key: String,
    },
    /// Username/password exchanged for a token (OpenStack Keystone).
    Password {
        username: String,
        password: String,
        /// Project (tenant) to scope the token to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project: Option<String>,
        /// User and project domain, `"Default"` when omitted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        domain: Option<String>,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiToken { .. } => f
                .debug_struct("ApiToken")
                .field("token", &"***")
                .finish(),
            Self::AccessKey { access_key_id, .. } => f
                .debug_struct("AccessKey")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"***")
                .finish(),
            Self::Password {
                username,
                project,
                domain,
                ..
            } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"***")
                .field("project", project)
                .field("domain", domain)
                .finish(),
        }
    }
}

impl Credentials {
    /// Shorthand for [`Credentials::ApiToken`].
    pub fn api_token(token: impl Into<String>) -> Self {
        Self::ApiToken {
            token: token.into(),
        }
    }

    /// Shorthand for [`Credentials::AccessKey`].
    pub fn access_key(access_key_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::AccessKey {
            access_key_id: access_key_id.into(),
            secret_access_key: secret.into(),
        }
    }

    /// The scheme this credential variant belongs to.
    pub fn scheme(&self) -> AuthScheme {
        match self {
            Self::ApiToken { .. } => AuthScheme::ApiToken,
            Self::AccessKey { .. } => AuthScheme::AccessKey,
            Self::Password { .. } => AuthScheme::Password,
        }
    }

    /// Construct credentials from a flat key-value map, validating required fields.
    ///
    /// Keys are the camelCase names listed in
    /// [`DriverMetadata::required_fields`](crate::DriverMetadata::required_fields).
    pub fn from_map(
        scheme: AuthScheme,
        map: &HashMap<String, String>,
    ) -> Result<Self, CredentialValidationError> {
        match scheme {
            AuthScheme::ApiToken => Ok(Self::ApiToken {
                token: required_field(map, "apiToken", "API Token")?,
            }),
            AuthScheme::AccessKey => Ok(Self::AccessKey {
                access_key_id: required_field(map, "accessKeyId", "Access Key ID")?,
                secret_access_key: required_field(map, "secretAccessKey", "Secret Access Key")?,
            }),
            AuthScheme::Password => Ok(Self::Password {
                username: required_field(map, "username", "Username")?,
                password: required_field(map, "password", "Password")?,
                project: optional_field(map, "project"),
                domain: optional_field(map, "domain"),
            }),
        }
    }

    /// Convert credentials to a flat map for key-value storage.
    pub fn to_map(&self) -> HashMap<String, String> {
        match self {
            Self::ApiToken { token } => [("apiToken".to_string(), token.clone())].into(),
            Self::AccessKey {
                access_key_id,
                secret_access_key,
            } => [
                ("accessKeyId".to_string(), access_key_id.clone()),
                ("secretAccessKey".to_string(), secret_access_key.clone()),
            ]
            .into(),
            Self::Password {
                username,
                password,
                project,
                domain,
            } => {
                let mut map: HashMap<String, String> = [
                    ("username".to_string(), username.clone()),
                    ("password".to_string(), password.clone()),
                ]
                .into();
                if let Some(project) = project {
                    map.insert("project".to_string(), project.clone());
                }
                if let Some(domain) = domain {
                    map.insert("domain".to_string(), domain.clone());
                }
                map
            }
        }
    }

    /// The API token, or a scheme mismatch error.
    pub(crate) fn into_api_token(self) -> Result<String, CredentialValidationError> {
        match self {
            Self::ApiToken { token } => Ok(token),
            other => Err(other.scheme_mismatch(AuthScheme::ApiToken)),
        }
    }

    /// `(access_key_id, secret_access_key)`, or a scheme mismatch error.
    pub(crate) fn into_access_key(self) -> Result<(String, String), CredentialValidationError> {
        match self {
            Self::AccessKey {
                access_key_id,
                secret_access_key,
            } => Ok((access_key_id, secret_access_key)),
            other => Err(other.scheme_mismatch(AuthScheme::AccessKey)),
        }
    }

    /// `(username, password, project, domain)`, or a scheme mismatch error.
    pub(crate) fn into_password(self) -> Result<PasswordParts, CredentialValidationError> {
        match self {
            Self::Password {
                username,
                password,
                project,
                domain,
            } => Ok((username, password, project, domain)),
            other => Err(other.scheme_mismatch(AuthScheme::Password)),
        }
    }

    fn scheme_mismatch(&self, expected: AuthScheme) -> CredentialValidationError {
        CredentialValidationError::InvalidFormat {
            field: "scheme".to_string(),
            label: "Credentials".to_string(),
            reason: format!("expected {expected:?} credentials, got {:?}", self.scheme()),
        }
    }
}

pub(crate) type PasswordParts = (String, String, Option<String>, Option<String>);

fn required_field(
    map: &HashMap<String, String>,
    key: &str,
    label: &str,
) -> Result<String, CredentialValidationError> {
    match map.get(key) {
        None => Err(CredentialValidationError::MissingField {
            field: key.to_string(),
            label: label.to_string(),
        }),
        Some(v) if v.trim().is_empty() => Err(CredentialValidationError::EmptyField {
            field: key.to_string(),
            label: label.to_string(),
        }),
        Some(v) => Ok(v.clone()),
    }
}

fn optional_field(map: &HashMap<String, String>, key: &str) -> Option<String> {
    map.get(key)
        .filter(|v| !v.trim().is_empty())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_token_roundtrip() {
        let map: HashMap<String, String> =
            [("apiToken".to_string(), "my-token".to_string())].into();
        let cred = Credentials::from_map(AuthScheme::ApiToken, &map).unwrap();
        assert_eq!(cred.scheme(), AuthScheme::ApiToken);
        assert_eq!(cred.to_map(), map);
    }

    #[test]
    fn access_key_roundtrip() {
        let map: HashMap<String, String> = [
            ("accessKeyId".to_string(), "AK".to_string()),
            ("secretAccessKey".to_string(), "SK".to_string()),
        ]
        .into();
        let cred = Credentials::from_map(AuthScheme::AccessKey, &map).unwrap();
        assert_eq!(cred.to_map(), map);
    }

    #[test]
    fn password_optional_fields() {
        let map: HashMap<String, String> = [
            ("username".to_string(), "admin".to_string()),
            ("password".to_string(), "pw".to_string()),
            ("project".to_string(), "  ".to_string()),
        ]
        .into();
        let cred = Credentials::from_map(AuthScheme::Password, &map).unwrap();
        assert_eq!(cred.scheme(), AuthScheme::Password);
        let Credentials::Password {
            project, domain, ..
        } = &cred
        else {
            return;
        };
        assert_eq!(project, &None);
        assert_eq!(domain, &None);
        assert!(!cred.to_map().contains_key("project"));
    }

    #[test]
    fn missing_field() {
        let res = Credentials::from_map(AuthScheme::AccessKey, &HashMap::new());
        assert!(
            matches!(&res, Err(CredentialValidationError::MissingField { field, .. }) if field == "accessKeyId"),
            "unexpected result: {res:?}"
        );
    }

    #[test]
    fn empty_field() {
        let map: HashMap<String, String> = [("apiToken".to_string(), "  ".to_string())].into();
        let res = Credentials::from_map(AuthScheme::ApiToken, &map);
        assert!(
            matches!(&res, Err(CredentialValidationError::EmptyField { .. })),
            "unexpected result: {res:?}"
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let cred = Credentials::access_key("AKID", "super-secret");
        let dbg = format!("{cred:?}");
        assert!(dbg.contains("AKID"));
        assert!(!dbg.contains("super-secret"));
    }

    #[test]
    fn scheme_mismatch_is_invalid_format() {
        assert_eq!(Credentials::api_token("t").into_api_token().unwrap(), "t");
        assert!(matches!(
            Credentials::api_token("t").into_access_key(),
            Err(CredentialValidationError::InvalidFormat { ref field, .. }) if field == "scheme"
        ));
        let (ak, sk) = Credentials::access_key("AK", "SK").into_access_key().unwrap();
        assert_eq!((ak.as_str(), sk.as_str()), ("AK", "SK"));
    }

    #[test]
    fn serde_tagged_by_scheme() {
        let json = serde_json::to_value(Credentials::api_token("t")).unwrap();
        assert_eq!(json["scheme"], "apiToken");
        assert_eq!(json["token"], "t");
    }
}
