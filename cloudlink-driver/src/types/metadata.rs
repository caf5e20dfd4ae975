use serde::{Deserialize, Serialize};

/// Which contract a driver implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Compute,
    LoadBalancer,
    Dns,
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compute => write!(f, "compute"),
            Self::LoadBalancer => write!(f, "load balancer"),
            Self::Dns => write!(f, "dns"),
        }
    }
}

/// Authentication scheme a driver expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthScheme {
    /// A single bearer/API token.
    ApiToken,
    /// An access key id plus a signing secret.
    AccessKey,
    /// Username/password exchanged for a session token.
    Password,
}

/// The input type of a credential field (affects UI rendering).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Plain text input.
    Text,
    /// Masked/password input.
    Password,
}

/// Definition of a single credential field required by a driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialField {
    /// Machine-readable key, as used by [`Credentials::from_map`](crate::Credentials::from_map).
    pub key: String,
    /// Human-readable label.
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field may be omitted.
    #[serde(default)]
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

impl CredentialField {
    pub(crate) fn text(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            field_type: FieldType::Text,
            optional: false,
            help_text: None,
        }
    }

    pub(crate) fn secret(key: &str, label: &str) -> Self {
        Self {
            field_type: FieldType::Password,
            ..Self::text(key, label)
        }
    }

    #[must_use]
    pub(crate) fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub(crate) fn help(mut self, text: &str) -> Self {
        self.help_text = Some(text.to_string());
        self
    }
}

/// Static description of a registered driver.
///
/// Obtain via `ComputeDriver::metadata()` (type level), a
/// [`DriverFactory`](crate::DriverFactory), or
/// [`all_driver_metadata()`](crate::all_driver_metadata).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverMetadata {
    /// Registry key (lowercase).
    pub id: String,
    /// Human-readable provider name.
    pub name: String,
    pub kind: DriverKind,
    pub auth: AuthScheme,
    /// Credential fields for UI or config validation.
    pub required_fields: Vec<CredentialField>,
    /// Provider website.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}
