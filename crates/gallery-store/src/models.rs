//! Store model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Back-reference from a fork to the effect and version it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub id: i64,
    pub version: i64,
}

/// Effect record - a shader entry in the gallery with its full edit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub parent: Option<ParentRef>,
    pub owner: String,
    pub hidden: bool,
    /// Ordered snapshots; the index is the version number.
    pub versions: Vec<Version>,
}

impl Effect {
    /// Thumbnail file name rendered for this effect.
    pub fn image_name(&self) -> String {
        format!("{}.png", self.id)
    }

    /// Most recent version, if any.
    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    /// Version by number.
    pub fn version(&self, number: i64) -> Option<&Version> {
        usize::try_from(number)
            .ok()
            .and_then(|n| self.versions.get(n))
    }

    /// Number of the most recent version.
    pub fn latest_version_number(&self) -> Option<i64> {
        self.versions.len().checked_sub(1).map(|n| n as i64)
    }
}

/// Version record - an immutable code snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub created_at: DateTime<Utc>,
    pub code: String,
}

/// Input for creating a fresh effect with a single initial version.
#[derive(Debug, Clone)]
pub struct NewEffect {
    pub parent: Option<ParentRef>,
    pub owner: String,
    pub code: String,
}

impl NewEffect {
    /// A root effect with no parent.
    pub fn root(owner: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            parent: None,
            owner: owner.into(),
            code: code.into(),
        }
    }

    /// A fork of `parent` at `version`.
    pub fn fork(
        parent: i64,
        version: i64,
        owner: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            parent: Some(ParentRef {
                id: parent,
                version,
            }),
            owner: owner.into(),
            code: code.into(),
        }
    }
}

/// User role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Moderator,
    User,
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Moderator => "moderator",
            Self::User => "user",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => Self::Admin,
            "moderator" => Self::Moderator,
            _ => Self::User,
        }
    }

    /// Whether this role may hide and reveal effects.
    pub fn can_moderate(&self) -> bool {
        matches!(self, Self::Admin | Self::Moderator)
    }
}

/// User record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Opaque password hash produced by the authentication layer.
    #[serde(skip_serializing)]
    pub password: Vec<u8>,
    pub email: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub provider: String,
    pub provider_id: String,
}

impl User {
    /// Validation rules shared with `NewUser`.
    pub fn validate(&self) -> Result<(), String> {
        validate_credentials(&self.provider, &self.provider_id, &self.password)
    }
}

/// Input for creating a new user.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub password: Vec<u8>,
    pub email: String,
    pub role: Role,
    pub active: bool,
    /// Defaults to now when absent.
    pub created_at: Option<DateTime<Utc>>,
    pub provider: String,
    pub provider_id: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), String> {
        validate_credentials(&self.provider, &self.provider_id, &self.password)
    }
}

pub const PROVIDER_PASSWORD: &str = "password";
pub const PROVIDER_TEST: &str = "test";

fn validate_credentials(provider: &str, provider_id: &str, password: &[u8]) -> Result<(), String> {
    if provider.is_empty() {
        return Err("provider is empty".to_string());
    }
    if provider != PROVIDER_TEST && provider_id.is_empty() {
        return Err("provider_id is empty".to_string());
    }
    if provider == PROVIDER_PASSWORD && password.is_empty() {
        return Err("password is empty".to_string());
    }
    Ok(())
}
