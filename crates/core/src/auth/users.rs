use crate::error::{Result, SymbolServerError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::path::Path;
use symserve_api::{Permission, Subject};

/// Account directory loaded from the users file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDirectory {
    #[serde(default)]
    pub guest: Option<GuestAccount>,
    #[serde(default)]
    pub users: Vec<UserAccount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuestAccount {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub global: BTreeSet<Permission>,
    #[serde(default)]
    pub projects: BTreeMap<String, BTreeSet<Permission>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub name: String,
    /// Lowercase hex SHA-256 of the password.
    pub password_sha256: String,
    #[serde(default)]
    pub global: BTreeSet<Permission>,
    #[serde(default)]
    pub projects: BTreeMap<String, BTreeSet<Permission>>,
}

impl UserAccount {
    pub fn new(name: impl Into<String>, password: &str) -> Self {
        Self {
            name: name.into(),
            password_sha256: hash_password(password),
            global: BTreeSet::new(),
            projects: BTreeMap::new(),
        }
    }

    pub fn grant(mut self, project_id: impl Into<String>, permission: Permission) -> Self {
        self.projects
            .entry(project_id.into())
            .or_default()
            .insert(permission);
        self
    }

    pub fn grant_global(mut self, permission: Permission) -> Self {
        self.global.insert(permission);
        self
    }

    pub fn verify(&self, password: &str) -> bool {
        self.password_sha256
            .eq_ignore_ascii_case(&hash_password(password))
    }

    pub fn subject(&self) -> Subject {
        Subject {
            name: self.name.clone(),
            guest: false,
            global: self.global.clone(),
            projects: self.projects.clone(),
        }
    }
}

impl GuestAccount {
    pub fn subject(&self) -> Subject {
        Subject {
            name: "guest".to_string(),
            guest: true,
            global: self.global.clone(),
            projects: self.projects.clone(),
        }
    }
}

impl UserDirectory {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SymbolServerError::Config(format!("cannot read users file {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_user(mut self, user: UserAccount) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_guest(mut self, guest: GuestAccount) -> Self {
        self.guest = Some(guest);
        self
    }

    pub fn find(&self, name: &str) -> Option<&UserAccount> {
        self.users.iter().find(|user| user.name == name)
    }

    pub fn guest(&self) -> Option<&GuestAccount> {
        self.guest.as_ref().filter(|guest| guest.enabled)
    }
}

/// Lowercase hex SHA-256 digest, the form stored in the users file.
///
/// Unsalted and fast: the users file must stay private.
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
