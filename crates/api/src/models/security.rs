use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Download build artifacts, symbol files included.
    ViewBuildRuntimeData,
    /// See artifacts stored under the hidden artifacts directory.
    ViewHiddenArtifacts,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::ViewBuildRuntimeData => f.write_str("VIEW_BUILD_RUNTIME_DATA"),
            Permission::ViewHiddenArtifacts => f.write_str("VIEW_HIDDEN_ARTIFACTS"),
        }
    }
}

/// An authenticated principal. Passed explicitly wherever work runs on its behalf.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Subject {
    pub name: String,
    pub guest: bool,
    pub global: BTreeSet<Permission>,
    pub projects: BTreeMap<String, BTreeSet<Permission>>,
}

impl Subject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn grant_global(mut self, permission: Permission) -> Self {
        self.global.insert(permission);
        self
    }

    pub fn grant(mut self, project_id: impl Into<String>, permission: Permission) -> Self {
        self.projects
            .entry(project_id.into())
            .or_default()
            .insert(permission);
        self
    }

    pub fn is_permission_granted_for_project(
        &self,
        project_id: &str,
        permission: Permission,
    ) -> bool {
        self.global.contains(&permission)
            || self
                .projects
                .get(project_id)
                .is_some_and(|granted| granted.contains(&permission))
    }
}

/// The predicate a caller must satisfy: `permission` on `project_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCheck {
    pub project_id: String,
    pub permission: Permission,
}

impl AccessCheck {
    pub fn new(project_id: impl Into<String>, permission: Permission) -> Self {
        Self {
            project_id: project_id.into(),
            permission,
        }
    }

    pub fn is_satisfied_by(&self, subject: &Subject) -> bool {
        subject.is_permission_granted_for_project(&self.project_id, self.permission)
    }
}

/// A terminal response produced by an authorizer. Written to the client unchanged.
#[derive(Debug, Clone)]
pub struct Denial {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub message: String,
}

impl Denial {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            message: message.into(),
        }
    }
}
