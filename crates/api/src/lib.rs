pub mod auth;
pub mod build;
pub mod error;
pub mod index;
pub mod models;

// Re-export commonly used types
pub use auth::{Authentication, Authorizer};
pub use build::{Artifact, ArtifactView, ArtifactsViewMode, Build, BuildRegistry};
pub use error::{ApiError, ApiResult};
pub use index::{MetadataEntries, MetadataIndex};
pub use models::*;
