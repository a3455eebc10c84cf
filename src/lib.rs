//! SumatraPDF release pipeline
//!
//! This crate builds, signs, packages and publishes SumatraPDF
//! pre-release builds, and prunes old pre-releases from the object
//! stores they are published to.

pub mod config;
pub mod error;
pub mod layout;
pub mod logging;
pub mod manifest;
pub mod mock;
pub mod pipeline;
pub mod registry;
pub mod store;
pub mod tasks;
pub mod tools;
pub mod version;

pub use artifact_names::{ArtifactKind, ArtifactNameCodec, BuildVariant, DecodedName};
pub use config::{Environment, ReleaseConfig};
pub use error::{ErrorCategory, ReleaseError, ReleaseResult};
pub use pipeline::{Collaborators, Mode, Pipeline, PipelineContext, ReleaseSummary, RunOptions};
pub use registry::{ArtifactRegistry, RetentionPolicy, VersionListing};
pub use store::ObjectStore;
pub use version::{VersionInfo, VersionResolver};
