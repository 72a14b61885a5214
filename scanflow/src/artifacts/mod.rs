//! Artifact path resolution.

mod resolver;

pub use resolver::{
    artifact_suffix, normalize_target, resolve, ArtifactLocation, ArtifactResolver, ArtifactSet,
    ROOT_FRAGMENT,
};
