//! SC-009: Fatal error taxonomy.
//!
//! Only document decoding and image-source validation abort a compile.
//! Everything else is reported through the result's warning list.

use thiserror::Error;

/// The template text could not be turned into a mapping tree.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml_ng::Error),

    #[error("empty YAML document")]
    Empty,

    #[error("unexpected YAML root: expected a mapping, found {0}")]
    NonMappingRoot(&'static str),
}

/// A compile call failed; no partial result is returned.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("unexpected template root after resolution")]
    UnexpectedRoot,

    #[error("image function {name} ({logical_id}) requires {field}")]
    MissingImageUri {
        name: String,
        logical_id: String,
        field: &'static str,
    },

    #[error("image function {name} ({logical_id}) has unresolved {field}: {uri}")]
    UnresolvedImageUri {
        name: String,
        logical_id: String,
        field: &'static str,
        uri: String,
    },
}

impl CompileError {
    /// Logical id of the function an image error is scoped to.
    pub fn logical_id(&self) -> Option<&str> {
        match self {
            Self::MissingImageUri { logical_id, .. } | Self::UnresolvedImageUri { logical_id, .. } => {
                Some(logical_id)
            }
            _ => None,
        }
    }
}
