// qemu-raspi/src/error.rs
use crate::runner::Exit;
use std::{io, path::PathBuf};
use thiserror::Error;

/// Errors raised while reading or resolving the boot configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unknown model: {0} (expected one of pi3, pi4)")]
    UnknownModel(String),
    #[error("invalid config descriptor {path:?}: {source}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no {0} given on the command line or in the config")]
    Missing(&'static str),
    #[error("cannot render config as JSON: {0}")]
    Render(#[source] serde_json::Error),
}

/// Errors raised while producing the merged device tree.
#[derive(Debug, Error)]
pub enum DeviceTreeError {
    #[error("dtoverlay does not exist: {0:?}")]
    MissingOverlay(PathBuf),
    #[error("refusing to merge {0:?} onto itself")]
    SameFile(PathBuf),
    #[error("device tree I/O on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to run merge tool `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("merge tool `{command}` failed with {status}")]
    MergeTool { command: String, status: Exit },
}

/// Errors raised by the emulator invocation.
#[derive(Debug, Error)]
pub enum ExternalToolError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` failed with {status}")]
    Failed { command: String, status: Exit },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    DeviceTree(#[from] DeviceTreeError),
    #[error(transparent)]
    ExternalTool(#[from] ExternalToolError),
}

impl Error {
    /// Process exit code for this failure. A failed emulator hands back its own code.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::ExternalTool(ExternalToolError::Failed {
                status: Exit::Code(code),
                ..
            }) => u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1),
            _ => 1,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
