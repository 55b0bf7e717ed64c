//! Boot Raspberry Pi kernels under QEMU.
//!
//! The pipeline runs in three stages: parse `config.txt` (or load a JSON
//! descriptor) into a [`BootConfig`], merge the configured overlays and
//! parameters into a QEMU-ready DTB with `dtmerge`, then assemble the kernel
//! command line and emulator arguments and run QEMU.
pub mod config_txt;
pub mod device_tree;
pub mod error;
pub mod model;
pub mod qemu;
pub mod report;
pub mod runner;
pub mod source;

pub use crate::config_txt::BootConfig;
pub use crate::device_tree::{DirectiveKind, MergeDirective, Merger};
pub use crate::error::{ConfigError, DeviceTreeError, Error, ExternalToolError, Result};
pub use crate::model::Model;
pub use crate::qemu::{BootCommand, BootOptions, assemble, launch};
pub use crate::report::{Diagnostic, LogReporter, Reporter};
pub use crate::runner::{DryRun, Exit, ExternalCommand, Runner, SystemRunner};
pub use crate::source::BootSource;
