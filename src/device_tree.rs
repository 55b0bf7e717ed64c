// qemu-raspi/src/device_tree.rs
// DTB overlay and parameter merging through an external dtmerge binary.
use crate::error::DeviceTreeError;
use crate::report::{Diagnostic, Reporter};
use crate::runner::{ExternalCommand, Runner, path_arg};
use log::{debug, info};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

/// Overlays of this family need a real VideoCore and break QEMU boots.
const INCOMPATIBLE_OVERLAY_PREFIX: &str = "vc4-kms";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveKind {
    Param,
    Overlay,
    Other(String),
}

impl DirectiveKind {
    pub fn as_str(&self) -> &str {
        match self {
            DirectiveKind::Param => "dtparam",
            DirectiveKind::Overlay => "dtoverlay",
            DirectiveKind::Other(kind) => kind,
        }
    }
}

/// One `dtparam=` or `dtoverlay=` step of a merge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeDirective {
    pub kind: DirectiveKind,
    pub value: String,
}

impl MergeDirective {
    pub fn param(value: impl Into<String>) -> Self {
        Self {
            kind: DirectiveKind::Param,
            value: value.into(),
        }
    }

    pub fn overlay(value: impl Into<String>) -> Self {
        Self {
            kind: DirectiveKind::Overlay,
            value: value.into(),
        }
    }

    /// Parses a `dtparam=...` or `dtoverlay=...` config entry.
    pub fn parse(entry: &str) -> Option<Self> {
        match entry.split_once('=')? {
            ("dtparam", value) => Some(Self::param(value)),
            ("dtoverlay", value) => Some(Self::overlay(value)),
            _ => None,
        }
    }
}

impl fmt::Display for MergeDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind.as_str(), self.value)
    }
}

/// Splits `name,arg1,arg2` into the leading name and its trailing arguments.
fn split_args(value: &str) -> (&str, Vec<&str>) {
    let mut parts = value.split(',');
    let head = parts.next().unwrap_or_default();
    (head, parts.filter(|p| !p.is_empty()).collect())
}

/// Applies merge directives to a base DTB with an external merge tool.
#[derive(Debug, Clone)]
pub struct Merger {
    pub tool: PathBuf,
    pub overlays_dir: PathBuf,
}

impl Merger {
    pub fn new(tool: impl Into<PathBuf>, overlays_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            overlays_dir: overlays_dir.into(),
        }
    }

    /// Path of the `.dtbo` blob for an overlay name.
    pub fn overlay_path(&self, name: &str) -> PathBuf {
        self.overlays_dir.join(format!("{}.dtbo", name))
    }

    /// Copies `base_dtb` to `output` and applies `directives` in order.
    ///
    /// Each step merges from a scratch snapshot of `output` back into `output`,
    /// so the tool never reads and writes the same file. A missing overlay or a
    /// failing tool aborts the run. After a tool failure `output` may be partly
    /// written and must not be booted.
    ///
    /// With a dry-run runner `output` is left untouched: the base tree and the
    /// overlays are only checked for existence.
    pub fn merge(
        &self,
        base_dtb: &Path,
        output: &Path,
        directives: &[MergeDirective],
        runner: &mut dyn Runner,
        reporter: &mut dyn Reporter,
    ) -> Result<(), DeviceTreeError> {
        if same_file(base_dtb, output) {
            return Err(DeviceTreeError::SameFile(output.to_owned()));
        }
        let dry_run = runner.is_dry_run();
        if dry_run {
            fs::metadata(base_dtb).map_err(|source| DeviceTreeError::Io {
                path: base_dtb.to_owned(),
                source,
            })?;
        } else {
            fs::copy(base_dtb, output).map_err(|source| DeviceTreeError::Io {
                path: base_dtb.to_owned(),
                source,
            })?;
        }
        if directives.is_empty() {
            return Ok(());
        }

        let scratch = scratch_file(output)?;
        debug!("Scratch DTB: {}", scratch.path().display());

        for directive in directives {
            if !dry_run {
                fs::copy(output, scratch.path()).map_err(|source| DeviceTreeError::Io {
                    path: scratch.path().to_owned(),
                    source,
                })?;
            }
            let base = ExternalCommand::new(&self.tool)
                .arg(path_arg(scratch.path()))
                .arg(path_arg(output));

            let command = match directive.kind {
                DirectiveKind::Param => {
                    info!("Merge dtparam: {}", directive.value);
                    base.arg("-").args(directive.value.split(',').filter(|p| !p.is_empty()))
                }
                DirectiveKind::Overlay => {
                    let (name, params) = split_args(&directive.value);
                    if name.starts_with(INCOMPATIBLE_OVERLAY_PREFIX) {
                        reporter.warn(Diagnostic::SkippedOverlay(directive.value.clone()));
                        continue;
                    }
                    info!("Merge dtoverlay: {}", directive.value);
                    let dtbo = self.overlay_path(name);
                    if !dtbo.exists() {
                        return Err(DeviceTreeError::MissingOverlay(dtbo));
                    }
                    base.arg(path_arg(&dtbo)).args(params)
                }
                DirectiveKind::Other(ref kind) => {
                    reporter.warn(Diagnostic::UnknownMergeEntry {
                        kind: kind.clone(),
                        value: directive.value.clone(),
                    });
                    continue;
                }
            };

            let status = runner
                .run(&command)
                .map_err(|source| DeviceTreeError::Spawn {
                    command: command.to_string(),
                    source,
                })?;
            if !status.success() {
                return Err(DeviceTreeError::MergeTool {
                    command: command.to_string(),
                    status,
                });
            }
        }

        let scratch_path = scratch.path().to_owned();
        scratch.close().map_err(|source| DeviceTreeError::Io {
            path: scratch_path,
            source,
        })
    }
}

/// `path` made absolute with links resolved. A missing file is resolved
/// through its parent directory.
fn resolved(path: &Path) -> Option<PathBuf> {
    if let Ok(path) = fs::canonicalize(path) {
        return Some(path);
    }
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::canonicalize(parent).ok().map(|dir| dir.join(name))
}

/// Whether `a` and `b` name the same file, however they are spelled.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (resolved(a), resolved(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// A uniquely named scratch file beside `output`, removed when dropped.
fn scratch_file(output: &Path) -> Result<NamedTempFile, DeviceTreeError> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let prefix = format!(
        ".{}.",
        output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|source| DeviceTreeError::Io {
            path: dir.to_owned(),
            source,
        })
}
