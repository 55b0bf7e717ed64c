// qemu-raspi/src/source.rs
// Where a BootConfig came from, and the boot asset paths it resolves to.
use crate::config_txt::{self, BootConfig};
use crate::error::ConfigError;
use crate::model::Model;
use crate::report::Reporter;
use log::info;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// A boot configuration together with the directory its assets live in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootSource {
    pub config: BootConfig,
    pub dir: PathBuf,
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

impl BootSource {
    /// Loads a JSON config descriptor.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        info!("Load config from: {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Descriptor {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self {
            config,
            dir: parent_dir(path),
        })
    }

    /// Parses a config.txt for `model`, honouring `[tryboot]` when `tryboot` is set.
    pub fn from_config_txt(
        path: &Path,
        model: Model,
        tryboot: bool,
        reporter: &mut dyn Reporter,
    ) -> Result<Self, ConfigError> {
        let config = config_txt::parse(path, model, tryboot, reporter)?;
        Ok(Self {
            config,
            dir: parent_dir(path),
        })
    }

    /// `<dir>/<os_prefix><name>`, the way the firmware locates boot files.
    pub fn asset(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.config.os_prefix, name))
    }

    pub fn dtb(&self) -> PathBuf {
        self.asset(&self.config.dtb)
    }

    pub fn kernel(&self) -> PathBuf {
        self.asset(&self.config.kernel)
    }

    /// The initramfs, if the file is actually there.
    pub fn initramfs(&self) -> Option<PathBuf> {
        let path = self.asset(&self.config.initramfs);
        if path.exists() {
            Some(path)
        } else {
            info!("No initramfs at {}", path.display());
            None
        }
    }

    pub fn overlays_dir(&self) -> PathBuf {
        self.asset("overlays")
    }

    /// First line of the cmdline file, trimmed.
    pub fn cmdline(&self) -> Result<String, ConfigError> {
        let path = self.asset(&self.config.cmdline);
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }
}
