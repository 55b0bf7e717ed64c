// qemu-raspi/src/config_txt/mod.rs
// Raspberry Pi config.txt
mod parser;
pub mod section;

pub use self::parser::{parse, parse_str};

use crate::model::Model;
use serde::{Deserialize, Serialize};

/// Boot configuration resolved for one model and boot mode.
///
/// The JSON form of this struct is the config descriptor accepted by `--config-json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootConfig {
    pub model: Model,
    #[serde(default)]
    pub os_prefix: String,
    pub kernel: String,
    pub initramfs: String,
    pub dtb: String,
    #[serde(default)]
    pub dtparam: Vec<String>,
    #[serde(default)]
    pub dtoverlay: Vec<String>,
    /// File holding the kernel command line.
    pub cmdline: String,
    /// Raw directives interpreted by the command assembler (e.g. `enable_uart=1`).
    #[serde(default)]
    pub misc: Vec<String>,
}

impl BootConfig {
    /// Firmware defaults for `model`, before any config.txt directive applies.
    pub fn new(model: Model) -> Self {
        let info = model.info();
        Self {
            model,
            os_prefix: String::new(),
            kernel: info.kernel.to_string(),
            initramfs: info.initramfs.to_string(),
            dtb: info.dtb.to_string(),
            dtparam: Vec::new(),
            dtoverlay: Vec::new(),
            cmdline: "cmdline.txt".to_string(),
            misc: Vec::new(),
        }
    }

    /// Flattens params, overlays and misc directives into `--config` style entries.
    pub fn directives(&self) -> Vec<String> {
        self.dtparam
            .iter()
            .map(|p| format!("dtparam={}", p))
            .chain(self.dtoverlay.iter().map(|o| format!("dtoverlay={}", o)))
            .chain(self.misc.iter().cloned())
            .collect()
    }
}
