// qemu-raspi/src/model.rs
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Supported Raspberry Pi models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Pi3,
    Pi4,
}

/// Fixed per-model data: config.txt filter tag, QEMU machine and firmware asset names.
#[derive(Debug, PartialEq, Eq)]
pub struct ModelInfo {
    pub model: Model,
    pub name: &'static str,
    /// Section header selecting this model in config.txt.
    pub filter: &'static str,
    pub machine: &'static str,
    /// PL011 early console address, as passed to `earlycon=`.
    pub earlycon: &'static str,
    pub dtb: &'static str,
    pub kernel: &'static str,
    pub initramfs: &'static str,
}

// Indexed by `Model as usize`.
static MODELS: [ModelInfo; 2] = [
    ModelInfo {
        model: Model::Pi3,
        name: "pi3",
        filter: "[pi3]",
        machine: "raspi3b",
        earlycon: "pl011,mmio32,0x3f215040",
        dtb: "bcm2710-rpi-3-b.dtb",
        kernel: "kernel7.img",
        initramfs: "initramfs7",
    },
    ModelInfo {
        model: Model::Pi4,
        name: "pi4",
        filter: "[pi4]",
        machine: "raspi4b",
        earlycon: "pl011,mmio32,0xfe201000",
        dtb: "bcm2711-rpi-4-b.dtb",
        kernel: "kernel8.img",
        initramfs: "initramfs8",
    },
];

impl Model {
    pub fn info(self) -> &'static ModelInfo {
        &MODELS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }
}

impl FromStr for Model {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MODELS
            .iter()
            .find(|info| info.name == s)
            .map(|info| info.model)
            .ok_or_else(|| ConfigError::UnknownModel(s.to_string()))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
