// qemu-raspi/src/config_txt/parser.rs
use super::BootConfig;
use super::section::{Event, SectionFilter, SectionState};
use crate::error::ConfigError;
use crate::model::Model;
use crate::report::{Diagnostic, Reporter};
use log::{debug, info};
use regex::Regex;
use std::{fs, path::Path, sync::LazyLock};

// `initramfs <file> [followkernel|<address>]` is the one directive without `=`.
static INITRAMFS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^initramfs\s+(\S+)(?:\s+(\S+))?").unwrap());

/// Reads and parses a config.txt file.
pub fn parse(
    path: &Path,
    model: Model,
    tryboot: bool,
    reporter: &mut dyn Reporter,
) -> Result<BootConfig, ConfigError> {
    info!(
        "Parse: {} (model={}, tryboot={})",
        path.display(),
        model,
        tryboot
    );
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    Ok(parse_str(&text, model, tryboot, reporter))
}

/// Parses config.txt contents. Lines before the first header are accepted.
pub fn parse_str(
    text: &str,
    model: Model,
    tryboot: bool,
    reporter: &mut dyn Reporter,
) -> BootConfig {
    let filter = SectionFilter::new(model, tryboot);
    let mut config = BootConfig::new(model);
    let mut state = SectionState::Accepting;

    for line in text.lines() {
        let (next, event) = filter.step(state, line);
        state = next;
        match event {
            Event::Header { name, accepted } => {
                if accepted {
                    info!("Found: {}", name);
                } else {
                    info!("Found: {} (Ignored)", name);
                }
            }
            Event::Directive(directive) => apply(&mut config, directive, reporter),
            Event::Discarded(directive) => debug!("Skipped: {}", directive),
            Event::Blank => {}
        }
    }

    config
}

fn apply(config: &mut BootConfig, line: &str, reporter: &mut dyn Reporter) {
    let (key, val) = if let Some(caps) = INITRAMFS.captures(line) {
        if let Some(placement) = caps.get(2) {
            debug!("initramfs placement ignored: {}", placement.as_str());
        }
        ("initramfs", caps.get(1).map_or("", |m| m.as_str()))
    } else if let Some(kv) = line.split_once('=') {
        kv
    } else {
        reporter.warn(Diagnostic::IgnoredLine(line.to_string()));
        return;
    };

    match key {
        "os_prefix" => config.os_prefix = val.to_string(),
        "kernel" => config.kernel = val.to_string(),
        "initramfs" => config.initramfs = val.to_string(),
        "cmdline" => config.cmdline = val.to_string(),
        "dtparam" => config.dtparam.push(val.to_string()),
        "dtoverlay" => config.dtoverlay.push(val.to_string()),
        "enable_uart" => config.misc.push(line.to_string()),
        _ => reporter.warn(Diagnostic::IgnoredLine(line.to_string())),
    }
}
