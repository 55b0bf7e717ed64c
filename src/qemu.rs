// qemu-raspi/src/qemu.rs
// Kernel command line and QEMU invocation for a Raspberry Pi boot.
use crate::device_tree::{MergeDirective, Merger};
use crate::error::{ExternalToolError, Result};
use crate::model::Model;
use crate::report::{Diagnostic, Reporter};
use crate::runner::{ExternalCommand, Runner, path_arg};
use log::info;
use std::path::{Path, PathBuf};

pub const DEFAULT_QEMU_BIN: &str = "qemu-system-aarch64";
/// Used when no command line is given at all.
pub const DEFAULT_CMDLINE: &str = "ignore_loglevel";
/// Appended for `enable_uart=1`.
pub const UART_TOKEN: &str = "8250.nr_uarts=1";
/// Marker added to the DTB file stem for the merged device tree.
pub const QEMU_DTB_SUFFIX: &str = "-qemu";

/// USB keyboard, mouse and network with SSH forwarded to host port 5022.
const FIXED_DEVICES: [&str; 8] = [
    "-device",
    "usb-kbd",
    "-device",
    "usb-mouse",
    "-device",
    "usb-net,netdev=net0",
    "-netdev",
    "user,id=net0,hostfwd=tcp::5022-:22",
];

/// Optional inputs to `assemble`.
#[derive(Debug, Clone, Default)]
pub struct BootOptions {
    pub initrd: Option<PathBuf>,
    /// SD card image.
    pub image: Option<PathBuf>,
    /// Explicit kernel command line, split on whitespace.
    pub cmdline: Option<String>,
    pub earlycon: bool,
    /// Replaces every `console=` token of the command line when non-empty.
    pub consoles: Vec<String>,
    /// Raw config.txt directives (`dtparam=...`, `dtoverlay=...`, `enable_uart=1`).
    pub config: Vec<String>,
    /// Passed to QEMU verbatim, after everything else.
    pub qemu_args: Vec<String>,
}

/// A fully assembled boot: merge plan plus emulator arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootCommand {
    pub machine: &'static str,
    pub cmdline: Vec<String>,
    pub base_dtb: PathBuf,
    /// Merged DTB handed to QEMU.
    pub dtb: PathBuf,
    pub directives: Vec<MergeDirective>,
    /// Emulator arguments, without the program itself.
    pub args: Vec<String>,
}

impl BootCommand {
    pub fn cmdline_string(&self) -> String {
        self.cmdline.join(" ")
    }

    pub fn command(&self, qemu_bin: &Path) -> ExternalCommand {
        ExternalCommand::new(qemu_bin).args(self.args.iter().cloned())
    }
}

/// Derives `<stem>-qemu.dtb` next to `dtb`.
pub fn merged_dtb_path(dtb: &Path) -> PathBuf {
    let stem = dtb
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    dtb.with_file_name(format!("{}{}.dtb", stem, QEMU_DTB_SUFFIX))
}

/// Builds the kernel command line, merge plan and QEMU arguments.
///
/// Nothing is run here. Config entries the assembler does not understand are
/// reported and dropped.
pub fn assemble(
    model: Model,
    dtb: &Path,
    kernel: &Path,
    opts: &BootOptions,
    reporter: &mut dyn Reporter,
) -> BootCommand {
    let info = model.info();

    let mut cmdline: Vec<String> = match opts.cmdline.as_deref() {
        Some(cmdline) if !cmdline.trim().is_empty() => {
            cmdline.split_whitespace().map(str::to_string).collect()
        }
        _ => vec![DEFAULT_CMDLINE.to_string()],
    };
    if opts.earlycon {
        cmdline.push(format!("earlycon={}", info.earlycon));
    }
    if !opts.consoles.is_empty() {
        cmdline.retain(|token| !token.starts_with("console="));
        cmdline.extend(opts.consoles.iter().map(|c| format!("console={}", c)));
    }

    let mut directives = Vec::new();
    for entry in &opts.config {
        if let Some(directive) = MergeDirective::parse(entry) {
            directives.push(directive);
        } else if entry == "enable_uart=1" {
            cmdline.push(UART_TOKEN.to_string());
        } else {
            reporter.warn(Diagnostic::IgnoredConfig(entry.clone()));
        }
    }

    let merged = merged_dtb_path(dtb);
    let mut args: Vec<String> = vec![
        "-machine".into(),
        info.machine.into(),
        "-dtb".into(),
        path_arg(&merged),
        "-kernel".into(),
        path_arg(kernel),
        "-append".into(),
        cmdline.join(" "),
    ];
    args.extend(FIXED_DEVICES.iter().map(|a| a.to_string()));
    if let Some(image) = &opts.image {
        args.push("-drive".into());
        args.push(format!("file={},if=sd,format=raw,index=0", image.display()));
    }
    if let Some(initrd) = &opts.initrd {
        args.push("-initrd".into());
        args.push(path_arg(initrd));
    }
    args.extend(opts.qemu_args.iter().cloned());

    BootCommand {
        machine: info.machine,
        cmdline,
        base_dtb: dtb.to_owned(),
        dtb: merged,
        directives,
        args,
    }
}

/// Merges the device tree, then runs QEMU and waits for it.
///
/// Pass a `DryRun` runner to plan without spawning anything.
pub fn launch(
    boot: &BootCommand,
    merger: &Merger,
    qemu_bin: &Path,
    runner: &mut dyn Runner,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    merger.merge(&boot.base_dtb, &boot.dtb, &boot.directives, runner, reporter)?;

    let command = boot.command(qemu_bin);
    info!("{}", command);
    let status = runner
        .run(&command)
        .map_err(|source| ExternalToolError::Spawn {
            command: command.to_string(),
            source,
        })?;
    if !status.success() {
        return Err(ExternalToolError::Failed {
            command: command.to_string(),
            status,
        }
        .into());
    }
    Ok(())
}
