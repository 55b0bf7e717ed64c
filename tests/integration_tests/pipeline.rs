use std::{fs, io, path::Path};

use qemu_raspi::{
    BootOptions, BootSource, DeviceTreeError, Diagnostic, DryRun, Error, MergeDirective, Merger,
    Model, assemble, launch,
};
use tempfile::tempdir;

use crate::integration_tests::common::{BASE_DTB, setup_boot_partition};

const CONFIG_TXT: &str = "\
# Raspberry Pi boot configuration
dtparam=audio=on

[pi3]
dtoverlay=pi3-only

[pi4]
dtoverlay=vc4-kms-v3d
max_framebuffers=2

[tryboot]
kernel=kernel8-try.img

[all]
dtoverlay=disable-bt
dtoverlay=uart1,txd1_pin=32
enable_uart=1
";

#[test]
fn test_config_txt_dry_run() -> io::Result<()> {
    let temp_dir = tempdir()?;
    let boot = setup_boot_partition(temp_dir.path(), CONFIG_TXT)?;
    let mut diagnostics = Vec::new();

    let source =
        BootSource::from_config_txt(&boot.config_txt, Model::Pi4, false, &mut diagnostics)
            .unwrap();
    assert_eq!(source.config.dtparam, ["audio=on"]);
    assert_eq!(
        source.config.dtoverlay,
        ["vc4-kms-v3d", "disable-bt", "uart1,txd1_pin=32"]
    );
    assert_eq!(source.config.kernel, "kernel8.img");
    assert_eq!(source.kernel(), boot.kernel);

    let opts = BootOptions {
        cmdline: Some(source.cmdline().unwrap()),
        earlycon: true,
        consoles: vec!["ttyAMA0".into()],
        config: source.config.directives(),
        qemu_args: vec!["-s".into()],
        ..Default::default()
    };
    let command = assemble(
        Model::Pi4,
        &source.dtb(),
        &source.kernel(),
        &opts,
        &mut diagnostics,
    );
    assert_eq!(
        command.cmdline,
        [
            "root=/dev/mmcblk0p2",
            "rootwait",
            "earlycon=pl011,mmio32,0xfe201000",
            "console=ttyAMA0",
            "8250.nr_uarts=1",
        ]
    );
    assert_eq!(
        command.directives,
        [
            MergeDirective::param("audio=on"),
            MergeDirective::overlay("vc4-kms-v3d"),
            MergeDirective::overlay("disable-bt"),
            MergeDirective::overlay("uart1,txd1_pin=32"),
        ]
    );

    let merger = Merger::new("dtmerge", &boot.overlays);
    let mut runner = DryRun::new();
    launch(
        &command,
        &merger,
        Path::new("qemu-system-aarch64"),
        &mut runner,
        &mut diagnostics,
    )
    .unwrap();

    assert_eq!(
        diagnostics,
        [
            Diagnostic::IgnoredLine("max_framebuffers=2".into()),
            Diagnostic::SkippedOverlay("vc4-kms-v3d".into()),
        ]
    );
    let commands = runner.commands();
    // vc4-kms-v3d never reaches dtmerge.
    assert_eq!(commands.len(), 4);
    assert!(commands[..3].iter().all(|c| c.program == Path::new("dtmerge")));
    assert!(
        commands[..3]
            .iter()
            .all(|c| !c.args.iter().any(|a| a.contains("vc4-kms")))
    );
    let qemu = &commands[3];
    assert_eq!(qemu.program, Path::new("qemu-system-aarch64"));
    assert_eq!(qemu.args.last().map(String::as_str), Some("-s"));

    // Dry run writes no merged tree.
    assert!(!command.dtb.exists());
    assert_eq!(fs::read(&boot.dtb)?, BASE_DTB);
    Ok(())
}

#[test]
fn test_tryboot_kernel() -> io::Result<()> {
    let temp_dir = tempdir()?;
    let boot = setup_boot_partition(temp_dir.path(), CONFIG_TXT)?;
    let mut diagnostics = Vec::new();

    let source =
        BootSource::from_config_txt(&boot.config_txt, Model::Pi3, true, &mut diagnostics)
            .unwrap();
    assert_eq!(source.config.kernel, "kernel8-try.img");
    assert_eq!(
        source.config.dtoverlay,
        ["pi3-only", "disable-bt", "uart1,txd1_pin=32"]
    );
    assert!(diagnostics.is_empty());
    Ok(())
}

#[test]
fn test_missing_overlay_aborts_before_qemu() -> io::Result<()> {
    let temp_dir = tempdir()?;
    let boot = setup_boot_partition(temp_dir.path(), "")?;
    let opts = BootOptions {
        config: vec![
            "dtoverlay=missing".into(),
            "dtoverlay=disable-bt".into(),
        ],
        ..Default::default()
    };
    let mut diagnostics = Vec::new();
    let command = assemble(Model::Pi4, &boot.dtb, &boot.kernel, &opts, &mut diagnostics);
    let merger = Merger::new("dtmerge", &boot.overlays);
    let mut runner = DryRun::new();

    let err = launch(
        &command,
        &merger,
        Path::new("qemu-system-aarch64"),
        &mut runner,
        &mut diagnostics,
    )
    .unwrap_err();

    match err {
        Error::DeviceTree(DeviceTreeError::MissingOverlay(path)) => {
            assert_eq!(path, boot.overlays.join("missing.dtbo"))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(runner.commands().is_empty());
    Ok(())
}
