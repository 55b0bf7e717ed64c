// Drives the real process runner against shell scripts standing in for
// dtmerge and QEMU. Kept to a single test so no other test forks while a
// script is being written.
#![cfg(unix)]

use std::{fs, io};

use qemu_raspi::{
    BootOptions, Error, Exit, ExternalToolError, Merger, Model, SystemRunner, assemble, launch,
};
use tempfile::tempdir;

use crate::integration_tests::common::{BASE_DTB, setup_boot_partition, write_script};

#[test]
fn test_merge_and_run_with_real_processes() -> io::Result<()> {
    let temp_dir = tempdir()?;
    let dir = temp_dir.path();
    let boot = setup_boot_partition(dir, "")?;

    // Copies the input blob and appends its remaining arguments.
    let dtmerge = dir.join("dtmerge");
    write_script(
        &dtmerge,
        r#"in="$1"; out="$2"; shift 2
[ "$in" != "$out" ] || exit 9
cat "$in" > "$out" && echo "$*" >> "$out""#,
    )?;
    let qemu_log = dir.join("qemu.args");
    let qemu = dir.join("qemu-system-aarch64");
    write_script(
        &qemu,
        &format!("printf '%s\\n' \"$@\" > '{}'\nexit 3", qemu_log.display()),
    )?;

    let opts = BootOptions {
        cmdline: Some("console=ttyS0 foo=1".into()),
        consoles: vec!["ttyAMA0".into()],
        config: vec![
            "dtparam=audio=on".into(),
            "dtoverlay=disable-bt".into(),
            "dtoverlay=vc4-kms-v3d".into(),
        ],
        qemu_args: vec!["-S".into()],
        ..Default::default()
    };
    let mut diagnostics = Vec::new();
    let command = assemble(Model::Pi4, &boot.dtb, &boot.kernel, &opts, &mut diagnostics);
    let merger = Merger::new(&dtmerge, &boot.overlays);

    let err = launch(&command, &merger, &qemu, &mut SystemRunner, &mut diagnostics).unwrap_err();

    assert!(matches!(
        err,
        Error::ExternalTool(ExternalToolError::Failed {
            status: Exit::Code(3),
            ..
        })
    ));
    assert_eq!(err.exit_code(), 3);

    // Each step saw the previous step's output.
    let mut expected = BASE_DTB.to_vec();
    expected.extend_from_slice(b"- audio=on\n");
    expected.extend_from_slice(
        format!("{}\n", boot.overlays.join("disable-bt.dtbo").display()).as_bytes(),
    );
    assert_eq!(fs::read(&command.dtb)?, expected);

    let recorded = fs::read_to_string(&qemu_log)?;
    let recorded: Vec<&str> = recorded.lines().collect();
    assert_eq!(recorded, command.args);
    assert!(recorded.contains(&"foo=1 console=ttyAMA0"));

    // No scratch blobs left next to the merged tree.
    let leftovers = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);
    Ok(())
}
