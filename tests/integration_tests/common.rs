use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

pub const BASE_DTB: &[u8] = b"\xd0\x0d\xfe\xed base tree\n";

/// A boot partition laid out the way the firmware expects it.
pub struct BootPartition {
    pub config_txt: PathBuf,
    pub dtb: PathBuf,
    pub kernel: PathBuf,
    pub overlays: PathBuf,
}

pub fn setup_boot_partition(dir: &Path, config_txt: &str) -> io::Result<BootPartition> {
    let config_path = dir.join("config.txt");
    fs::write(&config_path, config_txt)?;
    fs::write(
        dir.join("cmdline.txt"),
        "console=serial0,115200 console=tty1 root=/dev/mmcblk0p2 rootwait\n",
    )?;

    let dtb = dir.join("bcm2711-rpi-4-b.dtb");
    fs::write(&dtb, BASE_DTB)?;
    let kernel = dir.join("kernel8.img");
    fs::write(&kernel, vec![0u8; 4096])?;

    let overlays = dir.join("overlays");
    fs::create_dir_all(&overlays)?;
    for name in ["disable-bt", "uart1", "vc4-kms-v3d"] {
        fs::write(overlays.join(format!("{}.dtbo", name)), name.as_bytes())?;
    }

    Ok(BootPartition {
        config_txt: config_path,
        dtb,
        kernel,
        overlays,
    })
}

/// Writes an executable shell script.
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, format!("#!/bin/sh\n{}\n", body))?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}
