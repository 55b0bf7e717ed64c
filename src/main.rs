// qemu-raspi/src/main.rs
use clap::Parser;
use log::{LevelFilter, error};
use qemu_raspi::{
    BootCommand, BootOptions, BootSource, ConfigError, DryRun, LogReporter, Merger, Model,
    Reporter, Result, SystemRunner, assemble, launch, qemu,
};
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

#[derive(Parser, Debug)]
#[command(version, about = "Boot a Raspberry Pi kernel under QEMU")]
struct Cli {
    /// Raspberry Pi model (pi3, pi4)
    #[arg(long)]
    model: Option<Model>,
    /// DTB file
    #[arg(long)]
    dtb: Option<PathBuf>,
    /// Kernel file
    #[arg(long)]
    kernel: Option<PathBuf>,
    /// Initramfs file
    #[arg(long)]
    initrd: Option<PathBuf>,
    /// Directory with the DTB overlays
    #[arg(long)]
    overlays: Option<PathBuf>,
    /// Kernel command line
    #[arg(long)]
    cmdline: Option<String>,
    /// Add 'earlycon=...' to the kernel command line
    #[arg(long)]
    earlycon: bool,
    /// Add 'console=...' to the kernel command line, replacing existing ones
    #[arg(long)]
    console: Vec<String>,
    /// Specify config.txt settings (dtparam=..., dtoverlay=..., enable_uart=1)
    #[arg(long)]
    config: Vec<String>,
    /// Merge and print the QEMU command without running any tool
    #[arg(long)]
    dry_run: bool,
    #[arg(long)]
    verbose: bool,
    #[arg(long)]
    debug: bool,
    /// OS image file
    #[arg(long)]
    image: Option<PathBuf>,
    /// config.json descriptor
    #[arg(long, conflicts_with = "config_txt")]
    config_json: Option<PathBuf>,
    /// config.txt file, parsed for --model
    #[arg(long)]
    config_txt: Option<PathBuf>,
    /// Apply [tryboot] sections of --config-txt
    #[arg(long, requires = "config_txt")]
    tryboot: bool,
    /// Print the resolved boot configuration as JSON
    #[arg(long)]
    print_config: bool,
    /// QEMU binary
    #[arg(long, default_value = qemu::DEFAULT_QEMU_BIN)]
    qemu_bin: PathBuf,
    /// dtmerge binary
    #[arg(long, default_value = "dtmerge")]
    dtmerge_bin: PathBuf,
    /// Additional QEMU arguments
    #[arg(last = true, value_name = "QEMU_ARG")]
    qemu_args: Vec<String>,
}

impl Cli {
    /// Input paths named on the command line, checked before anything runs.
    fn declared_paths(&self) -> impl Iterator<Item = &PathBuf> {
        [
            &self.dtb,
            &self.kernel,
            &self.initrd,
            &self.overlays,
            &self.image,
            &self.config_json,
            &self.config_txt,
        ]
        .into_iter()
        .flatten()
    }
}

fn init_logging(verbose: bool, debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn load_source(cli: &Cli, reporter: &mut dyn Reporter) -> Result<Option<BootSource>> {
    if let Some(path) = &cli.config_json {
        return Ok(Some(BootSource::from_json(path)?));
    }
    if let Some(path) = &cli.config_txt {
        let model = cli.model.ok_or(ConfigError::Missing("model"))?;
        return Ok(Some(BootSource::from_config_txt(
            path,
            model,
            cli.tryboot,
            reporter,
        )?));
    }
    Ok(None)
}

/// Everything `assemble` and `launch` need, with command-line values taking precedence.
#[derive(Debug)]
struct Resolved {
    model: Model,
    dtb: PathBuf,
    kernel: PathBuf,
    overlays: PathBuf,
    opts: BootOptions,
}

fn resolve(cli: Cli, source: Option<&BootSource>) -> Result<Resolved> {
    let model = cli
        .model
        .or(source.map(|s| s.config.model))
        .ok_or(ConfigError::Missing("model"))?;
    let dtb = cli
        .dtb
        .or_else(|| source.map(BootSource::dtb))
        .ok_or(ConfigError::Missing("dtb"))?;
    let kernel = cli
        .kernel
        .or_else(|| source.map(BootSource::kernel))
        .ok_or(ConfigError::Missing("kernel"))?;
    let initrd = cli.initrd.or_else(|| source.and_then(BootSource::initramfs));
    let overlays = cli
        .overlays
        .or_else(|| source.map(BootSource::overlays_dir))
        .unwrap_or_else(|| PathBuf::from("."));

    let mut config = cli.config;
    if config.is_empty() {
        if let Some(source) = source {
            config = source.config.directives();
        }
    }
    let cmdline = match (cli.cmdline, source) {
        (Some(cmdline), _) => Some(cmdline),
        (None, Some(source)) => Some(source.cmdline()?),
        (None, None) => None,
    };

    Ok(Resolved {
        model,
        dtb,
        kernel,
        overlays,
        opts: BootOptions {
            initrd,
            image: cli.image,
            cmdline,
            earlycon: cli.earlycon,
            consoles: cli.console,
            config,
            qemu_args: cli.qemu_args,
        },
    })
}

fn config_json(source: &BootSource) -> Result<String, ConfigError> {
    serde_json::to_string_pretty(&source.config).map_err(ConfigError::Render)
}

fn run(cli: Cli) -> Result<()> {
    let mut reporter = LogReporter;
    let source = load_source(&cli, &mut reporter)?;
    if cli.print_config {
        if let Some(source) = &source {
            println!("{}", config_json(source)?);
        }
    }

    let dry_run = cli.dry_run;
    let qemu_bin = cli.qemu_bin.clone();
    let dtmerge_bin = cli.dtmerge_bin.clone();
    let resolved = resolve(cli, source.as_ref())?;

    let boot = assemble(
        resolved.model,
        &resolved.dtb,
        &resolved.kernel,
        &resolved.opts,
        &mut reporter,
    );
    let merger = Merger::new(dtmerge_bin, &resolved.overlays);
    run_boot(&boot, &merger, &qemu_bin, dry_run, &mut reporter)
}

fn run_boot(
    boot: &BootCommand,
    merger: &Merger,
    qemu_bin: &Path,
    dry_run: bool,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    if dry_run {
        let mut runner = DryRun::new();
        launch(boot, merger, qemu_bin, &mut runner, reporter)?;
        println!("{}", boot.command(qemu_bin));
        Ok(())
    } else {
        launch(boot, merger, qemu_bin, &mut SystemRunner, reporter)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    if let Some(missing) = cli.declared_paths().find(|p| !p.exists()) {
        error!("No such file or directory: {}", missing.display());
        return ExitCode::from(1);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::from(err.exit_code())
        }
    }
}
