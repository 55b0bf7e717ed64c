// qemu-raspi/src/runner.rs
use log::info;
use std::{
    fmt, io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};

/// An external program invocation: the merge tool or the emulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'') {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Renders a path as a command argument.
pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// How an external program finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Code(i32),
    /// Terminated without an exit code (killed by a signal).
    Signal,
}

impl Exit {
    pub fn success(self) -> bool {
        self == Exit::Code(0)
    }
}

impl From<ExitStatus> for Exit {
    fn from(status: ExitStatus) -> Self {
        status.code().map_or(Exit::Signal, Exit::Code)
    }
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exit::Code(code) => write!(f, "exit code {}", code),
            Exit::Signal => write!(f, "termination by signal"),
        }
    }
}

/// Runs external programs synchronously.
pub trait Runner {
    fn run(&mut self, command: &ExternalCommand) -> io::Result<Exit>;

    /// Runners that only record commands; callers skip their own file writes too.
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Spawns the program and blocks until it exits. Stdio is inherited.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&mut self, command: &ExternalCommand) -> io::Result<Exit> {
        info!("Run: {}", command);
        let status = Command::new(&command.program)
            .args(&command.args)
            .status()?;
        Ok(status.into())
    }
}

/// Records commands instead of running them. Every command "succeeds".
#[derive(Debug, Default, Clone)]
pub struct DryRun {
    commands: Vec<ExternalCommand>,
}

impl DryRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands seen so far, in invocation order.
    pub fn commands(&self) -> &[ExternalCommand] {
        &self.commands
    }
}

impl Runner for DryRun {
    fn run(&mut self, command: &ExternalCommand) -> io::Result<Exit> {
        info!("Dry run: {}", command);
        self.commands.push(command.clone());
        Ok(Exit::Code(0))
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}
