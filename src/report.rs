// qemu-raspi/src/report.rs
// Non-fatal diagnostics. Components hand these to a `Reporter` instead of
// writing to the global logger, so callers can inspect them.
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A config.txt line with an unknown key, or no `key=value` form at all.
    IgnoredLine(String),
    /// A `vc4-kms*` overlay, which does not work under QEMU.
    SkippedOverlay(String),
    /// A merge directive that is neither dtparam nor dtoverlay.
    UnknownMergeEntry { kind: String, value: String },
    /// A config directive the command assembler has no use for.
    IgnoredConfig(String),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::IgnoredLine(line) => write!(f, "Ignored line: {}", line),
            Diagnostic::SkippedOverlay(name) => write!(f, "Ignore dtoverlay: {}", name),
            Diagnostic::UnknownMergeEntry { kind, value } => {
                write!(f, "Unknown dtmerge entry: {} {}", kind, value)
            }
            Diagnostic::IgnoredConfig(entry) => write!(f, "Ignored config: {}", entry),
        }
    }
}

pub trait Reporter {
    fn warn(&mut self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to `log::warn!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn warn(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
    }
}

impl Reporter for Vec<Diagnostic> {
    fn warn(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}
