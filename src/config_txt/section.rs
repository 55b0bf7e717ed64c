// qemu-raspi/src/config_txt/section.rs
// Section filtering for config.txt. Headers never nest, so a single
// accepting/skipping flag is all the state the scan needs.
use crate::model::Model;
use regex::Regex;
use std::sync::LazyLock;

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[.*\]$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    Accepting,
    Skipping,
}

/// What a single config.txt line turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    /// Blank line or comment.
    Blank,
    /// A section header. `accepted` tells whether the section applies.
    Header { name: &'a str, accepted: bool },
    /// A directive inside an accepted section.
    Directive(&'a str),
    /// A directive inside a skipped section.
    Discarded(&'a str),
}

/// Decides which config.txt sections apply to a model and boot mode.
#[derive(Debug, Clone, Copy)]
pub struct SectionFilter {
    tag: &'static str,
    tryboot: bool,
}

impl SectionFilter {
    pub fn new(model: Model, tryboot: bool) -> Self {
        Self {
            tag: model.info().filter,
            tryboot,
        }
    }

    /// Whether a section header applies. `[tryboot]` only does in tryboot mode.
    pub fn accepts(&self, header: &str) -> bool {
        header == "[all]" || header == self.tag || (self.tryboot && header == "[tryboot]")
    }

    /// Feeds one line through the filter, returning the next state and the line's meaning.
    pub fn step<'a>(&self, state: SectionState, line: &'a str) -> (SectionState, Event<'a>) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return (state, Event::Blank);
        }

        if SECTION_HEADER.is_match(line) {
            let accepted = self.accepts(line);
            let next = if accepted {
                SectionState::Accepting
            } else {
                SectionState::Skipping
            };
            return (
                next,
                Event::Header {
                    name: line,
                    accepted,
                },
            );
        }

        match state {
            SectionState::Accepting => (state, Event::Directive(line)),
            SectionState::Skipping => (state, Event::Discarded(line)),
        }
    }
}
