//! Completion candidates for a partially typed command line.

use crate::metadata::OptionMetadata;
use crate::parser::{Cli, Phase, ScanMode};

impl Cli {
    /// Candidates for the last token of `tokens`, which may be empty or
    /// partially typed.
    ///
    /// The preceding tokens are walked like a parse. Nothing is suggested when
    /// they are invalid, when the last token is the value of an option, or
    /// once positional arguments have started. Otherwise the visible option
    /// names come first (global, then group, then command), followed by group
    /// and command names when one may still be named. Hidden entries are
    /// never offered.
    pub fn suggest<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<String> {
        let tokens: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
        let (partial, head) = match tokens.split_last() {
            Some((last, head)) => (*last, head),
            None => ("", &[][..]),
        };

        let scan = match self.scan(head, ScanMode::Suggest) {
            Ok(scan) => scan,
            Err(e) => {
                log::debug!("no suggestions: {}", e);
                return Vec::new();
            }
        };
        if let Some(option) = scan.pending {
            log::debug!("`{}` is waiting for a value", option.title);
            return Vec::new();
        }
        if scan.phase == Phase::Arguments {
            return Vec::new();
        }

        let mut out: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if name.starts_with(partial) && !out.iter().any(|n| n == name) {
                out.push(name.to_string());
            }
        };

        let tiers = scan.visible(self.metadata());
        for tier in tiers.iter().rev() {
            for opt in tier.iter().filter(|o| !o.hidden) {
                opt.names.iter().for_each(|n| push(n));
            }
        }

        match scan.phase {
            Phase::Global => {
                let meta = self.metadata();
                for group in meta.groups().iter().filter(|g| !g.hidden) {
                    push(&group.name);
                }
                for cmd in meta.commands().iter().filter(|c| !c.hidden) {
                    push(&cmd.name);
                }
            }
            Phase::Group => {
                if let Some(group) = scan.group {
                    for cmd in group.commands().iter().filter(|c| !c.hidden) {
                        push(&cmd.name);
                    }
                }
            }
            Phase::Command | Phase::Arguments => {}
        }

        out
    }
}

/// Names of `options` that complete `partial`, for callers rendering their
/// own completion lists.
pub fn option_names<'a>(options: &'a [OptionMetadata], partial: &'a str) -> impl Iterator<Item = &'a str> {
    options
        .iter()
        .filter(|o| !o.hidden)
        .flat_map(|o| o.names.iter())
        .map(String::as_str)
        .filter(move |n| n.starts_with(partial))
}
