//! The parsing engine: a single pass over the argument vector walking
//! `global → group → command → arguments`.

use crate::error::{MetadataError, ParseError, Result};
use crate::merge;
use crate::metadata::{
    CommandGroupMetadata, CommandMetadata, GlobalMetadata, OptionKey, OptionMetadata,
};
use crate::target::{Destination, Target, Values};
use crate::value::{coerce, CoercionError, Value};

/// Token forcing every following token to be positional.
pub const END_OF_OPTIONS: &str = "--";

// ============================================================================
// CliBuilder
// ============================================================================

pub struct CliBuilder {
    name: String,
    description: Option<String>,
    default_command: Option<String>,
    commands: Vec<CommandMetadata>,
    groups: Vec<CommandGroupMetadata>,
}

impl CliBuilder {
    pub fn new(name: &str) -> Self {
        CliBuilder {
            name: name.to_string(),
            description: None,
            default_command: None,
            commands: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Add a command outside of any group.
    pub fn command(mut self, cmd: CommandMetadata) -> Self {
        self.commands.push(cmd);
        self
    }

    pub fn group(mut self, group: CommandGroupMetadata) -> Self {
        self.groups.push(group);
        self
    }

    /// Command selected when the first non-option token names nothing. Must
    /// be one of the commands added with [`CliBuilder::command`].
    pub fn default_command(mut self, name: &str) -> Self {
        self.default_command = Some(name.to_string());
        self
    }

    pub fn build(self) -> std::result::Result<Cli, MetadataError> {
        let metadata = merge::resolve_global(
            self.name,
            self.description,
            self.default_command,
            self.commands,
            self.groups,
        )?;
        Ok(Cli { metadata })
    }
}

// ============================================================================
// Parse results
// ============================================================================

/// One value headed for one destination, in encounter order.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub destination: Destination,
    pub value: Value,
}

/// A successful parse: which command was selected and its populated target.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand<T> {
    pub group: Option<String>,
    pub command: String,
    pub target: T,
    pub assignments: Vec<Assignment>,
}

// ============================================================================
// Scanner state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Global,
    Group,
    Command,
    Arguments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanMode {
    Parse,
    /// Running out of tokens in the middle of an option's values is not an
    /// error; the scan stops and remembers the option.
    Suggest,
}

#[derive(Debug)]
pub(crate) struct Occurrence<'a> {
    pub option: &'a OptionMetadata,
    pub token: String,
    pub position: usize,
    pub values: Vec<String>,
}

#[derive(Debug)]
pub(crate) struct Scan<'a> {
    pub phase: Phase,
    pub group: Option<&'a CommandGroupMetadata>,
    pub command: Option<&'a CommandMetadata>,
    /// Bare token that sent us to a default command, with its position.
    pub implicit: Option<(String, usize)>,
    pub occurrences: Vec<Occurrence<'a>>,
    pub arguments: Vec<String>,
    pub arguments_start: Option<usize>,
    pub pending: Option<&'a OptionMetadata>,
}

impl<'a> Scan<'a> {
    fn new() -> Self {
        Scan {
            phase: Phase::Global,
            group: None,
            command: None,
            implicit: None,
            occurrences: Vec::new(),
            arguments: Vec::new(),
            arguments_start: None,
            pending: None,
        }
    }

    /// Option tiers visible in the current phase, innermost first.
    pub fn visible(&self, global: &'a GlobalMetadata) -> Vec<&'a [OptionMetadata]> {
        let mut tiers: Vec<&'a [OptionMetadata]> = Vec::with_capacity(3);
        if self.phase == Phase::Command {
            if let Some(cmd) = self.command {
                tiers.push(cmd.options());
            }
        }
        if let Some(group) = self.group {
            tiers.push(group.options());
        }
        tiers.push(global.options());
        tiers
    }

    fn enter_command(&mut self, cmd: &'a CommandMetadata) {
        log::debug!("resolved command `{}`", cmd.name);
        self.command = Some(cmd);
        self.phase = Phase::Command;
    }

    fn start_arguments(&mut self, position: usize) {
        self.phase = Phase::Arguments;
        self.arguments_start.get_or_insert(position);
    }
}

/// Whether a token that matched no option should be reported as an unknown
/// option rather than taken as a value. Numbers such as `-3` never are.
fn looks_like_option(token: &str) -> bool {
    let Some(rest) = token.strip_prefix('-') else {
        return false;
    };
    let numeric = rest.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && token.parse::<f64>().is_ok();
    !rest.is_empty() && !numeric
}

/// Abbreviations need something after the leading dashes: `-` alone is a
/// plain argument.
fn abbreviable(token: &str) -> bool {
    !token.trim_start_matches('-').is_empty()
}

// ============================================================================
// Cli
// ============================================================================

/// A built, immutable command-line definition. Parsing never mutates it, so
/// one `Cli` can serve any number of concurrent parses.
#[derive(Debug, Clone)]
pub struct Cli {
    metadata: GlobalMetadata,
}

impl Cli {
    pub fn builder(name: &str) -> CliBuilder {
        CliBuilder::new(name)
    }

    pub fn metadata(&self) -> &GlobalMetadata {
        &self.metadata
    }

    /// Parse `args` (program name excluded) into a [`Values`] target.
    pub fn parse<S: AsRef<str>>(&self, args: &[S]) -> Result<ParsedCommand<Values>> {
        self.parse_with(args, |_| Values::new())
    }

    /// Parse `args` into a target obtained from `factory` once the command is
    /// known. The target is only created, and only written, when the whole
    /// argument vector is valid.
    pub fn parse_with<S, T, F>(&self, args: &[S], factory: F) -> Result<ParsedCommand<T>>
    where
        S: AsRef<str>,
        T: Target,
        F: FnOnce(&CommandMetadata) -> T,
    {
        let tokens: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        log::debug!("parsing {:?}", tokens);

        let mut scan = self.scan(&tokens, ScanMode::Parse)?;
        let command = self.finish(&mut scan)?;
        let assignments = self.resolve_assignments(&scan, command)?;
        self.check_required(&scan, command)?;

        let mut target = factory(command);
        for assignment in &assignments {
            assignment
                .destination
                .write(&mut target, assignment.value.clone())
                .map_err(|message| ParseError::Target {
                    destination: assignment.destination.path().to_string(),
                    message,
                })?;
        }

        Ok(ParsedCommand {
            group: scan.group.map(|g| g.name.clone()),
            command: command.name.clone(),
            target,
            assignments,
        })
    }

    // ------------------------------------------------------------------------
    // Token walk
    // ------------------------------------------------------------------------

    pub(crate) fn scan<'a>(&'a self, tokens: &[&str], mode: ScanMode) -> Result<Scan<'a>> {
        let mut scan = Scan::new();
        let mut i = 0;

        while i < tokens.len() {
            let token = tokens[i];
            log::trace!("token {} `{}` in {:?}", i, token, scan.phase);

            if scan.phase == Phase::Arguments {
                scan.arguments.push(token.to_string());
                i += 1;
                continue;
            }

            if token == END_OF_OPTIONS {
                if mode == ScanMode::Parse {
                    self.resolve_default(&mut scan)?;
                }
                scan.start_arguments(i + 1);
                i += 1;
                continue;
            }

            if let Some(option) = self.match_option(&scan, token, i)? {
                let arity = option.effective_arity();
                let remaining = tokens.len() - i - 1;
                if remaining < arity {
                    if mode == ScanMode::Suggest {
                        scan.pending = Some(option);
                        return Ok(scan);
                    }
                    return Err(ParseError::MissingOptionValue {
                        option: token.to_string(),
                        position: i,
                        expected: arity,
                        found: remaining,
                    });
                }

                let values: Vec<String> = if arity == 0 {
                    vec!["true".to_string()]
                } else {
                    tokens[i + 1..=i + arity]
                        .iter()
                        .map(|v| v.to_string())
                        .collect()
                };
                if arity > 0 {
                    if let Some((idx, bad)) =
                        values.iter().enumerate().find(|(_, v)| !option.is_allowed(v))
                    {
                        return Err(not_allowed(option, token, i + 1 + idx, bad));
                    }
                }

                log::trace!("option `{}` takes {:?}", token, values);
                scan.occurrences.push(Occurrence {
                    option,
                    token: token.to_string(),
                    position: i,
                    values,
                });
                i += 1 + arity;
                continue;
            }

            match scan.phase {
                Phase::Global => {
                    if let Some(group) = self.metadata.find_group(token) {
                        log::debug!("entering group `{}`", group.name);
                        scan.group = Some(group);
                        scan.phase = Phase::Group;
                        i += 1;
                    } else if let Some(cmd) = self.metadata.find_command(token) {
                        scan.enter_command(cmd);
                        i += 1;
                    } else if let Some(cmd) = self.metadata.get_default_command() {
                        // Re-read the same token against the default command.
                        scan.implicit = Some((token.to_string(), i));
                        scan.enter_command(cmd);
                    } else {
                        return Err(unrecognized(token, i, None));
                    }
                }
                Phase::Group => {
                    let group = match scan.group {
                        Some(group) => group,
                        None => return Err(unrecognized(token, i, None)),
                    };
                    if let Some(cmd) = group.find_command(token) {
                        scan.enter_command(cmd);
                        i += 1;
                    } else if let Some(cmd) = group.get_default_command() {
                        scan.implicit = Some((token.to_string(), i));
                        scan.enter_command(cmd);
                    } else {
                        return Err(unrecognized(token, i, Some(group.name.as_str())));
                    }
                }
                Phase::Command => {
                    if looks_like_option(token) {
                        return Err(ParseError::UnknownOption {
                            token: token.to_string(),
                            position: i,
                        });
                    }
                    scan.start_arguments(i);
                }
                Phase::Arguments => {}
            }
        }

        Ok(scan)
    }

    /// Visible option named by `token`: exact match first (innermost tier
    /// wins), then an unambiguous prefix.
    fn match_option<'a>(
        &'a self,
        scan: &Scan<'a>,
        token: &str,
        position: usize,
    ) -> Result<Option<&'a OptionMetadata>> {
        let tiers = scan.visible(&self.metadata);

        for &tier in &tiers {
            if let Some(opt) = tier.iter().find(|o| o.names.iter().any(|n| n == token)) {
                return Ok(Some(opt));
            }
        }

        if !abbreviable(token) {
            return Ok(None);
        }

        let mut candidates: Vec<&'a OptionMetadata> = Vec::new();
        for &tier in &tiers {
            for opt in tier {
                // A global option is also listed by the command declaring it.
                if opt.names.iter().any(|n| n.starts_with(token))
                    && !candidates.iter().any(|c| c.key() == opt.key())
                {
                    candidates.push(opt);
                }
            }
        }

        match candidates.as_slice() {
            [] => Ok(None),
            [only] => {
                log::debug!("`{}` abbreviates {:?}", token, only.names);
                Ok(Some(*only))
            }
            many => Err(ParseError::AmbiguousOption {
                token: token.to_string(),
                position,
                candidates: many
                    .iter()
                    .flat_map(|o| o.names.iter().filter(|n| n.starts_with(token)))
                    .cloned()
                    .collect(),
            }),
        }
    }

    // ------------------------------------------------------------------------
    // After the walk
    // ------------------------------------------------------------------------

    /// Fall back to the default command of the current naming scope.
    fn resolve_default<'a>(&'a self, scan: &mut Scan<'a>) -> Result<()> {
        let default = match scan.phase {
            Phase::Global => self.metadata.get_default_command(),
            Phase::Group => scan.group.and_then(CommandGroupMetadata::get_default_command),
            Phase::Command | Phase::Arguments => return Ok(()),
        };
        match default {
            Some(cmd) => {
                log::debug!("no command named, using default `{}`", cmd.name);
                scan.enter_command(cmd);
                Ok(())
            }
            None => Err(ParseError::CommandRequired {
                group: scan.group.map(|g| g.name.clone()),
            }),
        }
    }

    fn finish<'a>(&'a self, scan: &mut Scan<'a>) -> Result<&'a CommandMetadata> {
        self.resolve_default(scan)?;
        let command = match scan.command {
            Some(cmd) => cmd,
            None => {
                return Err(ParseError::CommandRequired {
                    group: scan.group.map(|g| g.name.clone()),
                })
            }
        };

        if !scan.arguments.is_empty() && command.positional().is_none() {
            let position = scan.arguments_start.unwrap_or(0);
            if let Some((token, implicit_at)) = &scan.implicit {
                if *implicit_at == position {
                    return Err(ParseError::UnknownCommand {
                        token: token.clone(),
                        position,
                        group: scan.group.map(|g| g.name.clone()),
                    });
                }
            }
            return Err(ParseError::UnexpectedArguments {
                arguments: scan.arguments.clone(),
                position,
            });
        }
        Ok(command)
    }

    /// Coerce every recorded raw value for the destinations the selected
    /// command declares. Options only other commands declare are dropped.
    fn resolve_assignments(
        &self,
        scan: &Scan<'_>,
        command: &CommandMetadata,
    ) -> Result<Vec<Assignment>> {
        let own: Vec<(OptionKey, &OptionMetadata)> =
            command.options().iter().map(|o| (o.key(), o)).collect();
        let mut assignments = Vec::new();

        for occ in &scan.occurrences {
            let key = occ.option.key();
            let Some((_, declared)) = own.iter().find(|(k, _)| *k == key) else {
                log::debug!(
                    "`{}` is not declared by `{}`, ignoring",
                    occ.token,
                    command.name
                );
                continue;
            };
            for dest in &declared.destinations {
                for (idx, raw) in occ.values.iter().enumerate() {
                    let value = coerce(raw, dest.value_type(), dest.path()).map_err(|source| {
                        ParseError::InvalidValue {
                            option: occ.token.clone(),
                            position: if declared.effective_arity() == 0 {
                                occ.position
                            } else {
                                occ.position + 1 + idx
                            },
                            source,
                        }
                    })?;
                    assignments.push(Assignment {
                        destination: dest.clone(),
                        value,
                    });
                }
            }
        }

        if let Some(args) = command.positional() {
            let start = scan.arguments_start.unwrap_or(0);
            for dest in &args.destinations {
                for (idx, raw) in scan.arguments.iter().enumerate() {
                    let value = coerce(raw, dest.value_type(), dest.path()).map_err(|source| {
                        ParseError::InvalidValue {
                            option: args.title.clone(),
                            position: start + idx,
                            source,
                        }
                    })?;
                    assignments.push(Assignment {
                        destination: dest.clone(),
                        value,
                    });
                }
            }
        }

        Ok(assignments)
    }

    fn check_required(&self, scan: &Scan<'_>, command: &CommandMetadata) -> Result<()> {
        let seen: Vec<OptionKey> = scan.occurrences.iter().map(|o| o.option.key()).collect();
        let missing: Vec<String> = command
            .options()
            .iter()
            .filter(|o| o.required && !seen.contains(&o.key()))
            .filter_map(|o| o.names.first().cloned())
            .collect();
        if !missing.is_empty() {
            return Err(ParseError::MissingRequiredOption { names: missing });
        }

        if let Some(args) = command.positional() {
            if args.required && scan.arguments.is_empty() {
                return Err(ParseError::MissingRequiredArguments {
                    title: args.title.clone(),
                });
            }
        }
        Ok(())
    }
}

fn unrecognized(token: &str, position: usize, group: Option<&str>) -> ParseError {
    if looks_like_option(token) {
        ParseError::UnknownOption {
            token: token.to_string(),
            position,
        }
    } else {
        ParseError::UnknownCommand {
            token: token.to_string(),
            position,
            group: group.map(str::to_string),
        }
    }
}

fn not_allowed(option: &OptionMetadata, token: &str, position: usize, raw: &str) -> ParseError {
    let allowed = option.allowed_values.as_deref().unwrap_or_default();
    ParseError::InvalidValue {
        option: token.to_string(),
        position,
        source: CoercionError {
            raw: raw.to_string(),
            destination: option.title.clone(),
            expected: format!("value (allowed: {})", allowed.join(", ")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ArgumentsMetadata, OptionMetadata};
    use crate::value::ValueType;

    fn args(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    /// The classic single-command shape: `-log|-verbose`, `-debug`,
    /// `-groups` and trailing `<parameters>`.
    fn single_command() -> Cli {
        let cmd = CommandMetadata::new("test")
            .option(
                OptionMetadata::command(["-log", "-verbose"])
                    .title("verbose")
                    .destination(Destination::single("verbose", ValueType::I32)),
            )
            .option(OptionMetadata::command(["-debug"]).destination(Destination::flag("debug")))
            .option(
                OptionMetadata::command(["-groups"])
                    .destination(Destination::single("groups", ValueType::String)),
            )
            .option(
                OptionMetadata::command(["-host"])
                    .destination(Destination::multi("hosts", ValueType::String)),
            )
            .arguments(
                ArgumentsMetadata::new("parameters")
                    .destination(Destination::multi("parameters", ValueType::String)),
            );
        Cli::builder("test")
            .command(cmd)
            .default_command("test")
            .build()
            .unwrap()
    }

    fn git() -> Cli {
        let verbose = |path: &str| {
            OptionMetadata::global(["-v", "--verbose"]).destination(Destination::flag(path))
        };
        let add = CommandMetadata::new("add")
            .option(verbose("verbose"))
            .option(
                OptionMetadata::command(["-i", "--interactive"])
                    .destination(Destination::flag("interactive")),
            )
            .arguments(
                ArgumentsMetadata::new("patterns")
                    .destination(Destination::multi("patterns", ValueType::String)),
            );
        let commit = CommandMetadata::new("commit")
            .option(verbose("verbose"))
            .option(
                OptionMetadata::command(["-m", "--message"])
                    .required()
                    .destination(Destination::single("message", ValueType::String)),
            )
            .option(OptionMetadata::command(["--amend"]).destination(Destination::flag("amend")));
        let help = CommandMetadata::new("help").option(verbose("verbose")).arguments(
            ArgumentsMetadata::new("topic").destination(Destination::multi("topic", ValueType::String)),
        );
        let dry_run = |path: &str| {
            OptionMetadata::group(["-n", "--dry-run"]).destination(Destination::flag(path))
        };
        let show = CommandMetadata::new("show")
            .option(verbose("verbose"))
            .option(dry_run("dry_run"))
            .arguments(
                ArgumentsMetadata::new("name").destination(Destination::multi("names", ValueType::String)),
            );
        let remote_add = CommandMetadata::new("add")
            .option(verbose("verbose"))
            .option(dry_run("dry_run"))
            .option(
                OptionMetadata::command(["-t"])
                    .title("branch")
                    .destination(Destination::multi("branches", ValueType::String)),
            )
            .option(
                OptionMetadata::command(["--mirror"])
                    .allowed_values(["fetch", "push"])
                    .destination(Destination::single("mirror", ValueType::String)),
            )
            .arguments(
                ArgumentsMetadata::new("name url")
                    .required()
                    .destination(Destination::multi("remote", ValueType::String)),
            );
        let remote = CommandGroupMetadata::new("remote")
            .default_command("show")
            .command(show)
            .command(remote_add);
        Cli::builder("git")
            .command(help)
            .command(add)
            .command(commit)
            .default_command("help")
            .group(remote)
            .build()
            .unwrap()
    }

    // -- end to end --

    #[test]
    fn single_command_end_to_end() {
        let parsed = single_command()
            .parse(&args("-debug -log 2 -groups unit a b c"))
            .unwrap();
        let v = &parsed.target;
        assert_eq!(parsed.command, "test");
        assert_eq!(v.get::<bool>("debug"), Some(true));
        assert_eq!(v.get::<i32>("verbose"), Some(2));
        assert_eq!(v.get::<String>("groups").as_deref(), Some("unit"));
        assert_eq!(v.get_all::<String>("parameters"), vec!["a", "b", "c"]);
    }

    #[test]
    fn alias_names_write_the_same_destination() {
        let parsed = single_command().parse(&args("-verbose 3")).unwrap();
        assert_eq!(parsed.target.get::<i32>("verbose"), Some(3));
    }

    #[test]
    fn flag_consumes_no_tokens() {
        let parsed = single_command().parse(&args("-debug x")).unwrap();
        assert_eq!(parsed.target.get::<bool>("debug"), Some(true));
        assert_eq!(parsed.target.get_all::<String>("parameters"), vec!["x"]);
    }

    #[test]
    fn last_single_value_wins() {
        let parsed = single_command().parse(&args("-log 1 -log 4")).unwrap();
        assert_eq!(parsed.target.get::<i32>("verbose"), Some(4));
    }

    #[test]
    fn multi_valued_option_accumulates() {
        let parsed = single_command().parse(&args("-host a -host b")).unwrap();
        assert_eq!(parsed.target.get_all::<String>("hosts"), vec!["a", "b"]);
    }

    #[test]
    fn negative_number_is_a_value_and_an_argument() {
        let parsed = single_command().parse(&args("-log -3 -5")).unwrap();
        assert_eq!(parsed.target.get::<i32>("verbose"), Some(-3));
        assert_eq!(parsed.target.get_all::<String>("parameters"), vec!["-5"]);
    }

    #[test]
    fn end_of_options_marker() {
        let parsed = single_command().parse(&args("-debug -- -log 2 --")).unwrap();
        assert_eq!(parsed.target.get::<bool>("debug"), Some(true));
        assert_eq!(parsed.target.get::<i32>("verbose"), None);
        assert_eq!(
            parsed.target.get_all::<String>("parameters"),
            vec!["-log", "2", "--"]
        );
    }

    #[test]
    fn float_words_are_not_numbers() {
        for word in ["-inf", "-nan", "-infinity"] {
            assert_eq!(
                single_command().parse(&["-debug", word]).unwrap_err(),
                ParseError::UnknownOption {
                    token: word.to_string(),
                    position: 1
                }
            );
        }
        let parsed = single_command().parse(&["-.5", "-1e3"]).unwrap();
        assert_eq!(parsed.target.get_all::<String>("parameters"), vec!["-.5", "-1e3"]);
    }

    #[test]
    fn arguments_swallow_later_option_lookalikes() {
        let parsed = single_command().parse(&args("a -debug")).unwrap();
        assert_eq!(parsed.target.get::<bool>("debug"), None);
        assert_eq!(parsed.target.get_all::<String>("parameters"), vec!["a", "-debug"]);
    }

    #[test]
    fn lone_dash_is_an_argument() {
        let parsed = single_command().parse(&args("-")).unwrap();
        assert_eq!(parsed.target.get_all::<String>("parameters"), vec!["-"]);
    }

    // -- abbreviations --

    #[test]
    fn unambiguous_prefix_resolves() {
        let parsed = single_command().parse(&args("-deb -gr unit")).unwrap();
        assert_eq!(parsed.target.get::<bool>("debug"), Some(true));
        assert_eq!(parsed.target.get::<String>("groups").as_deref(), Some("unit"));
    }

    #[test]
    fn prefix_shared_by_names_of_one_option_is_not_ambiguous() {
        let cli = Cli::builder("p")
            .command(
                CommandMetadata::new("c").option(
                    OptionMetadata::command(["--verbose", "--verbosity"])
                        .destination(Destination::flag("v")),
                ),
            )
            .default_command("c")
            .build()
            .unwrap();
        let parsed = cli.parse(&args("--verb")).unwrap();
        assert_eq!(parsed.target.get::<bool>("v"), Some(true));
    }

    #[test]
    fn ambiguous_prefix_fails() {
        let cli = Cli::builder("p")
            .command(
                CommandMetadata::new("c")
                    .option(OptionMetadata::command(["--host"]).destination(Destination::flag("h")))
                    .option(OptionMetadata::command(["--home"]).destination(Destination::flag("m"))),
            )
            .default_command("c")
            .build()
            .unwrap();
        assert_eq!(
            cli.parse(&args("--ho")).unwrap_err(),
            ParseError::AmbiguousOption {
                token: "--ho".to_string(),
                position: 0,
                candidates: vec!["--host".to_string(), "--home".to_string()],
            }
        );
        let parsed = cli.parse(&args("--hos")).unwrap();
        assert_eq!(parsed.target.get::<bool>("h"), Some(true));
    }

    #[test]
    fn prefix_sees_global_and_command_tiers() {
        let parsed = git().parse(&args("add --i --verb")).unwrap();
        assert_eq!(parsed.target.get::<bool>("interactive"), Some(true));
        assert_eq!(parsed.target.get::<bool>("verbose"), Some(true));
    }

    #[test]
    fn dashes_alone_never_abbreviate() {
        assert_eq!(
            git().parse(&args("commit -m x ---")).unwrap_err(),
            ParseError::UnknownOption {
                token: "---".to_string(),
                position: 3
            }
        );
    }

    // -- command resolution --

    #[test]
    fn global_option_before_command() {
        let parsed = git().parse(&args("-v add -i a.txt b.txt")).unwrap();
        assert_eq!(parsed.command, "add");
        assert_eq!(parsed.group, None);
        assert_eq!(parsed.target.get::<bool>("verbose"), Some(true));
        assert_eq!(parsed.target.get::<bool>("interactive"), Some(true));
        assert_eq!(
            parsed.target.get_all::<String>("patterns"),
            vec!["a.txt", "b.txt"]
        );
    }

    #[test]
    fn global_option_after_command() {
        let parsed = git().parse(&args("add --verbose x")).unwrap();
        assert_eq!(parsed.target.get::<bool>("verbose"), Some(true));
    }

    #[test]
    fn command_option_not_visible_before_command() {
        let err = git().parse(&args("-i add")).unwrap_err();
        assert!(matches!(err, ParseError::UnknownOption { .. }));
    }

    #[test]
    fn group_and_group_option() {
        let parsed = git()
            .parse(&args("remote -n add -t main -t dev --mirror push origin url"))
            .unwrap();
        assert_eq!(parsed.group.as_deref(), Some("remote"));
        assert_eq!(parsed.command, "add");
        let v = &parsed.target;
        assert_eq!(v.get::<bool>("dry_run"), Some(true));
        assert_eq!(v.get_all::<String>("branches"), vec!["main", "dev"]);
        assert_eq!(v.get::<String>("mirror").as_deref(), Some("push"));
        assert_eq!(v.get_all::<String>("remote"), vec!["origin", "url"]);
    }

    #[test]
    fn group_option_not_visible_at_global_scope() {
        let err = git().parse(&args("-n remote add o u")).unwrap_err();
        assert!(matches!(err, ParseError::UnknownOption { .. }));
    }

    #[test]
    fn allowed_values_checked_before_coercion() {
        let err = git()
            .parse(&args("remote add --mirror pull origin url"))
            .unwrap_err();
        match err {
            ParseError::InvalidValue {
                option,
                position,
                source,
            } => {
                assert_eq!(option, "--mirror");
                assert_eq!(position, 3);
                assert_eq!(source.raw, "pull");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn default_command_without_tokens() {
        let parsed = git().parse(&Vec::<String>::new()).unwrap();
        assert_eq!(parsed.command, "help");
        assert!(parsed.assignments.is_empty());
    }

    #[test]
    fn default_command_takes_global_options_and_arguments() {
        let parsed = single_command().parse(&args("-debug p q")).unwrap();
        assert_eq!(parsed.command, "test");
        assert_eq!(parsed.target.get_all::<String>("parameters"), vec!["p", "q"]);

        let parsed = git().parse(&args("-v topic")).unwrap();
        assert_eq!(parsed.command, "help");
        assert_eq!(parsed.target.get::<bool>("verbose"), Some(true));
        assert_eq!(parsed.target.get_all::<String>("topic"), vec!["topic"]);
    }

    #[test]
    fn group_default_command() {
        let parsed = git().parse(&args("remote origin")).unwrap();
        assert_eq!(parsed.group.as_deref(), Some("remote"));
        assert_eq!(parsed.command, "show");
        assert_eq!(parsed.target.get_all::<String>("names"), vec!["origin"]);

        let parsed = git().parse(&args("remote")).unwrap();
        assert_eq!(parsed.command, "show");
    }

    #[test]
    fn unknown_command_without_default() {
        let cli = Cli::builder("p")
            .command(CommandMetadata::new("a"))
            .build()
            .unwrap();
        assert_eq!(
            cli.parse(&args("b")).unwrap_err(),
            ParseError::UnknownCommand {
                token: "b".to_string(),
                position: 0,
                group: None
            }
        );
        assert_eq!(
            cli.parse(&Vec::<String>::new()).unwrap_err(),
            ParseError::CommandRequired { group: None }
        );
        assert_eq!(
            cli.parse(&args("--")).unwrap_err(),
            ParseError::CommandRequired { group: None }
        );
    }

    #[test]
    fn unknown_command_in_group_without_default() {
        let cli = Cli::builder("p")
            .group(CommandGroupMetadata::new("g").command(CommandMetadata::new("a")))
            .build()
            .unwrap();
        assert_eq!(
            cli.parse(&args("g b")).unwrap_err(),
            ParseError::UnknownCommand {
                token: "b".to_string(),
                position: 1,
                group: Some("g".to_string())
            }
        );
        assert_eq!(
            cli.parse(&args("g")).unwrap_err(),
            ParseError::CommandRequired {
                group: Some("g".to_string())
            }
        );
    }

    #[test]
    fn bare_token_into_default_without_arguments_is_unknown_command() {
        let cli = Cli::builder("p")
            .command(CommandMetadata::new("status"))
            .command(CommandMetadata::new("push"))
            .default_command("status")
            .build()
            .unwrap();
        assert_eq!(
            cli.parse(&args("psuh")).unwrap_err(),
            ParseError::UnknownCommand {
                token: "psuh".to_string(),
                position: 0,
                group: None
            }
        );
        assert_eq!(
            cli.parse(&args("push extra")).unwrap_err(),
            ParseError::UnexpectedArguments {
                arguments: vec!["extra".to_string()],
                position: 1
            }
        );
    }

    // -- failures --

    #[test]
    fn missing_option_value() {
        assert_eq!(
            single_command().parse(&args("-debug -log")).unwrap_err(),
            ParseError::MissingOptionValue {
                option: "-log".to_string(),
                position: 1,
                expected: 1,
                found: 0
            }
        );
    }

    #[test]
    fn invalid_value_carries_context() {
        let err = single_command().parse(&args("-log two")).unwrap_err();
        match err {
            ParseError::InvalidValue {
                option,
                position,
                source,
            } => {
                assert_eq!(option, "-log");
                assert_eq!(position, 1);
                assert_eq!(source.raw, "two");
                assert_eq!(source.destination, "verbose");
                assert_eq!(source.expected, "32-bit integer");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_option_in_command_scope() {
        assert_eq!(
            git().parse(&args("add --force x")).unwrap_err(),
            ParseError::UnknownOption {
                token: "--force".to_string(),
                position: 1
            }
        );
    }

    #[test]
    fn unexpected_arguments() {
        assert_eq!(
            git().parse(&args("commit -m msg extra")).unwrap_err(),
            ParseError::UnexpectedArguments {
                arguments: vec!["extra".to_string()],
                position: 3
            }
        );
    }

    #[test]
    fn missing_required_option_and_arguments_are_distinct() {
        assert_eq!(
            git().parse(&args("commit --amend")).unwrap_err(),
            ParseError::MissingRequiredOption {
                names: vec!["-m".to_string()]
            }
        );
        assert_eq!(
            git().parse(&args("remote add")).unwrap_err(),
            ParseError::MissingRequiredArguments {
                title: "name url".to_string()
            }
        );
    }

    #[test]
    fn all_missing_required_options_reported_together() {
        let cli = Cli::builder("p")
            .command(
                CommandMetadata::new("c")
                    .option(
                        OptionMetadata::command(["--user"])
                            .required()
                            .destination(Destination::single("user", ValueType::String)),
                    )
                    .option(
                        OptionMetadata::command(["--host"])
                            .required()
                            .destination(Destination::single("host", ValueType::String)),
                    ),
            )
            .default_command("c")
            .build()
            .unwrap();
        assert_eq!(
            cli.parse(&Vec::<String>::new()).unwrap_err(),
            ParseError::MissingRequiredOption {
                names: vec!["--user".to_string(), "--host".to_string()]
            }
        );
    }

    // -- merged destinations --

    #[test]
    fn merged_option_writes_every_destination() {
        let cmd = CommandMetadata::new("c")
            .option(OptionMetadata::command(["-v"]).destination(Destination::flag("outer.verbose")))
            .option(OptionMetadata::command(["-v"]).destination(Destination::flag("inner.verbose")));
        let cli = Cli::builder("p")
            .command(cmd)
            .default_command("c")
            .build()
            .unwrap();
        let parsed = cli.parse(&args("-v")).unwrap();
        assert_eq!(parsed.target.get::<bool>("outer.verbose"), Some(true));
        assert_eq!(parsed.target.get::<bool>("inner.verbose"), Some(true));
    }

    #[test]
    fn global_values_reach_only_the_selected_command() {
        let verbose = |path: &str| {
            OptionMetadata::global(["-v"]).destination(Destination::flag(path))
        };
        let cli = Cli::builder("p")
            .command(CommandMetadata::new("a").option(verbose("a.verbose")))
            .command(CommandMetadata::new("b").option(verbose("b.verbose")))
            .build()
            .unwrap();
        let parsed = cli.parse(&args("-v b")).unwrap();
        assert_eq!(parsed.target.get::<bool>("b.verbose"), Some(true));
        assert!(!parsed.target.is_present("a.verbose"));
    }

    #[test]
    fn arity_two_consumes_two_tokens() {
        let cli = Cli::builder("p")
            .command(
                CommandMetadata::new("c")
                    .option(
                        OptionMetadata::command(["--range"])
                            .arity(2)
                            .destination(Destination::multi("range", ValueType::I64)),
                    )
                    .arguments(
                        ArgumentsMetadata::new("rest")
                            .destination(Destination::multi("rest", ValueType::String)),
                    ),
            )
            .default_command("c")
            .build()
            .unwrap();
        let parsed = cli.parse(&args("--range -1 5 tail")).unwrap();
        assert_eq!(parsed.target.get_all::<i64>("range"), vec![-1, 5]);
        assert_eq!(parsed.target.get_all::<String>("rest"), vec!["tail"]);

        let err = cli.parse(&args("--range 1")).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingOptionValue {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn explicit_boolean_arity_reads_text() {
        let cli = Cli::builder("p")
            .command(
                CommandMetadata::new("c").option(
                    OptionMetadata::command(["--color"])
                        .arity(1)
                        .destination(Destination::flag("color")),
                ),
            )
            .default_command("c")
            .build()
            .unwrap();
        let parsed = cli.parse(&args("--color false")).unwrap();
        assert_eq!(parsed.target.get::<bool>("color"), Some(false));
    }

    // -- targets --

    #[derive(Debug, Default)]
    struct Commit {
        message: Option<String>,
        amend: bool,
    }

    impl Target for Commit {
        fn set(&mut self, path: &str, value: Value) -> std::result::Result<(), String> {
            match (path, value) {
                ("message", Value::Str(s)) => self.message = Some(s),
                ("amend", Value::Bool(b)) => self.amend = b,
                ("verbose", _) => {}
                (other, _) => return Err(format!("no field `{}`", other)),
            }
            Ok(())
        }

        fn append(&mut self, path: &str, _value: Value) -> std::result::Result<(), String> {
            Err(format!("no list field `{}`", path))
        }
    }

    #[test]
    fn custom_target_from_factory() {
        let parsed = git()
            .parse_with(&args("commit --amend -m fix"), |cmd| {
                assert_eq!(cmd.name, "commit");
                Commit::default()
            })
            .unwrap();
        assert_eq!(parsed.target.message.as_deref(), Some("fix"));
        assert!(parsed.target.amend);
    }

    #[test]
    fn target_rejection_surfaces_as_error() {
        let err = git()
            .parse_with(&args("add x"), |_| Commit::default())
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::Target {
                destination: "patterns".to_string(),
                message: "no list field `patterns`".to_string(),
            }
        );
    }

    #[test]
    fn failed_parse_never_builds_a_target() {
        let mut built = false;
        let result = git().parse_with(&args("commit"), |_| {
            built = true;
            Values::new()
        });
        assert!(result.is_err());
        assert!(!built);
    }

    #[test]
    fn cli_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Cli>();

        let cli = std::sync::Arc::new(git());
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let cli = std::sync::Arc::clone(&cli);
                std::thread::spawn(move || {
                    let msg = format!("m{}", n);
                    let parsed = cli.parse(&["commit", "-m", msg.as_str()]).unwrap();
                    parsed.target.get::<String>("message")
                })
            })
            .collect();
        for (n, h) in handles.into_iter().enumerate() {
            assert_eq!(h.join().unwrap(), Some(format!("m{}", n)));
        }
    }
}
