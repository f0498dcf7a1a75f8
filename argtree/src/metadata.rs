//! Descriptor tree consumed by the parser.
//!
//! Descriptors are assembled with chained builder methods and handed to
//! [`Cli::builder`](crate::Cli::builder); once `build()` has merged and
//! validated them they are never mutated again, so a built tree can be shared
//! freely between threads.

use std::collections::BTreeSet;

use crate::target::Destination;

// ============================================================================
// OptionScope
// ============================================================================

/// Token-stream segment in which an option is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionScope {
    Global,
    Group,
    Command,
}

// ============================================================================
// OptionMetadata
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct OptionMetadata {
    pub scope: OptionScope,
    pub names: Vec<String>,
    pub title: String,
    pub description: Option<String>,
    /// Explicit arity. `None` infers it from the first destination.
    pub arity: Option<usize>,
    pub required: bool,
    pub hidden: bool,
    pub allowed_values: Option<Vec<String>>,
    pub destinations: Vec<Destination>,
}

impl OptionMetadata {
    pub fn new<I, S>(scope: OptionScope, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let title = names
            .first()
            .map(|n| n.trim_start_matches('-').to_string())
            .unwrap_or_default();
        OptionMetadata {
            scope,
            names,
            title,
            description: None,
            arity: None,
            required: false,
            hidden: false,
            allowed_values: None,
            destinations: Vec::new(),
        }
    }

    pub fn global<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(OptionScope::Global, names)
    }

    pub fn group<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(OptionScope::Group, names)
    }

    pub fn command<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(OptionScope::Command, names)
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn destination(mut self, dest: Destination) -> Self {
        self.destinations.push(dest);
        self
    }

    /// Number of tokens consumed after the option name. An explicit arity
    /// always wins; otherwise booleans take none and everything else one.
    pub fn effective_arity(&self) -> usize {
        match self.arity {
            Some(n) => n,
            None => match self.destinations.first() {
                Some(d) if d.value_type().is_bool() => 0,
                _ => 1,
            },
        }
    }

    pub fn is_multi_valued(&self) -> bool {
        self.destinations.iter().any(Destination::is_multi_valued)
    }

    pub fn is_allowed(&self, raw: &str) -> bool {
        match &self.allowed_values {
            Some(allowed) => allowed.iter().any(|a| a == raw),
            None => true,
        }
    }

    /// Identity for merging: everything except the destinations.
    pub fn key(&self) -> OptionKey {
        OptionKey {
            scope: self.scope,
            names: self.names.iter().cloned().collect(),
            title: self.title.clone(),
            description: self.description.clone(),
            arity: self.effective_arity(),
            required: self.required,
            hidden: self.hidden,
            allowed_values: self
                .allowed_values
                .as_ref()
                .map(|v| v.iter().cloned().collect()),
        }
    }

    /// Where this option was declared, for diagnostics.
    pub fn site(&self) -> String {
        describe_site(&self.destinations)
    }
}

/// Structural equality key of an option. Two options with equal keys are the
/// same command-line option declared through different paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OptionKey {
    scope: OptionScope,
    names: BTreeSet<String>,
    title: String,
    description: Option<String>,
    arity: usize,
    required: bool,
    hidden: bool,
    allowed_values: Option<BTreeSet<String>>,
}

fn describe_site(destinations: &[Destination]) -> String {
    let paths: Vec<String> = destinations
        .iter()
        .map(|d| format!("`{}`", d.path()))
        .collect();
    if paths.is_empty() {
        "<no destination>".to_string()
    } else {
        paths.join(", ")
    }
}

// ============================================================================
// ArgumentsMetadata
// ============================================================================

/// Trailing positional capture of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentsMetadata {
    pub title: String,
    pub description: Option<String>,
    pub required: bool,
    pub destinations: Vec<Destination>,
}

impl ArgumentsMetadata {
    pub fn new(title: &str) -> Self {
        ArgumentsMetadata {
            title: title.to_string(),
            description: None,
            required: false,
            destinations: Vec::new(),
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn destination(mut self, dest: Destination) -> Self {
        self.destinations.push(dest);
        self
    }

    pub fn is_multi_valued(&self) -> bool {
        self.destinations.iter().any(Destination::is_multi_valued)
    }

    pub(crate) fn same_shape(&self, other: &ArgumentsMetadata) -> bool {
        self.title == other.title
            && self.description == other.description
            && self.required == other.required
    }

    pub fn site(&self) -> String {
        describe_site(&self.destinations)
    }
}

// ============================================================================
// CommandMetadata
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CommandMetadata {
    pub name: String,
    pub description: Option<String>,
    pub hidden: bool,
    pub(crate) options: Vec<OptionMetadata>,
    pub(crate) arguments: Vec<ArgumentsMetadata>,
}

impl CommandMetadata {
    pub fn new(name: &str) -> Self {
        CommandMetadata {
            name: name.to_string(),
            description: None,
            hidden: false,
            options: Vec::new(),
            arguments: Vec::new(),
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Declare an option. Declaring the same option more than once (for
    /// instance from two nested option sets) is fine as long as only the
    /// destinations differ.
    pub fn option(mut self, opt: OptionMetadata) -> Self {
        self.options.push(opt);
        self
    }

    pub fn arguments(mut self, args: ArgumentsMetadata) -> Self {
        self.arguments.push(args);
        self
    }

    /// Every option the command declares, all scopes, merged.
    pub fn options(&self) -> &[OptionMetadata] {
        &self.options
    }

    pub fn options_in(&self, scope: OptionScope) -> impl Iterator<Item = &OptionMetadata> {
        self.options.iter().filter(move |o| o.scope == scope)
    }

    pub fn global_options(&self) -> impl Iterator<Item = &OptionMetadata> {
        self.options_in(OptionScope::Global)
    }

    pub fn group_options(&self) -> impl Iterator<Item = &OptionMetadata> {
        self.options_in(OptionScope::Group)
    }

    pub fn command_options(&self) -> impl Iterator<Item = &OptionMetadata> {
        self.options_in(OptionScope::Command)
    }

    pub fn positional(&self) -> Option<&ArgumentsMetadata> {
        self.arguments.first()
    }
}

// ============================================================================
// CommandGroupMetadata
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CommandGroupMetadata {
    pub name: String,
    pub description: Option<String>,
    pub hidden: bool,
    pub(crate) options: Vec<OptionMetadata>,
    pub(crate) default_command: Option<String>,
    pub(crate) commands: Vec<CommandMetadata>,
}

impl CommandGroupMetadata {
    pub fn new(name: &str) -> Self {
        CommandGroupMetadata {
            name: name.to_string(),
            description: None,
            hidden: false,
            options: Vec::new(),
            default_command: None,
            commands: Vec::new(),
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn command(mut self, cmd: CommandMetadata) -> Self {
        self.commands.push(cmd);
        self
    }

    /// Command used when no command name follows the group name. Must name
    /// one of the group's commands.
    pub fn default_command(mut self, name: &str) -> Self {
        self.default_command = Some(name.to_string());
        self
    }

    /// Group-scoped options, merged across the member commands.
    pub fn options(&self) -> &[OptionMetadata] {
        &self.options
    }

    pub fn commands(&self) -> &[CommandMetadata] {
        &self.commands
    }

    pub fn find_command(&self, name: &str) -> Option<&CommandMetadata> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn get_default_command(&self) -> Option<&CommandMetadata> {
        self.default_command
            .as_deref()
            .and_then(|name| self.find_command(name))
    }
}

// ============================================================================
// GlobalMetadata
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalMetadata {
    pub name: String,
    pub description: Option<String>,
    pub(crate) options: Vec<OptionMetadata>,
    pub(crate) default_command: Option<String>,
    pub(crate) commands: Vec<CommandMetadata>,
    pub(crate) groups: Vec<CommandGroupMetadata>,
}

impl GlobalMetadata {
    /// Global-scoped options, merged across every command of the program.
    pub fn options(&self) -> &[OptionMetadata] {
        &self.options
    }

    /// Commands outside any group, in declaration order.
    pub fn commands(&self) -> &[CommandMetadata] {
        &self.commands
    }

    pub fn groups(&self) -> &[CommandGroupMetadata] {
        &self.groups
    }

    pub fn find_command(&self, name: &str) -> Option<&CommandMetadata> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn find_group(&self, name: &str) -> Option<&CommandGroupMetadata> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn get_default_command(&self) -> Option<&CommandMetadata> {
        self.default_command
            .as_deref()
            .and_then(|name| self.find_command(name))
    }
}
