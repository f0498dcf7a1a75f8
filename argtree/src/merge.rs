//! Merge resolver: collapses options declared through several paths and
//! rejects genuine name conflicts.

use std::collections::HashMap;

use crate::error::MetadataError;
use crate::metadata::{
    ArgumentsMetadata, CommandGroupMetadata, CommandMetadata, GlobalMetadata, OptionKey,
    OptionMetadata, OptionScope,
};
use crate::target::Destination;

type Result<T> = std::result::Result<T, MetadataError>;

/// Merge structurally identical options into one descriptor carrying the
/// union of their destinations, then check that every name still maps to a
/// single descriptor.
///
/// First-seen order is preserved both for the merged options and for the
/// destinations inside each of them.
pub fn merge_options(options: Vec<OptionMetadata>) -> Result<Vec<OptionMetadata>> {
    let mut merged: Vec<OptionMetadata> = Vec::new();
    let mut by_key: HashMap<OptionKey, usize> = HashMap::new();

    for opt in options {
        let key = opt.key();
        match by_key.get(&key) {
            Some(&idx) => {
                log::debug!(
                    "merging option {:?} declared at {} into {}",
                    opt.names,
                    opt.site(),
                    merged[idx].site()
                );
                union_destinations(&mut merged[idx].destinations, opt.destinations);
            }
            None => {
                by_key.insert(key, merged.len());
                merged.push(opt);
            }
        }
    }

    let mut by_name: HashMap<&str, usize> = HashMap::new();
    for (idx, opt) in merged.iter().enumerate() {
        for name in &opt.names {
            if let Some(&other) = by_name.get(name.as_str()) {
                if other != idx {
                    return Err(MetadataError::OptionConflict {
                        name: name.clone(),
                        first: merged[other].site(),
                        second: opt.site(),
                    });
                }
            }
            by_name.insert(name.as_str(), idx);
        }
    }

    Ok(merged)
}

/// Same as [`merge_options`] for positional descriptors: any number of
/// identical declarations collapse into one, anything else is a conflict.
pub fn merge_arguments(arguments: Vec<ArgumentsMetadata>) -> Result<Option<ArgumentsMetadata>> {
    let mut merged: Option<ArgumentsMetadata> = None;
    for args in arguments {
        match merged.as_mut() {
            None => merged = Some(args),
            Some(existing) => {
                if !existing.same_shape(&args) {
                    return Err(MetadataError::ArgumentsConflict {
                        first: existing.site(),
                        second: args.site(),
                    });
                }
                union_destinations(&mut existing.destinations, args.destinations);
            }
        }
    }
    Ok(merged)
}

fn union_destinations(into: &mut Vec<Destination>, from: Vec<Destination>) {
    for dest in from {
        if !into.contains(&dest) {
            into.push(dest);
        }
    }
}

// ============================================================================
// Tree resolution
// ============================================================================

fn check_declarations(cmd: &CommandMetadata) -> Result<()> {
    for opt in &cmd.options {
        if opt.names.is_empty() || opt.names.iter().any(String::is_empty) {
            return Err(MetadataError::UnnamedOption(format!(
                "command `{}` ({})",
                cmd.name,
                opt.site()
            )));
        }
        if opt.destinations.is_empty() {
            return Err(MetadataError::NoDestinations(opt.names.join("|")));
        }
    }
    Ok(())
}

/// Command-local merge: all scopes at once, plus the positional descriptor.
fn resolve_command(mut cmd: CommandMetadata) -> Result<CommandMetadata> {
    check_declarations(&cmd)?;
    cmd.options = merge_options(std::mem::take(&mut cmd.options))?;
    cmd.arguments = merge_arguments(std::mem::take(&mut cmd.arguments))?
        .into_iter()
        .collect();
    Ok(cmd)
}

fn resolve_commands(commands: Vec<CommandMetadata>, scope: &str) -> Result<Vec<CommandMetadata>> {
    let mut resolved: Vec<CommandMetadata> = Vec::with_capacity(commands.len());
    for cmd in commands {
        if resolved.iter().any(|c| c.name == cmd.name) {
            return Err(MetadataError::DuplicateCommand {
                name: cmd.name,
                scope: scope.to_string(),
            });
        }
        resolved.push(resolve_command(cmd)?);
    }
    Ok(resolved)
}

fn scoped_options<'a, I>(commands: I, scope: OptionScope) -> Vec<OptionMetadata>
where
    I: IntoIterator<Item = &'a CommandMetadata>,
{
    commands
        .into_iter()
        .flat_map(|c| c.options_in(scope).cloned())
        .collect()
}

fn check_default(default: &Option<String>, commands: &[CommandMetadata], scope: &str) -> Result<()> {
    match default {
        Some(name) if !commands.iter().any(|c| &c.name == name) => {
            Err(MetadataError::UnknownDefaultCommand {
                name: name.clone(),
                scope: scope.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Build the immutable tree: command-local merges first, then group options
/// across each group's commands, then global options across every command.
pub(crate) fn resolve_global(
    name: String,
    description: Option<String>,
    default_command: Option<String>,
    commands: Vec<CommandMetadata>,
    groups: Vec<CommandGroupMetadata>,
) -> Result<GlobalMetadata> {
    let program = format!("program `{}`", name);
    let commands = resolve_commands(commands, &program)?;
    for cmd in &commands {
        if let Some(opt) = cmd.group_options().next() {
            return Err(MetadataError::GroupOptionOutsideGroup {
                command: cmd.name.clone(),
                option: opt.names.join("|"),
            });
        }
    }
    check_default(&default_command, &commands, &program)?;

    let mut resolved_groups: Vec<CommandGroupMetadata> = Vec::with_capacity(groups.len());
    for mut group in groups {
        if resolved_groups.iter().any(|g| g.name == group.name) {
            return Err(MetadataError::DuplicateGroup(group.name));
        }
        if commands.iter().any(|c| c.name == group.name) {
            return Err(MetadataError::DuplicateCommand {
                name: group.name,
                scope: program,
            });
        }
        let scope = format!("group `{}`", group.name);
        group.commands = resolve_commands(std::mem::take(&mut group.commands), &scope)?;
        check_default(&group.default_command, &group.commands, &scope)?;
        group.options = merge_options(scoped_options(&group.commands, OptionScope::Group))?;
        log::debug!(
            "group `{}`: {} command(s), {} group option(s)",
            group.name,
            group.commands.len(),
            group.options.len()
        );
        resolved_groups.push(group);
    }

    let all_commands = commands
        .iter()
        .chain(resolved_groups.iter().flat_map(|g| g.commands.iter()));
    let options = merge_options(scoped_options(all_commands, OptionScope::Global))?;
    log::debug!(
        "{}: {} global option(s), {} command(s), {} group(s)",
        program,
        options.len(),
        commands.len(),
        resolved_groups.len()
    );

    Ok(GlobalMetadata {
        name,
        description,
        options,
        default_command,
        commands,
        groups: resolved_groups,
    })
}
