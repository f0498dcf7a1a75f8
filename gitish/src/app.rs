use std::io::Write;

use argtree::{Cli, CommandGroupMetadata, CommandMetadata, OptionMetadata, ParsedCommand, Slot, Values};

use crate::arguments::PROGRAM;
use crate::error::{GitishError, Result};

/// Parse `args` and write the outcome to `out`.
pub fn run<S: AsRef<str>, W: Write>(cli: &Cli, args: &[S], out: &mut W) -> Result<()> {
    let parsed = cli.parse(args)?;
    log::debug!(
        "selected {}{} with {} assignment(s)",
        parsed.group.as_deref().map(|g| format!("{} ", g)).unwrap_or_default(),
        parsed.command,
        parsed.assignments.len()
    );

    match (parsed.group.as_deref(), parsed.command.as_str()) {
        (None, "help") => print_help(cli, &parsed.target.get_all::<String>("topic"), out),
        (None, "complete") => {
            for candidate in cli.suggest(&parsed.target.get_all::<String>("tokens")) {
                writeln!(out, "{}", candidate)?;
            }
            Ok(())
        }
        _ => print_invocation(&parsed, out),
    }
}

// ============================================================================
// Invocation report
// ============================================================================

/// One `key=value` line per value, keys in path order. Multi-valued paths
/// repeat their key.
fn print_invocation<W: Write>(parsed: &ParsedCommand<Values>, out: &mut W) -> Result<()> {
    if let Some(group) = &parsed.group {
        writeln!(out, "group={}", group)?;
    }
    writeln!(out, "command={}", parsed.command)?;
    for (path, slot) in parsed.target.iter() {
        match slot {
            Slot::Single(value) => writeln!(out, "{}={}", path, value)?,
            Slot::Multi(values) => {
                for value in values {
                    writeln!(out, "{}={}", path, value)?;
                }
            }
        }
    }
    if parsed.target.get::<bool>("verbose") == Some(true) {
        for a in &parsed.assignments {
            writeln!(out, "assignment={}:{}", a.destination.path(), a.value)?;
        }
    }
    Ok(())
}

// ============================================================================
// help
// ============================================================================

fn print_help<W: Write>(cli: &Cli, topic: &[String], out: &mut W) -> Result<()> {
    let meta = cli.metadata();
    let topic: Vec<&str> = topic.iter().map(String::as_str).collect();

    match topic.as_slice() {
        [] => {
            write!(out, "usage: {}", PROGRAM)?;
            for opt in meta.options().iter().filter(|o| !o.hidden) {
                write!(out, " [{}]", synopsis(opt, " | "))?;
            }
            writeln!(out, " <command> [<args>]")?;
            if let Some(desc) = &meta.description {
                writeln!(out, "\n{}", desc)?;
            }
            writeln!(out, "\ncommands:")?;
            for cmd in meta.commands().iter().filter(|c| !c.hidden) {
                writeln!(out, "  {:<12}{}", cmd.name, cmd.description.as_deref().unwrap_or(""))?;
            }
            writeln!(out, "\ngroups:")?;
            for group in meta.groups().iter().filter(|g| !g.hidden) {
                writeln!(out, "  {:<12}{}", group.name, group.description.as_deref().unwrap_or(""))?;
            }
            Ok(())
        }
        [name] => {
            if let Some(cmd) = meta.find_command(name) {
                print_command_help(None, cmd, out)
            } else if let Some(group) = meta.find_group(name) {
                print_group_help(group, out)
            } else {
                Err(GitishError::UnknownTopic(name.to_string()))
            }
        }
        [group, name] => {
            let cmd = meta
                .find_group(group)
                .and_then(|g| g.find_command(name))
                .ok_or_else(|| GitishError::UnknownTopic(topic.join(" ")))?;
            print_command_help(Some(*group), cmd, out)
        }
        _ => Err(GitishError::UnknownTopic(topic.join(" "))),
    }
}

fn print_group_help<W: Write>(group: &CommandGroupMetadata, out: &mut W) -> Result<()> {
    writeln!(out, "usage: {} {} [<options>] <command> [<args>]", PROGRAM, group.name)?;
    if let Some(desc) = &group.description {
        writeln!(out, "\n{}", desc)?;
    }
    print_options(group.options(), out)?;
    writeln!(out, "\ncommands:")?;
    let default = group.get_default_command().map(|c| c.name.as_str());
    for cmd in group.commands().iter().filter(|c| !c.hidden) {
        let marker = if Some(cmd.name.as_str()) == default { " (default)" } else { "" };
        writeln!(
            out,
            "  {:<12}{}{}",
            cmd.name,
            cmd.description.as_deref().unwrap_or(""),
            marker
        )?;
    }
    Ok(())
}

fn print_command_help<W: Write>(group: Option<&str>, cmd: &CommandMetadata, out: &mut W) -> Result<()> {
    write!(out, "usage: {}", PROGRAM)?;
    if let Some(group) = group {
        write!(out, " {}", group)?;
    }
    write!(out, " {} [<options>]", cmd.name)?;
    if let Some(args) = cmd.positional() {
        if args.required {
            write!(out, " <{}>...", args.title)?;
        } else {
            write!(out, " [<{}>...]", args.title)?;
        }
    }
    writeln!(out)?;
    if let Some(desc) = &cmd.description {
        writeln!(out, "\n{}", desc)?;
    }
    print_options(cmd.options(), out)
}

fn print_options<W: Write>(options: &[OptionMetadata], out: &mut W) -> Result<()> {
    let visible: Vec<&OptionMetadata> = options.iter().filter(|o| !o.hidden).collect();
    if visible.is_empty() {
        return Ok(());
    }
    writeln!(out, "\noptions:")?;
    for opt in visible {
        let mut line = format!("  {:<26}{}", synopsis(opt, ", "), opt.description.as_deref().unwrap_or(""));
        if opt.required {
            line.push_str(" (required)");
        }
        if let Some(allowed) = &opt.allowed_values {
            line.push_str(&format!(" [{}]", allowed.join("|")));
        }
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}

fn synopsis(opt: &OptionMetadata, separator: &str) -> String {
    let names = opt.names.join(separator);
    match opt.effective_arity() {
        0 => names,
        1 => format!("{} <{}>", names, opt.title),
        n => format!("{} <{}>{{{}}}", names, opt.title, n),
    }
}
