use argtree::{
    ArgumentsMetadata, Cli, CommandGroupMetadata, CommandMetadata, Destination, MetadataError,
    OptionMetadata, ValueType,
};

pub const PROGRAM: &str = "gitish";

/// Log output formats accepted by `log --format`.
const LOG_FORMATS: [&str; 3] = ["oneline", "short", "full"];

// ============================================================================
// Shared options
// ============================================================================

// Every command redeclares these; the merge resolver folds the copies into a
// single global option.
fn verbose() -> OptionMetadata {
    OptionMetadata::global(["-v", "--verbose"])
        .description("Report every value assignment.")
        .destination(Destination::flag("verbose"))
}

fn directory() -> OptionMetadata {
    OptionMetadata::global(["-C"])
        .title("path")
        .description("Run as if started in <path>.")
        .destination(Destination::single("directory", ValueType::String))
}

fn dry_run() -> OptionMetadata {
    OptionMetadata::group(["-n", "--dry-run"])
        .description("Do not touch the remote configuration.")
        .destination(Destination::flag("dry_run"))
}

fn command(name: &str, description: &str) -> CommandMetadata {
    CommandMetadata::new(name)
        .description(description)
        .option(verbose())
        .option(directory())
}

// ============================================================================
// Commands
// ============================================================================

fn add() -> CommandMetadata {
    command("add", "Add file contents to the index")
        .option(
            OptionMetadata::command(["-i", "--interactive"])
                .description("Pick hunks interactively.")
                .destination(Destination::flag("interactive")),
        )
        .option(
            OptionMetadata::command(["-f", "--force"])
                .description("Allow adding ignored files.")
                .destination(Destination::flag("force")),
        )
        .arguments(
            ArgumentsMetadata::new("pathspec")
                .description("Files to add.")
                .destination(Destination::multi("pathspec", ValueType::String)),
        )
}

fn commit() -> CommandMetadata {
    command("commit", "Record changes to the repository")
        .option(
            OptionMetadata::command(["-m", "--message"])
                .title("message")
                .required()
                .description("Commit message.")
                .destination(Destination::single("message", ValueType::String)),
        )
        .option(
            OptionMetadata::command(["--amend"])
                .description("Replace the tip of the current branch.")
                .destination(Destination::flag("amend")),
        )
        .option(
            OptionMetadata::command(["--author"])
                .description("Override the commit author.")
                .destination(Destination::single("author", ValueType::String)),
        )
        .option(
            OptionMetadata::command(["--date"])
                .description("Override the author date (YYYY-MM-DD).")
                .destination(Destination::single("date", ValueType::Date)),
        )
}

fn log_command() -> CommandMetadata {
    command("log", "Show commit logs")
        .option(
            OptionMetadata::command(["-n", "--max-count"])
                .title("number")
                .description("Limit the number of commits to output.")
                .destination(Destination::single("max_count", ValueType::U32)),
        )
        .option(
            OptionMetadata::command(["--since"])
                .description("Show commits more recent than a date.")
                .destination(Destination::single("since", ValueType::Date)),
        )
        .option(
            OptionMetadata::command(["--format"])
                .description("Pretty-print format.")
                .destination(Destination::single(
                    "format",
                    ValueType::enumeration(LOG_FORMATS),
                )),
        )
        .option(
            OptionMetadata::command(["--grep"])
                .title("pattern")
                .description("Limit to commits whose message matches. Repeatable.")
                .destination(Destination::multi("grep", ValueType::String)),
        )
        .option(
            OptionMetadata::command(["--min-ratio"])
                .description("Skip commits whose change ratio is below this.")
                .destination(Destination::single("min_ratio", ValueType::Decimal)),
        )
        .arguments(
            ArgumentsMetadata::new("revision range")
                .destination(Destination::multi("revisions", ValueType::String)),
        )
}

fn help() -> CommandMetadata {
    command("help", "Display help information").arguments(
        ArgumentsMetadata::new("topic").destination(Destination::multi("topic", ValueType::String)),
    )
}

fn complete() -> CommandMetadata {
    command("complete", "Print completions for a partial command line")
        .hidden()
        .arguments(
            ArgumentsMetadata::new("tokens")
                .destination(Destination::multi("tokens", ValueType::String)),
        )
}

// ============================================================================
// remote group
// ============================================================================

fn remote_command(name: &str, description: &str) -> CommandMetadata {
    command(name, description).option(dry_run())
}

fn remote() -> CommandGroupMetadata {
    let show = remote_command("show", "Show remotes").arguments(
        ArgumentsMetadata::new("name").destination(Destination::multi("names", ValueType::String)),
    );
    let add = remote_command("add", "Add a remote")
        .option(
            OptionMetadata::command(["-t", "--track"])
                .title("branch")
                .description("Track only <branch>. Repeatable.")
                .destination(Destination::multi("track", ValueType::String)),
        )
        .option(
            OptionMetadata::command(["-f", "--fetch"])
                .description("Fetch right after adding.")
                .destination(Destination::flag("fetch")),
        )
        .option(
            OptionMetadata::command(["--mirror"])
                .allowed_values(["fetch", "push"])
                .description("Set up a mirror remote.")
                .destination(Destination::single("mirror", ValueType::String)),
        )
        .arguments(
            ArgumentsMetadata::new("name url")
                .required()
                .destination(Destination::multi("remote", ValueType::String)),
        );
    let remove = remote_command("remove", "Remove a remote").arguments(
        ArgumentsMetadata::new("name")
            .required()
            .destination(Destination::multi("names", ValueType::String)),
    );
    CommandGroupMetadata::new("remote")
        .description("Manage tracked repositories")
        .default_command("show")
        .command(show)
        .command(add)
        .command(remove)
}

/// The full gitish command line.
pub fn build_cli() -> Result<Cli, MetadataError> {
    Cli::builder(PROGRAM)
        .description("A git-shaped command line that reports what it parsed.")
        .command(add())
        .command(commit())
        .command(log_command())
        .command(help())
        .command(complete())
        .default_command("help")
        .group(remote())
        .build()
}
