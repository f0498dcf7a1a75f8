use crate::value::CoercionError;

/// Metadata inconsistencies detected while building a [`Cli`](crate::Cli).
///
/// These are configuration bugs in the program definition: a parser is never
/// constructed when one of them is found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("option `{name}` is bound to conflicting definitions at {first} and {second}")]
    OptionConflict {
        name: String,
        first: String,
        second: String,
    },

    #[error("conflicting positional arguments declared at {first} and {second}")]
    ArgumentsConflict { first: String, second: String },

    #[error("an option declared at {0} has no names")]
    UnnamedOption(String),

    #[error("option `{0}` has no destinations")]
    NoDestinations(String),

    #[error("command `{command}` declares group option `{option}` but belongs to no group")]
    GroupOptionOutsideGroup { command: String, option: String },

    #[error("duplicate command `{name}` in {scope}")]
    DuplicateCommand { name: String, scope: String },

    #[error("duplicate command group `{0}`")]
    DuplicateGroup(String),

    #[error("default command `{name}` is not a command of {scope}")]
    UnknownDefaultCommand { name: String, scope: String },
}

/// A failed parse. Every variant carries enough context to render a message
/// without going back to the token stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown option `{token}` at position {position}")]
    UnknownOption { token: String, position: usize },

    #[error("option `{token}` at position {position} is ambiguous: could be {}", candidates.join(", "))]
    AmbiguousOption {
        token: String,
        position: usize,
        candidates: Vec<String>,
    },

    #[error("option `{option}` at position {position} expects {expected} value(s) but {found} remain")]
    MissingOptionValue {
        option: String,
        position: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid value for `{option}` at position {position}: {source}")]
    InvalidValue {
        option: String,
        position: usize,
        #[source]
        source: CoercionError,
    },

    #[error("unknown command `{token}` at position {position}{}", in_group(group))]
    UnknownCommand {
        token: String,
        position: usize,
        group: Option<String>,
    },

    #[error("a command is required{}", in_group(group))]
    CommandRequired { group: Option<String> },

    #[error("missing required option(s): {}", names.join(", "))]
    MissingRequiredOption { names: Vec<String> },

    #[error("missing required arguments: {title}")]
    MissingRequiredArguments { title: String },

    #[error("unexpected arguments starting at position {position}: {}", arguments.join(" "))]
    UnexpectedArguments {
        arguments: Vec<String>,
        position: usize,
    },

    #[error("cannot write `{destination}`: {message}")]
    Target {
        destination: String,
        message: String,
    },
}

fn in_group(group: &Option<String>) -> String {
    match group {
        Some(name) => format!(" in group `{}`", name),
        None => String::new(),
    }
}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;
