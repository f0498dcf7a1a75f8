//! Declarative parsing for git-style command lines.
//!
//! A program is described as a tree of descriptors:
//!
//! ```text
//! program [global-opts] [group [group-opts]] command [command-opts] [args]
//! ```
//!
//! - [`OptionMetadata`] names an option, its arity and where its values go
//! - [`CommandMetadata`] bundles options and an optional [`ArgumentsMetadata`]
//! - [`CommandGroupMetadata`] nests commands under a group name
//! - [`Cli::builder`] merges and validates the tree into an immutable [`Cli`]
//!
//! `Cli::parse` then turns an argument vector into a [`ParsedCommand`] whose
//! target has every declared [`Destination`] populated, or a [`ParseError`]
//! saying exactly which token was wrong.

mod error;
pub mod merge;
mod metadata;
mod parser;
mod suggest;
mod target;
mod value;

pub use error::{MetadataError, ParseError, Result};
pub use metadata::{
    ArgumentsMetadata, CommandGroupMetadata, CommandMetadata, GlobalMetadata, OptionKey,
    OptionMetadata, OptionScope,
};
pub use parser::{Assignment, Cli, CliBuilder, ParsedCommand, END_OF_OPTIONS};
pub use suggest::option_names;
pub use target::{Destination, Slot, Target, Values};
pub use value::{
    coerce, CoercionError, Decimal, FromValue, ParseDecimalError, Value, ValueType, DATE_FORMAT,
    MAX_DECIMAL_SCALE,
};
