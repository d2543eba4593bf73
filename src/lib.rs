//! Load, override and persist `.env` files.
//!
//! [`EnvStore`] is the safe default: it mirrors into an in-memory target and
//! can be owned and shared like any other value.
//!
//! Stores built with [`EnvStore::process`] and the [`global`] functions
//! mutate the process environment and are `unsafe`, because callers must
//! guarantee no concurrent process-environment access.

mod env;
mod error;
pub mod global;
mod loader;
mod model;
mod parser;
mod persist;
mod store;

pub use env::TargetEnv;
pub use error::{EnvWriteError, EnvWriteErrorKind, Error, LineIssue, ParseError, ParseErrorKind};
pub use model::{Entry, LoadReport, ParseMode, Persist, SaveFormat};
pub use parser::{
    Line, LineScanner, classify_line, parse_line, parse_reader, parse_reader_with_mode, parse_str,
    parse_str_with_mode, trim_line,
};
pub use persist::{SaveHandle, write_entries};
pub use store::EnvStore;
