//! Configuration, output routing and the run life cycle.

pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod output;
pub mod parser;
pub mod settings;
pub mod validator;

pub use error::{BalanceError, ParseError, Phase};
pub use lifecycle::{DefaultStages, ExitCode, LifeCycle, Stages, State};
pub use output::{Captured, Console, DiagStream, OutputRouter};
pub use parser::SettingsParser;
pub use settings::{LogTarget, STDERR_SENTINEL, STDOUT_SENTINEL, Settings};
pub use validator::Validator;
