//! Immutable run configuration.

use crate::partitioning::DecompMethod;
use std::path::Path;

/// Log-file value that binds the diagnostic stream to stdout.
pub const STDOUT_SENTINEL: &str = "cout";
/// Log-file value that binds the diagnostic stream to stderr.
pub const STDERR_SENTINEL: &str = "cerr";
/// Log file used when none is given on the command line.
pub const DEFAULT_LOG_FILENAME: &str = "mesh_balance.log";
/// Output directory used when none is given on the command line.
pub const DEFAULT_OUTPUT_DIRECTORY: &str = ".";
pub const DEFAULT_IMBALANCE_TOLERANCE: f64 = 1.05;

/// Where the root's diagnostic stream goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget<'a> {
    Stdout,
    Stderr,
    File(&'a str),
}

/// Settings of one balance run, identical on every process.
///
/// Built by [`SettingsParser`](super::SettingsParser) from the command line,
/// or directly with [`Settings::new`] and the `with_*` adjusters.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    input_filename: String,
    output_directory: String,
    output_filename: String,
    log_filename: String,
    decomp_method: DecompMethod,
    imbalance_tolerance: f64,
}

impl Settings {
    /// `output_filename` becomes `output_directory/<file name of input>`.
    pub fn new(input_filename: impl Into<String>, output_directory: impl Into<String>) -> Self {
        let input_filename = input_filename.into();
        let output_directory = output_directory.into();
        let output_filename = output_filename_for(&input_filename, &output_directory);
        Self {
            input_filename,
            output_directory,
            output_filename,
            log_filename: DEFAULT_LOG_FILENAME.to_string(),
            decomp_method: DecompMethod::default(),
            imbalance_tolerance: DEFAULT_IMBALANCE_TOLERANCE,
        }
    }

    pub fn with_log_filename(mut self, log_filename: impl Into<String>) -> Self {
        self.log_filename = log_filename.into();
        self
    }

    pub fn with_decomp_method(mut self, method: DecompMethod) -> Self {
        self.decomp_method = method;
        self
    }

    pub fn with_imbalance_tolerance(mut self, tolerance: f64) -> Self {
        self.imbalance_tolerance = tolerance;
        self
    }

    pub fn input_filename(&self) -> &str {
        &self.input_filename
    }

    pub fn output_directory(&self) -> &str {
        &self.output_directory
    }

    pub fn output_filename(&self) -> &str {
        &self.output_filename
    }

    pub fn log_filename(&self) -> &str {
        &self.log_filename
    }

    pub fn decomp_method(&self) -> DecompMethod {
        self.decomp_method
    }

    pub fn imbalance_tolerance(&self) -> f64 {
        self.imbalance_tolerance
    }

    pub fn log_target(&self) -> LogTarget<'_> {
        match self.log_filename.as_str() {
            STDOUT_SENTINEL => LogTarget::Stdout,
            STDERR_SENTINEL => LogTarget::Stderr,
            name => LogTarget::File(name),
        }
    }

    /// True when diagnostics go to a named file rather than a standard stream.
    pub fn uses_log_file(&self) -> bool {
        matches!(self.log_target(), LogTarget::File(_))
    }
}

fn output_filename_for(input: &str, output_directory: &str) -> String {
    let name = Path::new(input)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| input.into());
    Path::new(output_directory)
        .join(name)
        .to_string_lossy()
        .into_owned()
}
