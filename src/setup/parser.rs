//! Command-line parsing into [`Settings`].

use super::error::ParseError;
use super::settings::{
    DEFAULT_IMBALANCE_TOLERANCE, DEFAULT_LOG_FILENAME, DEFAULT_OUTPUT_DIRECTORY, Settings,
};
use crate::partitioning::DecompMethod;
use clap::Parser;
use clap::error::ErrorKind;
use itertools::Itertools;
use std::ffi::OsString;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "mesh-balance",
    version,
    about = "Rebalance a mesh across the processes of a parallel run",
    long_about = "`mesh-balance` reads a Gmsh mesh, partitions its elements over the processes
of the run and writes one mesh fragment per process.

EXAMPLE:
    # Balance over 4 processes, fragments land in out/mesh.msh.4.*
    mpirun -np 4 mesh-balance mesh.msh out

With a single process and no output directory the input would be overwritten
by itself, so the run does nothing."
)]
struct Args {
    /// Input mesh (Gmsh ASCII 2.2)
    #[arg(value_name = "INFILE")]
    infile: String,

    /// Directory receiving the output fragments
    #[arg(value_name = "OUTPUT_DIRECTORY", default_value = DEFAULT_OUTPUT_DIRECTORY)]
    output_directory: String,

    /// Diagnostic log file; `cout` and `cerr` select the standard streams
    #[arg(short = 'l', long = "logfile", value_name = "LOGFILE", default_value = DEFAULT_LOG_FILENAME)]
    logfile: String,

    /// Decomposition method
    #[arg(short = 'd', long = "decomp-method", value_enum, default_value_t = DecompMethod::Rcb)]
    decomp_method: DecompMethod,

    /// Acceptable max/average part weight before a warning is logged
    #[arg(
        short = 't',
        long = "imbalance-tolerance",
        value_name = "TOL",
        default_value_t = DEFAULT_IMBALANCE_TOLERANCE,
        value_parser = parse_tolerance
    )]
    imbalance_tolerance: f64,
}

fn parse_tolerance(s: &str) -> Result<f64, String> {
    let tol: f64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if tol.is_finite() && tol >= 1.0 {
        Ok(tol)
    } else {
        Err(format!("{tol} must be a finite value >= 1.0"))
    }
}

/// Turns raw process arguments (program name first) into [`Settings`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SettingsParser;

impl SettingsParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse<I, T>(&self, args: I) -> Result<Settings, ParseError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args = Args::try_parse_from(args).map_err(clap_error)?;
        if args.infile.is_empty() {
            return Err(ParseError::Usage("input file name is empty".into()));
        }
        Ok(Settings::new(args.infile, args.output_directory)
            .with_log_filename(args.logfile)
            .with_decomp_method(args.decomp_method)
            .with_imbalance_tolerance(args.imbalance_tolerance))
    }
}

fn clap_error(e: clap::Error) -> ParseError {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            ParseError::Informational(e.render().to_string())
        }
        _ => ParseError::Usage(one_line(&e.render().to_string())),
    }
}

/// First line of a rendered clap error plus the indented lines under it
/// (e.g. the names of missing arguments), joined into one line.
fn one_line(rendered: &str) -> String {
    let mut lines = rendered.lines().skip_while(|l| l.trim().is_empty());
    let Some(head) = lines.next() else {
        return "invalid command line".to_string();
    };
    let detail = lines
        .take_while(|l| l.starts_with(char::is_whitespace) && !l.trim().is_empty())
        .map(str::trim);
    std::iter::once(head.trim_start_matches("error: ").trim())
        .chain(detail)
        .join(" ")
}
