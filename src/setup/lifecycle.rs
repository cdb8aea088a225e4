//! Orchestration of one balance run.
//!
//! Every process builds a [`LifeCycle`] from the same arguments and calls
//! [`LifeCycle::run`] once. After the parse and after each collective phase
//! the group agrees on success, so a failure anywhere sends every process
//! down the same branch instead of leaving peers blocked in a collective.

use super::error::{BalanceError, ParseError, Phase};
use super::output::{Console, OutputRouter};
use super::parser::SettingsParser;
use super::settings::Settings;
use super::validator::Validator;
use crate::algs::communicator::Communicator;
use crate::balance::{Balancer, MeshBalancer};
use crate::io::{BalanceIo, MeshIo, output_pattern};
use crate::mesh::DistributedMesh;
use crate::mesh_error::MeshError;
use std::ffi::OsString;
use std::io::Write;

/// Process exit status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExitCode {
    /// Balanced, skipped as a no-op, or help shown.
    Success = 0,
    /// Command line or validation failure.
    ParseFailure = 1,
    /// Failure while reading, balancing or writing.
    BalanceFailure = 2,
}

impl ExitCode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    ParseFailed,
    /// `--help` or `--version` was printed.
    Informational,
    Parsed,
    NoOp,
    BalanceFailed,
    Balanced,
}

impl State {
    pub fn exit_code(self) -> ExitCode {
        match self {
            State::ParseFailed => ExitCode::ParseFailure,
            State::BalanceFailed => ExitCode::BalanceFailure,
            State::Informational | State::Parsed | State::NoOp | State::Balanced => {
                ExitCode::Success
            }
        }
    }
}

/// Builds the collective stages of a run for one group and settings value.
pub trait Stages<C: Communicator> {
    type Mesh;

    fn mesh_io<'a>(
        &self,
        comm: &'a C,
        settings: &Settings,
    ) -> Box<dyn MeshIo<Mesh = Self::Mesh> + 'a>;

    fn balancer<'a>(
        &self,
        comm: &'a C,
        settings: &Settings,
    ) -> Box<dyn Balancer<Self::Mesh> + 'a>;
}

/// Gmsh I/O and [`MeshBalancer`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStages;

impl<C: Communicator> Stages<C> for DefaultStages {
    type Mesh = DistributedMesh;

    fn mesh_io<'a>(
        &self,
        comm: &'a C,
        settings: &Settings,
    ) -> Box<dyn MeshIo<Mesh = DistributedMesh> + 'a> {
        Box::new(BalanceIo::new(comm, settings))
    }

    fn balancer<'a>(
        &self,
        comm: &'a C,
        settings: &Settings,
    ) -> Box<dyn Balancer<DistributedMesh> + 'a> {
        Box::new(MeshBalancer::new(comm, settings))
    }
}

pub struct LifeCycle<'c, C: Communicator> {
    comm: &'c C,
    settings: Option<Settings>,
    output: OutputRouter,
    state: State,
}

impl<'c, C: Communicator> LifeCycle<'c, C> {
    /// Parse `args` (program name first) and bind the diagnostic stream.
    pub fn new<I, T>(comm: &'c C, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::with_console(comm, args, Console::std())
    }

    /// As [`LifeCycle::new`], writing standard-stream output to `console`.
    pub fn with_console<I, T>(comm: &'c C, args: I, console: Console) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut lc = Self {
            comm,
            settings: None,
            output: OutputRouter::unbound(comm.is_root(), console),
            state: State::Parsed,
        };
        match lc.parse(args) {
            Ok(settings) => lc.settings = Some(settings),
            Err(ParseError::Informational(text)) => {
                lc.output.stdout_text(&text);
                lc.state = State::Informational;
            }
            Err(e) => {
                lc.output.stderr_line(&e);
                lc.state = State::ParseFailed;
            }
        }
        log::debug!("rank {}: constructed in state {:?}", comm.rank(), lc.state);
        lc
    }

    fn parse<I, T>(&mut self, args: I) -> Result<Settings, ParseError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let local = SettingsParser::new().parse(args).and_then(|s| {
            Validator::new(self.comm).require_file_exists(s.input_filename())?;
            Ok(s)
        });
        // help/version is reached identically everywhere and is not a failure
        let local_ok = !matches!(&local, Err(e) if !e.is_informational());
        let settings = match (local, self.comm.all_agree(local_ok)) {
            (Err(e), _) => return Err(e),
            (Ok(_), false) => return Err(ParseError::PeerFailed),
            (Ok(s), true) => s,
        };

        let bound = self.output.bind(&settings);
        let bound_ok = self.comm.all_agree(bound.is_ok());
        match bound {
            Err(e) => Err(ParseError::LogFile {
                path: settings.log_filename().to_string(),
                reason: e.to_string(),
            }),
            Ok(()) if !bound_ok => Err(ParseError::PeerFailed),
            Ok(()) => Ok(settings),
        }
    }

    /// Run with [`DefaultStages`].
    pub fn run(&mut self) {
        self.run_with(&DefaultStages);
    }

    /// Banner, no-op check, then read, balance and write with `stages`.
    /// Does nothing unless construction succeeded and no run happened yet.
    pub fn run_with<S: Stages<C>>(&mut self, stages: &S) {
        if self.state != State::Parsed {
            return;
        }
        let Some(settings) = self.settings.as_ref() else {
            return;
        };

        print_banner(&mut self.output, self.comm.size(), settings);

        let validator = Validator::new(self.comm);
        if validator.serial_input_equals_output(settings.input_filename(), settings.output_filename())
        {
            self.output.line(format_args!(
                "Running on 1 process and input file ({}) == output file ({}), doing nothing. \
                 Specify an output directory if you wish to copy the input file to an output \
                 file of the same name.",
                settings.input_filename(),
                settings.output_filename()
            ));
            self.state = State::NoOp;
            return;
        }

        self.state = match run_phases(self.comm, settings, stages) {
            Ok(()) => State::Balanced,
            Err(e) => {
                self.output.error_line(&e);
                State::BalanceFailed
            }
        };
        log::debug!("rank {}: run finished in state {:?}", self.comm.rank(), self.state);
    }

    pub fn exit_code(&self) -> ExitCode {
        self.state.exit_code()
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// `None` unless parsing succeeded.
    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }
}

fn print_banner(output: &mut OutputRouter, num_procs: usize, settings: &Settings) {
    // the tee lives only for the banner
    if let Err(e) = write_banner(&mut output.tee(), num_procs, settings) {
        log::warn!("banner write failed: {e}");
    }
}

fn write_banner(w: &mut impl Write, num_procs: usize, settings: &Settings) -> std::io::Result<()> {
    writeln!(w, "Running mesh-balance on {num_procs} processes")?;
    if settings.uses_log_file() {
        writeln!(w, "        Log file: {}", settings.log_filename())?;
    }
    writeln!(w, "      Input file: {}", settings.input_filename())?;
    writeln!(
        w,
        "    Output files: {}",
        output_pattern(settings.output_filename(), num_procs)
    )
}

fn run_phases<C: Communicator, S: Stages<C>>(
    comm: &C,
    settings: &Settings,
    stages: &S,
) -> Result<(), BalanceError> {
    let mut io = stages.mesh_io(comm, settings);
    let balancer = stages.balancer(comm, settings);

    let mut mesh = agree(comm, Phase::Read, io.read_initial_decomposition())?;
    agree(comm, Phase::Balance, balancer.balance(&mut mesh))?;
    agree(comm, Phase::Write, io.write(&mesh))
}

/// Local result of a collective phase, failed if any peer failed.
fn agree<C: Communicator, T>(
    comm: &C,
    phase: Phase,
    local: Result<T, MeshError>,
) -> Result<T, BalanceError> {
    let all_ok = comm.all_agree(local.is_ok());
    log::debug!("rank {}: {phase} agreed ok={all_ok}", comm.rank());
    match local {
        Err(source) => Err(BalanceError::Phase { phase, source }),
        Ok(_) if !all_ok => Err(BalanceError::PeerFailed(phase)),
        Ok(v) => Ok(v),
    }
}
