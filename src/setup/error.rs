//! Failure classes of a balance run.

use crate::mesh_error::MeshError;
use std::fmt;
use thiserror::Error;

/// Configuration failure; maps to exit code 1.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Malformed command line, rendered as a single line.
    #[error("{0}")]
    Usage(String),
    /// `--help` or `--version` was requested; carries the text to print.
    #[error("{0}")]
    Informational(String),
    #[error("Input file '{0}' does not exist")]
    MissingInput(String),
    #[error("Cannot open log file '{path}': {reason}")]
    LogFile { path: String, reason: String },
    #[error("Configuration failed on another process")]
    PeerFailed,
}

impl ParseError {
    pub fn is_informational(&self) -> bool {
        matches!(self, ParseError::Informational(_))
    }
}

/// Collective phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Read,
    Balance,
    Write,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Read => "mesh read",
            Phase::Balance => "balance",
            Phase::Write => "mesh write",
        })
    }
}

/// Failure of a collective phase; maps to exit code 2.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BalanceError {
    #[error("{phase} failed: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: MeshError,
    },
    #[error("{0} failed on another process")]
    PeerFailed(Phase),
}

impl BalanceError {
    pub fn phase(&self) -> Phase {
        match self {
            BalanceError::Phase { phase, .. } | BalanceError::PeerFailed(phase) => *phase,
        }
    }
}
