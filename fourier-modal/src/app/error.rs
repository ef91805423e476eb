// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Error
//! The error type for the binary

use miette::Diagnostic;

#[derive(thiserror::Error, Debug, Diagnostic)]
pub(crate) enum ApplicationError {
    #[error(transparent)]
    #[diagnostic(code(fourier_modal::io_error))]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    #[diagnostic(code(fourier_modal::config_error))]
    Config(#[from] config::ConfigError),
    #[error("failed to initialise tracing: {0}")]
    Telemetry(String),
    #[error("invalid structure file: {0}")]
    #[diagnostic(code(fourier_modal::structure))]
    Structure(String),
    #[error(transparent)]
    Solver(#[from] crate::error::SolverError),
}
