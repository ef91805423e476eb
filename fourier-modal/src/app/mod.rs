//! The command line driver: reads a structure, sweeps its wavelengths and prints the
//! efficiencies of the propagating orders.

mod configuration;
mod error;
mod logging;
mod structure;

pub(crate) use configuration::Configuration;
pub(crate) use error::ApplicationError;
pub(crate) use structure::Structure;

use crate::{propagation::Algorithm, solver::Solver};
use clap::{ArgEnum, Parser};
use color_eyre::eyre::eyre;
use std::path::PathBuf;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct App {
    file_path: Option<PathBuf>,
    #[clap(arg_enum, short, long, default_value = "info")]
    log_level: LogLevel,
    #[clap(arg_enum, short, long, default_value = "transfer")]
    algorithm: AlgorithmArg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ArgEnum)]
enum LogLevel {
    Trace,
    Info,
    Debug,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self {
            LogLevel::Trace => "trace",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        write!(f, "{level}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ArgEnum)]
enum AlgorithmArg {
    Transfer,
    Scattering,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(value: AlgorithmArg) -> Self {
        match value {
            AlgorithmArg::Transfer => Algorithm::Transfer,
            AlgorithmArg::Scattering => Algorithm::Scattering,
        }
    }
}

/// Parses the command line, solves the structure at every requested wavelength and
/// prints the efficiency tables
pub fn run() -> color_eyre::Result<()> {
    let cli = App::parse();

    let config = Configuration::build()?;
    let _guard = config.logging.install(cli.log_level)?;

    let path = cli
        .file_path
        .ok_or_else(|| eyre!("A structure file path needs to be passed."))?;
    let structure = Structure::build(path)?;

    let spec = structure.grating_spec()?;
    let algorithm = Algorithm::from(cli.algorithm);
    tracing::info!(
        "Solving a {:?} grating with {} harmonics using the {algorithm}",
        spec.kind(),
        spec.harmonics()
    );

    let solver = Solver::new(config.solver);
    let results = solver.sweep_wavelengths(
        &spec,
        structure.wavelengths(),
        |_| structure.layer_stack(spec.kind()),
        algorithm,
    );

    let term = console::Term::stdout();
    for (wavelength, result) in structure.wavelengths().iter().zip(results) {
        match result {
            Ok(result) => {
                for line in config.display.table(*wavelength, &result) {
                    term.write_line(&line)?;
                }
            }
            Err(e) => {
                tracing::error!("Solve failed at wavelength {wavelength}: {e}");
                term.write_line(&format!(
                    "{} {}",
                    console::style(format!("λ = {wavelength}")).bold().red(),
                    e
                ))?;
            }
        }
    }
    Ok(())
}
