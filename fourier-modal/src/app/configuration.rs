use super::{logging::LogConfiguration, ApplicationError};
use crate::{boundary::DiffractionResult, policy::SolverPolicy};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Configuration {
    pub(crate) solver: SolverPolicy,
    pub(crate) display: DisplayConfiguration,
    pub(crate) logging: LogConfiguration,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(crate) struct DisplayConfiguration {
    /// Orders carrying less power than this are left out of the tables
    pub(crate) minimum_efficiency: f64,
    /// Digits after the decimal point
    pub(crate) precision: usize,
}

impl Default for DisplayConfiguration {
    fn default() -> Self {
        Self {
            minimum_efficiency: 1e-6,
            precision: 6,
        }
    }
}

impl Configuration {
    pub(crate) fn build() -> Result<Self, ApplicationError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name(".config/default").required(false))
            .add_source(File::with_name(&format!(".config/{}", run_mode)).required(false))
            .add_source(Environment::with_prefix("FOURIER_MODAL").separator("__"))
            .build()?;

        Ok(s.try_deserialize()?)
    }
}

impl DisplayConfiguration {
    /// The rows of the efficiency table at one wavelength
    pub(crate) fn table(&self, wavelength: f64, result: &DiffractionResult) -> Vec<String> {
        let precision = self.precision;
        let mut lines = vec![
            console::style(format!("λ = {wavelength}"))
                .bold()
                .cyan()
                .to_string(),
            format!(
                "{:>10} {:>w$} {:>w$}",
                "order",
                "R",
                "T",
                w = precision + 4
            ),
        ];
        for (idx, &(mx, my)) in result.orders().iter().enumerate() {
            let (reflection, transmission) =
                (result.reflection()[idx], result.transmission()[idx]);
            if reflection.max(transmission) < self.minimum_efficiency {
                continue;
            }
            lines.push(format!(
                "{:>10} {:>w$.p$} {:>w$.p$}",
                format!("({mx}, {my})"),
                reflection,
                transmission,
                w = precision + 4,
                p = precision
            ));
        }
        lines.push(
            console::style(format!(
                "{:>10} {:>w$.p$} {:>w$.p$}",
                "total",
                result.total_reflection(),
                result.total_transmission(),
                w = precision + 4,
                p = precision
            ))
            .green()
            .to_string(),
        );
        for warning in result.warnings() {
            lines.push(console::style(format!("warning: {warning}")).yellow().to_string());
        }
        lines
    }
}
