//! Log output for a sweep.
//!
//! Solver events go to the terminal in a compact form, and every event of the run is
//! also recorded as JSON lines next to the efficiency tables so a sweep can be inspected
//! after it finishes.

use super::{ApplicationError, LogLevel};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{subscriber::set_global_default, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// Where the JSON record of a run is written
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct LogConfiguration {
    pub(crate) directory: PathBuf,
    pub(crate) file_name: String,
    /// Events from dependencies are only shown at this level or above
    pub(crate) dependency_level: String,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("results"),
            file_name: "fourier-modal.log".into(),
            dependency_level: "warn".into(),
        }
    }
}

impl LogConfiguration {
    /// The filter used when `RUST_LOG` is unset: the solver at the requested level,
    /// everything else at `dependency_level`
    pub(crate) fn directives(&self, level: LogLevel) -> String {
        format!("{},fourier_modal={level}", self.dependency_level)
    }

    /// Builds the sweep subscriber. The returned guard flushes the JSON record on drop and
    /// must outlive the sweep.
    pub(crate) fn subscriber(
        &self,
        level: LogLevel,
    ) -> Result<(impl Subscriber + Send + Sync, WorkerGuard), ApplicationError> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(self.directives(level))
                .map_err(|e| ApplicationError::Telemetry(e.to_string()))?,
        };

        let terminal = tracing_subscriber::fmt::Layer::new()
            .with_writer(console::Term::stderr)
            .with_target(false)
            .without_time()
            .compact();

        std::fs::create_dir_all(&self.directory)?;
        let (record, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
            &self.directory,
            &self.file_name,
        ));
        let record = tracing_subscriber::fmt::Layer::new()
            .with_writer(record)
            .json()
            .with_current_span(true);

        Ok((
            Registry::default().with(filter).with(terminal).with(record),
            guard,
        ))
    }

    /// Installs the sweep subscriber globally and bridges `log` records into it
    pub(crate) fn install(&self, level: LogLevel) -> Result<WorkerGuard, ApplicationError> {
        let (subscriber, guard) = self.subscriber(level)?;
        LogTracer::init().map_err(|e| ApplicationError::Telemetry(e.to_string()))?;
        set_global_default(subscriber).map_err(|e| ApplicationError::Telemetry(e.to_string()))?;
        Ok(guard)
    }
}
