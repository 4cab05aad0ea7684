//! Simulator error type.

use leaf_dashboard_common::{BusError, TemplateError};

#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("CAN bus failed to start: {0}")]
    Bus(#[from] BusError),

    #[error("invalid dashboard format: {0}")]
    Template(#[from] TemplateError),

    #[error("failed to spawn {name} thread")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}
