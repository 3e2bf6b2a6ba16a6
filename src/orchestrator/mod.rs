//! Test-cycle orchestration.
//!
//! This module owns the run-cycle state (registered brokers, simulator phase,
//! rerun count) and the background loops that launch, watch and restart each
//! cycle. The HTTP layer only calls into [`Coordinator`].

mod coordinator;
mod simulator;

pub(crate) use coordinator::Coordinator;
