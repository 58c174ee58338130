//! Environment lifecycle runtime: duplication with availability polling,
//! alias linking and environment deletion.

pub mod availability;
pub mod delete;
pub mod duplicate;
mod error;
pub mod link;
mod runtime;

pub use availability::{await_availability, ProbeState};
pub use delete::{delete, DeleteReport};
pub use duplicate::{duplicate, DuplicationReport, KeyStep};
pub use error::PromoteError;
pub use link::{link, LinkReport, PruneFailure};
pub use runtime::{block_on_with_shutdown, init_tracing};
