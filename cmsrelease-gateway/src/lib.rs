//! # cmsrelease-gateway
//!
//! The [`BackendGateway`] seam between the release engine and the content
//! platform, plus two implementations:
//!
//! - [`contentful::ContentfulClient`]: Contentful Management API over HTTP
//! - `memory::MemoryGateway`: in-process backend with scripted failures, for
//!   tests (`memory` feature)

pub mod contentful;
pub mod error;
pub mod gateway;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
mod wire;

pub use contentful::ContentfulClient;
pub use error::GatewayError;
pub use gateway::{
    Alias, BackendGateway, ClonedEnvironment, Environment, EnvironmentStatus,
    ScheduledActionQuery, Space,
};
#[cfg(any(test, feature = "memory"))]
pub use memory::MemoryGateway;
