//! Port traits at the edge of the domain.

pub mod artifact_port;
pub mod config_port;
pub mod data_port;
