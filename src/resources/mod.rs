//! Filesystem primitives shared by the deployment plugins.

pub mod diff;
pub mod fs;
