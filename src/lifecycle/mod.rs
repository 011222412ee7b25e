//! Run lifecycle: cooperative shutdown signalling.

pub mod shutdown;

pub use shutdown::Shutdown;
