//! Change source implementations.

pub mod notify_backend;
pub mod synthetic;

pub use notify_backend::NotifySource;
pub use synthetic::SyntheticSource;
