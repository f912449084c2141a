//! # Docsync Configuration Library
//!
//! Configuration types for the docsync change-detection core: watcher
//! settings, the workspace-relative paths the watcher must ignore, and the
//! limits applied by the tag scanner.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docsync_config::{ConfigLoader, ConfigValidator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("docsync.toml").await?;
//!     ConfigValidator::validate(&config)?;
//!     println!("debounce: {}ms", config.watcher.debounce_ms);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod loader;
mod settings;
mod validation;

pub use loader::*;
pub use settings::*;
pub use validation::*;
