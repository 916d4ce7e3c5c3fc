//! Converter discovery.
//!
//! Decides which converters run, from three inputs:
//!
//! 1. the static [`catalog`] of converters compiled into this build
//! 2. caller overrides, `name -> bool`, which decide membership outright
//! 3. a per-converter availability probe, consulted only without an override
//!
//! An empty result is a configuration error and a factory failure is a
//! linkage error. Both abort startup; there is no partially loaded registry.
//!
//! # Example
//!
//! ```ignore
//! use docshift_core::discovery::Discovery;
//!
//! let mut overrides = HashMap::new();
//! overrides.insert("libreoffice".to_string(), false);
//!
//! let registry = Discovery::builtin().load(&overrides, "/var/lib/docshift", Duration::from_secs(120))?;
//! let result = registry.convert(job).await?;
//! registry.shutdown_all().await;
//! ```

pub mod catalog;
mod error;
mod registry;
mod resolver;

pub use catalog::{AvailabilityProbe, ConverterDescriptor};
pub use error::DiscoveryError;
pub use registry::ConverterRegistry;
pub use resolver::{ActiveSet, Discovery};
