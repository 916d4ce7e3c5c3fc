//! Testing utilities and mock implementations.
//!
//! Mocks stand in for native tools, so discovery and the registry can be
//! exercised without LibreOffice or Pandoc installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use docshift_core::discovery::Discovery;
//! use docshift_core::testing::fixtures::TEST_CATALOG;
//!
//! let registry = Discovery::new(&TEST_CATALOG).load(&overrides, ".", timeout)?;
//! ```

mod mock_converter;
mod recording_sink;

pub use mock_converter::{MockConverter, RecordedConversion};
pub use recording_sink::RecordingSink;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;
    use std::sync::Arc;

    use super::MockConverter;
    use crate::converter::{ConverterContext, ConverterError, ExternalConverter};
    use crate::discovery::ConverterDescriptor;

    /// Probe that always reports the tool as present.
    pub fn available(_work_dir: &Path) -> bool {
        true
    }

    /// Probe that always reports the tool as missing.
    pub fn unavailable(_work_dir: &Path) -> bool {
        false
    }

    fn alpha(_context: ConverterContext) -> Result<Arc<dyn ExternalConverter>, ConverterError> {
        Ok(Arc::new(MockConverter::named("alpha")))
    }

    fn beta(_context: ConverterContext) -> Result<Arc<dyn ExternalConverter>, ConverterError> {
        Ok(Arc::new(MockConverter::named("beta")))
    }

    fn broken(_context: ConverterContext) -> Result<Arc<dyn ExternalConverter>, ConverterError> {
        Err(ConverterError::initialization("native library missing"))
    }

    /// Catalog with one available converter, one unavailable and one whose
    /// factory always fails.
    pub static TEST_CATALOG: [ConverterDescriptor; 3] = [
        ConverterDescriptor {
            name: "alpha",
            factory: alpha,
            probe: available,
        },
        ConverterDescriptor {
            name: "beta",
            factory: beta,
            probe: unavailable,
        },
        ConverterDescriptor {
            name: "broken",
            factory: broken,
            probe: unavailable,
        },
    ];
}
