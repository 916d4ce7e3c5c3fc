//! The fixed table of known converters.

use std::fmt;
use std::path::Path;

use crate::converter::{libreoffice, pandoc, script, ConverterFactory};

/// Environment check deciding whether an unconfigured converter is used.
///
/// Receives the base working directory. Must not have side effects.
pub type AvailabilityProbe = fn(&Path) -> bool;

/// Identity of a known converter.
#[derive(Clone, Copy)]
pub struct ConverterDescriptor {
    /// Stable name, used as the override key in configuration.
    pub name: &'static str,
    /// Builds an instance.
    pub factory: ConverterFactory,
    /// Decides auto-detection when no override exists.
    pub probe: AvailabilityProbe,
}

impl fmt::Debug for ConverterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

static BUILTIN: [ConverterDescriptor; 3] = [
    ConverterDescriptor {
        name: libreoffice::NAME,
        factory: libreoffice::create,
        probe: libreoffice::probe,
    },
    ConverterDescriptor {
        name: pandoc::NAME,
        factory: pandoc::create,
        probe: pandoc::probe,
    },
    ConverterDescriptor {
        name: script::NAME,
        factory: script::create,
        probe: script::probe,
    },
];

/// Every converter compiled into this build, in preference order.
pub fn builtin() -> &'static [ConverterDescriptor] {
    &BUILTIN
}

/// Looks up a built-in descriptor by name.
pub fn find(name: &str) -> Option<&'static ConverterDescriptor> {
    BUILTIN.iter().find(|d| d.name == name)
}
