pub mod config;
pub mod converter;
pub mod discovery;
pub mod metrics;
pub mod process;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, MetricsConfig,
    TimeoutUnit,
};
pub use converter::{
    ConversionJob, ConversionResult, ConverterContext, ConverterError, DocumentType,
    ExternalConverter, LibreOfficeConverter, PandocConverter, ScriptConverter,
};
pub use discovery::{ConverterDescriptor, ConverterRegistry, Discovery, DiscoveryError};
pub use process::{ExecutionOutcome, OutputSink, ProcessError, ProcessHarness, TracingSink};
