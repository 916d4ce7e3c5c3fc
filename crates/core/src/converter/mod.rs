//! Converter module: the capability interface and the bundled backends.
//!
//! Every backend implements [`ExternalConverter`] and is built by a
//! [`ConverterFactory`] from a [`ConverterContext`] (working directory,
//! timeout and output sink). The discovery engine only ever sees these two
//! types, never a concrete backend.
//!
//! # Bundled backends
//!
//! - [`LibreOfficeConverter`]: office formats through `soffice --headless`
//! - [`PandocConverter`]: markup formats through `pandoc`
//! - [`ScriptConverter`]: user scripts in the working directory
//!
//! # Example
//!
//! ```ignore
//! use docshift_core::converter::{ConversionJob, ConverterContext, DocumentType};
//!
//! let context = ConverterContext::new("/var/lib/docshift", Duration::from_secs(120), sink);
//! let converter = docshift_core::converter::pandoc::create(context)?;
//!
//! let job = ConversionJob::new(
//!     "job-1",
//!     "/docs/notes.md",
//!     DocumentType::Markdown,
//!     "/out/notes.docx",
//!     DocumentType::Docx,
//! );
//! let result = converter.convert(job).await?;
//! println!("Converted in {} ms", result.duration_ms);
//! ```

mod error;
pub mod libreoffice;
pub mod pandoc;
pub mod script;
mod support;
mod traits;
mod types;

pub use error::ConverterError;
pub use libreoffice::LibreOfficeConverter;
pub use pandoc::PandocConverter;
pub use script::ScriptConverter;
pub use traits::{ConverterContext, ConverterFactory, ExternalConverter};
pub use types::{ConversionJob, ConversionResult, DocumentType};
