//! ccprompt core library: extract a definition together with the code it
//! depends on through inheritance.
//!
//! Given a class or function name, the engine indexes a source tree, finds
//! the definition, and walks its base classes and metaclasses (or, for a
//! method, its enclosing class's chain) so the emitted source reads as a
//! self-contained prompt. Python and the JavaScript/TypeScript family are
//! supported through native tree-sitter grammars.
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! let report = ccprompt_core::extract(&["DerivedClass"], &[PathBuf::from(".")], "python")?;
//! for (path, source) in report.pairs() {
//!     println!("File: {path}\n\n{source}\n");
//! }
//! # Ok::<(), ccprompt_core::CcpromptError>(())
//! ```

pub mod errors;
pub mod indexer;
pub mod models;
pub mod query;

pub use errors::{CcpromptError, CcpromptResult, ParseFailure};
pub use indexer::parser::{FrontEnd, Language, LanguageFrontEnd};
pub use indexer::pipeline::{build_index, build_index_with, IndexOptions};
pub use models::{
    CanonicalIdentity, DefinitionIndex, ExtractStats, ExtractedSource, ExtractionReport, NodeKind,
    VisitedSet,
};
pub use query::context::{extract, extract_with_options, resolve, ExtractOptions, Extractor};
