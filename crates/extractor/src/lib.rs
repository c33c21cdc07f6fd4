//! # Codegraph Extractor
//!
//! AST-based extraction of code relationship graphs from source files.
//!
//! ## Philosophy
//!
//! The extractor turns one source file into a small graph fragment that:
//! - Anchors every construct to a FILE node spanning the whole file
//! - Derives stable node and edge identifiers from position and name alone
//! - Records heritage against raw names first, to be resolved once the
//!   whole workspace has been indexed
//! - Degrades to a generic declaration scan for languages without a
//!   dedicated visitor
//!
//! ## Architecture
//!
//! ```text
//! Source Code
//!     │
//!     ├──> Language Detection (from extension)
//!     │
//!     ├──> Tree-sitter Parsing → AST
//!     │
//!     ├──> Relationship Visitors
//!     │    ├─> TypeScript/JavaScript: classes, methods, heritage,
//!     │    │   imports, exports, functions
//!     │    ├─> Python: classes, methods, superclasses, imports
//!     │    └─> Generic: name-bearing function/class declarations
//!     │
//!     └──> GraphBatch (nodes + edges, FILE node first)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use codegraph_extractor::{Language, RelationshipExtractor};
//!
//! let mut extractor = RelationshipExtractor::new(Language::TypeScript).unwrap();
//! let batch = extractor
//!     .extract("class Greeter {}\n", "src/greeter.ts")
//!     .unwrap();
//!
//! // FILE node plus the class, joined by a containment edge.
//! assert_eq!(batch.nodes.len(), 2);
//! assert_eq!(batch.edges.len(), 1);
//! ```

mod error;
mod extract;
mod language;

pub use error::{ExtractError, Result};
pub use extract::RelationshipExtractor;
pub use language::Language;
