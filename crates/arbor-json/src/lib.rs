//! # arbor-json
//!
//! Strict JSON parsing into a recycling value pool.
//! Documents are parsed in one pass by a recursive-descent parser that
//! allocates every node from a slab [`ValuePool`]; released trees return
//! their slots to the pool's free-list for the next parse. Failures carry the
//! 1-based line and column of the offending character.
//!
//! ```
//! use arbor_json::prelude::*;
//!
//! let mut pool = ValuePool::new();
//! let mut doc = pool.parse(r#"{"name": "Ada", "born": 1815}"#).unwrap();
//! let root = pool.root(&doc).unwrap();
//! assert_eq!(root.get("name").as_str(), Some("Ada"));
//! assert_eq!(root.key_at(1), Some("born"));
//! pool.destroy(&mut doc);
//!
//! let err = pool.parse("{\n  \"a\" 1\n}").unwrap_err();
//! assert_eq!((err.line, err.column), (2, 7));
//! assert_eq!(err.to_string(), "line 2, column 7: expected colon after key");
//! ```

#![warn(rust_2018_idioms)]

pub mod arena;
pub mod config;
pub mod error;
pub mod parser;
pub mod value;

pub use arena::{PoolStats, ValueId, ValuePool};
pub use config::{DuplicateKeyPolicy, ParserConfig, PoolConfig};
pub use error::{Error, ParseError, ParseErrorKind, Result};
pub use parser::{DepthTracker, Parser, Position, parse};
pub use value::{Document, OptionalValue, ScopedDocument, Value, ValueRef, ValueType};

/// Re-export commonly used types
pub mod prelude {
    pub use super::{
        Document, Error, OptionalValue, ParseError, ParseErrorKind, Parser, ParserConfig,
        PoolConfig, Result, ScopedDocument, Value, ValuePool, ValueRef, ValueType,
    };
}
