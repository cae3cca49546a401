//! Recursive-descent JSON parser building trees in a [`ValuePool`]
//!
//! One pass over an in-memory buffer. Every node is a slot acquired from the
//! pool; containers own their children. The first error wins: each level
//! releases the subtree it was building before the error propagates, so a
//! failed parse leaves no live slots behind.

pub mod cursor;
pub mod depth;
pub mod string;

pub use cursor::Position;
pub use depth::DepthTracker;

use ahash::AHashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::arena::{Node, ValueId, ValuePool};
use crate::config::{DuplicateKeyPolicy, ParserConfig};
use crate::error::{ParseError, ParseErrorKind, Result};
use crate::value::{Document, ScopedDocument};
use cursor::Cursor;

/// JSON parser bound to the pool it allocates from
pub struct Parser<'p> {
    pool: &'p mut ValuePool,
    config: ParserConfig,
}

impl<'p> Parser<'p> {
    /// Create parser with default limits
    pub fn new(pool: &'p mut ValuePool) -> Self {
        Self {
            pool,
            config: ParserConfig::default(),
        }
    }

    /// Create parser with custom limits
    pub fn with_config(pool: &'p mut ValuePool, config: ParserConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { pool, config })
    }

    /// Limits in effect
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse one JSON document.
    ///
    /// On success the caller owns the returned root and must hand it back
    /// with [`ValuePool::destroy`]. On failure nothing is left allocated.
    pub fn parse(&mut self, text: &str) -> std::result::Result<Document, ParseError> {
        let input = text.as_bytes();
        if input.len() > self.config.max_input_size {
            return Err(ParseError::new(
                ParseErrorKind::InputTooLarge {
                    size: input.len(),
                    max: self.config.max_input_size,
                },
                1,
                1,
            ));
        }
        trace!(input_len = input.len(), "parse started");

        let mut descent = Descent {
            pool: &mut *self.pool,
            config: &self.config,
            cursor: Cursor::new(text),
            depth: DepthTracker::with_max_depth(self.config.max_depth),
        };
        let result = descent.parse_document();

        match &result {
            Ok(_) => debug!(input_len = input.len(), "parse succeeded"),
            Err(err) => debug!(
                line = err.line,
                column = err.column,
                error = %err.kind,
                "parse failed"
            ),
        }
        result
    }

    /// Parse raw bytes, reporting the first invalid UTF-8 sequence by position
    pub fn parse_bytes(&mut self, input: &[u8]) -> std::result::Result<Document, ParseError> {
        match std::str::from_utf8(input) {
            Ok(text) => self.parse(text),
            Err(err) => {
                let valid = input
                    .get(..err.valid_up_to())
                    .and_then(|prefix| std::str::from_utf8(prefix).ok())
                    .unwrap_or_default();
                let mut cursor = Cursor::new(valid);
                cursor.advance(valid.len());
                debug!(offset = err.valid_up_to(), "parse rejected invalid UTF-8");
                Err(cursor.error(ParseErrorKind::InvalidUtf8))
            }
        }
    }
}

/// Parse `text` into `pool` with default limits
pub fn parse(pool: &mut ValuePool, text: &str) -> std::result::Result<Document, ParseError> {
    Parser::new(pool).parse(text)
}

impl ValuePool {
    /// Parse `text` into this pool with default limits
    pub fn parse(&mut self, text: &str) -> std::result::Result<Document, ParseError> {
        Parser::new(self).parse(text)
    }

    /// Parse `text` and return a document that releases itself when dropped
    pub fn parse_scoped(
        &mut self,
        text: &str,
    ) -> std::result::Result<ScopedDocument<'_>, ParseError> {
        let document = Parser::new(self).parse(text)?;
        Ok(ScopedDocument::new(self, document))
    }
}

/// State of a single parse
struct Descent<'a, 'p> {
    pool: &'p mut ValuePool,
    config: &'p ParserConfig,
    cursor: Cursor<'a>,
    depth: DepthTracker,
}

type Parsed<T> = std::result::Result<T, ParseError>;

impl Descent<'_, '_> {
    fn parse_document(&mut self) -> Parsed<Document> {
        let root = self.parse_value()?;
        self.cursor.skip_whitespace();
        if !self.cursor.is_at_end() {
            let err = self.cursor.error(ParseErrorKind::TrailingData);
            self.pool.destroy_subtree(root);
            return Err(err);
        }
        Ok(Document::new(root))
    }

    fn parse_value(&mut self) -> Parsed<ValueId> {
        self.cursor.skip_whitespace();
        match self.cursor.peek() {
            Some(b'"') => {
                let start = self.cursor.position();
                let text = string::parse_string(&mut self.cursor, self.config.max_string_length)?;
                self.alloc(Node::String(text), start)
            }
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b't') => self.parse_literal(b"true", Node::Bool(true)),
            Some(b'f') => self.parse_literal(b"false", Node::Bool(false)),
            Some(b'n') => self.parse_literal(b"null", Node::Null),
            Some(b'-' | b'+' | b'0'..=b'9') => self.parse_number(),
            Some(_) => Err(self.cursor.error(ParseErrorKind::UnexpectedCharacter)),
            None => Err(self.cursor.error(ParseErrorKind::UnexpectedEnd)),
        }
    }

    /// Acquire a slot and store `node` in it
    fn alloc(&mut self, node: Node, at: Position) -> Parsed<ValueId> {
        let id = self
            .pool
            .acquire()
            .map_err(|e| at.error(ParseErrorKind::AllocationFailed(e.to_string())))?;
        match self.pool.node_mut(id) {
            Some(slot) => {
                *slot = node;
                Ok(id)
            }
            None => Err(at.error(ParseErrorKind::AllocationFailed(
                "acquired slot is not live".to_string(),
            ))),
        }
    }

    fn parse_literal(&mut self, literal: &'static [u8], node: Node) -> Parsed<ValueId> {
        let start = self.cursor.position();
        for &expected in literal {
            if self.cursor.peek() != Some(expected) {
                return Err(self.cursor.error(ParseErrorKind::InvalidLiteral));
            }
            self.cursor.bump();
        }
        self.alloc(node, start)
    }

    fn parse_number(&mut self) -> Parsed<ValueId> {
        let start = self.cursor.position();
        let rest = self.cursor.remaining();
        let len = scan_number(rest.as_bytes());
        if len == 0 {
            return Err(self.cursor.error(ParseErrorKind::InvalidNumber));
        }
        let number = rest[..len]
            .parse::<f64>()
            .map_err(|_| start.error(ParseErrorKind::InvalidNumber))?;
        self.cursor.advance(len);
        self.alloc(Node::Number(number), start)
    }

    fn parse_array(&mut self) -> Parsed<ValueId> {
        let start = self.cursor.position();
        self.depth.enter().map_err(|kind| start.error(kind))?;
        let array = match self.alloc(Node::Array(Vec::new()), start) {
            Ok(id) => id,
            Err(err) => {
                self.depth.exit();
                return Err(err);
            }
        };
        self.cursor.bump();

        let mut items = Vec::new();
        let result = self.parse_elements(&mut items);
        self.depth.exit();
        self.adopt(array, Node::Array(items));

        match result {
            Ok(()) => Ok(array),
            Err(err) => {
                self.pool.destroy_subtree(array);
                Err(err)
            }
        }
    }

    fn parse_elements(&mut self, items: &mut Vec<ValueId>) -> Parsed<()> {
        self.cursor.skip_whitespace();
        if self.cursor.peek() == Some(b']') {
            self.cursor.bump();
            return Ok(());
        }
        loop {
            self.cursor.skip_whitespace();
            if items.len() >= self.config.max_array_length {
                return Err(self.cursor.error(ParseErrorKind::ArrayTooLong {
                    max: self.config.max_array_length,
                }));
            }
            items.push(self.parse_value()?);
            self.cursor.skip_whitespace();
            match self.cursor.peek() {
                Some(b',') => {
                    self.cursor.bump();
                }
                Some(b']') => {
                    self.cursor.bump();
                    return Ok(());
                }
                _ => return Err(self.cursor.error(ParseErrorKind::ExpectedCommaOrBracket)),
            }
        }
    }

    fn parse_object(&mut self) -> Parsed<ValueId> {
        let start = self.cursor.position();
        self.depth.enter().map_err(|kind| start.error(kind))?;
        let object = match self.alloc(Node::Object(Vec::new()), start) {
            Ok(id) => id,
            Err(err) => {
                self.depth.exit();
                return Err(err);
            }
        };
        self.cursor.bump();

        let mut entries = Vec::new();
        let result = self.parse_members(&mut entries);
        self.depth.exit();
        self.adopt(object, Node::Object(entries));

        match result {
            Ok(()) => Ok(object),
            Err(err) => {
                self.pool.destroy_subtree(object);
                Err(err)
            }
        }
    }

    fn parse_members(&mut self, entries: &mut Vec<(String, ValueId)>) -> Parsed<()> {
        self.cursor.skip_whitespace();
        if self.cursor.peek() == Some(b'}') {
            self.cursor.bump();
            return Ok(());
        }
        let mut keys = KeyIndex::default();
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.peek() != Some(b'"') {
                return Err(self.cursor.error(ParseErrorKind::ExpectedKey));
            }
            let key_start = self.cursor.position();
            let key = string::parse_string(&mut self.cursor, self.config.max_string_length)?;

            self.cursor.skip_whitespace();
            if self.cursor.peek() != Some(b':') {
                return Err(self.cursor.error(ParseErrorKind::ExpectedColon));
            }
            self.cursor.bump();

            let value = self.parse_value()?;
            self.insert_member(entries, &mut keys, key, value, key_start)?;

            self.cursor.skip_whitespace();
            match self.cursor.peek() {
                Some(b',') => {
                    self.cursor.bump();
                }
                Some(b'}') => {
                    self.cursor.bump();
                    return Ok(());
                }
                _ => return Err(self.cursor.error(ParseErrorKind::ExpectedCommaOrBrace)),
            }
        }
    }

    /// Add a parsed member, applying the duplicate key policy.
    ///
    /// Takes ownership of `value`: it is released if it does not end up in
    /// `entries`.
    fn insert_member(
        &mut self,
        entries: &mut Vec<(String, ValueId)>,
        keys: &mut KeyIndex,
        key: String,
        value: ValueId,
        key_start: Position,
    ) -> Parsed<()> {
        let policy = self.config.duplicate_keys;
        if policy != DuplicateKeyPolicy::Retain
            && let Some(existing) = keys
                .find(entries, &key)
                .and_then(|index| entries.get_mut(index))
        {
            if policy == DuplicateKeyPolicy::Reject {
                self.pool.destroy_subtree(value);
                return Err(key_start.error(ParseErrorKind::DuplicateKey(key)));
            }
            let previous = std::mem::replace(&mut existing.1, value);
            self.pool.destroy_subtree(previous);
            return Ok(());
        }

        if entries.len() >= self.config.max_object_keys {
            self.pool.destroy_subtree(value);
            return Err(key_start.error(ParseErrorKind::TooManyKeys {
                max: self.config.max_object_keys,
            }));
        }
        entries.push((key, value));
        if policy != DuplicateKeyPolicy::Retain {
            keys.record(entries);
        }
        Ok(())
    }

    /// Store collected children in their container's slot
    fn adopt(&mut self, container: ValueId, node: Node) {
        match self.pool.node_mut(container) {
            Some(slot) => *slot = node,
            None => {
                for child in node.children() {
                    self.pool.destroy_subtree(child);
                }
            }
        }
    }
}

/// Entries an object holds before its keys are indexed by hash
const KEY_INDEX_THRESHOLD: usize = 16;

/// Duplicate key lookup for one object while its members are parsed.
///
/// Small objects are scanned linearly. Past `KEY_INDEX_THRESHOLD` entries,
/// entry positions are bucketed by key hash so lookups stay constant time.
#[derive(Default)]
struct KeyIndex {
    buckets: Option<AHashMap<u64, SmallVec<[usize; 1]>>>,
}

impl KeyIndex {
    /// Position of the first entry named `key`
    fn find(&self, entries: &[(String, ValueId)], key: &str) -> Option<usize> {
        match &self.buckets {
            None => entries.iter().position(|entry| entry.0 == key),
            Some(buckets) => buckets
                .get(&buckets.hasher().hash_one(key))?
                .iter()
                .copied()
                .find(|&index| entries.get(index).is_some_and(|entry| entry.0 == key)),
        }
    }

    /// Account for the entry just pushed onto `entries`
    fn record(&mut self, entries: &[(String, ValueId)]) {
        match &mut self.buckets {
            Some(buckets) => {
                if let Some(entry) = entries.last() {
                    let hash = buckets.hasher().hash_one(entry.0.as_str());
                    buckets.entry(hash).or_default().push(entries.len() - 1);
                }
            }
            None if entries.len() > KEY_INDEX_THRESHOLD => {
                let mut buckets: AHashMap<u64, SmallVec<[usize; 1]>> =
                    AHashMap::with_capacity(entries.len() * 2);
                for (index, (key, _)) in entries.iter().enumerate() {
                    let hash = buckets.hasher().hash_one(key.as_str());
                    buckets.entry(hash).or_default().push(index);
                }
                self.buckets = Some(buckets);
            }
            None => {}
        }
    }
}

/// Length of the number token at the start of `bytes`, or 0 if there is none.
///
/// Grammar: optional sign, digits, optional `.digits`, optional exponent.
/// A dangling `.` or exponent marker is left for the caller to reject.
fn scan_number(bytes: &[u8]) -> usize {
    let digits_from = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let mut i = usize::from(matches!(bytes.first(), Some(b'-' | b'+')));
    let int_end = digits_from(i);
    if int_end == i {
        return 0;
    }
    i = int_end;

    if bytes.get(i) == Some(&b'.') && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
        i = digits_from(i + 1);
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        if bytes.get(j).is_some_and(u8::is_ascii_digit) {
            i = digits_from(j);
        }
    }
    i
}
