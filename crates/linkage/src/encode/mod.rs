//! Key encodings used to build blocking keys and by the encoded-string
//! comparator.
//!
//! Encoders are pure functions of `(value, param)`. They are looked up by name
//! through an [`EncoderRegistry`], which callers may extend before the
//! pipeline is assembled.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rphonetic::{DoubleMetaphone, Encoder, Nysiis, Phonex, Soundex};

use crate::error::LinkageError;

/// A stateless string encoding. `param` is the encoding's optional length
/// argument (`truncate` length, maximum code length for phonetic codes).
pub trait KeyEncoder: Send + Sync {
    fn encode(&self, value: &str, param: Option<usize>) -> String;
}

impl<F> KeyEncoder for F
where
    F: Fn(&str, Option<usize>) -> String + Send + Sync,
{
    fn encode(&self, value: &str, param: Option<usize>) -> String {
        self(value, param)
    }
}

/// Name → encoder map. `Default` holds the builtins.
#[derive(Clone)]
pub struct EncoderRegistry {
    encoders: BTreeMap<String, Arc<dyn KeyEncoder>>,
}

impl EncoderRegistry {
    /// A registry with no encoders at all.
    pub fn empty() -> Self {
        Self {
            encoders: BTreeMap::new(),
        }
    }

    /// Register (or replace) an encoder under `name`.
    pub fn register(&mut self, name: impl Into<String>, encoder: impl KeyEncoder + 'static) {
        self.encoders.insert(name.into(), Arc::new(encoder));
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn KeyEncoder>, LinkageError> {
        self.encoders
            .get(name)
            .cloned()
            .ok_or_else(|| LinkageError::UnknownEncoding(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.encoders.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        let mut reg = Self::empty();
        reg.register("direct", direct);
        reg.register("truncate", truncate);
        reg.register("soundex", soundex);
        reg.register("nysiis", nysiis);
        reg.register("dmetaphone", dmetaphone);
        reg.register("phonex", phonex);
        reg
    }
}

impl fmt::Debug for EncoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderRegistry")
            .field("encoders", &self.encoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Builtins
// ---------------------------------------------------------------------------

/// The value itself. `param` is ignored.
pub fn direct(value: &str, _param: Option<usize>) -> String {
    value.trim().to_string()
}

/// First `param` characters; the whole value when `param` is absent.
pub fn truncate(value: &str, param: Option<usize>) -> String {
    let value = value.trim();
    match param {
        Some(n) => value.chars().take(n).collect(),
        None => value.to_string(),
    }
}

/// American Soundex. Codes are padded with zeros, or cut, to `param`
/// characters (default 4); at most four of them carry information.
pub fn soundex(value: &str, param: Option<usize>) -> String {
    let code = Soundex::default().encode(value);
    if code.is_empty() {
        return code;
    }
    let len = param.unwrap_or(4).max(1);
    code.chars().chain(std::iter::repeat('0')).take(len).collect()
}

/// New York State Identification and Intelligence System phonetic code,
/// truncated to `param` characters when given.
pub fn nysiis(value: &str, param: Option<usize>) -> String {
    let code = Nysiis::new(false).encode(value);
    truncate(&code, param)
}

/// Primary double-metaphone code, at most `param` characters when given.
pub fn dmetaphone(value: &str, param: Option<usize>) -> String {
    // each input letter adds at most two code characters
    let max = param.unwrap_or(value.len() * 2);
    DoubleMetaphone::new(max).encode(value)
}

/// Phonex code of `param` characters (default 4). Empty when `value` has
/// no letters.
pub fn phonex(value: &str, param: Option<usize>) -> String {
    if !value.chars().any(|c| c.is_ascii_alphabetic()) {
        return String::new();
    }
    Phonex::new(param.unwrap_or(4)).encode(value)
}
