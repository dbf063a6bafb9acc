//! Kind-tag to decoder table for declared sources.

use super::errors::DecodeError;
use super::{FileSource, GitSource, OsfSource, SourceKind, UrlSource};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

/// Turns the fields of one declared source (without `type`) into a source.
pub type SourceDecoder = fn(Value) -> Result<Box<dyn FileSource>, DecodeError>;

/// Explicitly constructed registry of source kinds.
///
/// Built once at startup and passed to whatever decodes metadata.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    decoders: BTreeMap<String, SourceDecoder>,
}

impl SourceRegistry {
    /// Registry without any kinds.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the `osf`, `url` and `git` kinds.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry
            .register(OsfSource::KIND, decode_as::<OsfSource>)
            .register(UrlSource::KIND, decode_as::<UrlSource>)
            .register(GitSource::KIND, GitSource::decode);
        registry
    }

    /// Add or replace the decoder for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, decoder: SourceDecoder) -> &mut Self {
        self.decoders.insert(kind.into(), decoder);
        self
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.decoders.keys().map(String::as_str)
    }

    /// Decode one `{"type": ..., ...}` entry.
    pub fn decode(&self, entry: &Value) -> Result<Box<dyn FileSource>, DecodeError> {
        let mut fields = entry.as_object().cloned().ok_or(DecodeError::MissingType)?;
        let kind = match fields.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(DecodeError::MissingType),
        };
        let decoder = self
            .decoders
            .get(&kind)
            .ok_or_else(|| DecodeError::UnknownType {
                kind: kind.clone(),
                known: self.kinds().map(str::to_string).collect(),
            })?;
        decoder(Value::Object(fields))
    }
}

/// Decoder for sources whose fields map one-to-one onto a struct.
pub fn decode_as<S>(fields: Value) -> Result<Box<dyn FileSource>, DecodeError>
where
    S: FileSource + SourceKind + DeserializeOwned + 'static,
{
    let source: S = serde_json::from_value(fields).map_err(|source| DecodeError::Invalid {
        kind: S::KIND.to_string(),
        source,
    })?;
    Ok(Box::new(source))
}
