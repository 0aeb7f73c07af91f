//! Per-class body serializer registry.
//!
//! Object bodies are decoded and re-emitted by class-specific codecs looked up by
//! class *name*, not by static type. Lookup walks the class's super chain so a codec
//! registered for a base class covers every derived class; anything unregistered
//! falls back to the raw codec, which copies the byte range through verbatim.

use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    export::BodyWriter,
    objects::{ObjectBody, UObject},
    upk::export::ObjectExport,
    Result,
};

/// Byte-level codec for one class of object bodies.
///
/// `read_body` decodes the export's `[serial_offset, serial_offset + serial_size)`
/// range into an opaque payload; `write_body` re-emits a materialized object into
/// an export stream, routing every name and object reference through the
/// exporter's tables so the emitted body points at the new indices.
pub trait ObjectCodec: Send + Sync {
    /// Decode the serialized body of `export` from its byte range
    ///
    /// # Errors
    /// Returns decoding errors when the payload is structurally invalid
    fn read_body(&self, export: &ObjectExport, data: &[u8]) -> Result<ObjectBody>;

    /// Re-emit the body of a materialized object into an export stream
    ///
    /// # Errors
    /// Returns [`crate::Error::ObjectNotMaterialized`] when the object carries
    /// no payload to emit, and propagates stream failures otherwise
    fn write_body(&self, object: &UObject, out: &mut BodyWriter<'_>) -> Result<()>;
}

/// The identity codec: bodies pass through as raw bytes.
///
/// This is the fallback for every class without a registered codec, and the
/// codec used by identity exports (round-trips). It cannot rewrite references
/// inside the payload, so it is only correct when the surrounding tables keep
/// the referenced indices stable or the payload holds none.
pub struct RawObjectCodec;

impl ObjectCodec for RawObjectCodec {
    fn read_body(&self, _export: &ObjectExport, data: &[u8]) -> Result<ObjectBody> {
        if data.is_empty() {
            Ok(ObjectBody::Empty)
        } else {
            Ok(ObjectBody::Raw(data.to_vec()))
        }
    }

    fn write_body(&self, object: &UObject, out: &mut BodyWriter<'_>) -> Result<()> {
        match &object.body {
            ObjectBody::Empty => Ok(()),
            ObjectBody::Raw(data) => out.write_bytes(data),
        }
    }
}

/// Registry mapping class names to body codecs.
///
/// Thread-safe; registration may happen at any time before the classes are
/// materialized. Lookup through [`ObjectCodecRegistry::resolve`] walks a class
/// chain from most to least specific, matching the engine's behavior of walking
/// base types until a serializer is found.
pub struct ObjectCodecRegistry {
    codecs: DashMap<String, Arc<dyn ObjectCodec>>,
    fallback: Arc<dyn ObjectCodec>,
}

impl ObjectCodecRegistry {
    /// Create a registry with only the raw fallback codec
    #[must_use]
    pub fn new() -> Self {
        ObjectCodecRegistry {
            codecs: DashMap::new(),
            fallback: Arc::new(RawObjectCodec),
        }
    }

    /// Register a codec for a class name, replacing any previous registration
    ///
    /// ## Arguments
    /// * 'class_name' - The class the codec decodes bodies for
    /// * 'codec'      - The codec implementation
    pub fn register(&self, class_name: &str, codec: Arc<dyn ObjectCodec>) {
        self.codecs.insert(class_name.to_string(), codec);
    }

    /// Get the codec registered for exactly `class_name`, if any
    #[must_use]
    pub fn get(&self, class_name: &str) -> Option<Arc<dyn ObjectCodec>> {
        self.codecs.get(class_name).map(|entry| entry.value().clone())
    }

    /// Resolve the most specific codec for a class chain.
    ///
    /// ## Arguments
    /// * 'chain' - Class names ordered most to least specific (class, super, ...)
    #[must_use]
    pub fn resolve(&self, chain: &[String]) -> Arc<dyn ObjectCodec> {
        for class_name in chain {
            if let Some(codec) = self.get(class_name) {
                return codec;
            }
        }
        self.fallback.clone()
    }
}

impl Default for ObjectCodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}
