//! Process-wide codec cache.
//!
//! Readers load an immutable snapshot of the `TypeId -> Codec` map without
//! locking. A miss builds the codec outside of any lock and publishes a new
//! snapshot containing the old entries plus the new one. Two threads missing
//! on the same type may both build it; either codec is correct and the last
//! publish wins.

use std::any::TypeId;
use std::sync::Arc;

use arc_swap::ArcSwap;
use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use crate::codec::Codec;
use crate::codec::builder::Builder;
use crate::error::BuildError;
use crate::reflect::TypeRef;

type Snapshot = FxHashMap<TypeId, Arc<Codec>>;

lazy_static! {
    static ref CODEC_CACHE: CodecCache = CodecCache::new();
}

/// An append-only map from type to codec.
pub struct CodecCache {
    snapshot: ArcSwap<Snapshot>,
}

impl CodecCache {
    /// Creates an empty cache, independent of the global one.
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
        }
    }

    /// The cache shared by the entry points.
    pub fn global() -> &'static CodecCache {
        &CODEC_CACHE
    }

    /// Returns the published codec for a type, if any.
    #[inline]
    pub fn lookup(&self, id: TypeId) -> Option<Arc<Codec>> {
        self.snapshot.load().get(&id).cloned()
    }

    /// Adds a codec, keeping every entry published so far.
    pub fn publish(&self, id: TypeId, codec: Arc<Codec>) {
        log::trace!("publishing codec for {}", codec.type_name());
        self.snapshot.rcu(|current| {
            let mut next = Snapshot::clone(current);
            next.insert(id, codec.clone());
            next
        });
    }

    /// Returns the codec for `ty`, building and publishing it on a miss.
    pub fn codec_of(&self, ty: TypeRef) -> Result<Arc<Codec>, BuildError> {
        if let Some(codec) = self.lookup(ty.id()) {
            return Ok(codec);
        }
        let codec = Builder::new(self).build(ty)?;
        self.publish(ty.id(), codec.clone());
        Ok(codec)
    }

    /// Number of published codecs.
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CodecCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_builds_and_publishes() {
        let cache = CodecCache::new();
        assert!(cache.is_empty());
        assert!(cache.lookup(TypeId::of::<u64>()).is_none());

        let built = cache.codec_of(TypeRef::of::<u64>()).unwrap();
        let cached = cache.lookup(TypeId::of::<u64>()).unwrap();
        assert!(Arc::ptr_eq(&built, &cached));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_publish_keeps_existing_entries() {
        let cache = CodecCache::new();
        cache.codec_of(TypeRef::of::<String>()).unwrap();
        cache.codec_of(TypeRef::of::<bool>()).unwrap();
        assert!(cache.lookup(TypeId::of::<String>()).is_some());
        assert!(cache.lookup(TypeId::of::<bool>()).is_some());
    }

    #[test]
    fn test_failed_build_publishes_nothing() {
        let cache = CodecCache::new();
        assert!(cache.codec_of(TypeRef::of::<u8>()).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(CodecCache::global(), CodecCache::global()));
    }
}
