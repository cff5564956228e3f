//! Canonicalizing symbol table for decoded field names.
//!
//! Field-name bytes are viewed as little-endian 32-bit quads (the final
//! quad zero-padded) and probed here before any UTF-8 decoding; a hit
//! returns the canonical interned name and skips the character work
//! entirely. The table is shared across every decoder a factory creates,
//! so a document stream with a stable vocabulary pays the decode cost
//! once.
//!
//! Concurrency: reads take the shared lock (the common path once the
//! vocabulary stabilizes); interning takes the exclusive lock and
//! coalesces with any racing insertion: the first writer wins and later
//! writers get its entry back.

use std::sync::{Arc, RwLock};

const INITIAL_BUCKETS: usize = 64;

/// Rehash when entries exceed 3/4 of the bucket count.
const LOAD_NUM: usize = 3;
const LOAD_DEN: usize = 4;

/// Default cap on distinct names; past it, new names skip interning so a
/// hostile document cannot grow the table without bound.
const DEFAULT_MAX_ENTRIES: usize = 4096;

struct Entry {
    hash: u32,
    /// Packed name bytes; the final quad is zero-padded.
    quads: Box<[u32]>,
    /// Exact byte length, to distinguish padding from real NUL bytes.
    byte_len: usize,
    name: Arc<str>,
}

struct Inner {
    buckets: Vec<Vec<Entry>>,
    count: usize,
}

/// Shared, append-mostly interner keyed on packed name quads.
pub struct SymbolTable {
    inner: RwLock<Inner>,
    max_entries: usize,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    /// A table that stops interning (but keeps resolving) once `max`
    /// distinct names have been seen.
    #[must_use]
    pub fn with_max_entries(max: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                buckets: (0..INITIAL_BUCKETS).map(|_| Vec::new()).collect(),
                count: 0,
            }),
            max_entries: max,
        }
    }

    /// Number of distinct names interned so far.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.read().expect("symbol table poisoned").count
    }

    /// Looks up the canonical name for the packed quads of a candidate
    /// field name. `byte_len` is the exact (unpadded) byte length.
    #[must_use]
    pub fn find(&self, quads: &[u32], byte_len: usize) -> Option<Arc<str>> {
        let hash = calc_hash(quads);
        let inner = self.inner.read().expect("symbol table poisoned");
        let bucket = &inner.buckets[hash as usize % inner.buckets.len()];
        bucket
            .iter()
            .find(|e| e.hash == hash && e.byte_len == byte_len && *e.quads == *quads)
            .map(|e| Arc::clone(&e.name))
    }

    /// Interns `name`, returning the canonical entry. If another thread
    /// inserted the same bytes first, its entry is returned; if the
    /// distinct-name cap has been reached, the name is returned
    /// uninterned.
    #[must_use]
    pub fn intern(&self, name: &str, quads: &[u32]) -> Arc<str> {
        let hash = calc_hash(quads);
        let mut inner = self.inner.write().expect("symbol table poisoned");
        let idx = hash as usize % inner.buckets.len();
        if let Some(existing) = inner.buckets[idx]
            .iter()
            .find(|e| e.hash == hash && e.byte_len == name.len() && *e.quads == *quads)
        {
            return Arc::clone(&existing.name);
        }
        if inner.count >= self.max_entries {
            return Arc::from(name);
        }
        let canonical: Arc<str> = Arc::from(name);
        inner.buckets[idx].push(Entry {
            hash,
            quads: quads.into(),
            byte_len: name.len(),
            name: Arc::clone(&canonical),
        });
        inner.count += 1;
        if inner.count * LOAD_DEN > inner.buckets.len() * LOAD_NUM {
            rehash(&mut inner);
        }
        canonical
    }
}

fn rehash(inner: &mut Inner) {
    let new_len = inner.buckets.len() * 2;
    let mut buckets: Vec<Vec<Entry>> = (0..new_len).map(|_| Vec::new()).collect();
    for entry in inner.buckets.drain(..).flatten() {
        let idx = entry.hash as usize % new_len;
        buckets[idx].push(entry);
    }
    inner.buckets = buckets;
}

/// Packs name bytes into little-endian quads, zero-padding the tail.
pub(crate) fn pack_quads(bytes: &[u8], out: &mut Vec<u32>) {
    out.clear();
    let mut chunks = bytes.chunks_exact(4);
    for chunk in &mut chunks {
        out.push(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    let rest = chunks.remainder();
    if !rest.is_empty() {
        let mut quad = [0u8; 4];
        quad[..rest.len()].copy_from_slice(rest);
        out.push(u32::from_le_bytes(quad));
    }
}

fn calc_hash(quads: &[u32]) -> u32 {
    let mut h: u32 = 0x811C_9DC5;
    for &q in quads {
        h ^= q;
        h = h.wrapping_mul(0x0100_0193);
    }
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quads_of(name: &str) -> Vec<u32> {
        let mut q = Vec::new();
        pack_quads(name.as_bytes(), &mut q);
        q
    }

    #[test]
    fn intern_then_find_is_canonical() {
        let table = SymbolTable::new();
        let q = quads_of("query");
        let a = table.intern("query", &q);
        let b = table.find(&q, 5).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(&*b, "query");
        assert_eq!(table.size(), 1);
    }

    #[test]
    fn repeated_intern_coalesces() {
        let table = SymbolTable::new();
        let q = quads_of("id");
        let a = table.intern("id", &q);
        let b = table.intern("id", &q);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(table.size(), 1);
    }

    #[test]
    fn padding_does_not_collide_with_nul() {
        let table = SymbolTable::new();
        let with_nul = "ab\0";
        let plain = "ab";
        let q1 = quads_of(with_nul);
        let q2 = quads_of(plain);
        assert_eq!(q1, q2); // same packed quads...
        let a = table.intern(with_nul, &q1);
        let b = table.intern(plain, &q2);
        assert_eq!(&*a, with_nul);
        assert_eq!(&*b, plain); // ...but byte_len keeps them apart
        assert_eq!(table.size(), 2);
    }

    #[test]
    fn survives_rehash() {
        let table = SymbolTable::new();
        let names: Vec<String> = (0..200).map(|i| format!("field_{i}")).collect();
        let firsts: Vec<Arc<str>> = names
            .iter()
            .map(|n| table.intern(n, &quads_of(n)))
            .collect();
        for (name, first) in names.iter().zip(&firsts) {
            let found = table.find(&quads_of(name), name.len()).unwrap();
            assert!(Arc::ptr_eq(first, &found));
        }
        assert_eq!(table.size(), 200);
    }

    #[test]
    fn cap_bypasses_interning() {
        let table = SymbolTable::with_max_entries(2);
        let _ = table.intern("a", &quads_of("a"));
        let _ = table.intern("b", &quads_of("b"));
        let c1 = table.intern("c", &quads_of("c"));
        let c2 = table.intern("c", &quads_of("c"));
        assert_eq!(&*c1, "c");
        assert!(!Arc::ptr_eq(&c1, &c2));
        assert_eq!(table.size(), 2);
        assert!(table.find(&quads_of("c"), 1).is_none());
    }

    #[test]
    fn long_names_use_quad_arrays() {
        let table = SymbolTable::new();
        let name = "a-rather-long-field-name-spanning-many-quads";
        let q = quads_of(name);
        assert!(q.len() > 2);
        let a = table.intern(name, &q);
        let b = table.find(&q, name.len()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
