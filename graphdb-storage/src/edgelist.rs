//! Delta+varint compressed sorted id lists (C2).
//!
//! Layout once built: `base(varint) | count(varint) | delta_1(varint) | ... | delta_{n-1}(varint)`.
//! Deltas are differences between consecutive sorted ids, so they fit in far
//! fewer bytes than the raw ids for densely clustered neighbor sets.

use graphdb_core::error::{GraphError, Result};

/// An immutable, delta+varint compressed representation of a sorted sequence
/// of `u64` ids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompressedEdgeList {
    bytes: Vec<u8>,
    count: usize,
}

impl CompressedEdgeList {
    /// Builds a compressed list from an arbitrary (possibly unsorted) id
    /// sequence. Duplicates are preserved; sort is stable.
    pub fn from_ids(mut ids: Vec<u64>) -> Self {
        ids.sort_unstable();
        let mut bytes = Vec::new();
        put_varint(&mut bytes, ids.len() as u64);
        if let Some(&base) = ids.first() {
            put_varint(&mut bytes, base);
            let mut prev = base;
            for &id in &ids[1..] {
                put_varint(&mut bytes, id - prev);
                prev = id;
            }
        }
        Self {
            bytes,
            count: ids.len(),
        }
    }

    pub fn empty() -> Self {
        Self::from_ids(Vec::new())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Raw wire bytes, for direct storage in the KV engine.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut cursor = 0usize;
        let count = get_varint(&bytes, &mut cursor)? as usize;
        Ok(Self { bytes, count })
    }

    /// Decompresses the full sorted sequence. On a corrupt delta stream
    /// (a varint that would overflow the running sum) returns the ids
    /// decoded so far along with a [`GraphError::Corruption`].
    pub fn decompress(&self) -> std::result::Result<Vec<u64>, (Vec<u64>, GraphError)> {
        let mut cursor = 0usize;
        let count = match get_varint(&self.bytes, &mut cursor) {
            Ok(v) => v as usize,
            Err(e) => return Err((Vec::new(), e)),
        };
        let mut out = Vec::with_capacity(count);
        if count == 0 {
            return Ok(out);
        }
        let base = match get_varint(&self.bytes, &mut cursor) {
            Ok(v) => v,
            Err(e) => return Err((out, e)),
        };
        out.push(base);
        let mut prev = base;
        for _ in 1..count {
            let delta = match get_varint(&self.bytes, &mut cursor) {
                Ok(v) => v,
                Err(e) => return Err((out, e)),
            };
            match prev.checked_add(delta) {
                Some(next) => {
                    out.push(next);
                    prev = next;
                }
                None => {
                    return Err((
                        out,
                        GraphError::Corruption("edge list delta overflow".into()),
                    ))
                }
            }
        }
        Ok(out)
    }

    /// Membership test, evaluated by scanning the delta stream rather than
    /// materializing the full decompression.
    pub fn contains(&self, id: u64) -> bool {
        let mut cursor = 0usize;
        let count = match get_varint(&self.bytes, &mut cursor) {
            Ok(v) => v as usize,
            Err(_) => return false,
        };
        if count == 0 {
            return false;
        }
        let mut prev = match get_varint(&self.bytes, &mut cursor) {
            Ok(v) => v,
            Err(_) => return false,
        };
        if prev == id {
            return true;
        }
        if prev > id {
            return false;
        }
        for _ in 1..count {
            let delta = match get_varint(&self.bytes, &mut cursor) {
                Ok(v) => v,
                Err(_) => return false,
            };
            prev = match prev.checked_add(delta) {
                Some(v) => v,
                None => return false,
            };
            if prev == id {
                return true;
            }
            if prev > id {
                return false;
            }
        }
        false
    }
}

fn put_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn get_varint(bytes: &[u8], cursor: &mut usize) -> Result<u64> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *bytes
            .get(*cursor)
            .ok_or_else(|| GraphError::Corruption("truncated varint".into()))?;
        *cursor += 1;
        if shift >= 64 {
            return Err(GraphError::Corruption("varint too long".into()));
        }
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decompress_sorts_and_dedupes_nothing() {
        let list = CompressedEdgeList::from_ids(vec![100, 50, 150, 75]);
        assert_eq!(list.decompress().unwrap(), vec![50, 75, 100, 150]);
    }

    #[test]
    fn empty_list_round_trips() {
        let list = CompressedEdgeList::empty();
        assert_eq!(list.count(), 0);
        assert_eq!(list.decompress().unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn contains_matches_membership() {
        let list = CompressedEdgeList::from_ids(vec![5, 1, 9, 3]);
        assert!(list.contains(1));
        assert!(list.contains(9));
        assert!(!list.contains(4));
    }

    #[test]
    fn handles_ids_near_u64_max() {
        let ids = vec![u64::MAX, u64::MAX - 10, u64::MAX - 1000];
        let list = CompressedEdgeList::from_ids(ids.clone());
        let mut expected = ids;
        expected.sort_unstable();
        assert_eq!(list.decompress().unwrap(), expected);
        assert!(list.contains(u64::MAX));
    }

    #[test]
    fn bytes_round_trip_through_from_bytes() {
        let list = CompressedEdgeList::from_ids(vec![1, 2, 3, 1000]);
        let rebuilt = CompressedEdgeList::from_bytes(list.as_bytes().to_vec()).unwrap();
        assert_eq!(list, rebuilt);
    }

    #[test]
    fn duplicates_are_retained() {
        let list = CompressedEdgeList::from_ids(vec![1, 1, 2]);
        assert_eq!(list.count(), 3);
        assert_eq!(list.decompress().unwrap(), vec![1, 1, 2]);
    }
}
