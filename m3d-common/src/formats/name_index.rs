//! Name-index tables
//!
//! Every homogeneous section of an `.m3d` file is preceded by a table mapping
//! entity names to their storage index. Entries are sorted by name so the
//! loader can binary-search, while the stored index keeps the mapping back to
//! the array position stable.
//!
//! # Layout
//! ```text
//! count u16
//! count × { name_len u16, name bytes, index u16 }
//! ```

use std::io::{self, Write};

use super::primitives::{BinaryReader, BinaryWriter, DecodeError};

/// One `(name, storage index)` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameIndexEntry {
    pub name: String,
    pub index: u16,
}

/// Sorted name → index table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameIndexMap {
    entries: Vec<NameIndexEntry>,
}

impl NameIndexMap {
    /// Build a table from `(name, index)` pairs, sorting by name (byte-wise)
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u16)>,
        S: Into<String>,
    {
        let mut entries: Vec<NameIndexEntry> = pairs
            .into_iter()
            .map(|(name, index)| NameIndexEntry {
                name: name.into(),
                index,
            })
            .collect();
        entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        Self { entries }
    }

    /// Build a table where each name's index is its position in `names`
    pub fn from_ordered_names<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::new(
            names
                .into_iter()
                .enumerate()
                .map(|(i, name)| (name, i as u16)),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in sorted order
    pub fn entries(&self) -> &[NameIndexEntry] {
        &self.entries
    }

    /// Binary-search the storage index of `name`
    pub fn lookup(&self, name: &str) -> Option<u16> {
        self.entries
            .binary_search_by(|e| e.name.as_bytes().cmp(name.as_bytes()))
            .ok()
            .map(|i| self.entries[i].index)
    }

    /// Serialized size in bytes
    pub fn byte_size(&self) -> usize {
        2 + self
            .entries
            .iter()
            .map(|e| 2 + e.name.len() + 2)
            .sum::<usize>()
    }

    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> io::Result<()> {
        let count = u16::try_from(self.entries.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("name-index table of {} entries exceeds u16", self.entries.len()),
            )
        })?;
        w.write_u16(count)?;
        for entry in &self.entries {
            w.write_string(&entry.name)?;
            w.write_u16(entry.index)?;
        }
        Ok(())
    }

    /// Decode a table, keeping entries in their stored order
    pub fn read_from(r: &mut BinaryReader<'_>) -> Result<Self, DecodeError> {
        let count = r.read_u16()? as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let name = r.read_string()?;
            let index = r.read_u16()?;
            entries.push(NameIndexEntry { name, index });
        }
        Ok(Self { entries })
    }

    /// Read a table that must index exactly `len()` records
    pub fn read_checked(r: &mut BinaryReader<'_>) -> Result<Self, DecodeError> {
        let map = Self::read_from(r)?;
        if !map.is_index_permutation() {
            return Err(DecodeError::InvalidNameIndex { count: map.len() });
        }
        Ok(map)
    }

    /// True if entries are in ascending byte-wise name order
    pub fn is_sorted(&self) -> bool {
        self.entries
            .windows(2)
            .all(|w| w[0].name.as_bytes() <= w[1].name.as_bytes())
    }

    /// True if the stored indices are exactly a permutation of `0..len`
    pub fn is_index_permutation(&self) -> bool {
        let mut seen = vec![false; self.entries.len()];
        for entry in &self.entries {
            match seen.get_mut(entry.index as usize) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(map: &NameIndexMap) -> Vec<u8> {
        let mut w = BinaryWriter::new(Vec::new());
        map.write_to(&mut w).unwrap();
        w.into_inner()
    }

    #[test]
    fn test_entries_sorted_by_name() {
        let map = NameIndexMap::from_ordered_names(["Torso", "Arm", "Leg"]);
        let names: Vec<_> = map.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Arm", "Leg", "Torso"]);
        assert_eq!(map.lookup("Torso"), Some(0));
        assert_eq!(map.lookup("Arm"), Some(1));
        assert_eq!(map.lookup("Leg"), Some(2));
        assert_eq!(map.lookup("Head"), None);
        assert!(map.is_sorted());
        assert!(map.is_index_permutation());
    }

    #[test]
    fn test_sort_is_bytewise() {
        // Uppercase sorts before lowercase in byte order
        let map = NameIndexMap::from_ordered_names(["beta", "Alpha", "alpha"]);
        let names: Vec<_> = map.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "alpha", "beta"]);
    }

    #[test]
    fn test_layout() {
        let map = NameIndexMap::from_ordered_names(["b", "a"]);
        let bytes = encode(&map);
        assert_eq!(
            bytes,
            vec![
                2, 0, // count
                1, 0, b'a', 1, 0, // "a" -> 1
                1, 0, b'b', 0, 0, // "b" -> 0
            ]
        );
        assert_eq!(map.byte_size(), bytes.len());
    }

    #[test]
    fn test_empty_map_is_single_zero_count() {
        let map = NameIndexMap::default();
        assert_eq!(encode(&map), vec![0, 0]);
    }

    #[test]
    fn test_decode() {
        let map = NameIndexMap::from_ordered_names(["Mesh.001", "Cube", "Plane"]);
        let bytes = encode(&map);
        let mut r = BinaryReader::new(&bytes);
        let decoded = NameIndexMap::read_from(&mut r).unwrap();
        assert!(r.is_empty());
        assert_eq!(decoded, map);
    }

    #[test]
    fn test_permutation_check() {
        let dup = NameIndexMap::new([("a", 0), ("b", 0)]);
        assert!(!dup.is_index_permutation());
        let gap = NameIndexMap::new([("a", 0), ("b", 2)]);
        assert!(!gap.is_index_permutation());
    }
}
