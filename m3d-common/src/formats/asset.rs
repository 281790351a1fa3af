//! Whole-file `.m3d` reader
//!
//! The file is a sequence of named sections with no magic and no version:
//!
//! ```text
//! meshes     NameIndexMap + MeshRecord × n
//! armatures  NameIndexMap + ArmatureRecord × n
//! actions    NameIndexMap + AnimationStream × n
//! "MAT"      length-prefixed separator
//! materials  NameIndexMap + MaterialRecord × n
//! images     NameIndexMap + ImageRecord × n
//! scenes     NameIndexMap + SceneRecord × n
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use super::animation::AnimationStream;
use super::material::{ImageRecord, MaterialRecord};
use super::mesh::MeshRecord;
use super::name_index::NameIndexMap;
use super::primitives::{BinaryReader, BinaryWriter, DecodeError};
use super::scene::SceneRecord;
use super::skeleton::ArmatureRecord;
use super::MATERIAL_SEPARATOR;

/// A name table plus the records it indexes
#[derive(Debug, Clone, PartialEq)]
pub struct Section<T> {
    pub names: NameIndexMap,
    pub records: Vec<T>,
}

impl<T> Default for Section<T> {
    fn default() -> Self {
        Self {
            names: NameIndexMap::default(),
            records: Vec::new(),
        }
    }
}

impl<T> Section<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record stored under `name`
    pub fn get(&self, name: &str) -> Option<&T> {
        self.names
            .lookup(name)
            .and_then(|i| self.records.get(i as usize))
    }

    fn read_with(
        r: &mut BinaryReader<'_>,
        read: impl Fn(&mut BinaryReader<'_>) -> Result<T, DecodeError>,
    ) -> Result<Self, DecodeError> {
        let names = NameIndexMap::read_checked(r)?;
        let mut records = Vec::with_capacity(names.len());
        for _ in 0..names.len() {
            records.push(read(r)?);
        }
        Ok(Self { names, records })
    }

    fn write_with<W: Write>(
        &self,
        w: &mut BinaryWriter<W>,
        write: impl Fn(&T, &mut BinaryWriter<W>) -> io::Result<()>,
    ) -> io::Result<()> {
        self.names.write_to(w)?;
        for record in &self.records {
            write(record, w)?;
        }
        Ok(())
    }
}

/// Error loading an `.m3d` file from disk
#[derive(Debug, thiserror::Error)]
pub enum AssetLoadError {
    #[error("failed to read asset: {0}")]
    Io(#[from] io::Error),

    #[error("malformed asset: {0}")]
    Decode(#[from] DecodeError),
}

/// Fully decoded `.m3d` asset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct M3dAsset {
    pub meshes: Section<MeshRecord>,
    pub armatures: Section<ArmatureRecord>,
    pub actions: Section<AnimationStream>,
    pub materials: Section<MaterialRecord>,
    pub images: Section<ImageRecord>,
    pub scenes: Section<SceneRecord>,
}

impl M3dAsset {
    /// Decode a complete file; trailing bytes are an error
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = BinaryReader::new(bytes);

        let meshes = Section::read_with(&mut r, MeshRecord::read_from)?;
        let armatures = Section::read_with(&mut r, ArmatureRecord::read_from)?;
        let actions = Section::read_with(&mut r, AnimationStream::read_from)?;

        let separator = r.read_string()?;
        if separator != MATERIAL_SEPARATOR {
            return Err(DecodeError::InvalidSeparator {
                expected: MATERIAL_SEPARATOR.to_string(),
                found: separator,
            });
        }

        let materials = Section::read_with(&mut r, MaterialRecord::read_from)?;
        let images = Section::read_with(&mut r, ImageRecord::read_from)?;
        let scenes = Section::read_with(&mut r, SceneRecord::read_from)?;

        if !r.is_empty() {
            return Err(DecodeError::TrailingBytes(r.remaining()));
        }

        Ok(Self {
            meshes,
            armatures,
            actions,
            materials,
            images,
            scenes,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AssetLoadError> {
        let bytes = fs::read(path)?;
        Ok(Self::from_bytes(&bytes)?)
    }

    /// Encode the asset in section order
    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> io::Result<()> {
        self.meshes.write_with(w, MeshRecord::write_to)?;
        self.armatures.write_with(w, ArmatureRecord::write_to)?;
        self.actions.write_with(w, AnimationStream::write_to)?;
        w.write_string(MATERIAL_SEPARATOR)?;
        self.materials.write_with(w, MaterialRecord::write_to)?;
        self.images.write_with(w, ImageRecord::write_to)?;
        self.scenes.write_with(w, SceneRecord::write_to)
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut w = BinaryWriter::new(Vec::new());
        self.write_to(&mut w)?;
        Ok(w.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{BoneRecord, KeyframeRecord, SENTINEL};

    /// Six empty maps around the separator
    const EMPTY_ASSET: [u8; 17] = [0, 0, 0, 0, 0, 0, 3, 0, b'M', b'A', b'T', 0, 0, 0, 0, 0, 0];

    #[test]
    fn test_empty_asset_layout() {
        assert_eq!(M3dAsset::default().to_bytes().unwrap(), EMPTY_ASSET);
        assert_eq!(M3dAsset::from_bytes(&EMPTY_ASSET).unwrap(), M3dAsset::default());
    }

    #[test]
    fn test_bad_separator() {
        let mut bytes = EMPTY_ASSET;
        bytes[8] = b'X';
        assert!(matches!(
            M3dAsset::from_bytes(&bytes),
            Err(DecodeError::InvalidSeparator { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = EMPTY_ASSET.to_vec();
        bytes.push(0);
        assert_eq!(
            M3dAsset::from_bytes(&bytes),
            Err(DecodeError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_name_index_out_of_range() {
        // One mesh named "A" pointing at record 5, followed by that one record
        let mut bytes = vec![1, 0, 1, 0, b'A', 5, 0];
        bytes.extend_from_slice(&[12, 0, 0, 0, 0, 0]);
        bytes.extend_from_slice(&EMPTY_ASSET[2..]);
        assert_eq!(
            M3dAsset::from_bytes(&bytes),
            Err(DecodeError::InvalidNameIndex { count: 1 })
        );
    }

    #[test]
    fn test_truncated_file() {
        assert!(matches!(
            M3dAsset::from_bytes(&EMPTY_ASSET[..10]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_populated_asset_decode() {
        let asset = M3dAsset {
            armatures: Section {
                names: NameIndexMap::from_ordered_names(["Rig"]),
                records: vec![ArmatureRecord {
                    bones: vec![BoneRecord {
                        name: "Root".into(),
                        parent: SENTINEL,
                        offset: [0.0, 0.0, 1.0],
                        roll: 0.0,
                    }],
                }],
            },
            actions: Section {
                names: NameIndexMap::from_ordered_names(["Idle"]),
                records: vec![
                    AnimationStream::new(
                        1,
                        1,
                        vec![
                            KeyframeRecord::sample(0, 0, [0.0, 0.0, 0.0, 1.0]),
                            KeyframeRecord::end_of_track(0),
                        ],
                    )
                    .unwrap(),
                ],
            },
            images: Section {
                names: NameIndexMap::from_ordered_names(["wood.png"]),
                records: vec![ImageRecord {
                    name: "wood.png".into(),
                }],
            },
            ..Default::default()
        };

        let bytes = asset.to_bytes().unwrap();
        let decoded = M3dAsset::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, asset);
        assert_eq!(decoded.armatures.get("Rig").map(|a| a.bones.len()), Some(1));
        assert!(decoded.actions.get("Walk").is_none());
    }
}
