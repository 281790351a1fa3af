//! Scene registry
//!
//! Assigns every exported entity its storage index once, before any encoding,
//! and resolves name references (object → mesh/material, material → texture →
//! image) through owned lookup tables. Only entities flagged for export get an
//! index; images are always exported.

use hashbrown::HashMap;
use m3d_common::{NameIndexMap, SENTINEL};

use crate::error::{check_count, ExportError};
use crate::scene::{
    Action, Armature, AttributeGroup, Image, Material, Mesh, Scene, SceneNode, Texture,
    TextureKind,
};

/// Largest number of entities per section (0xFFFF is reserved)
pub const MAX_ENTITIES: usize = SENTINEL as usize;

/// Exported entities in storage order plus name → index tables
pub struct Registry<'a> {
    pub meshes: Vec<&'a Mesh>,
    pub armatures: Vec<&'a Armature>,
    pub actions: Vec<&'a Action>,
    pub materials: Vec<&'a Material>,
    pub images: Vec<&'a Image>,
    pub scenes: Vec<&'a SceneNode>,

    mesh_index: HashMap<&'a str, u16>,
    material_index: HashMap<&'a str, u16>,
    image_index: HashMap<&'a str, u16>,
    textures: HashMap<&'a str, &'a Texture>,
    attribute_groups: HashMap<&'a str, &'a AttributeGroup>,

    strict: bool,
}

/// Index entities by name, keeping the first of any duplicates
fn index_by_name<'a, T>(
    kind: &str,
    items: &[&'a T],
    name: impl Fn(&'a T) -> &'a str,
) -> HashMap<&'a str, u16> {
    let mut map = HashMap::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let key = name(*item);
        if map.contains_key(key) {
            tracing::warn!("Duplicate {} name '{}', keeping the first", kind, key);
            continue;
        }
        map.insert(key, i as u16);
    }
    map
}

impl<'a> Registry<'a> {
    /// Register the exported entities of `scene`
    ///
    /// With `strict == false`, unresolved references resolve to 0xFFFF.
    pub fn build(scene: &'a Scene, strict: bool) -> Result<Self, ExportError> {
        let meshes: Vec<&Mesh> = scene.meshes.iter().filter(|m| m.export).collect();
        let armatures: Vec<&Armature> = scene.armatures.iter().filter(|a| a.export).collect();
        let actions: Vec<&Action> = scene.actions.iter().filter(|a| a.export).collect();
        let materials: Vec<&Material> = scene.materials.iter().filter(|m| m.export).collect();
        let images: Vec<&Image> = scene.images.iter().collect();
        let scenes: Vec<&SceneNode> = scene.scenes.iter().filter(|s| s.export).collect();

        check_count(|| "meshes".into(), meshes.len(), MAX_ENTITIES)?;
        check_count(|| "armatures".into(), armatures.len(), MAX_ENTITIES)?;
        check_count(|| "actions".into(), actions.len(), MAX_ENTITIES)?;
        check_count(|| "materials".into(), materials.len(), MAX_ENTITIES)?;
        check_count(|| "images".into(), images.len(), MAX_ENTITIES)?;
        check_count(|| "scenes".into(), scenes.len(), MAX_ENTITIES)?;

        let mesh_index = index_by_name("mesh", &meshes, |m| m.name.as_str());
        let material_index = index_by_name("material", &materials, |m| m.name.as_str());
        let image_index = index_by_name("image", &images, |i| i.name.as_str());

        let textures = scene
            .textures
            .iter()
            .map(|t| (t.name.as_str(), t))
            .collect();
        let attribute_groups = scene
            .attribute_groups
            .iter()
            .map(|g| (g.name.as_str(), g))
            .collect();

        tracing::debug!(
            "Registered {} meshes, {} armatures, {} actions, {} materials, {} images, {} scenes",
            meshes.len(),
            armatures.len(),
            actions.len(),
            materials.len(),
            images.len(),
            scenes.len()
        );

        Ok(Self {
            meshes,
            armatures,
            actions,
            materials,
            images,
            scenes,
            mesh_index,
            material_index,
            image_index,
            textures,
            attribute_groups,
            strict,
        })
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn mesh_index(&self, name: &str) -> Option<u16> {
        self.mesh_index.get(name).copied()
    }

    pub fn material_index(&self, name: &str) -> Option<u16> {
        self.material_index.get(name).copied()
    }

    pub fn image_index(&self, name: &str) -> Option<u16> {
        self.image_index.get(name).copied()
    }

    pub fn texture(&self, name: &str) -> Option<&'a Texture> {
        self.textures.get(name).copied()
    }

    pub fn attribute_group(&self, name: &str) -> Option<&'a AttributeGroup> {
        self.attribute_groups.get(name).copied()
    }

    // ========================================================================
    // Name tables
    // ========================================================================

    pub fn mesh_names(&self) -> NameIndexMap {
        NameIndexMap::from_ordered_names(self.meshes.iter().map(|m| m.name.as_str()))
    }

    pub fn armature_names(&self) -> NameIndexMap {
        NameIndexMap::from_ordered_names(self.armatures.iter().map(|a| a.name.as_str()))
    }

    pub fn action_names(&self) -> NameIndexMap {
        NameIndexMap::from_ordered_names(self.actions.iter().map(|a| a.name.as_str()))
    }

    pub fn material_names(&self) -> NameIndexMap {
        NameIndexMap::from_ordered_names(self.materials.iter().map(|m| m.name.as_str()))
    }

    pub fn image_names(&self) -> NameIndexMap {
        NameIndexMap::from_ordered_names(self.images.iter().map(|i| i.name.as_str()))
    }

    pub fn scene_names(&self) -> NameIndexMap {
        NameIndexMap::from_ordered_names(self.scenes.iter().map(|s| s.name.as_str()))
    }

    // ========================================================================
    // Reference resolution
    // ========================================================================

    /// Fail in strict mode, otherwise log and fall back to 0xFFFF
    fn degrade(&self, err: ExportError) -> Result<u16, ExportError> {
        if self.strict {
            return Err(err);
        }
        tracing::warn!("{}; writing 0xFFFF", err);
        Ok(SENTINEL)
    }

    /// Storage index of an object's mesh
    pub fn resolve_mesh(&self, name: &str, referrer: &str) -> Result<u16, ExportError> {
        match self.mesh_index(name) {
            Some(index) => Ok(index),
            None => self.degrade(ExportError::unresolved("mesh", name, referrer)),
        }
    }

    /// Storage index of an optional material, 0xFFFF when absent
    pub fn resolve_material(&self, name: Option<&str>, referrer: &str) -> Result<u16, ExportError> {
        let Some(name) = name else {
            return Ok(SENTINEL);
        };
        match self.material_index(name) {
            Some(index) => Ok(index),
            None => self.degrade(ExportError::unresolved("material", name, referrer)),
        }
    }

    /// Image index behind a texture slot
    ///
    /// Non-image textures and image textures without an image yield 0xFFFF.
    pub fn resolve_texture_image(&self, texture: &str, referrer: &str) -> Result<u16, ExportError> {
        let Some(tex) = self.texture(texture) else {
            return self.degrade(ExportError::unresolved("texture", texture, referrer));
        };
        if tex.kind != TextureKind::Image {
            return Ok(SENTINEL);
        }
        let Some(image) = tex.image.as_deref() else {
            return Ok(SENTINEL);
        };
        match self.image_index(image) {
            Some(index) => Ok(index),
            None => self.degrade(ExportError::unresolved(
                "image",
                image,
                format!("texture '{}'", tex.name),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        Scene {
            meshes: vec![
                Mesh {
                    name: "Hidden".into(),
                    export: false,
                    vertices: vec![],
                    faces: vec![],
                    uv_layers: vec![],
                    color_layers: vec![],
                    materials: vec![],
                },
                Mesh {
                    name: "Cube".into(),
                    export: true,
                    vertices: vec![],
                    faces: vec![],
                    uv_layers: vec![],
                    color_layers: vec![],
                    materials: vec![],
                },
            ],
            textures: vec![
                Texture {
                    name: "Bricks".into(),
                    kind: TextureKind::Image,
                    image: Some("bricks.png".into()),
                },
                Texture {
                    name: "Noise".into(),
                    kind: TextureKind::Other,
                    image: None,
                },
                Texture {
                    name: "Dangling".into(),
                    kind: TextureKind::Image,
                    image: Some("gone.png".into()),
                },
            ],
            images: vec![
                Image {
                    name: "grass.png".into(),
                },
                Image {
                    name: "bricks.png".into(),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_only_exported_entities_are_indexed() {
        let scene = scene();
        let registry = Registry::build(&scene, true).unwrap();
        assert_eq!(registry.meshes.len(), 1);
        assert_eq!(registry.mesh_index("Cube"), Some(0));
        assert_eq!(registry.mesh_index("Hidden"), None);
        assert_eq!(registry.mesh_names().lookup("Cube"), Some(0));
    }

    #[test]
    fn test_texture_resolution() {
        let scene = scene();
        let registry = Registry::build(&scene, true).unwrap();
        assert_eq!(registry.resolve_texture_image("Bricks", "m").unwrap(), 1);
        assert_eq!(registry.resolve_texture_image("Noise", "m").unwrap(), SENTINEL);
        assert!(matches!(
            registry.resolve_texture_image("Dangling", "m"),
            Err(ExportError::UnresolvedReference { kind: "image", .. })
        ));
        assert!(matches!(
            registry.resolve_texture_image("Missing", "m"),
            Err(ExportError::UnresolvedReference { kind: "texture", .. })
        ));
    }

    #[test]
    fn test_lenient_resolution_degrades_to_sentinel() {
        let scene = scene();
        let registry = Registry::build(&scene, false).unwrap();
        assert!(!registry.is_strict());
        assert_eq!(registry.resolve_mesh("Hidden", "object 'A'").unwrap(), SENTINEL);
        assert_eq!(
            registry.resolve_material(Some("Nope"), "object 'A'").unwrap(),
            SENTINEL
        );
        assert_eq!(registry.resolve_material(None, "object 'A'").unwrap(), SENTINEL);
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let mut scene = scene();
        scene.images.push(Image {
            name: "grass.png".into(),
        });
        let registry = Registry::build(&scene, true).unwrap();
        assert_eq!(registry.images.len(), 3);
        assert_eq!(registry.image_index("grass.png"), Some(0));
    }
}
