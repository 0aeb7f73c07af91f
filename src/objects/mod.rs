//! Materialized object model.
//!
//! Loading a package materializes its rows into [`UObject`] values: a tagged variant
//! over the known class taxonomy plus a catch-all, with the capability set the rest
//! of the crate relies on (owning package handle, outer, class, archetype, flags,
//! full name). Object bodies are opaque payloads decoded and re-emitted through the
//! codec registry; this crate never interprets them.
//!
//! # Key Types
//! - [`UObject`] - One materialized object, shared as [`UObjectRc`]
//! - [`ObjectKind`] - The known class taxonomy, derived from class names
//! - [`ObjectBody`] - Opaque serialized payload
//! - [`NativeClass`] - A class synthesized by the engine with no table row

pub mod registry;

use std::{str::FromStr, sync::Arc};

use strum::{Display, EnumIter, EnumString};

use crate::upk::index::ObjectIndex;

/// A reference to a materialized object
pub type UObjectRc = Arc<UObject>;

/// A reference to a native class
pub type NativeClassRc = Arc<NativeClass>;

/// The known object-class taxonomy.
///
/// Derived from class names; anything outside the known set collapses into
/// [`ObjectKind::Other`]. The exporter keys its flag rewriting off this.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Display, EnumString, EnumIter)]
pub enum ObjectKind {
    /// A package object (top-level grouping)
    Package,
    /// A class object
    Class,
    /// A map world
    World,
    /// A streaming level inside a world
    Level,
    /// A material resource
    Material,
    /// A material instance resource
    #[strum(to_string = "MaterialInstance", serialize = "MaterialInstanceConstant")]
    MaterialInstance,
    /// A texture resource
    #[strum(to_string = "Texture", serialize = "Texture2D")]
    Texture,
    /// A skeletal mesh resource
    SkeletalMesh,
    /// A static mesh resource
    StaticMesh,
    /// Any class outside the known taxonomy
    Other,
}

impl ObjectKind {
    /// Classify a class name, collapsing unknown classes into [`ObjectKind::Other`]
    #[must_use]
    pub fn from_class_name(name: &str) -> Self {
        ObjectKind::from_str(name).unwrap_or(ObjectKind::Other)
    }

    /// Returns true for the shared-resource classes the exporter treats specially
    #[must_use]
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            ObjectKind::Material
                | ObjectKind::MaterialInstance
                | ObjectKind::Texture
                | ObjectKind::SkeletalMesh
                | ObjectKind::StaticMesh
        )
    }
}

/// Opaque serialized payload of a materialized object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectBody {
    /// No payload (zero-length body, or an import wrapper)
    Empty,
    /// Raw body bytes as decoded by a codec
    Raw(Vec<u8>),
}

impl ObjectBody {
    /// Length of the payload in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ObjectBody::Empty => 0,
            ObjectBody::Raw(data) => data.len(),
        }
    }

    /// Returns true if the payload is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View the raw payload, if any
    #[must_use]
    pub fn as_raw(&self) -> Option<&[u8]> {
        match self {
            ObjectBody::Empty => None,
            ObjectBody::Raw(data) => Some(data),
        }
    }
}

/// One materialized object.
///
/// Objects hold a back-reference to their owning package by name; the name is a
/// lookup handle through the package cache, never an ownership edge, so object
/// graphs with references in either direction cannot leak through reference
/// counting cycles.
#[derive(Clone, Debug)]
pub struct UObject {
    /// Name of the owning package (cache lookup handle)
    pub package: Arc<str>,
    /// The row this object was materialized from, within the owning package
    pub index: ObjectIndex,
    /// Bare object name
    pub name: String,
    /// Dot-joined name path from the outermost object down to this one
    pub full_name: String,
    /// Name of the object's class
    pub class_name: String,
    /// Classified kind of [`UObject::class_name`]
    pub kind: ObjectKind,
    /// Enclosing object within the owning package
    pub outer: ObjectIndex,
    /// Object supplying default property values
    pub archetype: ObjectIndex,
    /// Object flags word, carried verbatim
    pub flags: u64,
    /// Serialized payload
    pub body: ObjectBody,
}

impl UObject {
    /// Returns true if this object is owned by the named package
    #[must_use]
    pub fn is_in_package(&self, package: &str) -> bool {
        self.package.as_ref() == package
    }
}

/// A class synthesized by the engine, with no import or export row anywhere.
///
/// Native classes are resolvable only by name through the owning package's
/// class registry; the dependency graph tracks them as handles that are never
/// materialized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeClass {
    /// Class name
    pub name: String,
    /// Name of the package that synthesizes the class
    pub package: String,
}

impl NativeClass {
    /// Create a native class owned by `package`
    #[must_use]
    pub fn new(name: &str, package: &str) -> Self {
        NativeClass {
            name: name.to_string(),
            package: package.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn kind_from_class_name() {
        assert_eq!(ObjectKind::from_class_name("Package"), ObjectKind::Package);
        assert_eq!(ObjectKind::from_class_name("World"), ObjectKind::World);
        assert_eq!(
            ObjectKind::from_class_name("MaterialInstanceConstant"),
            ObjectKind::MaterialInstance
        );
        assert_eq!(
            ObjectKind::from_class_name("Texture2D"),
            ObjectKind::Texture
        );
        assert_eq!(
            ObjectKind::from_class_name("FracturedStaticMesh"),
            ObjectKind::Other
        );
    }

    #[test]
    fn resource_classes() {
        let resources: Vec<_> = ObjectKind::iter().filter(ObjectKind::is_resource).collect();
        assert_eq!(
            resources,
            vec![
                ObjectKind::Material,
                ObjectKind::MaterialInstance,
                ObjectKind::Texture,
                ObjectKind::SkeletalMesh,
                ObjectKind::StaticMesh,
            ]
        );
        assert!(!ObjectKind::Package.is_resource());
        assert!(!ObjectKind::Other.is_resource());
    }

    #[test]
    fn kind_display() {
        assert_eq!(ObjectKind::MaterialInstance.to_string(), "MaterialInstance");
        assert_eq!(ObjectKind::StaticMesh.to_string(), "StaticMesh");
    }

    #[test]
    fn body_accessors() {
        assert!(ObjectBody::Empty.is_empty());
        assert_eq!(ObjectBody::Empty.as_raw(), None);

        let body = ObjectBody::Raw(vec![1, 2, 3]);
        assert_eq!(body.len(), 3);
        assert_eq!(body.as_raw(), Some(&[1u8, 2, 3][..]));
    }
}
