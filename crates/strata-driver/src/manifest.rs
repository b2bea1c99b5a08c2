//! The JSON project manifest.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use strata_resolver::{id::Name, session::ModuleKind, syntax::DeclarationKind};

use crate::{
    config::DriverConfig,
    error::{DriverError, DriverResult},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub config: DriverConfig,
    #[serde(default)]
    pub modules: Vec<ModuleManifest>,
}

impl Manifest {
    pub fn from_json(text: &str) -> DriverResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Utf8Path) -> DriverResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| DriverError::Io {
            path: path.to_owned(),
            source,
        })?;

        Self::from_json(&text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub name: Name,
    #[serde(default)]
    pub kind: ModuleKind,
    /// Names of the modules this one sees.
    #[serde(default)]
    pub dependencies: Vec<Name>,
    #[serde(default)]
    pub files: Vec<FileManifest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileManifest {
    pub path: Utf8PathBuf,
    /// Dotted package name, empty for the root package.
    #[serde(default)]
    pub package: Name,
    /// Dotted names of imported packages.
    #[serde(default)]
    pub imports: Vec<Name>,
    #[serde(default)]
    pub declarations: Vec<DeclarationManifest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclarationManifest {
    Class {
        name: Name,
        #[serde(default)]
        supertypes: Vec<Name>,
        #[serde(default)]
        members: Vec<DeclarationManifest>,
    },
    Function {
        name: Name,
        #[serde(default)]
        params: Vec<Name>,
        #[serde(default)]
        returns: Option<Name>,
        #[serde(default)]
        calls: Vec<Name>,
    },
    Property {
        name: Name,
        #[serde(rename = "type", default)]
        ty: Option<Name>,
        #[serde(default)]
        calls: Vec<Name>,
    },
    TypeAlias {
        name: Name,
        target: Name,
    },
}

impl DeclarationManifest {
    pub fn name(&self) -> &Name {
        match self {
            Self::Class { name, .. }
            | Self::Function { name, .. }
            | Self::Property { name, .. }
            | Self::TypeAlias { name, .. } => name,
        }
    }

    pub fn kind(&self) -> DeclarationKind {
        match self {
            Self::Class { .. } => DeclarationKind::Class,
            Self::Function { .. } => DeclarationKind::Function,
            Self::Property { .. } => DeclarationKind::Property,
            Self::TypeAlias { .. } => DeclarationKind::TypeAlias,
        }
    }
}

/// Splits a dotted package name into its segments.
pub fn package_segments(package: &str) -> Vec<Name> {
    package
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(Name::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_declarations() {
        let manifest = Manifest::from_json(
            r#"{
                "modules": [{
                    "name": "core",
                    "kind": "library",
                    "files": [{
                        "path": "shapes.st",
                        "package": "geo.shapes",
                        "declarations": [
                            { "kind": "class", "name": "Shape", "members": [
                                { "kind": "property", "name": "area", "type": "Int" }
                            ]},
                            { "kind": "type_alias", "name": "Area", "target": "Int" }
                        ]
                    }]
                }]
            }"#,
        )
        .unwrap();

        let module = &manifest.modules[0];
        assert_eq!(module.kind, ModuleKind::Library);
        assert_eq!(manifest.config, DriverConfig::default());

        let file = &module.files[0];
        assert_eq!(
            package_segments(&file.package),
            [Name::from("geo"), Name::from("shapes")]
        );
        assert_eq!(file.declarations[1].kind(), DeclarationKind::TypeAlias);

        let DeclarationManifest::Class { members, .. } = &file.declarations[0] else {
            panic!("expected a class");
        };
        assert_eq!(
            members[0],
            DeclarationManifest::Property {
                name: "area".into(),
                ty: Some("Int".into()),
                calls: Vec::new(),
            }
        );
    }

    #[test]
    fn rejects_unknown_declaration_kinds() {
        let result = Manifest::from_json(
            r#"{ "modules": [{ "name": "m", "files": [{ "path": "a", "declarations": [
                { "kind": "macro", "name": "m" }
            ]}]}]}"#,
        );

        assert!(matches!(result, Err(DriverError::Manifest(_))));
    }

    #[test]
    fn empty_package_has_no_segments() {
        assert!(package_segments("").is_empty());
    }
}
