//! Runtime config generator: small mutation helpers over an OCI `Spec`.

use crate::config::types::{IdMapping, Result};
use crate::kernel::namespace::NamespaceKind;
use oci_spec::runtime::{
    LinuxIdMapping, LinuxIdMappingBuilder, LinuxNamespace, LinuxNamespaceBuilder, RootBuilder,
    Spec,
};
use std::path::{Path, PathBuf};

/// Builds the runtime config handed to the runtime under test
#[derive(Debug, Clone)]
pub struct SpecGenerator {
    spec: Spec,
}

impl Default for SpecGenerator {
    fn default() -> Self {
        Self::from_spec(Spec::default())
    }
}

impl SpecGenerator {
    pub fn from_spec(spec: Spec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    pub fn into_spec(self) -> Spec {
        self.spec
    }

    /// Namespaces currently requested by the config
    pub fn namespaces(&self) -> Vec<LinuxNamespace> {
        self.spec
            .linux()
            .as_ref()
            .and_then(|linux| linux.namespaces().clone())
            .unwrap_or_default()
    }

    /// Request `kind`, joining the namespace at `path` when given.
    /// An existing entry of the same kind is replaced in place.
    pub fn add_or_replace_namespace(&mut self, kind: NamespaceKind, path: Option<&Path>) -> Result<()> {
        let mut builder = LinuxNamespaceBuilder::default();
        builder = builder.typ(kind.oci_type());
        if let Some(path) = path {
            builder = builder.path(path.to_path_buf());
        }
        let entry = builder.build()?;

        let mut linux = self.spec.linux().clone().unwrap_or_default();
        let mut namespaces = linux.namespaces().clone().unwrap_or_default();
        match namespaces.iter_mut().find(|ns| ns.typ() == kind.oci_type()) {
            Some(existing) => *existing = entry,
            None => namespaces.push(entry),
        }
        linux.set_namespaces(Some(namespaces));
        self.spec.set_linux(Some(linux));
        Ok(())
    }

    pub fn add_uid_mapping(&mut self, mapping: IdMapping) -> Result<()> {
        let entry = build_mapping(mapping)?;
        let mut linux = self.spec.linux().clone().unwrap_or_default();
        let mut mappings = linux.uid_mappings().clone().unwrap_or_default();
        mappings.push(entry);
        linux.set_uid_mappings(Some(mappings));
        self.spec.set_linux(Some(linux));
        Ok(())
    }

    pub fn add_gid_mapping(&mut self, mapping: IdMapping) -> Result<()> {
        let entry = build_mapping(mapping)?;
        let mut linux = self.spec.linux().clone().unwrap_or_default();
        let mut mappings = linux.gid_mappings().clone().unwrap_or_default();
        mappings.push(entry);
        linux.set_gid_mappings(Some(mappings));
        self.spec.set_linux(Some(linux));
        Ok(())
    }

    /// Drop every mount whose destination is `destination`
    pub fn remove_mount(&mut self, destination: &Path) {
        if let Some(mounts) = self.spec.mounts().clone() {
            let kept = mounts
                .into_iter()
                .filter(|m| m.destination().as_path() != destination)
                .collect();
            self.spec.set_mounts(Some(kept));
        }
    }

    pub fn set_root_path(&mut self, path: PathBuf) -> Result<()> {
        let readonly = self
            .spec
            .root()
            .as_ref()
            .and_then(|root| root.readonly())
            .unwrap_or(true);
        let root = RootBuilder::default().path(path).readonly(readonly).build()?;
        self.spec.set_root(Some(root));
        Ok(())
    }
}

fn build_mapping(mapping: IdMapping) -> Result<LinuxIdMapping> {
    Ok(LinuxIdMappingBuilder::default()
        .host_id(mapping.host_id)
        .container_id(mapping.container_id)
        .size(mapping.size)
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oci_spec::runtime::LinuxNamespaceType;

    #[test]
    fn replaces_existing_namespace_with_path() {
        let mut generator = SpecGenerator::default();
        let before = generator.namespaces().len();
        let path = PathBuf::from("/proc/1234/ns/net");

        generator
            .add_or_replace_namespace(NamespaceKind::Network, Some(&path))
            .unwrap();

        let namespaces = generator.namespaces();
        let network: Vec<_> = namespaces
            .iter()
            .filter(|ns| ns.typ() == LinuxNamespaceType::Network)
            .collect();
        assert_eq!(network.len(), 1);
        assert_eq!(network[0].path().as_ref(), Some(&path));
        assert!(namespaces.len() == before || namespaces.len() == before + 1);
    }

    #[test]
    fn adds_missing_namespace() {
        let mut generator = SpecGenerator::default();
        generator
            .add_or_replace_namespace(NamespaceKind::User, Some(Path::new("/proc/9/ns/user")))
            .unwrap();
        assert!(generator
            .namespaces()
            .iter()
            .any(|ns| ns.typ() == LinuxNamespaceType::User));
    }

    #[test]
    fn adds_id_mappings() {
        let mut generator = SpecGenerator::default();
        generator.add_uid_mapping(IdMapping::default()).unwrap();
        generator.add_gid_mapping(IdMapping::default()).unwrap();

        let linux = generator.spec().linux().clone().unwrap();
        let uid = linux.uid_mappings().clone().unwrap();
        let gid = linux.gid_mappings().clone().unwrap();
        assert_eq!(uid.len(), 1);
        assert_eq!(uid[0].host_id(), 1000);
        assert_eq!(uid[0].container_id(), 0);
        assert_eq!(gid[0].size(), 1000);
    }

    #[test]
    fn removes_dev_pts_mount() {
        let mut generator = SpecGenerator::default();
        let has_pts = |g: &SpecGenerator| {
            g.spec()
                .mounts()
                .iter()
                .flatten()
                .any(|m| m.destination() == Path::new("/dev/pts"))
        };
        assert!(has_pts(&generator));

        generator.remove_mount(Path::new("/dev/pts"));
        assert!(!has_pts(&generator));
    }
}
