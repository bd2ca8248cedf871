//! Collected objects, grouped by kind

use std::collections::BTreeMap;

use kmf_core::{HelmReleaseIndex, Kind};
use kube::api::DynamicObject;

/// Everything collected from the source cluster for one run
#[derive(Debug, Clone, Default)]
pub struct ResourceInventory {
    objects: BTreeMap<Kind, Vec<DynamicObject>>,
    pub charts: HelmReleaseIndex,
}

impl ResourceInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: Kind, obj: DynamicObject) {
        self.objects.entry(kind).or_default().push(obj);
    }

    pub fn extend(&mut self, kind: Kind, objs: impl IntoIterator<Item = DynamicObject>) {
        self.objects.entry(kind).or_default().extend(objs);
    }

    /// Objects of one kind, in collection order
    pub fn objects(&self, kind: Kind) -> &[DynamicObject] {
        self.objects.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn objects_mut(&mut self, kind: Kind) -> impl Iterator<Item = &mut DynamicObject> {
        self.objects.get_mut(&kind).into_iter().flatten()
    }

    /// Objects of a namespaced kind that belong to `namespace`
    pub fn objects_in<'a>(
        &'a self,
        kind: Kind,
        namespace: &'a str,
    ) -> impl Iterator<Item = &'a DynamicObject> {
        self.objects(kind)
            .iter()
            .filter(move |obj| obj.metadata.namespace.as_deref() == Some(namespace))
    }

    /// Names of the collected namespaces, in collection order
    pub fn namespaces(&self) -> Vec<String> {
        self.objects(Kind::Namespace)
            .iter()
            .filter_map(|ns| ns.metadata.name.clone())
            .collect()
    }

    /// Collected object count per kind, in inventory order
    pub fn counts(&self) -> Vec<(Kind, usize)> {
        Kind::ALL
            .into_iter()
            .filter_map(|kind| self.objects.get(&kind).map(|objs| (kind, objs.len())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.objects.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
