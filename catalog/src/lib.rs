/*!
# Background

This library models a host configuration as data: a directed acyclic graph
of typed resources (packages, files, downloads, services, users) with
explicit edge semantics.  A `Require` edge only orders two resources; a
`Notify` edge also marks the downstream resource for a refresh when the
upstream one changed during an apply, which is how "restart the service when
its config file changed" is expressed.

The graph is deterministic end to end: resources are stored in key order and
the execution order is a topological sort with ties broken by resource id,
so the same catalog always applies in the same order.
*/

pub mod error;
pub mod resource;

pub use error::Error;
pub use resource::{
    Download, File, FileState, Kind, Package, PackageState, Resource, ResourceId, Service,
    ServiceState, User,
};

use log::trace;
use serde::Serialize;
use snafu::ensure;
use std::collections::{BTreeMap, BTreeSet};

type Result<T> = std::result::Result<T, error::Error>;

/// How two resources relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// The upstream resource is applied first.
    Require,
    /// Ordering, plus: if the upstream resource changed during apply, the
    /// downstream resource is refreshed afterward.
    Notify,
}

/// A directed edge; `before` is applied before `after`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub before: ResourceId,
    pub after: ResourceId,
    pub kind: EdgeKind,
}

/// The compiled resource graph for one host.
#[derive(Debug, Default)]
pub struct Catalog {
    resources: BTreeMap<ResourceId, Resource>,
    edges: Vec<Edge>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource; each id may only appear once.
    pub fn add(&mut self, resource: Resource) -> Result<()> {
        let id = resource.id();
        ensure!(
            !self.resources.contains_key(&id),
            error::DuplicateResourceSnafu { id }
        );
        trace!("Adding resource '{}'", resource.id());
        self.resources.insert(resource.id(), resource);
        Ok(())
    }

    /// Add an edge between two resources already in the catalog.
    pub fn add_edge(&mut self, before: &ResourceId, after: &ResourceId, kind: EdgeKind) -> Result<()> {
        ensure!(before != after, error::SelfEdgeSnafu { id: before.clone() });
        for id in [before, after].iter() {
            ensure!(
                self.resources.contains_key(*id),
                error::UnknownResourceSnafu { id: (*id).clone() }
            );
        }
        trace!("Adding {:?} edge '{}' -> '{}'", kind, before, after);
        self.edges.push(Edge {
            before: before.clone(),
            after: after.clone(),
            kind,
        });
        Ok(())
    }

    /// Shorthand for a `Require` edge.
    pub fn require(&mut self, before: &ResourceId, after: &ResourceId) -> Result<()> {
        self.add_edge(before, after, EdgeKind::Require)
    }

    /// Shorthand for a `Notify` edge.
    pub fn notify(&mut self, before: &ResourceId, after: &ResourceId) -> Result<()> {
        self.add_edge(before, after, EdgeKind::Notify)
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// The resources refreshed when `before` changes.
    pub fn notified_by(&self, before: &ResourceId) -> Vec<&ResourceId> {
        self.edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Notify && &e.before == before)
            .map(|e| &e.after)
            .collect()
    }

    /// The resources whose changes refresh `after`.
    pub fn notifiers_of(&self, after: &ResourceId) -> Vec<&ResourceId> {
        self.edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Notify && &e.after == after)
            .map(|e| &e.before)
            .collect()
    }

    /// A topological ordering of the resources, honoring every edge.
    ///
    /// Ties are broken by id ordering so the result is stable for a given
    /// catalog.  Fails if the edges form a cycle, naming the resources that
    /// couldn't be ordered.
    pub fn execution_order(&self) -> Result<Vec<ResourceId>> {
        let mut indegree: BTreeMap<&ResourceId, usize> =
            self.resources.keys().map(|id| (id, 0)).collect();
        let mut downstream: BTreeMap<&ResourceId, Vec<&ResourceId>> = BTreeMap::new();
        for edge in &self.edges {
            downstream.entry(&edge.before).or_default().push(&edge.after);
            // add_edge checked the endpoints, so the entry exists
            *indegree.get_mut(&edge.after).unwrap() += 1;
        }

        let mut ready: BTreeSet<&ResourceId> = indegree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut order = Vec::with_capacity(self.resources.len());
        while let Some(id) = ready.iter().next().cloned() {
            ready.remove(id);
            order.push(id.clone());
            for next in downstream.get(id).into_iter().flatten() {
                let degree = indegree.get_mut(next).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(*next);
                }
            }
        }

        ensure!(
            order.len() == self.resources.len(),
            error::DependencyCycleSnafu {
                ids: indegree
                    .iter()
                    .filter(|(_, degree)| **degree > 0)
                    .map(|(id, _)| id.to_string())
                    .collect::<Vec<_>>(),
            }
        );
        Ok(order)
    }
}

#[cfg(test)]
mod test {
    use super::resource::{File, FileState, Resource, ResourceId, Service, ServiceState};
    use super::{Catalog, EdgeKind, Error, Kind};

    fn file(path: &str) -> Resource {
        Resource::File(File {
            path: path.into(),
            state: FileState::Present,
            content: Some("x".to_string()),
            owner: None,
            group: None,
            mode: None,
        })
    }

    fn service(name: &str) -> Resource {
        Resource::Service(Service {
            name: name.to_string(),
            state: ServiceState::Running,
            enabled: true,
            start_commands: vec![],
            stop_commands: vec![],
            restart_commands: vec![],
        })
    }

    #[test]
    fn duplicate_resource_rejected() {
        let mut catalog = Catalog::new();
        catalog.add(file("/etc/app.config")).unwrap();
        let err = catalog.add(file("/etc/app.config")).unwrap_err();
        assert!(matches!(err, Error::DuplicateResource { .. }));
    }

    #[test]
    fn edges_need_known_endpoints() {
        let mut catalog = Catalog::new();
        catalog.add(service("riak-cs")).unwrap();
        let missing = ResourceId::new(Kind::File, "/nope");
        let err = catalog
            .add_edge(&missing, &service("riak-cs").id(), EdgeKind::Require)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownResource { .. }));
    }

    #[test]
    fn order_respects_edges() {
        let mut catalog = Catalog::new();
        catalog.add(service("riak-cs")).unwrap();
        catalog.add(file("/etc/riak-cs/vm.args")).unwrap();
        catalog.add(file("/etc/riak-cs/app.config")).unwrap();
        let svc = service("riak-cs").id();
        catalog.notify(&file("/etc/riak-cs/vm.args").id(), &svc).unwrap();
        catalog.notify(&file("/etc/riak-cs/app.config").id(), &svc).unwrap();

        let order = catalog.execution_order().unwrap();
        let position = |id: &ResourceId| order.iter().position(|o| o == id).unwrap();
        assert!(position(&file("/etc/riak-cs/vm.args").id()) < position(&svc));
        assert!(position(&file("/etc/riak-cs/app.config").id()) < position(&svc));
    }

    #[test]
    fn order_is_deterministic() {
        let build = || {
            let mut catalog = Catalog::new();
            catalog.add(file("/b")).unwrap();
            catalog.add(file("/a")).unwrap();
            catalog.add(file("/c")).unwrap();
            catalog
        };
        // No edges at all; ties are broken by id.
        assert_eq!(
            build().execution_order().unwrap(),
            build().execution_order().unwrap()
        );
        assert_eq!(
            build().execution_order().unwrap(),
            vec![file("/a").id(), file("/b").id(), file("/c").id()]
        );
    }

    #[test]
    fn cycle_is_an_error() {
        let mut catalog = Catalog::new();
        catalog.add(file("/a")).unwrap();
        catalog.add(file("/b")).unwrap();
        catalog.require(&file("/a").id(), &file("/b").id()).unwrap();
        catalog.require(&file("/b").id(), &file("/a").id()).unwrap();

        match catalog.execution_order().unwrap_err() {
            Error::DependencyCycle { ids } => {
                assert_eq!(ids, vec!["file//a".to_string(), "file//b".to_string()]);
            }
            other => panic!("expected cycle error, got {}", other),
        }
    }

    #[test]
    fn notify_queries() {
        let mut catalog = Catalog::new();
        catalog.add(service("riak-cs")).unwrap();
        catalog.add(file("/etc/riak-cs/vm.args")).unwrap();
        let svc = service("riak-cs").id();
        let args = file("/etc/riak-cs/vm.args").id();
        catalog.notify(&args, &svc).unwrap();

        assert_eq!(catalog.notified_by(&args), vec![&svc]);
        assert_eq!(catalog.notifiers_of(&svc), vec![&args]);
        assert!(catalog.notified_by(&svc).is_empty());
    }

    #[test]
    fn self_edge_rejected() {
        let mut catalog = Catalog::new();
        catalog.add(service("riak-cs")).unwrap();
        let svc = service("riak-cs").id();
        let err = catalog.add_edge(&svc, &svc, EdgeKind::Notify).unwrap_err();
        assert!(matches!(err, Error::SelfEdge { .. }));
    }
}
