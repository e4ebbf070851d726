//! Interns `/rack/host` paths into stable node handles. Only two levels are
//! modelled: every host hangs off a rack, racks hang off nothing.
use std::collections::HashMap;

/// Rack assigned to hosts that come without topology information.
pub const DEFAULT_RACK: &str = "/default-rack";
const PATH_SEPARATOR: char = '/';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(usize);

#[derive(Debug)]
struct Node {
    /// Canonical full path, e.g. `/rack1/host1:50010`.
    path: String,
    /// Last path component, e.g. `host1:50010`.
    name: String,
    /// The host's rack; a rack points at itself.
    rack: NodeHandle,
}

#[derive(Debug, Default)]
pub struct TopologyRegistry {
    nodes: Vec<Node>,
    by_path: HashMap<String, NodeHandle>,
}

impl TopologyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the host node for `path`, creating it and its rack on first use.
    /// The same canonical path always yields the same handle.
    pub fn resolve(&mut self, path: &str) -> NodeHandle {
        let canonical = canonicalize(path);
        if let Some(handle) = self.by_path.get(&canonical) {
            return *handle;
        }
        let rack = self.intern(split_location(&canonical).0.to_string(), None);
        self.intern(canonical, Some(rack))
    }

    fn intern(&mut self, path: String, rack: Option<NodeHandle>) -> NodeHandle {
        if let Some(handle) = self.by_path.get(&path) {
            return *handle;
        }
        let handle = NodeHandle(self.nodes.len());
        let name = split_location(&path).1.to_string();
        self.by_path.insert(path.clone(), handle);
        self.nodes.push(Node {
            path,
            name,
            rack: rack.unwrap_or(handle),
        });
        handle
    }

    /// The rack of a host. Racks have no parent.
    pub fn parent_of(&self, handle: NodeHandle) -> Option<NodeHandle> {
        let rack = self.nodes[handle.0].rack;
        (rack != handle).then_some(rack)
    }

    /// The rack of a host, or the node itself when it is a rack.
    pub fn rack_of(&self, handle: NodeHandle) -> NodeHandle {
        self.nodes[handle.0].rack
    }

    pub fn name(&self, handle: NodeHandle) -> &str {
        &self.nodes[handle.0].name
    }

    pub fn path(&self, handle: NodeHandle) -> &str {
        &self.nodes[handle.0].path
    }

    /// Looks up an already interned rack or host path.
    pub fn get(&self, path: &str) -> Option<NodeHandle> {
        self.by_path.get(&normalize(path)).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches(PATH_SEPARATOR);
    if trimmed.starts_with(PATH_SEPARATOR) {
        trimmed.to_string()
    } else {
        format!("{}{}", PATH_SEPARATOR, trimmed)
    }
}

/// Leading separator ensured, trailing ones dropped, a bare host name placed
/// under the default rack.
pub fn canonicalize(path: &str) -> String {
    let rooted = normalize(path);
    match rooted.rfind(PATH_SEPARATOR) {
        Some(0) => format!("{}{}", DEFAULT_RACK, rooted),
        _ => rooted,
    }
}

fn split_location(path: &str) -> (&str, &str) {
    match path.rfind(PATH_SEPARATOR) {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    }
}

/// Host name with any trailing `:port` removed.
pub fn strip_port(name: &str) -> &str {
    name.split(':').next().unwrap_or(name)
}

/// Topology paths for a block that carries none: each host under the default rack.
pub fn fake_racks(hosts: &[String]) -> Vec<String> {
    hosts
        .iter()
        .map(|host| format!("{}{}{}", DEFAULT_RACK, PATH_SEPARATOR, host))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_canonical() {
        let mut registry = TopologyRegistry::new();
        let a = registry.resolve("/rack1/host1");
        let b = registry.resolve("rack1/host1/");
        assert_eq!(a, b);
        assert_eq!(registry.name(a), "host1");
        assert_eq!(registry.path(a), "/rack1/host1");

        let rack = registry.parent_of(a).unwrap();
        assert_eq!(registry.path(rack), "/rack1");
        assert_eq!(registry.parent_of(rack), None);
        assert_eq!(registry.rack_of(a), rack);
        assert_eq!(registry.rack_of(rack), rack);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_hosts_share_rack_node() {
        let mut registry = TopologyRegistry::new();
        let h1 = registry.resolve("/r1/h1");
        let h2 = registry.resolve("/r1/h2");
        let h3 = registry.resolve("/r2/h3");
        assert_eq!(registry.parent_of(h1), registry.parent_of(h2));
        assert_ne!(registry.parent_of(h1), registry.parent_of(h3));
        assert_eq!(registry.get("/r1"), registry.parent_of(h1));
    }

    #[test]
    fn test_bare_host_goes_to_default_rack() {
        let mut registry = TopologyRegistry::new();
        let host = registry.resolve("lonely:9866");
        let rack = registry.parent_of(host).unwrap();
        assert_eq!(registry.path(rack), DEFAULT_RACK);
        assert_eq!(strip_port(registry.name(host)), "lonely");
        assert_eq!(
            fake_racks(&["h1".to_string(), "h2".to_string()]),
            vec!["/default-rack/h1", "/default-rack/h2"]
        );
    }
}
