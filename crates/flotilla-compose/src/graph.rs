//! Service dependency graph using `petgraph`.
//!
//! Edges point from a dependency to its dependent so that a topological
//! walk yields dependencies first. Lifecycle operations that tear things
//! down walk the levels in reverse.

use std::collections::HashMap;

use flotilla_common::error::{FlotillaError, Result};
use petgraph::Direction;
use petgraph::graph::NodeIndex;

/// A dependency graph of services.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: petgraph::Graph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
            nodes: HashMap::new(),
        }
    }

    /// Adds a service node, returning the existing node if already present.
    pub fn add_service(&mut self, name: impl Into<String>) -> NodeIndex {
        let name = name.into();
        if let Some(&idx) = self.nodes.get(&name) {
            return idx;
        }
        let idx = self.graph.add_node(name.clone());
        let _ = self.nodes.insert(name, idx);
        idx
    }

    /// Records that `dependent` depends on `dependency`.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.add_edge(dependency, dependent, ());
    }

    /// Returns a topological ordering with dependencies first.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph contains cycles.
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        Ok(self
            .sorted()?
            .into_iter()
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect())
    }

    /// Groups services into levels: level 0 has no dependencies, level `n`
    /// depends on nothing beyond level `n - 1`. Services within a level are
    /// independent of each other and sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph contains cycles.
    pub fn levels(&self) -> Result<Vec<Vec<String>>> {
        let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
        let mut levels: Vec<Vec<String>> = Vec::new();
        for idx in self.sorted()? {
            let level = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .filter_map(|dep| depth.get(&dep))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            let _ = depth.insert(idx, level);
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            if let Some(name) = self.graph.node_weight(idx) {
                levels[level].push(name.clone());
            }
        }
        for level in &mut levels {
            level.sort();
        }
        Ok(levels)
    }

    fn sorted(&self) -> Result<Vec<NodeIndex>> {
        petgraph::algo::toposort(&self.graph, None).map_err(|cycle| FlotillaError::Config {
            message: format!(
                "cyclic dependency detected in service graph at {}",
                self.graph
                    .node_weight(cycle.node_id())
                    .map_or("<unknown>", String::as_str)
            ),
        })
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop() -> DependencyGraph {
        // proxy -> {web, worker} -> db
        let mut g = DependencyGraph::default();
        let [proxy, web, worker, db] = ["proxy", "web", "worker", "db"].map(|s| g.add_service(s));
        g.add_dependency(proxy, web);
        g.add_dependency(proxy, worker);
        g.add_dependency(web, db);
        g.add_dependency(worker, db);
        g
    }

    #[test]
    fn no_services_no_levels() {
        let g = DependencyGraph::default();
        assert_eq!(g.resolve_order().expect("order"), Vec::<String>::new());
        assert_eq!(g.levels().expect("levels"), Vec::<Vec<String>>::new());
    }

    #[test]
    fn repeated_service_is_one_node() {
        let mut g = DependencyGraph::default();
        assert_eq!(g.add_service("web"), g.add_service("web"));
        assert_eq!(g.resolve_order().expect("order"), ["web"]);
    }

    #[test]
    fn order_puts_dependencies_first() {
        let order = shop().resolve_order().expect("order");
        let at = |name: &str| order.iter().position(|n| n == name).expect(name);
        assert!(at("db") < at("web"));
        assert!(at("db") < at("worker"));
        assert!(at("web") < at("proxy"));
    }

    #[test]
    fn levels_group_independent_services() {
        assert_eq!(
            shop().levels().expect("levels"),
            vec![vec!["db"], vec!["web", "worker"], vec!["proxy"]]
        );
    }

    #[test]
    fn level_is_the_longest_path_to_a_root() {
        let mut g = DependencyGraph::default();
        let [web, cache, db] = ["web", "cache", "db"].map(|s| g.add_service(s));
        g.add_dependency(web, cache);
        g.add_dependency(cache, db);
        g.add_dependency(web, db);

        assert_eq!(
            g.levels().expect("levels"),
            vec![vec!["db"], vec!["cache"], vec!["web"]]
        );
    }

    #[test]
    fn mutual_dependency_is_a_config_error() {
        let mut g = DependencyGraph::default();
        let [web, cache] = ["web", "cache"].map(|s| g.add_service(s));
        g.add_dependency(web, cache);
        g.add_dependency(cache, web);

        let err = g.levels().unwrap_err();
        assert!(matches!(err, FlotillaError::Config { .. }));
        assert!(g.resolve_order().is_err());
    }
}
