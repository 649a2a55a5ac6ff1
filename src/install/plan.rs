//! Install ordering
//!
//! The dependency forest is collapsed into a graph with one node per key and
//! an edge from every parent to each of its children. A post-order walk from
//! the roots puts every dependency after everything it depends on; handlers
//! that ask to be deferred are then moved behind all the others, keeping
//! their relative order.

use crate::error::DeployResult;
use crate::handler::HandlerRegistry;
use crate::models::Dependency;
use petgraph::graph::NodeIndex;
use petgraph::visit::DfsPostOrder;
use petgraph::{Directed, Graph};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct InstallPlan {
    non_deferred: Vec<Dependency>,
    deferred: Vec<Dependency>,
}

impl InstallPlan {
    pub fn from_forest(reg: &HandlerRegistry, roots: &[Dependency]) -> DeployResult<Self> {
        let mut graph = Graph::<String, (), Directed>::new();
        let mut node_map: HashMap<String, NodeIndex> = HashMap::new();
        let mut nodes: HashMap<String, Dependency> = HashMap::new();

        let mut root_nodes = Vec::with_capacity(roots.len());
        for root in roots {
            root_nodes.push(add_subtree(&mut graph, &mut node_map, &mut nodes, root));
        }

        let mut plan = InstallPlan::default();
        let mut dfs = DfsPostOrder::empty(&graph);
        for root in root_nodes {
            dfs.move_to(root);
            while let Some(index) = dfs.next(&graph) {
                let Some(dep) = nodes.remove(&graph[index]) else {
                    continue;
                };
                if reg.handler(dep.object_type)?.should_defer_installation() {
                    plan.deferred.push(dep);
                } else {
                    plan.non_deferred.push(dep);
                }
            }
        }
        debug!(
            "Install plan: {} dependencies, {} deferred",
            plan.len(),
            plan.deferred.len()
        );
        Ok(plan)
    }

    pub fn non_deferred(&self) -> &[Dependency] {
        &self.non_deferred
    }

    pub fn deferred(&self) -> &[Dependency] {
        &self.deferred
    }

    /// Every dependency in install order
    pub fn ordered(&self) -> impl Iterator<Item = &Dependency> {
        self.non_deferred.iter().chain(self.deferred.iter())
    }

    pub fn len(&self) -> usize {
        self.non_deferred.len() + self.deferred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Add a dependency and its subtree; the expanded occurrence of a key wins
/// over associations, and plan nodes carry no children
fn add_subtree(
    graph: &mut Graph<String, (), Directed>,
    node_map: &mut HashMap<String, NodeIndex>,
    nodes: &mut HashMap<String, Dependency>,
    dep: &Dependency,
) -> NodeIndex {
    let key = dep.key();
    let index = *node_map
        .entry(key.clone())
        .or_insert_with(|| graph.add_node(key.clone()));

    let replace = match nodes.get(&key) {
        None => true,
        Some(existing) => existing.is_association && !dep.is_association,
    };
    if replace {
        let mut flat = dep.clone();
        flat.children = None;
        nodes.insert(key, flat);
    }

    for child in dep.children() {
        let child_index = add_subtree(graph, node_map, nodes, child);
        if graph.find_edge(index, child_index).is_none() {
            graph.add_edge(index, child_index, ());
        }
    }
    index
}
