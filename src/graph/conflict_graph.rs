use crate::conflict::ConflictReason;
use crate::timetable::ConflictFinding;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap};

/// Entries as nodes, pairwise double-bookings as edges.
pub struct ConflictGraph {
    pub graph: UnGraph<String, ConflictReason>,
    pub id_to_index: HashMap<String, NodeIndex>,
}

impl ConflictGraph {
    pub fn build(findings: &[ConflictFinding]) -> Self {
        let mut graph: UnGraph<String, ConflictReason> = UnGraph::new_undirected();
        let mut id_to_index: HashMap<String, NodeIndex> = HashMap::new();

        for finding in findings {
            let Some(second) = finding.second.as_ref() else {
                continue;
            };
            let u = *id_to_index
                .entry(finding.first.clone())
                .or_insert_with(|| graph.add_node(finding.first.clone()));
            let v = *id_to_index
                .entry(second.clone())
                .or_insert_with(|| graph.add_node(second.clone()));
            graph.add_edge(u, v, finding.reason);
        }

        Self { graph, id_to_index }
    }

    /// Groups of entries linked by at least one double-booking, each sorted,
    /// ordered by their first id.
    pub fn clusters(&self) -> Vec<Vec<String>> {
        let mut components = UnionFind::<usize>::new(self.graph.node_count());
        for edge in self.graph.edge_references() {
            components.union(edge.source().index(), edge.target().index());
        }

        let mut grouped: HashMap<usize, Vec<String>> = HashMap::new();
        for index in self.graph.node_indices() {
            grouped
                .entry(components.find(index.index()))
                .or_default()
                .push(self.graph[index].clone());
        }

        let mut ordered: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (_, mut ids) in grouped {
            ids.sort();
            if let Some(first) = ids.first().cloned() {
                ordered.insert(first, ids);
            }
        }
        ordered.into_values().collect()
    }
}
