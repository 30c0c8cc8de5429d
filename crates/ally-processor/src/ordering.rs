//! Handler ordering
//!
//! Before/after hints form a partial order. The build order is a Kahn
//! topological sort in which the earliest inserted ready handler always goes
//! first, so handlers without constraints keep their insertion order.

use crate::error::SetupError;
use indexmap::{IndexMap, IndexSet};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Placement hints relative to other handlers of the same assembly
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    pub(crate) before: IndexSet<String>,
    pub(crate) after: IndexSet<String>,
}

impl Position {
    /// No constraint
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place before the named handler
    #[must_use]
    pub fn before(mut self, name: impl Into<String>) -> Self {
        self.before.insert(name.into());
        self
    }

    /// Place after the named handler
    #[must_use]
    pub fn after(mut self, name: impl Into<String>) -> Self {
        self.after.insert(name.into());
        self
    }

    /// Check if there are no constraints
    #[inline]
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    pub(crate) fn rename(&mut self, from: &str, to: &str) {
        for set in [&mut self.before, &mut self.after] {
            if set.shift_remove(from) {
                set.insert(to.to_string());
            }
        }
    }
}

/// Sort `entries` (name, position) into build order, returning indices
pub(crate) fn order<'a, I>(entries: I) -> Result<Vec<usize>, SetupError>
where
    I: IntoIterator<Item = (&'a str, &'a Position)>,
{
    let entries: Vec<_> = entries.into_iter().collect();

    let mut index: IndexMap<&str, NodeIndex> = IndexMap::with_capacity(entries.len());
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(entries.len(), 0);
    for (i, (name, _)) in entries.iter().enumerate() {
        let node = graph.add_node(i);
        if index.insert(*name, node).is_some() {
            return Err(SetupError::DuplicateHandler((*name).to_string()));
        }
    }

    for (name, position) in &entries {
        let node = index[*name];
        let anchor = |other: &String| {
            index
                .get(other.as_str())
                .copied()
                .ok_or_else(|| SetupError::UnknownAnchor {
                    handler: (*name).to_string(),
                    anchor: other.clone(),
                })
        };
        for other in &position.before {
            graph.add_edge(node, anchor(other)?, ());
        }
        for other in &position.after {
            graph.add_edge(anchor(other)?, node, ());
        }
    }

    let mut incoming: Vec<usize> = graph
        .node_indices()
        .map(|node| graph.neighbors_directed(node, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = incoming
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut sorted = Vec::with_capacity(entries.len());
    while let Some(Reverse(i)) = ready.pop() {
        sorted.push(i);
        for next in graph.neighbors_directed(NodeIndex::new(i), Direction::Outgoing) {
            let count = &mut incoming[next.index()];
            *count -= 1;
            if *count == 0 {
                ready.push(Reverse(next.index()));
            }
        }
    }

    if sorted.len() < entries.len() {
        let mut cyclic: Vec<usize> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .flatten()
            .map(NodeIndex::index)
            .collect();
        cyclic.sort_unstable();
        return Err(SetupError::OrderingCycle(
            cyclic.into_iter().map(|i| entries[i].0.to_string()).collect(),
        ));
    }
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names<'a>(entries: &'a [(&'a str, Position)]) -> Result<Vec<&'a str>, SetupError> {
        let sorted = order(entries.iter().map(|(name, pos)| (*name, pos)))?;
        Ok(sorted.into_iter().map(|i| entries[i].0).collect())
    }

    #[test]
    fn unconstrained_keeps_insertion_order() {
        let entries = [("a", Position::new()), ("b", Position::new()), ("c", Position::new())];
        assert_eq!(names(&entries).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn before_moves_forward() {
        let entries = [
            ("a", Position::new()),
            ("b", Position::new()),
            ("c", Position::new().before("a")),
        ];
        assert_eq!(names(&entries).unwrap(), vec!["c", "a", "b"]);
    }

    #[test]
    fn after_moves_back() {
        let entries = [
            ("a", Position::new().after("c")),
            ("b", Position::new()),
            ("c", Position::new()),
        ];
        assert_eq!(names(&entries).unwrap(), vec!["b", "c", "a"]);
    }

    #[test]
    fn duplicate_edges_are_harmless() {
        let entries = [
            ("a", Position::new().after("b")),
            ("b", Position::new().before("a")),
        ];
        assert_eq!(names(&entries).unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn unknown_anchor() {
        let entries = [("a", Position::new().before("ghost"))];
        let err = names(&entries).unwrap_err();
        assert!(
            matches!(err, SetupError::UnknownAnchor { ref handler, ref anchor } if handler == "a" && anchor == "ghost")
        );
    }

    #[test]
    fn duplicate_name() {
        let entries = [("a", Position::new()), ("a", Position::new())];
        assert!(matches!(names(&entries), Err(SetupError::DuplicateHandler(name)) if name == "a"));
    }

    #[test]
    fn cycle_names_only_members() {
        let entries = [
            ("free", Position::new()),
            ("x", Position::new().before("y")),
            ("y", Position::new().before("x")),
            ("tail", Position::new().after("y")),
        ];
        match names(&entries) {
            Err(SetupError::OrderingCycle(members)) => assert_eq!(members, vec!["x", "y"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_anchor_is_a_cycle() {
        let entries = [("a", Position::new().before("a"))];
        assert!(matches!(names(&entries), Err(SetupError::OrderingCycle(m)) if m == vec!["a"]));
    }

    #[test]
    fn rename_redirects_anchor() {
        let mut position = Position::new().before("old").after("other");
        position.rename("old", "new");
        assert_eq!(position, Position::new().after("other").before("new"));
    }
}
