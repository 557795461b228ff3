//!
//! # Dependency Ordering
//!

// Std-lib
use std::collections::HashSet;
use std::hash::Hash;

///
/// # Dependency Graph Trait
///
/// Layout libraries, in which cells instantiate other cells, form directed graphs.
/// Many processing tasks need those graphs' nodes in dependency order:
/// each node after everything it depends upon.
///
/// Implementers provide two methods:
/// * `deps`, returning the direct dependencies of a node, or an error if they cannot be resolved.
/// * `cycle`, producing the error reported when a dependency cycle is found.
///
/// The default-implemented [DepGraph::dep_order] then performs a depth-first walk
/// from each of its `items`, returning a dependency-ordered vector.
///
/// ```
/// use std::collections::HashMap;
/// use gdsdbutils::DepGraph;
///
/// struct Graph(HashMap<&'static str, Vec<&'static str>>);
/// impl DepGraph for Graph {
///     type Item = &'static str;
///     type Error = String;
///     fn deps(&self, item: &Self::Item) -> Result<Vec<Self::Item>, String> {
///         self.0.get(item).cloned().ok_or(format!("unknown node {}", item))
///     }
///     fn cycle(&self, path: Vec<Self::Item>) -> String {
///         path.join(" -> ")
///     }
/// }
/// let g = Graph(HashMap::from([("top", vec!["mid"]), ("mid", vec!["leaf"]), ("leaf", vec![])]));
/// assert_eq!(g.dep_order(&["top"]), Ok(vec!["leaf", "mid", "top"]));
/// ```
///
pub trait DepGraph: Sized {
    /// Node type. Typically a key or name identifying each node.
    type Item: Clone + Eq + Hash;
    /// Error Type
    type Error;

    /// Get the direct dependencies of `item`
    fn deps(&self, item: &Self::Item) -> Result<Vec<Self::Item>, Self::Error>;
    /// Create the error for dependency-cycle `path`.
    /// The path starts and ends with the same repeated item.
    fn cycle(&self, path: Vec<Self::Item>) -> Self::Error;

    /// Dependency-order `items` and everything they transitively depend upon
    fn dep_order(&self, items: &[Self::Item]) -> Result<Vec<Self::Item>, Self::Error> {
        DepOrderer::new(self).order(items)
    }
}

/// # Dependency Order Helper
/// Depth-first walker behind [DepGraph::dep_order].
pub struct DepOrderer<'g, G: DepGraph> {
    /// Graph being ordered
    graph: &'g G,
    /// Ordered, completed items
    done: Vec<G::Item>,
    /// Set of completed items, for quick membership tests
    seen: HashSet<G::Item>,
    /// Open recursive frames, in order, for cycle reporting
    pending: Vec<G::Item>,
    /// Set of open frames, for quick cycle detection
    pending_set: HashSet<G::Item>,
}
impl<'g, G: DepGraph> DepOrderer<'g, G> {
    /// Create a new [DepOrderer] over `graph`
    pub fn new(graph: &'g G) -> Self {
        Self {
            graph,
            done: Vec::new(),
            seen: HashSet::new(),
            pending: Vec::new(),
            pending_set: HashSet::new(),
        }
    }
    /// Order all of `items`, consuming the orderer
    pub fn order(mut self, items: &[G::Item]) -> Result<Vec<G::Item>, G::Error> {
        for item in items.iter() {
            self.push(item)?;
        }
        Ok(self.done)
    }
    /// Push `item`'s dependencies, and then `item` itself
    fn push(&mut self, item: &G::Item) -> Result<(), G::Error> {
        if self.seen.contains(item) {
            return Ok(());
        }
        if self.pending_set.contains(item) {
            // Report the cycle from `item`'s open frame back around to itself
            let start = self.pending.iter().position(|p| p == item).unwrap_or(0);
            let mut path = self.pending[start..].to_vec();
            path.push(item.clone());
            return Err(self.graph.cycle(path));
        }
        self.pending.push(item.clone());
        self.pending_set.insert(item.clone());
        for dep in self.graph.deps(item)?.iter() {
            self.push(dep)?;
        }
        self.pending.pop();
        self.pending_set.remove(item);
        self.seen.insert(item.clone());
        self.done.push(item.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Graph(HashMap<u32, Vec<u32>>);
    impl DepGraph for Graph {
        type Item = u32;
        type Error = Vec<u32>;
        fn deps(&self, item: &u32) -> Result<Vec<u32>, Vec<u32>> {
            Ok(self.0.get(item).cloned().unwrap_or_default())
        }
        fn cycle(&self, path: Vec<u32>) -> Vec<u32> {
            path
        }
    }

    #[test]
    fn orders_diamond() {
        // 1 -> {2, 3} -> 4
        let g = Graph(HashMap::from([(1, vec![2, 3]), (2, vec![4]), (3, vec![4])]));
        assert_eq!(g.dep_order(&[1]), Ok(vec![4, 2, 3, 1]));
    }
    #[test]
    fn reports_cycle_path() {
        // 1 -> 2 -> 3 -> 2
        let g = Graph(HashMap::from([(1, vec![2]), (2, vec![3]), (3, vec![2])]));
        assert_eq!(g.dep_order(&[1]), Err(vec![2, 3, 2]));
    }
    #[test]
    fn self_reference_is_a_cycle() {
        let g = Graph(HashMap::from([(7, vec![7])]));
        assert_eq!(g.dep_order(&[7]), Err(vec![7, 7]));
    }
}
