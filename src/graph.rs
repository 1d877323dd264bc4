//! The plugin dependency graph and its topological ordering.
//!
//! Edges accumulate over four passes of decreasing authority: master-flag
//! partitioning, explicit dependencies (masters, requirements, load-after),
//! priorities, and record overlap. The first two passes assert hard rules
//! and may produce cycles, which are reported as errors; the last two are
//! soft preferences that skip any edge which would create a cycle.

use petgraph::{
    algo::has_path_connecting,
    graph::{DiGraph, NodeIndex},
    visit::{depth_first_search, Control, DfsEvent, EdgeRef},
};

use crate::plugin::is_plugin_file;
use crate::prelude::*;

/// One vertex of the graph: a plugin paired with its evaluated metadata.
#[derive(Debug, Clone)]
pub struct SortEntry {
    pub plugin: Plugin,
    pub metadata: PluginMetadata,
}

/// A directed graph over installed plugins where an edge a -> b means a must
/// load before b.
///
/// Vertices keep their insertion order, which doubles as the tie-break for
/// plugins the edges leave unordered.
#[derive(Debug, Default)]
pub struct PluginGraph {
    graph: DiGraph<SortEntry, ()>,
    names: IndexMap<String, NodeIndex>,
}

impl PluginGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin vertex. Later duplicates of the same name are ignored.
    pub fn add_plugin(&mut self, plugin: Plugin, metadata: PluginMetadata) {
        let key = plugin.name().to_lowercase();
        if self.names.contains_key(&key) {
            warn!("Skipping duplicate plugin vertex: {}", plugin.name());
            return;
        }

        let index = self.graph.add_node(SortEntry { plugin, metadata });
        self.names.insert(key, index);
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    fn vertex_by_name(&self, name: &str) -> Option<NodeIndex> {
        self.names.get(&name.to_lowercase()).copied()
    }

    fn entry(&self, index: NodeIndex) -> &SortEntry {
        &self.graph[index]
    }

    /// First pass: every master-flagged plugin loads before every
    /// non-master.
    pub fn add_master_flag_edges(&mut self) {
        debug!("Adding edges for master flags.");

        let (masters, non_masters): (Vec<_>, Vec<_>) = self
            .graph
            .node_indices()
            .partition(|&i| self.entry(i).plugin.is_master());

        for &master in &masters {
            for &other in &non_masters {
                self.add_edge(master, other);
            }
        }
    }

    /// Second pass: explicit dependencies. Header masters, metadata
    /// requirements and load-after entries all demand that the named plugin
    /// load first.
    ///
    /// Header masters are matched by name alone; whatever the header names is
    /// a plugin by definition. Requirement and load-after entries may
    /// reference arbitrary files, so only those naming a plugin file
    /// contribute an edge. Entries naming plugins that are not installed
    /// contribute none either way.
    pub fn add_specific_edges(&mut self) {
        debug!("Adding edges for masters and metadata dependencies.");

        for index in self.graph.node_indices().collect_vec() {
            let entry = self.entry(index);

            let masters = entry.plugin.masters().to_vec();
            let files = entry
                .metadata
                .requirements()
                .iter()
                .chain(entry.metadata.load_after().iter())
                .map(|f| f.name().to_owned())
                .collect_vec();

            for name in masters {
                if let Some(before) = self.vertex_by_name(&name) {
                    self.add_edge(before, index);
                }
            }

            for name in files {
                if !is_plugin_file(&name) {
                    continue;
                }

                if let Some(before) = self.vertex_by_name(&name) {
                    self.add_edge(before, index);
                }
            }
        }
    }

    /// Third pass: priority edges between every plugin pair with differing
    /// priority values.
    ///
    /// An edge is only worth asserting when the plugins could actually
    /// conflict: one priority is global, their records overlap, or one of
    /// them overrides nothing at all (header-only plugins exist to load
    /// archives, whose resources are still affected by load order). Edges
    /// that would create a cycle are skipped, so earlier passes always win.
    pub fn add_priority_edges(&mut self) {
        debug!("Adding edges for plugin priorities.");

        let indices = self.graph.node_indices().collect_vec();
        for (pos, &a) in indices.iter().enumerate() {
            for &b in &indices[pos + 1..] {
                let (ea, eb) = (self.entry(a), self.entry(b));

                let pa = ea.metadata.priority();
                let pb = eb.metadata.priority();
                if pa.value() == pb.value() {
                    continue;
                }

                let applies = pa.is_global()
                    || pb.is_global()
                    || ea.plugin.overlaps(&eb.plugin)
                    || ea.plugin.is_empty()
                    || eb.plugin.is_empty();
                if !applies {
                    continue;
                }

                let (from, to) = if pa.value() < pb.value() { (a, b) } else { (b, a) };

                if self.graph.contains_edge(from, to) {
                    continue;
                }
                if self.edge_would_cycle(from, to) {
                    trace!(
                        "Skipping priority edge from \"{}\" to \"{}\" to avoid a cycle.",
                        self.entry(from).plugin.name(),
                        self.entry(to).plugin.name()
                    );
                    continue;
                }

                self.add_edge(from, to);
            }
        }
    }

    /// Fourth pass: overlap edges. When two unordered plugins override a
    /// common record, the one overriding more records loads first, so the
    /// more focused plugin wins the conflict.
    ///
    /// Ties fall back to case-insensitive name order. Edges that would create
    /// a cycle are skipped.
    pub fn add_overlap_edges(&mut self) {
        debug!("Adding edges for overlapping records.");

        let indices = self.graph.node_indices().collect_vec();
        for (pos, &a) in indices.iter().enumerate() {
            for &b in &indices[pos + 1..] {
                let (ea, eb) = (self.entry(a), self.entry(b));

                if ea.plugin.override_record_count() == 0
                    || eb.plugin.override_record_count() == 0
                    || !ea.plugin.overlaps(&eb.plugin)
                {
                    continue;
                }
                if self.graph.contains_edge(a, b) || self.graph.contains_edge(b, a) {
                    continue;
                }

                let (from, to) = match ea
                    .plugin
                    .override_record_count()
                    .cmp(&eb.plugin.override_record_count())
                {
                    std::cmp::Ordering::Greater => (a, b),
                    std::cmp::Ordering::Less => (b, a),
                    std::cmp::Ordering::Equal => {
                        let na = ea.plugin.name().to_lowercase();
                        let nb = eb.plugin.name().to_lowercase();
                        if na <= nb {
                            (a, b)
                        } else {
                            (b, a)
                        }
                    }
                };

                if self.edge_would_cycle(from, to) {
                    trace!(
                        "Skipping overlap edge from \"{}\" to \"{}\" to avoid a cycle.",
                        self.entry(from).plugin.name(),
                        self.entry(to).plugin.name()
                    );
                    continue;
                }

                self.add_edge(from, to);
            }
        }
    }

    fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) {
        if self.graph.contains_edge(from, to) {
            return;
        }

        trace!(
            "Adding edge from \"{}\" to \"{}\".",
            self.entry(from).plugin.name(),
            self.entry(to).plugin.name()
        );
        self.graph.add_edge(from, to, ());
    }

    /// Whether adding from -> to would close a cycle, that is, whether to can
    /// already reach from.
    fn edge_would_cycle(&self, from: NodeIndex, to: NodeIndex) -> bool {
        has_path_connecting(&self.graph, to, from, None)
    }

    /// Searches for a cycle among the hard edges, reporting one of its edges
    /// by plugin name.
    pub fn check_for_cycles(&self) -> Result<(), SortError> {
        debug!("Checking plugin graph for cycles.");

        let starts = self.graph.node_indices().collect_vec();
        let result = depth_first_search(&self.graph, starts, |event| {
            if let DfsEvent::BackEdge(from, to) = event {
                return Control::Break((from, to));
            }
            Control::Continue
        });

        match result.break_value() {
            Some((from, to)) => Err(SortError::Cycle(
                self.entry(from).plugin.name().to_owned(),
                self.entry(to).plugin.name().to_owned(),
            )),
            None => Ok(()),
        }
    }

    /// Consumes the graph and produces its plugins in a valid topological
    /// order.
    ///
    /// Among plugins the edges leave unordered, vertex insertion order wins,
    /// so the output is stable across runs for the same input.
    pub fn into_load_order(self) -> Result<Vec<Plugin>, SortError> {
        debug!("Performing topological sort on plugin graph.");

        let mut in_degrees = vec![0usize; self.graph.node_count()];
        for edge in self.graph.edge_references() {
            in_degrees[edge.target().index()] += 1;
        }

        // Kahn's algorithm with the ready set kept in index order, so ties
        // resolve to insertion order rather than whatever the edge layout
        // happens to produce.
        let mut ready: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|i| in_degrees[i.index()] == 0)
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(&next) = ready.iter().min_by_key(|i| i.index()) {
            ready.retain(|&i| i != next);
            order.push(next);

            for neighbor in self.graph.neighbors(next) {
                in_degrees[neighbor.index()] -= 1;
                if in_degrees[neighbor.index()] == 0 {
                    ready.push(neighbor);
                }
            }
        }

        if order.len() != self.graph.node_count() {
            // A cycle survived; find an edge of it to name.
            self.check_for_cycles()?;
            unreachable!("sort came up short without a detectable cycle");
        }

        let mut entries: IndexMap<NodeIndex, Plugin> = self
            .graph
            .node_indices()
            .zip(self.graph.node_weights().map(|e| e.plugin.clone()))
            .collect();

        Ok(order
            .into_iter()
            .filter_map(|i| entries.swap_remove(&i))
            .collect())
    }
}
