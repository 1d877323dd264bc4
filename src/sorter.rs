//! The sorting entry points, tying metadata evaluation to the plugin graph.

use crate::graph::PluginGraph;
use crate::prelude::*;

/// Computes a load order for the given plugins and their evaluated metadata.
///
/// Plugins should arrive in their current install order; plugins the rules
/// leave unordered keep that order. The result is all-or-nothing: on a cycle
/// no partial order is produced.
pub fn sort_load_order(entries: Vec<(Plugin, PluginMetadata)>) -> AppResult<Vec<Plugin>> {
    info!("Sorting load order for {} plugins.", entries.len());

    let mut graph = PluginGraph::new();
    for (plugin, metadata) in entries {
        graph.add_plugin(plugin, metadata);
    }

    graph.add_master_flag_edges();
    graph.add_specific_edges();
    graph.check_for_cycles()?;

    graph.add_priority_edges();
    graph.add_overlap_edges();

    Ok(graph
        .into_load_order()?
        .tap(|order| info!("Load order sorted: {} plugins.", order.len())))
}

/// Evaluates the metadata database against the environment and sorts the
/// given plugins in one step.
///
/// Evaluation happens in a fresh session pass, so stale cached condition
/// results never leak in from earlier calls.
pub fn evaluate_and_sort(
    plugins: Vec<Plugin>,
    db: &MetadataDb,
    session: &mut EvalSession,
) -> AppResult<Vec<Plugin>> {
    session.clear();

    let installed = plugins.iter().map(|p| p.name().to_owned()).collect_vec();
    let mut evaluated = db.evaluate_all(&installed, session)?;

    let entries = plugins
        .into_iter()
        .map(|plugin| {
            let metadata = evaluated
                .swap_remove(&plugin.name().to_lowercase())
                .unwrap_or_else(|| PluginMetadata::new(plugin.name()));
            (plugin, metadata)
        })
        .collect_vec();

    sort_load_order(entries)
}
