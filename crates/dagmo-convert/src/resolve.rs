//! Dependency resolution.
//!
//! Notebook cells declare nothing, so their edges are inferred from the
//! names each cell binds and reads. Pipeline assets declare their upstream
//! assets as parameters, so their edges are read off and validated.
//! Both directions end in the same stable topological order.

use std::collections::BTreeSet;

use dagmo_core::pattern::{self, QueryCall};
use dagmo_core::python::{StatementKind, analyze};
use dagmo_core::{
    Construct, ConversionConfig, DependencyGraph, Diagnostics, Error, Module, ParamRole, Result,
    Unit, UnitId,
};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

/// Infer reads, writes and outputs of the convertible notebook cells and
/// return their indices in emission order.
pub(crate) fn infer(
    module: &mut Module,
    config: &ConversionConfig,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<usize>> {
    let members: Vec<usize> = module
        .units
        .iter()
        .enumerate()
        .filter(|(_, u)| u.kind.is_convertible())
        .map(|(i, _)| i)
        .collect();
    check_unique(members.iter().map(|&i| module.units[i].name.as_str()))?;

    let mut graph = DependencyGraph::new();
    let ids: Vec<UnitId> = members
        .iter()
        .map(|&i| graph.add_unit(module.units[i].name.as_str(), module.units[i].order_index))
        .collect();

    let mut produced: Vec<Vec<String>> = Vec::with_capacity(members.len());
    let mut candidates: Vec<Vec<String>> = Vec::with_capacity(members.len());
    for &i in &members {
        let unit = &mut module.units[i];
        let text = unit.body_text();
        let bindings = analyze(&text).map_err(|e| e.offset_line(unit.line))?;
        let imported = imported_names(unit);

        let public: Vec<String> = bindings
            .bound
            .iter()
            .filter(|n| !n.starts_with('_') && !imported.contains(n.as_str()))
            .cloned()
            .collect();
        unit.outputs.retain(|o| !imported.contains(o.as_str()));
        unit.writes = public.iter().filter(|n| **n != unit.name).cloned().collect();

        let mut names = public;
        for output in &unit.outputs {
            if !names.contains(output) {
                names.push(output.clone());
            }
        }
        produced.push(names);

        let mut wanted = bindings.free;
        wanted.extend(unit.params_with(ParamRole::Data).map(str::to_string));
        let queries = pattern::query_calls(&text, &config.notebook.alias, &config.query.notebook_function);
        if queries.iter().any(|q| matches!(q, QueryCall::Call(_))) {
            wanted.extend(pattern::sql_table_refs(&text));
        }
        let mut seen = FxHashSet::default();
        wanted.retain(|n| *n != unit.name && seen.insert(n.clone()));
        candidates.push(wanted);
    }

    let mut writers: FxHashMap<&str, Vec<usize>> = FxHashMap::default();
    for (k, names) in produced.iter().enumerate() {
        for name in names {
            writers.entry(name.as_str()).or_default().push(k);
        }
    }

    let mut reads: Vec<BTreeSet<String>> = vec![BTreeSet::new(); members.len()];
    let mut consumed: Vec<BTreeSet<String>> = vec![BTreeSet::new(); members.len()];
    for (k, wanted) in candidates.iter().enumerate() {
        for name in wanted {
            let Some(found) = writers.get(name.as_str()) else {
                continue;
            };
            let Some(producer) = nearest(found, k) else {
                continue;
            };
            let others = found.iter().filter(|&&w| w != k).count();
            if others > 1 {
                diagnostics.push(
                    module.units[members[k]].name.as_str(),
                    Construct::AmbiguousProducer,
                    format!(
                        "`{name}` is written by {others} cells, reading it from `{}`",
                        module.units[members[producer]].name
                    ),
                );
            }
            trace!(
                "{} reads {} from {}",
                module.units[members[k]].name,
                name,
                module.units[members[producer]].name
            );
            graph.add_edge(ids[producer], ids[k]);
            reads[k].insert(name.clone());
            consumed[producer].insert(name.clone());
        }
    }

    for (k, &i) in members.iter().enumerate() {
        let unit = &module.units[i];
        for dep in &unit.deps {
            let producer = members
                .iter()
                .position(|&j| module.units[j].name == *dep)
                .or_else(|| writers.get(dep.as_str()).and_then(|found| nearest(found, k)));
            match producer {
                Some(p) if p != k => graph.add_edge(ids[p], ids[k]),
                _ => diagnostics.push(
                    unit.name.as_str(),
                    Construct::UnresolvedUpstream,
                    format!("dependency `{dep}` does not name another cell"),
                ),
            }
        }
    }

    for (k, &i) in members.iter().enumerate() {
        let unit = &mut module.units[i];
        unit.reads = std::mem::take(&mut reads[k]);
        for name in &consumed[k] {
            if !unit.outputs.contains(name) {
                unit.outputs.push(name.clone());
            }
        }
        unit.multi_output =
            !(unit.outputs.is_empty() || (unit.outputs.len() == 1 && unit.outputs[0] == unit.name));
    }

    let order = graph.topological_order()?;
    debug!("Ordered {} of {} cells", order.len(), module.units.len());
    Ok(order.into_iter().map(|id| members[id.as_usize()]).collect())
}

/// Validate the declared dependencies of pipeline assets and return their
/// indices in emission order.
pub(crate) fn declared(module: &mut Module, diagnostics: &mut Diagnostics) -> Result<Vec<usize>> {
    check_unique(module.units.iter().map(|u| u.name.as_str()))?;

    let names: FxHashMap<String, usize> = module
        .units
        .iter()
        .enumerate()
        .map(|(i, u)| (u.name.clone(), i))
        .collect();
    let mut keys: FxHashMap<String, usize> = FxHashMap::default();
    for (i, unit) in module.units.iter().enumerate() {
        for output in &unit.outputs {
            match keys.get(output) {
                Some(&other) if other != i => return Err(Error::DuplicateName(output.clone())),
                _ => {
                    keys.insert(output.clone(), i);
                }
            }
        }
    }

    let mut graph = DependencyGraph::new();
    let ids: Vec<UnitId> = module
        .units
        .iter()
        .map(|u| graph.add_unit(u.name.as_str(), u.order_index))
        .collect();

    let mut consumed: FxHashSet<usize> = FxHashSet::default();
    for (i, unit) in module.units.iter_mut().enumerate() {
        let mut reads = BTreeSet::new();
        for param in unit.params_with(ParamRole::Data) {
            if param == unit.name {
                continue;
            }
            match keys.get(param) {
                Some(&producer) if producer != i => {
                    graph.add_edge(ids[producer], ids[i]);
                    consumed.insert(producer);
                }
                Some(_) => {}
                None => diagnostics.push(
                    unit.name.as_str(),
                    Construct::UnresolvedUpstream,
                    format!("parameter `{param}` does not name an asset of this module"),
                ),
            }
            reads.insert(param.to_string());
        }

        for dep in &unit.deps {
            match keys.get(dep).or_else(|| names.get(dep)) {
                Some(&producer) if producer != i => graph.add_edge(ids[producer], ids[i]),
                _ => diagnostics.push(
                    unit.name.as_str(),
                    Construct::UnresolvedUpstream,
                    format!("dependency `{dep}` does not name another asset of this module"),
                ),
            }
        }

        unit.writes = unit
            .outputs
            .iter()
            .filter(|o| **o != unit.name)
            .cloned()
            .collect();
        unit.reads = reads;
    }

    for (i, unit) in module.units.iter_mut().enumerate() {
        let returns_value = matches!(
            unit.body.last().map(|s| &s.kind),
            Some(StatementKind::Return(Some(_)))
        );
        if !unit.multi_output && !returns_value && !consumed.contains(&i) {
            unit.outputs.clear();
        }
    }

    let order = graph.topological_order()?;
    debug!("Ordered {} assets", order.len());
    Ok(order.into_iter().map(|id| id.as_usize()).collect())
}

fn check_unique<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = FxHashSet::default();
    for name in names {
        if !seen.insert(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
    }
    Ok(())
}

/// Writer closest to `reader`: the nearest preceding one, else the first
/// following one. `writers` is in source order.
fn nearest(writers: &[usize], reader: usize) -> Option<usize> {
    writers
        .iter()
        .rev()
        .find(|&&w| w < reader)
        .or_else(|| writers.iter().find(|&&w| w > reader))
        .copied()
}

/// Names bound by the import statements of a unit body.
fn imported_names(unit: &Unit) -> FxHashSet<String> {
    unit.body
        .iter()
        .filter_map(|s| match &s.kind {
            StatementKind::Import(items) => Some(items),
            _ => None,
        })
        .flatten()
        .flat_map(|item| item.bound_names())
        .collect()
}
