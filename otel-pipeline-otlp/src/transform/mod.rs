//! Conversion from pipeline records to the OTLP message tree.
//!
//! Every request is grouped resource first, then instrumentation scope, in
//! the order the groups first appear in the batch. Records keep their batch
//! order inside a group.
pub(crate) mod common;
pub(crate) mod logs;
pub(crate) mod metrics;
pub(crate) mod trace;

use otel_pipeline_sdk::{InstrumentationScope, Resource};
use std::sync::Arc;

pub(crate) struct ResourceGroup<'a, T> {
    pub(crate) resource: &'a Resource,
    pub(crate) scopes: Vec<ScopeGroup<'a, T>>,
}

pub(crate) struct ScopeGroup<'a, T> {
    pub(crate) scope: &'a InstrumentationScope,
    pub(crate) items: Vec<T>,
}

/// Records usually share the provider's `Arc`, so pointer equality settles
/// most comparisons before falling back to comparing contents.
fn same<T: PartialEq>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::ptr_eq(a, b) || a == b
}

pub(crate) fn group_by_resource_and_scope<'a, T>(
    items: impl IntoIterator<Item = (&'a Arc<Resource>, &'a Arc<InstrumentationScope>, T)>,
) -> Vec<ResourceGroup<'a, T>> {
    let mut groups: Vec<(&'a Arc<Resource>, Vec<(&'a Arc<InstrumentationScope>, Vec<T>)>)> =
        Vec::new();
    for (resource, scope, item) in items {
        let position = match groups.iter().position(|(r, _)| same(r, resource)) {
            Some(position) => position,
            None => {
                groups.push((resource, Vec::new()));
                groups.len() - 1
            }
        };
        let scopes = &mut groups[position].1;
        match scopes.iter_mut().find(|(s, _)| same(s, scope)) {
            Some((_, items)) => items.push(item),
            None => scopes.push((scope, vec![item])),
        }
    }

    groups
        .into_iter()
        .map(|(resource, scopes)| ResourceGroup {
            resource: resource.as_ref(),
            scopes: scopes
                .into_iter()
                .map(|(scope, items)| ScopeGroup {
                    scope: scope.as_ref(),
                    items,
                })
                .collect(),
        })
        .collect()
}
