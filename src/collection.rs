//! Named, ordered, derived views over content items.
//!
//! Collections are recomputed from scratch every pass: membership is a
//! pure function of the current item set and the configured predicate,
//! never mutated incrementally.

use crate::config::CollectionSpec;
use crate::content::{ContentItem, parse_date};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A built collection: indices into the pass's item slice, in order.
#[derive(Debug, Clone)]
pub struct Collection {
    pub name: String,
    pub items: Vec<usize>,
}

impl Collection {
    /// Iterate the member items in collection order.
    pub fn iter<'a>(&'a self, items: &'a [ContentItem]) -> impl Iterator<Item = &'a ContentItem> {
        self.items.iter().map(move |&i| &items[i])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Build one collection from the current item set.
///
/// Default order is discovery order. With `sort_by`, a stable sort on the
/// named front matter key: equal keys keep their relative discovery order,
/// and `reverse` inverts the comparator (not the sequence), so ties still
/// hold discovery order.
pub fn build(items: &[ContentItem], name: &str, spec: &CollectionSpec) -> Collection {
    let mut members: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.has_tag(&spec.tag))
        .map(|(i, _)| i)
        .collect();

    if let Some(key) = &spec.sort_by {
        members.sort_by(|&a, &b| {
            let ord = compare_by_key(&items[a], &items[b], key);
            if spec.reverse { ord.reverse() } else { ord }
        });
    }

    Collection {
        name: name.to_string(),
        items: members,
    }
}

/// Build every configured collection for this pass.
pub fn build_all(
    items: &[ContentItem],
    specs: &BTreeMap<String, CollectionSpec>,
) -> FxHashMap<String, Collection> {
    specs
        .iter()
        .map(|(name, spec)| (name.clone(), build(items, name, spec)))
        .collect()
}

/// Compare two items on a front matter key.
///
/// Values that parse as dates compare chronologically, otherwise string
/// comparison. Items missing the key sort after items that have it.
fn compare_by_key(a: &ContentItem, b: &ContentItem, key: &str) -> Ordering {
    match (sort_value(a, key), sort_value(b, key)) {
        (Some(va), Some(vb)) => match (parse_date(&va), parse_date(&vb)) {
            (Some(da), Some(db)) => da.cmp(&db),
            _ => va.cmp(&vb),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn sort_value(item: &ContentItem, key: &str) -> Option<String> {
    match item.meta.get(key)? {
        toml::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
