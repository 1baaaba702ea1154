//! Host-side sorting of materialized documents.

use std::cmp::Ordering;

use crate::types::{SortDescriptor, StoredDocument, Value};

/// Sorts documents by the given descriptors.
///
/// Each descriptor's key path is resolved below `sort_root` (an empty root
/// means the record itself). Documents missing a sort value order after
/// those that have one, in either direction. The sort is stable, so ties
/// keep their incoming order.
pub fn sort_documents(
    documents: &mut [StoredDocument],
    descriptors: &[SortDescriptor],
    sort_root: &str,
) {
    if descriptors.is_empty() {
        return;
    }
    documents.sort_by(|a, b| compare_documents(a, b, descriptors, sort_root));
}

fn compare_documents(
    a: &StoredDocument,
    b: &StoredDocument,
    descriptors: &[SortDescriptor],
    sort_root: &str,
) -> Ordering {
    for descriptor in descriptors {
        let path = if sort_root.is_empty() {
            descriptor.key_path.clone()
        } else {
            format!("{}.{}", sort_root, descriptor.key_path)
        };
        let ordering = match (a.get(&path), b.get(&path)) {
            (Some(x), Some(y)) => directed(x, y, descriptor.ascending),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn directed(a: &Value, b: &Value, ascending: bool) -> Ordering {
    let ordering = a.sort_cmp(b);
    if ascending {
        ordering
    } else {
        ordering.reverse()
    }
}

/// Applies offset and limit to an already ordered list.
pub fn paginate<T>(items: Vec<T>, offset: Option<usize>, limit: Option<usize>) -> Vec<T> {
    let iter = items.into_iter().skip(offset.unwrap_or(0));
    match limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}
