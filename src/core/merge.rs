use crate::core::{Entity, PageRequest};
use crate::domain::model::Pagination;
use std::collections::HashSet;

/// Concatenates per-source pages, drops exact `(source, id)` repeats, applies
/// the filters and sorts.
///
/// Records from different sources are never folded together. The sort is
/// stable and ties fall back to id, then source, so the output order does not
/// depend on which source answered first.
pub fn merge<E: Entity>(pages: Vec<Vec<E>>, filters: &E::Filters) -> Vec<E> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut merged: Vec<E> = pages
        .into_iter()
        .flatten()
        .filter(|item| seen.insert((item.source().to_string(), item.id().to_string())))
        .filter(|item| item.matches(filters))
        .collect();

    merged.sort_by(|a, b| {
        a.compare(b, filters)
            .then_with(|| a.id().cmp(b.id()))
            .then_with(|| a.source().cmp(b.source()))
    });
    merged
}

pub fn paginate<E: Clone>(items: &[E], page: PageRequest) -> (Vec<E>, Pagination) {
    let total = items.len();
    let data: Vec<E> = items
        .iter()
        .skip(page.offset)
        .take(page.limit)
        .cloned()
        .collect();
    let pagination = Pagination {
        limit: page.limit,
        offset: page.offset,
        total,
        has_more: page.offset.saturating_add(page.limit) < total,
    };
    (data, pagination)
}

/// Sources with at least one record in `items`, in `registered` order.
pub fn contributing_sources<E: Entity>(registered: &[String], items: &[E]) -> Vec<String> {
    let present: HashSet<&str> = items.iter().map(|item| item.source()).collect();
    registered
        .iter()
        .filter(|name| present.contains(name.as_str()))
        .cloned()
        .collect()
}
