use std::ops::Range;

/// Half-open window `[skip, skip + page_size)` clamped to `len`.
pub fn page_bounds(skip: usize, page_size: usize, len: usize) -> Range<usize> {
    let start = skip.min(len);
    let end = skip.saturating_add(page_size).min(len);
    start..end
}

pub fn paginate<T>(items: &[T], skip: usize, page_size: usize) -> &[T] {
    &items[page_bounds(skip, page_size, items.len())]
}
