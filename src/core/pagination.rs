use serde::Serialize;

/// One page of posts plus the metadata clients use to navigate.
///
/// There is always at least one page, even for an empty set. A requested
/// page past the end is clamped to the last page.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    #[serde(rename = "posts")]
    pub items: Vec<T>,
    pub has_next: bool,
    pub has_previous: bool,
    pub total_pages: usize,
    pub current_page: usize,
}

pub fn paginate<T>(items: Vec<T>, requested: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_pages = items.len().div_ceil(page_size).max(1);
    let current_page = requested.clamp(1, total_pages);

    let items = items
        .into_iter()
        .skip((current_page - 1) * page_size)
        .take(page_size)
        .collect();

    Page {
        items,
        has_next: current_page < total_pages,
        has_previous: current_page > 1,
        total_pages,
        current_page,
    }
}

impl<T> Page<T> {
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        let items = self.items.into_iter().map(f).collect::<Result<Vec<_>, E>>()?;
        Ok(Page {
            items,
            has_next: self.has_next,
            has_previous: self.has_previous,
            total_pages: self.total_pages,
            current_page: self.current_page,
        })
    }
}
