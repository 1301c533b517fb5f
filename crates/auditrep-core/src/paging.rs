/// One page of a token-paginated listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next_token: None }
    }

    pub fn with_next(items: Vec<T>, next_token: impl Into<String>) -> Self {
        Self { items, next_token: Some(next_token.into()) }
    }
}

/// Drains a paginated listing: calls `fetch` with the previous page's token
/// until a page comes back without one. Items keep page order. The first
/// fetch error is returned as-is.
///
/// An empty-string token is treated as "no more pages".
pub fn collect_pages<T, E, F>(mut fetch: F) -> Result<Vec<T>, E>
where
    F: FnMut(Option<&str>) -> Result<Page<T>, E>,
{
    let mut all = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = fetch(token.as_deref())?;
        all.extend(page.items);
        match page.next_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => return Ok(all),
        }
    }
}
