use std::future::Future;

use log::debug;

use blobsign_core::Error;
use blobsign_core::Result;

/// One page of a listing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items in server order.
    pub items: Vec<T>,
    /// Opaque marker for the next page. Absent or empty when the listing is
    /// exhausted.
    pub next_marker: Option<String>,
}

/// Consecutive repeats of the same non-empty marker tolerated before the
/// pager gives up on a misbehaving server.
const STALL_LIMIT: usize = 2;

/// Lazily walks a continuation-marker listing.
///
/// The pager owns nothing but the current marker; the caller-supplied
/// `fetch_page` closure performs the actual I/O and is the only suspension
/// point. Dropping the pager cancels the walk with nothing to clean up, and
/// a fresh pager restarts from the beginning.
///
/// Errors from `fetch_page` pass through unwrapped. A server that returns
/// the same non-empty marker repeatedly stops the walk with a
/// pagination-stalled error instead of looping forever.
pub struct Pager<F> {
    fetch_page: F,
    marker: Option<String>,
    stalled: usize,
    done: bool,
}

impl<F> Pager<F> {
    /// Create a pager over `fetch_page`.
    ///
    /// The closure receives the continuation marker to resume from, `None`
    /// for the first page.
    pub fn new(fetch_page: F) -> Self {
        Self {
            fetch_page,
            marker: None,
            stalled: 0,
            done: false,
        }
    }
}

impl<T, F, Fut> Pager<F>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    /// Fetch the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Page<T>>> {
        if self.done {
            return Ok(None);
        }

        let page = (self.fetch_page)(self.marker.clone()).await?;

        // An empty marker means exhausted, same as an absent one.
        let next = page.next_marker.clone().filter(|m| !m.is_empty());
        match &next {
            None => self.done = true,
            Some(m) if self.marker.as_deref() == Some(m.as_str()) => {
                self.stalled += 1;
                debug!("continuation marker {m:?} repeated, attempt {}", self.stalled);
                if self.stalled >= STALL_LIMIT {
                    self.done = true;
                    return Err(Error::pagination_stalled(format!(
                        "continuation marker {m:?} did not advance after {STALL_LIMIT} repeats"
                    )));
                }
            }
            Some(_) => self.stalled = 0,
        }
        self.marker = next;

        Ok(Some(page))
    }
}

/// Drain a continuation-marker listing into a single vector, preserving
/// arrival order within and across pages.
pub async fn list_all<T, F, Fut>(fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut pager = Pager::new(fetch_page);
    let mut items = Vec::new();
    while let Some(page) = pager.next_page().await? {
        items.extend(page.items);
    }
    Ok(items)
}
