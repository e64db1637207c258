//! Cursor-driven account listing.

use futures::stream::{self, Stream, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::DirectoryClient;
use crate::error::{DirectoryError, DirectoryResult, ElementFailure};
use crate::model::{ExportedUserRecord, PageCursor};

/// One page of a listing.
#[derive(Debug)]
pub struct UserPage {
    pub users: Vec<ExportedUserRecord>,
    /// Cursor for the following page; `None` on the last page.
    pub next_page_token: Option<PageCursor>,
    /// Elements that failed to map. Always empty under
    /// [`MappingPolicy::FailOnAny`](crate::mapper::MappingPolicy::FailOnAny).
    pub failures: Vec<ElementFailure>,
}

#[derive(Debug, Clone)]
enum PagerState {
    Active { cursor: Option<PageCursor> },
    Exhausted,
}

/// A listing in progress. Each [`next_page`](Self::next_page) call performs
/// at most one round trip.
///
/// A failed or cancelled call leaves the cursor where it was, so the same
/// page is requested again on the next call.
#[derive(Debug)]
pub struct UserPager {
    client: DirectoryClient,
    page_size: u32,
    state: PagerState,
}

impl UserPager {
    pub(crate) fn new(client: DirectoryClient, page_size: u32, start: Option<PageCursor>) -> Self {
        Self {
            client,
            page_size,
            state: PagerState::Active { cursor: start },
        }
    }

    /// Fetch the next page, or `Ok(None)` once the listing is exhausted.
    pub async fn next_page(
        &mut self,
        cancel: &CancellationToken,
    ) -> DirectoryResult<Option<UserPage>> {
        let cursor = match &self.state {
            PagerState::Exhausted => return Ok(None),
            PagerState::Active { cursor } => cursor.clone(),
        };

        let (mapped, next) = self
            .client
            .download_page(cancel, self.page_size, cursor.as_ref())
            .await?;
        let mapped = mapped.with_policy(self.client.mapping_policy())?;

        if cancel.is_cancelled() {
            return Err(DirectoryError::Cancelled);
        }

        debug!(
            users = mapped.records.len(),
            has_next = next.is_some(),
            "Fetched listing page"
        );
        self.state = match &next {
            Some(cursor) => PagerState::Active {
                cursor: Some(cursor.clone()),
            },
            None => PagerState::Exhausted,
        };

        Ok(Some(UserPage {
            users: mapped.records,
            next_page_token: next,
            failures: mapped.failures,
        }))
    }

    /// Cursor of the next page to fetch; `None` before the first page of an
    /// unseeded listing and after exhaustion.
    #[must_use]
    pub fn cursor(&self) -> Option<&PageCursor> {
        match &self.state {
            PagerState::Active { cursor } => cursor.as_ref(),
            PagerState::Exhausted => None,
        }
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, PagerState::Exhausted)
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Flatten the remaining pages into a stream of records.
    ///
    /// The stream ends after the first error. Failures tolerated under
    /// `AllowPartial` are dropped; use [`next_page`](Self::next_page) to see
    /// them.
    pub fn into_stream(
        self,
        cancel: CancellationToken,
    ) -> impl Stream<Item = DirectoryResult<ExportedUserRecord>> {
        stream::try_unfold((self, cancel), |(mut pager, cancel)| async move {
            let page = pager.next_page(&cancel).await?;
            let step: DirectoryResult<_> = Ok(page.map(|page| {
                let users = stream::iter(page.users.into_iter().map(Ok::<_, DirectoryError>));
                (users, (pager, cancel))
            }));
            step
        })
        .try_flatten()
    }
}
