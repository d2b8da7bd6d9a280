//! Search Dispatcher: the single entry point from grid state to a page of normalized rows.

use serde::Serialize;

use crate::{
	Result, SearchService,
	cache::{self, CacheMode},
	criteria::{Criteria, EntityKind},
	entity::SearchPage,
	paging::{self, FetchOptions, GridOptions, SortMapping},
	row::{self, Row, SearchHit},
};

/// What the grid renders: one page of rows plus the remote total over all pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPage {
	pub objects: Vec<Row>,
	pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
	/// A broad query was not confirmed; nothing was sent.
	Declined,
	Page(RowPage),
}
impl SearchOutcome {
	pub fn page(&self) -> Option<&RowPage> {
		match self {
			Self::Page(page) => Some(page),
			Self::Declined => None,
		}
	}
}

impl SearchService {
	/// Runs one page of `criteria` under the grid's paging, sort, and free-text state.
	///
	/// The stored criteria only gains cache bookkeeping; free-text tokens go into a
	/// request-scoped copy. Remote errors are returned as the remote produced them.
	pub async fn search(
		&self,
		criteria: &mut Criteria,
		options: &GridOptions,
	) -> Result<SearchOutcome> {
		let token = options.search_text();
		let tokens = self.splitter.split(token);
		let request = criteria.with_free_text_tokens(&tokens);
		let kind = request.entity_kind();

		if self.cfg.search.confirm_broad_queries
			&& request.is_broad()
			&& !self.gate.confirm(&request).await
		{
			tracing::info!(%kind, "Broad query declined. No request was sent.");

			return Ok(SearchOutcome::Declined);
		}

		let mapping = SortMapping::new(kind);
		let mut fetch = paging::to_fetch_options(
			options,
			&mapping,
			CacheMode::ReloadAndCache,
			&self.cfg.search,
		)?;
		let decision = cache::decide(criteria, token)?;

		fetch.cache = decision.mode;

		tracing::debug!(
			%kind,
			from = fetch.from,
			count = fetch.count,
			cache = ?fetch.cache,
			tokens = tokens.len(),
			"Dispatching search."
		);

		let (hits, total_count) = match self.fetch(&request, &fetch).await {
			Ok(result) => result,
			Err(err) => {
				// The remote never built the result set this decision recorded.
				cache::invalidate(criteria);

				return Err(err);
			},
		};
		let objects = row::normalize_page(hits);

		Ok(SearchOutcome::Page(RowPage { objects, total_count }))
	}

	async fn fetch(
		&self,
		request: &Criteria,
		fetch: &FetchOptions,
	) -> Result<(Vec<SearchHit>, u64)> {
		match request.entity_kind() {
			EntityKind::Sample =>
				Ok(into_hits(self.remote.search_samples(request, fetch).await?, SearchHit::Sample)),
			EntityKind::Experiment => Ok(into_hits(
				self.remote.search_experiments(request, fetch).await?,
				SearchHit::Experiment,
			)),
			EntityKind::Dataset => Ok(into_hits(
				self.remote.search_data_sets(request, fetch).await?,
				SearchHit::DataSet,
			)),
			EntityKind::All => {
				let text = request.global_text();
				let page = self.remote.search_global(&text, fetch).await?;

				Ok(into_hits(page, SearchHit::Global))
			},
		}
	}
}

fn into_hits<T>(page: SearchPage<T>, wrap: fn(T) -> SearchHit) -> (Vec<SearchHit>, u64) {
	(page.objects.into_iter().map(wrap).collect(), page.total_count)
}
