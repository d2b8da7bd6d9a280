pub mod cache;
pub mod columns;
pub mod criteria;
pub mod dispatch;
pub mod entity;
pub mod fields;
pub mod paging;
pub mod row;
pub mod time_serde;

mod error;

pub use cache::{CacheDecision, CacheMode, CacheState};
pub use columns::{GridColumn, ResultColumns};
pub use criteria::{
	Criteria, EntityKind, KindSelector, LogicalOperator, Rule, RuleId, RuleOperator, RuleType,
	TokenSplitter,
};
pub use dispatch::{RowPage, SearchOutcome};
pub use entity::{DataSet, Experiment, GlobalHit, GlobalObjectKind, Material, Sample, SearchPage};
pub use error::{Error, Result};
pub use paging::{FetchOptions, GridOptions, Sort, SortDirection, SortOrder, SortType};
pub use row::{Row, RowKind, SearchHit};

use std::{future::Future, pin::Pin, sync::Arc};

use lims_config::Config;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The remote entity service. One typed advanced search per entity kind plus the global
/// free-text search.
pub trait EntitySearch
where
	Self: Send + Sync,
{
	fn search_samples<'a>(
		&'a self,
		criteria: &'a Criteria,
		options: &'a FetchOptions,
	) -> BoxFuture<'a, Result<SearchPage<Sample>>>;

	fn search_experiments<'a>(
		&'a self,
		criteria: &'a Criteria,
		options: &'a FetchOptions,
	) -> BoxFuture<'a, Result<SearchPage<Experiment>>>;

	fn search_data_sets<'a>(
		&'a self,
		criteria: &'a Criteria,
		options: &'a FetchOptions,
	) -> BoxFuture<'a, Result<SearchPage<DataSet>>>;

	fn search_global<'a>(
		&'a self,
		text: &'a str,
		options: &'a FetchOptions,
	) -> BoxFuture<'a, Result<SearchPage<GlobalHit>>>;
}

/// Asks whoever drives the search whether a query without constraining rules should run.
pub trait BroadQueryGate
where
	Self: Send + Sync,
{
	fn confirm<'a>(&'a self, criteria: &'a Criteria) -> BoxFuture<'a, bool>;
}

/// Gate for non-interactive callers: every broad query runs.
pub struct AlwaysConfirm;
impl BroadQueryGate for AlwaysConfirm {
	fn confirm<'a>(&'a self, _: &'a Criteria) -> BoxFuture<'a, bool> {
		Box::pin(async { true })
	}
}

pub struct SearchService {
	pub cfg: Config,
	pub remote: Arc<dyn EntitySearch>,
	pub gate: Arc<dyn BroadQueryGate>,
	splitter: TokenSplitter,
}
impl SearchService {
	pub fn new(cfg: Config, remote: Arc<dyn EntitySearch>) -> Result<Self> {
		Self::with_gate(cfg, remote, Arc::new(AlwaysConfirm))
	}

	pub fn with_gate(
		cfg: Config,
		remote: Arc<dyn EntitySearch>,
		gate: Arc<dyn BroadQueryGate>,
	) -> Result<Self> {
		let splitter = TokenSplitter::new(&cfg.search.free_text_separators)?;

		Ok(Self { cfg, remote, gate, splitter })
	}
}
