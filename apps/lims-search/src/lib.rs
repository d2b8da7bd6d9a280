use std::{
	fs,
	io::{self, Write},
	path::{Path, PathBuf},
	sync::Arc,
};

use clap::Parser;
use color_eyre::eyre;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use lims_config::Config;
use lims_inventory::{InventoryRemote, Snapshot};
use lims_search::{
	AlwaysConfirm, BoxFuture, BroadQueryGate, Criteria, EntityKind, GridColumn, GridOptions,
	KindSelector, Row, RowPage, SearchOutcome, SearchService, SortDirection, columns,
};

#[derive(Debug, Parser)]
#[command(
	version = lims_cli::VERSION,
	about = lims_cli::about("lims-search"),
	rename_all = "kebab",
	styles = lims_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Stored criteria as JSON.
	#[arg(long, value_name = "FILE")]
	pub criteria: PathBuf,
	/// Inventory export; overrides `inventory.snapshot`.
	#[arg(long, value_name = "FILE")]
	pub snapshot: Option<PathBuf>,
	/// Kind selector applied to the criteria first, e.g. `ALL` or `SAMPLE$YEAST`.
	#[arg(long, value_name = "KIND")]
	pub kind: Option<String>,
	#[arg(long, value_name = "N", default_value_t = 0)]
	pub page: u32,
	#[arg(long, value_name = "N")]
	pub page_size: Option<u32>,
	#[arg(long, value_name = "COLUMN")]
	pub sort: Option<String>,
	#[arg(long, requires = "sort")]
	pub desc: bool,
	/// Grid free text, split into extra search tokens.
	#[arg(long, value_name = "TEXT")]
	pub search: Option<String>,
	/// Run broad queries without asking.
	#[arg(long, short = 'y')]
	pub yes: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridOutput {
	pub columns: Vec<GridColumn>,
	pub objects: Vec<Row>,
	pub total_count: u64,
}

/// Prompts on the terminal before a broad query runs.
struct StdinGate;
impl BroadQueryGate for StdinGate {
	fn confirm<'a>(&'a self, criteria: &'a Criteria) -> BoxFuture<'a, bool> {
		let kind = criteria.entity_kind();

		Box::pin(async move {
			match tokio::task::spawn_blocking(move || prompt(kind)).await {
				Ok(Ok(answer)) => answer,
				Ok(Err(err)) => {
					tracing::warn!(error = %err, "Failed to read confirmation.");

					false
				},
				Err(err) => {
					tracing::warn!(error = %err, "Confirmation prompt did not complete.");

					false
				},
			}
		})
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = lims_config::load(&args.config)?;

	init_tracing(&config)?;

	let snapshot_path = args
		.snapshot
		.clone()
		.or_else(|| config.inventory.snapshot.clone())
		.ok_or_else(|| eyre::eyre!("Pass --snapshot or set inventory.snapshot."))?;
	let snapshot = Snapshot::load(&snapshot_path)?;
	let mut criteria = load_criteria(&args.criteria)?;

	if let Some(kind) = args.kind.as_deref() {
		criteria.select_kind(&KindSelector::parse(kind)?);
	}

	let options = grid_options(&args, &config);
	let gate: Arc<dyn BroadQueryGate> =
		if args.yes { Arc::new(AlwaysConfirm) } else { Arc::new(StdinGate) };
	let remote =
		Arc::new(InventoryRemote::new(snapshot, config.inventory.max_cached_result_sets));
	let service = SearchService::with_gate(config, remote, gate)?;
	let SearchOutcome::Page(page) = service.search(&mut criteria, &options).await? else {
		return Ok(());
	};
	let output = render(page, &service.cfg.grid, criteria.entity_kind());
	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	Ok(())
}

pub fn grid_options(args: &Args, config: &Config) -> GridOptions {
	let direction = if args.desc { SortDirection::Desc } else { SortDirection::Asc };

	GridOptions {
		page_index: args.page,
		page_size: args.page_size.unwrap_or(config.search.default_page_size),
		sort_property: args.sort.clone(),
		sort_direction: args.sort.as_ref().map(|_| direction),
		search: args.search.clone(),
	}
}

pub fn render(page: RowPage, grid: &lims_config::Grid, kind: EntityKind) -> GridOutput {
	let columns = columns::grid_columns(&page.objects, grid, kind.is_global());

	GridOutput { columns, objects: page.objects, total_count: page.total_count }
}

pub fn is_affirmative(answer: &str) -> bool {
	matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn load_criteria(path: &Path) -> color_eyre::Result<Criteria> {
	let raw = fs::read_to_string(path)?;
	let criteria: Criteria = serde_json::from_str(&raw)?;

	Ok(criteria)
}

fn prompt(kind: EntityKind) -> io::Result<bool> {
	let mut stderr = io::stderr();

	write!(
		stderr,
		"This {kind} search has no constraining rule and may return the whole inventory. \
		 Continue? [y/N] "
	)?;
	stderr.flush()?;

	let mut answer = String::new();

	io::stdin().read_line(&mut answer)?;

	Ok(is_affirmative(&answer))
}

fn init_tracing(config: &Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();

	Ok(())
}
