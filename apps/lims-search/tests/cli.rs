use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use clap::Parser;

use lims_inventory::{InventoryRemote, Snapshot};
use lims_search::{Criteria, EntityKind, RowPage, SearchOutcome, SearchService, SortDirection};
use lims_search_cli::{Args, grid_options, is_affirmative, render};

const CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/config.template.toml");
const CRITERIA_JSON: &str = include_str!("fixtures/criteria.json");
const SNAPSHOT_JSON: &str = include_str!("fixtures/snapshot.json");

fn write_temp(name: &str, payload: &str) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("lims_search_cli_test_{nanos}_{pid}_{ordinal}_{name}"));

	fs::write(&path, payload).expect("Failed to write test fixture.");

	path
}

fn config() -> lims_config::Config {
	let path = write_temp("config.toml", CONFIG_TEMPLATE_TOML);
	let result = lims_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result.expect("Template config must load.")
}

#[test]
fn parses_full_argument_set() {
	let args = Args::try_parse_from([
		"lims-search",
		"--config",
		"lims.toml",
		"--criteria",
		"criteria.json",
		"--snapshot",
		"inventory.json",
		"--kind",
		"SAMPLE$YEAST",
		"--page",
		"2",
		"--page-size",
		"25",
		"--sort",
		"code",
		"--desc",
		"--search",
		"his3, lacZ",
		"--yes",
	])
	.expect("Arguments must parse.");

	assert_eq!(args.page, 2);
	assert_eq!(args.page_size, Some(25));
	assert_eq!(args.kind.as_deref(), Some("SAMPLE$YEAST"));
	assert!(args.desc && args.yes);

	let options = grid_options(&args, &config());

	assert_eq!(options.page_index, 2);
	assert_eq!(options.page_size, 25);
	assert_eq!(options.sort_property.as_deref(), Some("code"));
	assert_eq!(options.sort_direction, Some(SortDirection::Desc));
	assert_eq!(options.search_text(), "his3, lacZ");
}

#[test]
fn desc_requires_a_sort_column() {
	let result = Args::try_parse_from([
		"lims-search",
		"--config",
		"lims.toml",
		"--criteria",
		"criteria.json",
		"--desc",
	]);

	assert!(result.is_err());
}

#[test]
fn page_size_defaults_from_config() {
	let args = Args::try_parse_from(["lims-search", "-c", "lims.toml", "--criteria", "c.json"])
		.expect("Arguments must parse.");
	let options = grid_options(&args, &config());

	assert_eq!(options.page_index, 0);
	assert_eq!(options.page_size, 10);
	assert!(options.sort_property.is_none() && options.sort_direction.is_none());
}

#[test]
fn confirmation_accepts_yes_only() {
	assert!(is_affirmative("y\n"));
	assert!(is_affirmative(" YES "));
	assert!(!is_affirmative(""));
	assert!(!is_affirmative("no"));
}

#[tokio::test]
async fn stored_criteria_render_as_grid_json() {
	let config = config();
	let grid = config.grid.clone();
	let snapshot = Snapshot::from_json(SNAPSHOT_JSON).expect("Fixture snapshot must parse.");
	let remote = InventoryRemote::new(snapshot, config.inventory.max_cached_result_sets);
	let service =
		SearchService::new(config, std::sync::Arc::new(remote)).expect("Service must build.");
	let mut criteria: Criteria =
		serde_json::from_str(CRITERIA_JSON).expect("Fixture criteria must parse.");
	let args = Args::try_parse_from([
		"lims-search",
		"-c",
		"lims.toml",
		"--criteria",
		"criteria.json",
		"--sort",
		"code",
	])
	.expect("Arguments must parse.");
	let options = grid_options(&args, &service.cfg);
	let outcome = service.search(&mut criteria, &options).await.expect("Search must succeed.");
	let SearchOutcome::Page(page) = outcome else {
		panic!("Constrained criteria must not be declined.");
	};
	let output = render(page, &grid, EntityKind::Sample);
	let json = serde_json::to_value(&output).expect("Output must encode.");

	assert_eq!(json["totalCount"], 2);
	assert_eq!(json["objects"][0]["code"], "BAC1");
	assert_eq!(json["objects"][1]["code"], "BAC2");

	let labels: Vec<_> = output.columns.iter().map(|column| column.label.as_str()).collect();

	assert!(labels.contains(&"Genotype"));
	assert!(labels.contains(&"RANK"));
	assert_eq!(labels.iter().filter(|label| **label == "Name").count(), 1);
}

#[test]
fn empty_page_renders_fixed_columns() {
	let output = render(
		RowPage { objects: Vec::new(), total_count: 0 },
		&lims_config::Grid::default(),
		EntityKind::All,
	);

	assert!(output.columns.iter().any(|column| column.property == "score"));
	assert!(output.objects.is_empty());
}
