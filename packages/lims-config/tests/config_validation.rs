use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use lims_config::{Config, Error};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with_paging(default_page_size: i64, max_page_size: i64) -> String {
	let mut value: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let root = value.as_table_mut().expect("Template config must be a table.");
	let search = root
		.get_mut("search")
		.and_then(Value::as_table_mut)
		.expect("Template config must include [search].");

	search.insert("default_page_size".to_string(), Value::Integer(default_page_size));
	search.insert("max_page_size".to_string(), Value::Integer(max_page_size));

	toml::to_string(&value).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("lims_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

#[test]
fn template_config_loads() {
	let path = write_temp_config(SAMPLE_CONFIG_TEMPLATE_TOML.to_string());
	let result = lims_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected template config to load.");

	assert_eq!(cfg.search.default_page_size, 10);
	assert!(cfg.search.confirm_broad_queries);
	assert_eq!(cfg.grid.property_labels.get("GENOTYPE").map(String::as_str), Some("Genotype"));
	assert_eq!(cfg.inventory.snapshot, Some(PathBuf::from("inventory.json")));
	assert_eq!(cfg.inventory.max_cached_result_sets, 32);
}

#[test]
fn page_size_must_be_positive() {
	let path = write_temp_config(sample_toml_with_paging(0, 500));
	let result = lims_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected page size validation error.");

	assert!(
		err.to_string().contains("search.default_page_size must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn default_page_size_is_capped_by_max() {
	let path = write_temp_config(sample_toml_with_paging(100, 50));
	let result = lims_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	assert!(matches!(result, Err(Error::Validation { ref field, .. }) if field == "search.default_page_size"));
}

#[test]
fn missing_file_reports_path() {
	let path = env::temp_dir().join("lims_config_test_missing.toml");
	let err = lims_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }));
}

#[test]
fn optional_sections_fall_back_to_defaults() {
	let cfg: Config = toml::from_str(
		"[service]\nlog_level = \"debug\"\n\n[search]\ndefault_page_size = 5\nmax_page_size = 5\n",
	)
	.expect("Failed to parse minimal config.");

	assert!(cfg.search.min_table_info);
	assert_eq!(cfg.search.free_text_separators, " ,");
	assert_eq!(cfg.grid.hidden_property_codes, vec!["NAME", "XMLCOMMENTS", "ANNOTATIONS_STATE"]);
	assert!(cfg.inventory.snapshot.is_none());
	assert_eq!(cfg.inventory.max_cached_result_sets, 64);
	assert!(lims_config::validate(&cfg).is_ok());
}

#[test]
fn separators_reject_alphanumerics() {
	let mut cfg = base_config();

	cfg.search.free_text_separators = " x".to_string();

	let err = lims_config::validate(&cfg).expect_err("Expected separator validation error.");

	assert!(err.to_string().contains("must not contain letters or digits."), "Unexpected error: {err}");
}

#[test]
fn blank_labels_are_rejected() {
	let mut cfg = base_config();

	cfg.grid.property_labels.insert("GENOTYPE".to_string(), "  ".to_string());

	assert!(lims_config::validate(&cfg).is_err());
}

#[test]
fn result_set_cache_must_hold_something() {
	let mut cfg = base_config();

	cfg.inventory.max_cached_result_sets = 0;

	assert!(matches!(
		lims_config::validate(&cfg),
		Err(Error::Validation { ref field, .. }) if field == "inventory.max_cached_result_sets"
	));
}
