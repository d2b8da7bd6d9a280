mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Grid, Inventory, Search, Service};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::validation("service.log_level", "must be non-empty."));
	}
	if cfg.search.default_page_size == 0 {
		return Err(Error::validation("search.default_page_size", "must be greater than zero."));
	}
	if cfg.search.max_page_size == 0 {
		return Err(Error::validation("search.max_page_size", "must be greater than zero."));
	}
	if cfg.search.default_page_size > cfg.search.max_page_size {
		return Err(Error::validation(
			"search.default_page_size",
			"must not exceed search.max_page_size.",
		));
	}
	if cfg.search.free_text_separators.is_empty() {
		return Err(Error::validation("search.free_text_separators", "must be non-empty."));
	}
	if cfg.search.free_text_separators.chars().any(char::is_alphanumeric) {
		return Err(Error::validation(
			"search.free_text_separators",
			"must not contain letters or digits.",
		));
	}

	for code in &cfg.grid.hidden_property_codes {
		if code.is_empty() {
			return Err(Error::validation(
				"grid.hidden_property_codes",
				"must not contain empty codes.",
			));
		}
	}

	if cfg.grid.property_labels.values().any(|label| label.trim().is_empty()) {
		return Err(Error::validation("grid.property_labels", "must not contain empty labels."));
	}
	if cfg.inventory.max_cached_result_sets == 0 {
		return Err(Error::validation(
			"inventory.max_cached_result_sets",
			"must be greater than zero.",
		));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.log_level = cfg.service.log_level.trim().to_string();
	cfg.grid.hidden_property_codes =
		cfg.grid.hidden_property_codes.iter().map(|code| code.trim().to_ascii_uppercase()).collect();

	if cfg
		.inventory
		.snapshot
		.as_deref()
		.map(|path| path.as_os_str().is_empty())
		.unwrap_or(false)
	{
		cfg.inventory.snapshot = None;
	}
}
