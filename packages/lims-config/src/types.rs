use std::{collections::HashMap, path::PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub search: Search,
	#[serde(default)]
	pub grid: Grid,
	#[serde(default)]
	pub inventory: Inventory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	pub default_page_size: u32,
	pub max_page_size: u32,
	/// Ask before running a query without any constraining rule.
	#[serde(default = "default_true")]
	pub confirm_broad_queries: bool,
	/// Request the cheaper table projection from the remote service.
	#[serde(default = "default_true")]
	pub min_table_info: bool,
	/// Characters that split grid free text into search tokens.
	#[serde(default = "default_free_text_separators")]
	pub free_text_separators: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Grid {
	/// Property codes never offered as dynamic result columns.
	pub hidden_property_codes: Vec<String>,
	/// Optional. Display labels keyed by property code; the code is shown when absent.
	pub property_labels: HashMap<String, String>,
}
impl Default for Grid {
	fn default() -> Self {
		Self {
			hidden_property_codes: default_hidden_property_codes(),
			property_labels: HashMap::new(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Inventory {
	/// Optional. JSON export used by the offline backend.
	pub snapshot: Option<PathBuf>,
	/// Result sets the offline backend keeps per cache; the oldest is evicted first.
	pub max_cached_result_sets: usize,
}
impl Default for Inventory {
	fn default() -> Self {
		Self { snapshot: None, max_cached_result_sets: default_max_cached_result_sets() }
	}
}

fn default_true() -> bool {
	true
}

fn default_max_cached_result_sets() -> usize {
	64
}

fn default_free_text_separators() -> String {
	" ,".to_string()
}

fn default_hidden_property_codes() -> Vec<String> {
	["NAME", "XMLCOMMENTS", "ANNOTATIONS_STATE"].into_iter().map(str::to_string).collect()
}
