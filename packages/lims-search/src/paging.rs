//! Pagination/Sort Adapter: grid paging and column sorting expressed as remote fetch options.

use serde::{Deserialize, Serialize, Serializer};

use crate::{Error, Result, cache::CacheMode, criteria::EntityKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
	#[serde(alias = "ASC", alias = "ascending")]
	Asc,
	#[serde(alias = "DESC", alias = "descending")]
	Desc,
}

/// Paging, sorting, and free-text state of the generic grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridOptions {
	#[serde(default)]
	pub page_index: u32,
	pub page_size: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sort_property: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sort_direction: Option<SortDirection>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub search: Option<String>,
}
impl GridOptions {
	pub fn first_page(page_size: u32) -> Self {
		Self { page_size, ..Default::default() }
	}

	pub fn search_text(&self) -> &str {
		self.search.as_deref().unwrap_or_default()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortType {
	Attribute,
	Property,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
	#[serde(rename = "type")]
	pub sort_type: SortType,
	pub name: String,
	pub direction: SortDirection,
}

/// Three ways a request can leave the adapter: no opinion (the server picks its default
/// order, the field is omitted), explicitly unsorted (`null`), or sorted by a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SortOrder {
	#[default]
	ServerDefault,
	Unsorted,
	By(Sort),
}
impl SortOrder {
	pub fn is_server_default(&self) -> bool {
		matches!(self, Self::ServerDefault)
	}

	pub fn sort(&self) -> Option<&Sort> {
		match self {
			Self::By(sort) => Some(sort),
			Self::ServerDefault | Self::Unsorted => None,
		}
	}
}
impl Serialize for SortOrder {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match self {
			Self::By(sort) => sort.serialize(serializer),
			Self::ServerDefault | Self::Unsorted => serializer.serialize_none(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
	pub count: u32,
	pub from: u64,
	#[serde(skip_serializing_if = "SortOrder::is_server_default")]
	pub sort: SortOrder,
	pub cache: CacheMode,
	pub min_table_info: bool,
	pub with_experiment: bool,
	pub with_properties: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortResolution {
	Field { sort_type: SortType, name: String },
	/// Column is computed client-side; the server cannot order by it.
	Derived,
	Unmapped,
}

/// Static lookup from grid column to server-side sort field.
#[derive(Debug, Clone, Copy)]
pub struct SortMapping {
	global: bool,
}
impl SortMapping {
	pub fn new(kind: EntityKind) -> Self {
		Self { global: kind.is_global() }
	}

	pub fn resolve(&self, column: &str) -> SortResolution {
		let column = column.trim();

		if matches!(column, "entityKind" | "experiment" | "matched" | "score" | "entityObject") {
			return SortResolution::Derived;
		}

		let attribute = match column {
			"code" => Some("code"),
			"permId" => Some("permId"),
			"identifier" => Some("identifier"),
			"entityType" => Some("type"),
			"registrationDate" => Some("registrationDate"),
			"modificationDate" => Some("modificationDate"),
			_ => None,
		};
		let field = match attribute {
			Some(name) => Some((SortType::Attribute, name)),
			None if is_property_code(column) => Some((SortType::Property, column)),
			None => None,
		};

		match field {
			// Global hits come back ranked by score; no column sorts them.
			Some(_) if self.global => SortResolution::Derived,
			Some((sort_type, name)) => SortResolution::Field { sort_type, name: name.to_string() },
			None => SortResolution::Unmapped,
		}
	}

	pub fn is_sortable(&self, column: &str) -> bool {
		matches!(self.resolve(column), SortResolution::Field { .. })
	}
}

pub fn to_fetch_options(
	options: &GridOptions,
	mapping: &SortMapping,
	cache: CacheMode,
	cfg: &lims_config::Search,
) -> Result<FetchOptions> {
	if options.page_size == 0 {
		return Err(Error::InvalidRequest {
			message: "pageSize must be greater than zero.".to_string(),
		});
	}
	if options.page_size > cfg.max_page_size {
		return Err(Error::InvalidRequest {
			message: format!("pageSize must not exceed {}.", cfg.max_page_size),
		});
	}

	let sort_property = options.sort_property.as_deref().filter(|column| !column.trim().is_empty());
	let sort = match (sort_property, options.sort_direction) {
		(Some(column), Some(direction)) => match mapping.resolve(column) {
			SortResolution::Field { sort_type, name } =>
				SortOrder::By(Sort { sort_type, name, direction }),
			SortResolution::Derived => SortOrder::Unsorted,
			SortResolution::Unmapped => SortOrder::ServerDefault,
		},
		_ => SortOrder::ServerDefault,
	};

	Ok(FetchOptions {
		count: options.page_size,
		from: u64::from(options.page_index) * u64::from(options.page_size),
		sort,
		cache,
		min_table_info: cfg.min_table_info,
		with_experiment: !mapping.global,
		with_properties: true,
	})
}

/// Property codes are upper-case identifiers (`NAME`, `$PLATE_GEOMETRY`, `CELL.LINE`).
fn is_property_code(column: &str) -> bool {
	let mut chars = column.chars();

	chars.next().map(|first| first.is_ascii_uppercase() || first == '$').unwrap_or(false)
		&& chars.all(|ch| {
			ch.is_ascii_uppercase() || ch.is_ascii_digit() || matches!(ch, '_' | '.' | '$' | '-')
		})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn search_cfg() -> lims_config::Search {
		lims_config::Search {
			default_page_size: 10,
			max_page_size: 100,
			confirm_broad_queries: true,
			min_table_info: true,
			free_text_separators: " ,".to_string(),
		}
	}

	fn grid(column: Option<&str>, direction: Option<SortDirection>) -> GridOptions {
		GridOptions {
			page_index: 0,
			page_size: 10,
			sort_property: column.map(str::to_string),
			sort_direction: direction,
			search: None,
		}
	}

	fn fetch(kind: EntityKind, options: &GridOptions) -> FetchOptions {
		to_fetch_options(options, &SortMapping::new(kind), CacheMode::ReloadAndCache, &search_cfg())
			.expect("Fetch options.")
	}

	#[test]
	fn page_window_is_index_times_size() {
		let options = GridOptions { page_index: 2, page_size: 25, ..Default::default() };
		let fetch = fetch(EntityKind::Sample, &options);

		assert_eq!(fetch.from, 50);
		assert_eq!(fetch.count, 25);
	}

	#[test]
	fn derived_columns_send_explicit_null() {
		for column in ["matched", "score", "entityKind"] {
			let fetch = fetch(EntityKind::All, &grid(Some(column), Some(SortDirection::Asc)));

			assert_eq!(fetch.sort, SortOrder::Unsorted);

			let json = serde_json::to_value(&fetch).expect("Fetch options must encode.");

			assert!(json.get("sort").is_some_and(serde_json::Value::is_null));
		}
	}

	#[test]
	fn unknown_or_half_specified_sort_is_omitted() {
		let unknown = fetch(EntityKind::Sample, &grid(Some("whatever"), Some(SortDirection::Asc)));
		let no_direction = fetch(EntityKind::Sample, &grid(Some("code"), None));
		let no_column = fetch(EntityKind::Sample, &grid(None, Some(SortDirection::Desc)));

		for fetch in [unknown, no_direction, no_column] {
			assert_eq!(fetch.sort, SortOrder::ServerDefault);

			let json = serde_json::to_value(&fetch).expect("Fetch options must encode.");

			assert!(json.get("sort").is_none());
		}
	}

	#[test]
	fn attribute_and_property_columns_map_to_server_fields() {
		let by_type = fetch(EntityKind::Sample, &grid(Some("entityType"), Some(SortDirection::Desc)));
		let by_name = fetch(EntityKind::Experiment, &grid(Some("NAME"), Some(SortDirection::Asc)));

		assert_eq!(
			by_type.sort.sort(),
			Some(&Sort {
				sort_type: SortType::Attribute,
				name: "type".to_string(),
				direction: SortDirection::Desc
			})
		);
		assert_eq!(by_name.sort.sort().map(|sort| sort.sort_type), Some(SortType::Property));
	}

	#[test]
	fn identifier_is_not_sortable_under_global_search() {
		assert!(SortMapping::new(EntityKind::Sample).is_sortable("identifier"));
		assert!(!SortMapping::new(EntityKind::All).is_sortable("identifier"));
		assert_eq!(SortMapping::new(EntityKind::All).resolve("identifier"), SortResolution::Derived);
	}

	#[test]
	fn rejects_empty_or_oversized_pages() {
		let mapping = SortMapping::new(EntityKind::Sample);
		let cfg = search_cfg();

		assert!(
			to_fetch_options(&GridOptions::first_page(0), &mapping, CacheMode::Cache, &cfg).is_err()
		);
		assert!(
			to_fetch_options(&GridOptions::first_page(101), &mapping, CacheMode::Cache, &cfg)
				.is_err()
		);
	}

	#[test]
	fn projection_hints_follow_kind_and_config() {
		let typed = fetch(EntityKind::Dataset, &GridOptions::first_page(5));
		let global = fetch(EntityKind::All, &GridOptions::first_page(5));

		assert!(typed.with_experiment);
		assert!(!global.with_experiment);
		assert!(typed.min_table_info);
	}
}
