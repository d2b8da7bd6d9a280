//! Column layout of the result grid: fixed attribute columns around the dynamic property
//! columns discovered on the current page.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::{
	criteria::EntityKind,
	paging::SortMapping,
	row::Row,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridColumn {
	pub label: String,
	/// Row key the column reads.
	pub property: String,
	pub sortable: bool,
	pub exportable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultColumns {
	pub leading: Vec<GridColumn>,
	pub trailing: Vec<GridColumn>,
}

pub fn result_columns(is_global: bool) -> ResultColumns {
	let mapping = mapping(is_global);
	let mut leading = vec![
		column(&mapping, "Entity Kind", "entityKind"),
		column(&mapping, "Entity Type", "entityType"),
		column(&mapping, "Name", "NAME"),
		column(&mapping, "Code", "code"),
		column(&mapping, "Identifier", "identifier"),
		column(&mapping, "Experiment", "experiment"),
	];

	if is_global {
		leading.push(column(&mapping, "Matched", "matched"));
		leading.push(column(&mapping, "Score", "score"));
	}

	let trailing = vec![
		column(&mapping, "Registration Date", "registrationDate"),
		column(&mapping, "Modification Date", "modificationDate"),
	];

	ResultColumns { leading, trailing }
}

/// One column per property code that carries a value somewhere on the page, minus hidden codes,
/// ordered by label.
pub fn property_columns(
	rows: &[Row],
	labels: &HashMap<String, String>,
	hidden: &[String],
	is_global: bool,
) -> Vec<GridColumn> {
	let mapping = mapping(is_global);
	let codes: BTreeSet<&str> = rows
		.iter()
		.flat_map(|row| row.properties.iter())
		.filter(|(_, value)| !value.trim().is_empty())
		.map(|(code, _)| code.as_str())
		.filter(|code| !hidden.iter().any(|hidden| hidden.eq_ignore_ascii_case(code)))
		.collect();
	let mut columns: Vec<GridColumn> = codes
		.into_iter()
		.map(|code| {
			let label = labels
				.get(code)
				.map(|label| label.trim())
				.filter(|label| !label.is_empty())
				.unwrap_or(code);

			column(&mapping, label, code)
		})
		.collect();

	columns.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.property.cmp(&b.property)));

	columns
}

/// Full column list for a page: leading, property, then trailing columns.
pub fn grid_columns(rows: &[Row], grid: &lims_config::Grid, is_global: bool) -> Vec<GridColumn> {
	let ResultColumns { leading, trailing } = result_columns(is_global);
	let properties =
		property_columns(rows, &grid.property_labels, &grid.hidden_property_codes, is_global);

	leading.into_iter().chain(properties).chain(trailing).collect()
}

fn mapping(is_global: bool) -> SortMapping {
	SortMapping::new(if is_global { EntityKind::All } else { EntityKind::Sample })
}

fn column(mapping: &SortMapping, label: &str, property: &str) -> GridColumn {
	GridColumn {
		label: label.to_string(),
		property: property.to_string(),
		sortable: mapping.is_sortable(property),
		exportable: true,
	}
}
