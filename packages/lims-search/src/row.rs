//! Row Normalizer: every search path funnels its raw results through here so that one grid
//! renderer can consume samples, experiments, data sets, and global hits alike.

use std::{borrow::Cow, collections::BTreeMap};

use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

use crate::{
	Error, Result,
	entity::{DataSet, Entity, Experiment, GlobalHit, GlobalObjectKind, Sample},
	time_serde,
};

/// Top-level row keys owned by the normalizer. A property whose code equals one of these is
/// shadowed in the flat view and only reachable through [`Row::property`].
pub const COMMON_FIELDS: [&str; 13] = [
	"entityKind",
	"entityType",
	"code",
	"permId",
	"identifier",
	"registrator",
	"registrationDate",
	"modifier",
	"modificationDate",
	"experiment",
	"matched",
	"score",
	"entityObject",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowKind {
	Sample,
	Experiment,
	DataSet,
}
impl RowKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Sample => "SAMPLE",
			Self::Experiment => "EXPERIMENT",
			Self::DataSet => "DATA_SET",
		}
	}
}

/// Raw remote result, tagged by the search path that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchHit {
	Sample(Sample),
	Experiment(Experiment),
	DataSet(DataSet),
	Global(GlobalHit),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
	/// The hit is of a kind the grid cannot show (materials).
	Unsupported(GlobalObjectKind),
	/// The envelope did not carry the entity its tag announced.
	EmptyEnvelope(GlobalObjectKind),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
	Row(Box<Row>),
	Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
	pub entity_kind: RowKind,
	pub entity_type: Option<String>,
	pub code: String,
	pub perm_id: String,
	pub identifier: Option<String>,
	pub registrator: Option<String>,
	pub registration_date: Option<String>,
	pub modifier: Option<String>,
	pub modification_date: Option<String>,
	pub experiment: Option<String>,
	pub properties: BTreeMap<String, String>,
	pub matched: Option<String>,
	pub score: Option<f64>,
	pub entity_object: Entity,
}
impl Row {
	pub fn property(&self, code: &str) -> Option<&str> {
		self.properties.get(code).map(String::as_str)
	}

	/// Value under a flat row key, resolved the way the serialized row resolves it.
	pub fn field(&self, key: &str) -> Option<Cow<'_, str>> {
		match key {
			"entityKind" => Some(Cow::Borrowed(self.entity_kind.as_str())),
			"entityType" => borrowed(&self.entity_type),
			"code" => Some(Cow::Borrowed(&self.code)),
			"permId" => Some(Cow::Borrowed(&self.perm_id)),
			"identifier" => borrowed(&self.identifier),
			"registrator" => borrowed(&self.registrator),
			"registrationDate" => borrowed(&self.registration_date),
			"modifier" => borrowed(&self.modifier),
			"modificationDate" => borrowed(&self.modification_date),
			"experiment" => borrowed(&self.experiment),
			"matched" => borrowed(&self.matched),
			"score" => self.score.map(|score| Cow::Owned(score.to_string())),
			"entityObject" => None,
			code => self.property(code).map(Cow::Borrowed),
		}
	}
}
impl Serialize for Row {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut map = serializer.serialize_map(None)?;

		map.serialize_entry("entityKind", &self.entity_kind)?;
		map.serialize_entry("code", &self.code)?;
		map.serialize_entry("permId", &self.perm_id)?;

		for (key, value) in [
			("entityType", &self.entity_type),
			("identifier", &self.identifier),
			("registrator", &self.registrator),
			("registrationDate", &self.registration_date),
			("modifier", &self.modifier),
			("modificationDate", &self.modification_date),
			("experiment", &self.experiment),
			("matched", &self.matched),
		] {
			if let Some(value) = value {
				map.serialize_entry(key, value)?;
			}
		}

		if let Some(score) = self.score {
			map.serialize_entry("score", &score)?;
		}

		for (code, value) in &self.properties {
			if !COMMON_FIELDS.contains(&code.as_str()) {
				map.serialize_entry(code, value)?;
			}
		}

		map.serialize_entry("entityObject", &self.entity_object)?;
		map.end()
	}
}

pub fn normalize(hit: SearchHit) -> Result<Normalized> {
	match hit {
		SearchHit::Sample(sample) => normalize_sample(sample),
		SearchHit::Experiment(experiment) => normalize_experiment(experiment),
		SearchHit::DataSet(data_set) => normalize_data_set(data_set),
		SearchHit::Global(hit) => normalize_global(hit),
	}
}

/// Normalizes a whole page. Skipped hits are dropped silently; malformed ones are dropped
/// with a warning so one bad entity does not cost the caller the page.
pub fn normalize_page<I>(hits: I) -> Vec<Row>
where
	I: IntoIterator<Item = SearchHit>,
{
	let mut rows = Vec::new();

	for hit in hits {
		match normalize(hit) {
			Ok(Normalized::Row(row)) => rows.push(*row),
			Ok(Normalized::Skipped(reason)) => {
				tracing::debug!(?reason, "Skipped search hit.");
			},
			Err(err) => {
				tracing::warn!(error = %err, "Dropped malformed search hit.");
			},
		}
	}

	rows
}

fn normalize_sample(sample: Sample) -> Result<Normalized> {
	build_row(RowKind::Sample, Entity::Sample(sample)).map(boxed)
}

fn normalize_experiment(experiment: Experiment) -> Result<Normalized> {
	build_row(RowKind::Experiment, Entity::Experiment(experiment)).map(boxed)
}

fn normalize_data_set(data_set: DataSet) -> Result<Normalized> {
	build_row(RowKind::DataSet, Entity::DataSet(data_set)).map(boxed)
}

fn normalize_global(hit: GlobalHit) -> Result<Normalized> {
	let GlobalHit { object_kind, sample, experiment, data_set, matched, score, .. } = hit;
	let entity = match object_kind {
		GlobalObjectKind::Sample => sample.map(|sample| (RowKind::Sample, Entity::Sample(sample))),
		GlobalObjectKind::Experiment => experiment
			.map(|experiment| (RowKind::Experiment, Entity::Experiment(experiment))),
		GlobalObjectKind::DataSet =>
			data_set.map(|data_set| (RowKind::DataSet, Entity::DataSet(data_set))),
		GlobalObjectKind::Material =>
			return Ok(Normalized::Skipped(SkipReason::Unsupported(object_kind))),
	};
	let Some((kind, entity)) = entity else {
		return Ok(Normalized::Skipped(SkipReason::EmptyEnvelope(object_kind)));
	};
	let mut row = build_row(kind, entity)?;

	row.matched = matched;
	row.score = Some(score);

	Ok(boxed(row))
}

fn build_row(entity_kind: RowKind, entity: Entity) -> Result<Row> {
	let core = entity.core();
	let code = required(core.code(), entity_kind, "code")?;
	let perm_id = required(core.perm_id(), entity_kind, "permId")?;

	Ok(Row {
		entity_kind,
		entity_type: core.type_code().map(str::to_string),
		identifier: core.identifier().map(str::to_string),
		registrator: core.registrator.as_ref().map(|person| person.user_id.clone()),
		registration_date: core.registration_date.as_ref().map(time_serde::display),
		modifier: core.modifier.as_ref().map(|person| person.user_id.clone()),
		modification_date: core.modification_date.as_ref().map(time_serde::display),
		experiment: entity.experiment_identifier().map(str::to_string),
		properties: core.properties.clone(),
		matched: None,
		score: None,
		code,
		perm_id,
		entity_object: entity,
	})
}

fn required(value: Option<&str>, kind: RowKind, field: &str) -> Result<String> {
	value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string).ok_or_else(|| {
		Error::MalformedEntity { message: format!("{} is missing {field}.", kind.as_str()) }
	})
}

fn borrowed(value: &Option<String>) -> Option<Cow<'_, str>> {
	value.as_deref().map(Cow::Borrowed)
}

fn boxed(row: Row) -> Normalized {
	Normalized::Row(Box::new(row))
}
