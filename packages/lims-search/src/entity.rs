//! Data shapes returned by the remote entity service. Only the fields the search engine reads
//! are modelled; anything else in a payload is ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermId {
	pub perm_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
	pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRef {
	pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
	pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub code: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub perm_id: Option<PermId>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub identifier: Option<Identifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRef {
	pub code: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub perm_id: Option<PermId>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub identifier: Option<Identifier>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub space: Option<CodeRef>,
}

/// Attributes shared by every searchable entity. `code` and `permId` are optional on the
/// wire so that a truncated payload still decodes; the row normalizer rejects such entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityCore {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub code: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub perm_id: Option<PermId>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub identifier: Option<Identifier>,
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub entity_type: Option<CodeRef>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub registrator: Option<Person>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub modifier: Option<Person>,
	#[serde(default, with = "crate::time_serde::option", skip_serializing_if = "Option::is_none")]
	pub registration_date: Option<OffsetDateTime>,
	#[serde(default, with = "crate::time_serde::option", skip_serializing_if = "Option::is_none")]
	pub modification_date: Option<OffsetDateTime>,
	#[serde(default)]
	pub properties: BTreeMap<String, String>,
}
impl EntityCore {
	pub fn code(&self) -> Option<&str> {
		self.code.as_deref()
	}

	pub fn perm_id(&self) -> Option<&str> {
		self.perm_id.as_ref().map(|perm_id| perm_id.perm_id.as_str())
	}

	pub fn identifier(&self) -> Option<&str> {
		self.identifier.as_ref().map(|identifier| identifier.identifier.as_str())
	}

	pub fn type_code(&self) -> Option<&str> {
		self.entity_type.as_ref().map(|entity_type| entity_type.code.as_str())
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
	#[serde(flatten)]
	pub core: EntityCore,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub space: Option<CodeRef>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub experiment: Option<EntityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
	#[serde(flatten)]
	pub core: EntityCore,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub project: Option<ProjectRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSet {
	#[serde(flatten)]
	pub core: EntityCore,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub experiment: Option<EntityRef>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sample: Option<EntityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
	#[serde(flatten)]
	pub core: EntityCore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GlobalObjectKind {
	Sample,
	Experiment,
	DataSet,
	Material,
}

/// One global full-text hit. Exactly one of the entity slots is expected to match
/// `object_kind`; the others stay empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalHit {
	pub object_kind: GlobalObjectKind,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sample: Option<Sample>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub experiment: Option<Experiment>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data_set: Option<DataSet>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub material: Option<Material>,
	#[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
	pub matched: Option<String>,
	#[serde(default)]
	pub score: f64,
}

/// A supported entity after any global-search envelope has been removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entity {
	Sample(Sample),
	Experiment(Experiment),
	DataSet(DataSet),
}
impl Entity {
	pub fn core(&self) -> &EntityCore {
		match self {
			Self::Sample(sample) => &sample.core,
			Self::Experiment(experiment) => &experiment.core,
			Self::DataSet(data_set) => &data_set.core,
		}
	}

	/// Identifier of the owning experiment, when the entity has one.
	pub fn experiment_identifier(&self) -> Option<&str> {
		let experiment = match self {
			Self::Sample(sample) => sample.experiment.as_ref(),
			Self::DataSet(data_set) => data_set.experiment.as_ref(),
			Self::Experiment(_) => None,
		}?;

		experiment
			.identifier
			.as_ref()
			.map(|identifier| identifier.identifier.as_str())
			.or(experiment.code.as_deref())
	}
}

/// One page of remote results; `total_count` covers every match, not just this page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage<T> {
	pub objects: Vec<T>,
	pub total_count: u64,
}
