//! The user's filter intent: entity kind, logical operator, and a flat rule set.

use std::{
	fmt::{Display, Formatter},
	str::FromStr,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, cache::CacheState};

pub const WILDCARD: &str = "*";
pub const SAMPLE_TYPE_FIELD: &str = "ATTR.SAMPLE_TYPE";

const KIND_TYPE_SEPARATOR: char = '$';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
	Sample,
	Experiment,
	Dataset,
	All,
}
impl EntityKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Sample => "SAMPLE",
			Self::Experiment => "EXPERIMENT",
			Self::Dataset => "DATASET",
			Self::All => "ALL",
		}
	}

	pub fn is_global(self) -> bool {
		matches!(self, Self::All)
	}
}
impl Display for EntityKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for EntityKind {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_uppercase().as_str() {
			"SAMPLE" => Ok(Self::Sample),
			"EXPERIMENT" => Ok(Self::Experiment),
			"DATASET" | "DATA_SET" => Ok(Self::Dataset),
			"ALL" => Ok(Self::All),
			other => Err(Error::InvalidRequest {
				message: format!("Unknown entity kind '{other}'."),
			}),
		}
	}
}

/// Value of the "Search For" selector: a kind, optionally pinned to one sample type
/// (`SAMPLE$<TYPE_CODE>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindSelector {
	pub kind: EntityKind,
	pub sample_type: Option<String>,
}
impl KindSelector {
	pub fn kind(kind: EntityKind) -> Self {
		Self { kind, sample_type: None }
	}

	pub fn parse(raw: &str) -> Result<Self> {
		let Some((kind, sample_type)) = raw.split_once(KIND_TYPE_SEPARATOR) else {
			return Ok(Self::kind(raw.parse()?));
		};
		let kind: EntityKind = kind.parse()?;
		let sample_type = sample_type.trim();

		if kind != EntityKind::Sample {
			return Err(Error::InvalidRequest {
				message: format!("Only samples can be narrowed to a type, got '{raw}'."),
			});
		}
		if sample_type.is_empty() {
			return Err(Error::InvalidRequest {
				message: "Sample type in kind selector must be non-empty.".to_string(),
			});
		}

		Ok(Self { kind, sample_type: Some(sample_type.to_string()) })
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicalOperator {
	#[default]
	And,
	Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleType {
	Attribute,
	Property,
	#[serde(rename = "Property/Attribute", alias = "PropertyOrAttribute")]
	PropertyOrAttribute,
	All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleOperator {
	ThatEquals,
	#[default]
	ThatContains,
	ThatContainsString,
	ThatStartsWith,
	ThatEndsWith,
	ThatIsLessThan,
	ThatIsGreaterThan,
	ThatIsEarlierThanOrEqualToDate,
	ThatIsLaterThanOrEqualToDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);
impl RuleId {
	pub fn generate() -> Self {
		Self(Uuid::new_v4().to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for RuleId {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}
impl From<&str> for RuleId {
	fn from(raw: &str) -> Self {
		Self(raw.to_string())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
	#[serde(rename = "type")]
	pub rule_type: RuleType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default)]
	pub operator: RuleOperator,
	#[serde(default)]
	pub value: Option<String>,
}
impl Rule {
	pub fn all(value: impl Into<String>) -> Self {
		Self {
			rule_type: RuleType::All,
			name: None,
			operator: RuleOperator::ThatContains,
			value: Some(value.into()),
		}
	}

	pub fn empty() -> Self {
		Self { rule_type: RuleType::All, name: None, operator: RuleOperator::ThatContains, value: None }
	}

	pub fn attribute(
		name: impl Into<String>,
		operator: RuleOperator,
		value: impl Into<String>,
	) -> Self {
		Self {
			rule_type: RuleType::Attribute,
			name: Some(name.into()),
			operator,
			value: Some(value.into()),
		}
	}

	pub fn property(
		name: impl Into<String>,
		operator: RuleOperator,
		value: impl Into<String>,
	) -> Self {
		Self {
			rule_type: RuleType::Property,
			name: Some(name.into()),
			operator,
			value: Some(value.into()),
		}
	}

	/// Trimmed value, or `None` when the rule does not constrain anything.
	pub fn effective_value(&self) -> Option<&str> {
		self.value.as_deref().map(str::trim).filter(|value| !value.is_empty() && *value != WILDCARD)
	}

	pub fn is_constraining(&self) -> bool {
		self.effective_value().is_some()
	}

	fn validate(&self) -> Result<()> {
		if self.rule_type == RuleType::All {
			return Ok(());
		}
		if self.name.as_deref().map(|name| name.trim().is_empty()).unwrap_or(true) {
			return Err(Error::InvalidRequest {
				message: format!("Rule of type {:?} requires a field name.", self.rule_type),
			});
		}

		Ok(())
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CriteriaDocument")]
pub struct Criteria {
	entity_kind: EntityKind,
	logical_operator: LogicalOperator,
	#[serde(serialize_with = "rule_map::serialize")]
	rules: Vec<(RuleId, Rule)>,
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	sample_type_forced: bool,
	#[serde(skip)]
	pub(crate) cache: CacheState,
}
impl Criteria {
	/// Fresh criteria holding one empty `All` rule, ready for the user to fill in.
	pub fn new(entity_kind: EntityKind) -> Self {
		Self {
			entity_kind,
			logical_operator: default_operator(entity_kind),
			rules: vec![(RuleId::generate(), Rule::empty())],
			sample_type_forced: false,
			cache: CacheState::default(),
		}
	}

	/// Criteria without any rule; callers add their own.
	pub fn empty(entity_kind: EntityKind) -> Self {
		Self { rules: Vec::new(), ..Self::new(entity_kind) }
	}

	pub fn entity_kind(&self) -> EntityKind {
		self.entity_kind
	}

	pub fn logical_operator(&self) -> LogicalOperator {
		self.logical_operator
	}

	pub fn sample_type_forced(&self) -> bool {
		self.sample_type_forced
	}

	/// Sample type pinned by an `ATTR.SAMPLE_TYPE thatEquals <code>` rule, if any.
	pub fn forced_sample_type(&self) -> Option<&str> {
		self.rules
			.iter()
			.map(|(_, rule)| rule)
			.filter(|rule| {
				rule.rule_type == RuleType::Attribute
					&& rule.name.as_deref() == Some(SAMPLE_TYPE_FIELD)
					&& rule.operator == RuleOperator::ThatEquals
			})
			.find_map(Rule::effective_value)
	}

	pub fn cache_state(&self) -> &CacheState {
		&self.cache
	}

	pub fn set_logical_operator(&mut self, operator: LogicalOperator) -> Result<()> {
		if self.entity_kind.is_global() && operator != LogicalOperator::Or {
			return Err(Error::InvalidRequest {
				message: "Global search always joins rules with OR.".to_string(),
			});
		}

		self.logical_operator = operator;

		Ok(())
	}

	pub fn rules(&self) -> impl Iterator<Item = (&RuleId, &Rule)> {
		self.rules.iter().map(|(id, rule)| (id, rule))
	}

	pub fn rule(&self, id: &RuleId) -> Option<&Rule> {
		self.rules.iter().find(|(existing, _)| existing == id).map(|(_, rule)| rule)
	}

	pub fn rule_count(&self) -> usize {
		self.rules.len()
	}

	/// Inserts `rule` under `id`, replacing any rule already stored there.
	pub fn add_rule(&mut self, id: RuleId, rule: Rule) -> Result<()> {
		rule.validate()?;

		match self.rules.iter_mut().find(|(existing, _)| *existing == id) {
			Some((_, slot)) => *slot = rule,
			None => self.rules.push((id, rule)),
		}

		Ok(())
	}

	pub fn push_rule(&mut self, rule: Rule) -> Result<RuleId> {
		let id = RuleId::generate();

		self.add_rule(id.clone(), rule)?;

		Ok(id)
	}

	pub fn set_rule_value(&mut self, id: &RuleId, value: Option<String>) -> Result<()> {
		let (_, rule) =
			self.rules.iter_mut().find(|(existing, _)| existing == id).ok_or_else(|| {
				Error::InvalidRequest { message: format!("Unknown rule id '{id}'.") }
			})?;

		rule.value = value;

		Ok(())
	}

	pub fn remove_rule(&mut self, id: &RuleId) -> Result<Rule> {
		let index = self.rules.iter().position(|(existing, _)| existing == id).ok_or_else(|| {
			Error::InvalidRequest { message: format!("Unknown rule id '{id}'.") }
		})?;

		if self.rules.len() == 1 {
			return Err(Error::InvalidRequest {
				message: "There must be at least one rule of search criteria present.".to_string(),
			});
		}

		Ok(self.rules.remove(index).1)
	}

	/// True when no rule narrows the result set, i.e. the query would scan the whole inventory.
	pub fn is_broad(&self) -> bool {
		self.rules.iter().all(|(_, rule)| !rule.is_constraining())
	}

	pub fn is_all_rules(&self) -> bool {
		self.rules.iter().all(|(_, rule)| rule.rule_type == RuleType::All)
	}

	/// Switches the searched kind. Free-text rules survive a switch; typed rules do not, since
	/// their field names belong to the previous kind.
	pub fn select_kind(&mut self, selector: &KindSelector) {
		if self.is_all_rules() {
			self.entity_kind = selector.kind;
			self.logical_operator = default_operator(selector.kind);
		} else {
			*self = Self::new(selector.kind);
		}

		match selector.sample_type.as_deref() {
			Some(sample_type) => {
				self.rules.push((
					RuleId::generate(),
					Rule::attribute(SAMPLE_TYPE_FIELD, RuleOperator::ThatEquals, sample_type),
				));
				self.sample_type_forced = true;
			},
			None => self.sample_type_forced = false,
		}
	}

	/// Request-scoped copy with one `All` rule per free-text token. `self` is left untouched.
	pub fn with_free_text_tokens(&self, tokens: &[String]) -> Self {
		let mut derived = Self { cache: CacheState::default(), ..self.clone() };

		for token in tokens {
			let token = token.trim();

			if !token.is_empty() {
				derived.rules.push((RuleId::generate(), Rule::all(token)));
			}
		}

		derived
	}

	/// Constraining rule values joined into the single text a global search accepts.
	pub fn global_text(&self) -> String {
		self.rules.iter().filter_map(|(_, rule)| rule.effective_value()).collect::<Vec<_>>().join(" ")
	}

	/// Canonical JSON of what the criteria asks for: rules sorted by id, cache state excluded.
	pub fn canonical_value(&self) -> serde_json::Value {
		let mut rules: Vec<_> = self.rules.iter().collect();

		rules.sort_by(|(a, _), (b, _)| a.cmp(b));

		serde_json::json!({
			"entityKind": self.entity_kind,
			"logicalOperator": self.logical_operator,
			"rules": rules
				.into_iter()
				.map(|(id, rule)| serde_json::json!({ "id": id, "rule": rule }))
				.collect::<Vec<_>>(),
		})
	}
}

/// Criteria as stored on disk, checked by [`Criteria::try_from`] against the same rules the
/// mutators apply.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CriteriaDocument {
	entity_kind: EntityKind,
	#[serde(default)]
	logical_operator: Option<LogicalOperator>,
	#[serde(default, deserialize_with = "rule_map::deserialize")]
	rules: Vec<(RuleId, Rule)>,
	#[serde(default)]
	sample_type_forced: bool,
}

impl TryFrom<CriteriaDocument> for Criteria {
	type Error = Error;

	fn try_from(document: CriteriaDocument) -> Result<Self> {
		let mut criteria = Self { rules: document.rules, ..Self::new(document.entity_kind) };

		if let Some(operator) = document.logical_operator {
			criteria.set_logical_operator(operator)?;
		}
		if document.sample_type_forced {
			if criteria.entity_kind != EntityKind::Sample {
				return Err(Error::InvalidRequest {
					message: format!(
						"Only sample criteria can force a sample type, got {}.",
						criteria.entity_kind
					),
				});
			}
			if criteria.forced_sample_type().is_none() {
				return Err(Error::InvalidRequest {
					message: format!("Forced sample type needs a {SAMPLE_TYPE_FIELD} equality rule."),
				});
			}

			criteria.sample_type_forced = true;
		}

		Ok(criteria)
	}
}

/// Splits the grid's free-text box into search tokens.
#[derive(Debug, Clone)]
pub struct TokenSplitter {
	pattern: Regex,
}
impl TokenSplitter {
	pub fn new(separators: &str) -> Result<Self> {
		if separators.is_empty() {
			return Err(Error::InvalidRequest {
				message: "Token separators must be non-empty.".to_string(),
			});
		}

		let whitespace = if separators.chars().any(char::is_whitespace) { r"\s" } else { "" };
		let escaped: String = separators
			.chars()
			.filter(|ch| !ch.is_whitespace())
			.map(|ch| regex::escape(ch.encode_utf8(&mut [0; 4])))
			.collect();
		let pattern = Regex::new(&format!("[{whitespace}{escaped}]+")).map_err(|err| {
			Error::InvalidRequest { message: format!("Invalid token separators: {err}") }
		})?;

		Ok(Self { pattern })
	}

	pub fn split(&self, text: &str) -> Vec<String> {
		self.pattern
			.split(text)
			.map(str::trim)
			.filter(|token| !token.is_empty())
			.map(str::to_string)
			.collect()
	}
}

fn default_operator(kind: EntityKind) -> LogicalOperator {
	if kind.is_global() { LogicalOperator::Or } else { LogicalOperator::And }
}

mod rule_map {
	use std::collections::BTreeMap;

	use serde::{Deserialize, Deserializer, Serializer, ser::SerializeMap};

	use super::{Rule, RuleId};

	pub fn serialize<S>(rules: &[(RuleId, Rule)], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut map = serializer.serialize_map(Some(rules.len()))?;

		for (id, rule) in rules {
			map.serialize_entry(id, rule)?;
		}

		map.end()
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(RuleId, Rule)>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let rules = BTreeMap::<RuleId, Rule>::deserialize(deserializer)?;

		for rule in rules.values() {
			rule.validate().map_err(serde::de::Error::custom)?;
		}

		Ok(rules.into_iter().collect())
	}
}
