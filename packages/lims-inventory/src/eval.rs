//! Server-side criteria evaluation over snapshot entities.

use std::cmp::Ordering;

use lims_search::{
	Criteria, DataSet, EntityKind, Error, Experiment, LogicalOperator, Result, Rule,
	RuleOperator, RuleType, Sample, Sort, SortDirection, SortType,
	entity::{EntityCore, EntityRef},
	fields::FieldName,
	time_serde,
};

const COMMON_ATTRIBUTES: [&str; 8] = [
	"CODE",
	"PERM_ID",
	"IDENTIFIER",
	"TYPE",
	"REGISTRATOR",
	"MODIFIER",
	"REGISTRATION_DATE",
	"MODIFICATION_DATE",
];

/// An entity the inventory can filter, sort, and project.
pub(crate) trait Searchable
where
	Self: Clone,
{
	const KIND: EntityKind;
	/// Kind-specific alias of the `TYPE` attribute.
	const TYPE_ATTRIBUTE: &'static str;
	const EXTRA_ATTRIBUTES: &'static [&'static str];

	fn core(&self) -> &EntityCore;

	fn core_mut(&mut self) -> &mut EntityCore;

	fn extra_attribute(&self, name: &str) -> Option<String>;

	fn drop_experiment(&mut self) {}
}
impl Searchable for Sample {
	const EXTRA_ATTRIBUTES: &'static [&'static str] = &["SPACE", "EXPERIMENT"];
	const KIND: EntityKind = EntityKind::Sample;
	const TYPE_ATTRIBUTE: &'static str = "SAMPLE_TYPE";

	fn core(&self) -> &EntityCore {
		&self.core
	}

	fn core_mut(&mut self) -> &mut EntityCore {
		&mut self.core
	}

	fn extra_attribute(&self, name: &str) -> Option<String> {
		match name {
			"SPACE" => self.space.as_ref().map(|space| space.code.clone()),
			"EXPERIMENT" => self.experiment.as_ref().and_then(reference_text),
			_ => None,
		}
	}

	fn drop_experiment(&mut self) {
		self.experiment = None;
	}
}
impl Searchable for Experiment {
	const EXTRA_ATTRIBUTES: &'static [&'static str] =
		&["PROJECT", "PROJECT_PERM_ID", "PROJECT_SPACE"];
	const KIND: EntityKind = EntityKind::Experiment;
	const TYPE_ATTRIBUTE: &'static str = "EXPERIMENT_TYPE";

	fn core(&self) -> &EntityCore {
		&self.core
	}

	fn core_mut(&mut self) -> &mut EntityCore {
		&mut self.core
	}

	fn extra_attribute(&self, name: &str) -> Option<String> {
		let project = self.project.as_ref()?;

		match name {
			"PROJECT" => Some(project.code.clone()),
			"PROJECT_PERM_ID" => project.perm_id.as_ref().map(|perm_id| perm_id.perm_id.clone()),
			"PROJECT_SPACE" => project.space.as_ref().map(|space| space.code.clone()),
			_ => None,
		}
	}
}
impl Searchable for DataSet {
	const EXTRA_ATTRIBUTES: &'static [&'static str] = &["EXPERIMENT", "SAMPLE"];
	const KIND: EntityKind = EntityKind::Dataset;
	const TYPE_ATTRIBUTE: &'static str = "DATA_SET_TYPE";

	fn core(&self) -> &EntityCore {
		&self.core
	}

	fn core_mut(&mut self) -> &mut EntityCore {
		&mut self.core
	}

	fn extra_attribute(&self, name: &str) -> Option<String> {
		match name {
			"EXPERIMENT" => self.experiment.as_ref().and_then(reference_text),
			"SAMPLE" => self.sample.as_ref().and_then(reference_text),
			_ => None,
		}
	}

	fn drop_experiment(&mut self) {
		self.experiment = None;
	}
}

/// Rejects criteria the inventory cannot answer: a kind mismatch or an unknown attribute name.
pub(crate) fn validate<T>(criteria: &Criteria) -> Result<()>
where
	T: Searchable,
{
	if criteria.entity_kind() != T::KIND {
		return Err(Error::InvalidRequest {
			message: format!(
				"Criteria for {} sent to the {} search.",
				criteria.entity_kind(),
				T::KIND
			),
		});
	}

	for (id, rule) in criteria.rules() {
		let Some(name) = rule.name.as_deref() else { continue };
		let field = FieldName::parse(name);
		let attribute = match (rule.rule_type, field) {
			(RuleType::Attribute, field) => Some(field.name()),
			(RuleType::PropertyOrAttribute, FieldName::Attribute(name)) => Some(name),
			_ => None,
		};

		if let Some(attribute) = attribute
			&& !is_known_attribute::<T>(&attribute.to_ascii_uppercase())
		{
			return Err(Error::InvalidRequest {
				message: format!("Rule {id} uses unknown {} attribute '{name}'.", T::KIND),
			});
		}
	}

	Ok(())
}

pub(crate) fn matches<T>(entity: &T, criteria: &Criteria) -> bool
where
	T: Searchable,
{
	let mut constraining =
		criteria.rules().map(|(_, rule)| rule).filter(|rule| rule.is_constraining());

	match criteria.logical_operator() {
		LogicalOperator::And => constraining.all(|rule| rule_matches(entity, rule)),
		LogicalOperator::Or => {
			let mut any = false;

			for rule in constraining {
				if rule_matches(entity, rule) {
					return true;
				}

				any = true;
			}

			// Only blank rules: nothing narrows the result set.
			!any
		},
	}
}

pub(crate) fn attribute<T>(entity: &T, name: &str) -> Option<String>
where
	T: Searchable,
{
	let core = entity.core();

	match name {
		"CODE" => core.code().map(str::to_string),
		"PERM_ID" => core.perm_id().map(str::to_string),
		"IDENTIFIER" => core.identifier().map(str::to_string),
		"REGISTRATOR" => core.registrator.as_ref().map(|person| person.user_id.clone()),
		"MODIFIER" => core.modifier.as_ref().map(|person| person.user_id.clone()),
		"REGISTRATION_DATE" => core.registration_date.as_ref().map(time_serde::display),
		"MODIFICATION_DATE" => core.modification_date.as_ref().map(time_serde::display),
		name if name == "TYPE" || name == T::TYPE_ATTRIBUTE => core.type_code().map(str::to_string),
		name => entity.extra_attribute(name),
	}
}

pub(crate) fn property<'a>(core: &'a EntityCore, code: &str) -> Option<&'a str> {
	core.properties.get(code).map(String::as_str).or_else(|| {
		core.properties
			.iter()
			.find(|(candidate, _)| candidate.eq_ignore_ascii_case(code))
			.map(|(_, value)| value.as_str())
	})
}

/// Orders `indices` into `entities`. Entities without the sort key go last in either direction;
/// ties fall back to the code.
pub(crate) fn sort_indices<T>(entities: &[T], indices: &mut [usize], sort: &Sort)
where
	T: Searchable,
{
	indices.sort_by_cached_key(|&index| SortKey {
		value: sort_value(&entities[index], sort),
		code: entities[index].core().code().unwrap_or_default().to_string(),
		direction: sort.direction,
	});
}

fn compare_values(a: &str, b: &str) -> Ordering {
	match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
		(Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
		_ => a.to_lowercase().cmp(&b.to_lowercase()),
	}
}

fn is_known_attribute<T>(name: &str) -> bool
where
	T: Searchable,
{
	COMMON_ATTRIBUTES.contains(&name)
		|| name == T::TYPE_ATTRIBUTE
		|| T::EXTRA_ATTRIBUTES.contains(&name)
}

fn rule_matches<T>(entity: &T, rule: &Rule) -> bool
where
	T: Searchable,
{
	let Some(expected) = rule.effective_value() else { return true };

	if rule.rule_type == RuleType::All {
		return searchable_values(entity)
			.iter()
			.any(|actual| operator_matches(rule.operator, actual, expected));
	}

	let Some(name) = rule.name.as_deref() else { return false };
	let actual = match (rule.rule_type, FieldName::parse(name)) {
		(RuleType::Attribute, field) => attribute(entity, &field.name().to_ascii_uppercase()),
		(RuleType::Property, field) => property(entity.core(), field.name()).map(str::to_string),
		(_, FieldName::Attribute(name)) => attribute(entity, &name.to_ascii_uppercase()),
		(_, FieldName::Property(code)) => property(entity.core(), code).map(str::to_string),
		(_, FieldName::Bare(name)) => {
			let upper = name.to_ascii_uppercase();

			if is_known_attribute::<T>(&upper) {
				attribute(entity, &upper)
			} else {
				property(entity.core(), name).map(str::to_string)
			}
		},
	};

	actual.is_some_and(|actual| operator_matches(rule.operator, &actual, expected))
}

fn searchable_values<T>(entity: &T) -> Vec<String>
where
	T: Searchable,
{
	let core = entity.core();

	[core.code(), core.perm_id(), core.identifier(), core.type_code()]
		.into_iter()
		.flatten()
		.chain(core.properties.values().map(String::as_str))
		.map(str::to_string)
		.collect()
}

fn operator_matches(operator: RuleOperator, actual: &str, expected: &str) -> bool {
	let actual_lower = actual.trim().to_lowercase();
	let expected_lower = expected.trim().to_lowercase();

	match operator {
		RuleOperator::ThatEquals => actual_lower == expected_lower,
		RuleOperator::ThatContains | RuleOperator::ThatContainsString =>
			actual_lower.contains(&expected_lower),
		RuleOperator::ThatStartsWith => actual_lower.starts_with(&expected_lower),
		RuleOperator::ThatEndsWith => actual_lower.ends_with(&expected_lower),
		RuleOperator::ThatIsLessThan => compare_values(actual, expected) == Ordering::Less,
		RuleOperator::ThatIsGreaterThan => compare_values(actual, expected) == Ordering::Greater,
		RuleOperator::ThatIsEarlierThanOrEqualToDate =>
			date_part(actual).zip(date_part(expected)).is_some_and(|(a, b)| a <= b),
		RuleOperator::ThatIsLaterThanOrEqualToDate =>
			date_part(actual).zip(date_part(expected)).is_some_and(|(a, b)| a >= b),
	}
}

/// `YYYY-MM-DD` prefix of a display or RFC 3339 timestamp.
fn date_part(value: &str) -> Option<&str> {
	let date = value.trim().get(..10)?;
	let bytes = date.as_bytes();
	let well_formed = bytes.iter().enumerate().all(|(index, byte)| match index {
		4 | 7 => *byte == b'-',
		_ => byte.is_ascii_digit(),
	});

	well_formed.then_some(date)
}

fn sort_value<T>(entity: &T, sort: &Sort) -> Option<String>
where
	T: Searchable,
{
	match sort.sort_type {
		SortType::Attribute => {
			let name = match sort.name.as_str() {
				"code" => "CODE",
				"permId" => "PERM_ID",
				"identifier" => "IDENTIFIER",
				"type" => "TYPE",
				"registrationDate" => "REGISTRATION_DATE",
				"modificationDate" => "MODIFICATION_DATE",
				_ => return None,
			};

			attribute(entity, name)
		},
		SortType::Property => property(entity.core(), &sort.name).map(str::to_string),
	}
}

fn reference_text(reference: &EntityRef) -> Option<String> {
	reference
		.identifier
		.as_ref()
		.map(|identifier| identifier.identifier.clone())
		.or_else(|| reference.code.clone())
}

#[derive(PartialEq, Eq)]
struct SortKey {
	value: Option<String>,
	code: String,
	direction: SortDirection,
}
impl Ord for SortKey {
	fn cmp(&self, other: &Self) -> Ordering {
		let by_value = match (&self.value, &other.value) {
			(Some(a), Some(b)) => match self.direction {
				SortDirection::Asc => compare_values(a, b),
				SortDirection::Desc => compare_values(b, a),
			},
			(Some(_), None) => Ordering::Less,
			(None, Some(_)) => Ordering::Greater,
			(None, None) => Ordering::Equal,
		};

		by_value.then_with(|| self.code.cmp(&other.code))
	}
}
impl PartialOrd for SortKey {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
