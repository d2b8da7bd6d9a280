use serde::Serialize;

use crate::criteria::{EntityKind, RuleType};

pub const ATTRIBUTE_PREFIX: &str = "ATTR.";
pub const PROPERTY_PREFIX: &str = "PROP.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldOption {
	pub value: &'static str,
	pub label: &'static str,
}

/// A rule field name split into its namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldName<'a> {
	Attribute(&'a str),
	Property(&'a str),
	/// No namespace prefix; the backend resolves it against both.
	Bare(&'a str),
}
impl<'a> FieldName<'a> {
	pub fn parse(raw: &'a str) -> Self {
		let raw = raw.trim();

		if let Some(name) = strip_prefix_ignore_case(raw, ATTRIBUTE_PREFIX) {
			Self::Attribute(name)
		} else if let Some(name) = strip_prefix_ignore_case(raw, PROPERTY_PREFIX) {
			Self::Property(name)
		} else {
			Self::Bare(raw)
		}
	}

	pub fn name(&self) -> &'a str {
		match self {
			Self::Attribute(name) | Self::Property(name) | Self::Bare(name) => name,
		}
	}
}

pub fn rule_types(kind: EntityKind) -> &'static [RuleType] {
	match kind {
		EntityKind::All => &[RuleType::All],
		EntityKind::Sample | EntityKind::Experiment | EntityKind::Dataset =>
			&[RuleType::All, RuleType::PropertyOrAttribute, RuleType::Attribute, RuleType::Property],
	}
}

/// Attribute fields a user can pick for `kind`, in display order.
pub fn attribute_fields(kind: EntityKind, sample_type_forced: bool) -> Vec<FieldOption> {
	match kind {
		EntityKind::All => Vec::new(),
		EntityKind::Experiment => vec![
			field("ATTR.CODE", "Code"),
			field("ATTR.EXPERIMENT_TYPE", "Experiment Type"),
			field("ATTR.PERM_ID", "Perm Id"),
			field("ATTR.PROJECT", "Project"),
			field("ATTR.PROJECT_PERM_ID", "Project Perm Id"),
			field("ATTR.PROJECT_SPACE", "Project Space"),
			field("ATTR.REGISTRATION_DATE", "Registration Date"),
			field("ATTR.MODIFICATION_DATE", "Modification Date"),
		],
		EntityKind::Sample => {
			let mut fields = vec![field("ATTR.CODE", "Code")];

			if !sample_type_forced {
				fields.push(field("ATTR.SAMPLE_TYPE", "Sample Type"));
			}

			fields.extend([
				field("ATTR.PERM_ID", "Perm Id"),
				field("ATTR.SPACE", "Space"),
				field("ATTR.REGISTRATION_DATE", "Registration Date"),
				field("ATTR.MODIFICATION_DATE", "Modification Date"),
			]);

			fields
		},
		EntityKind::Dataset => vec![
			field("ATTR.CODE", "Code"),
			field("ATTR.DATA_SET_TYPE", "Data Set Type"),
			field("ATTR.REGISTRATION_DATE", "Registration Date"),
			field("ATTR.MODIFICATION_DATE", "Modification Date"),
		],
	}
}

pub fn property_field(code: &str) -> String {
	format!("{PROPERTY_PREFIX}{}", code.trim().to_ascii_uppercase())
}

fn field(value: &'static str, label: &'static str) -> FieldOption {
	FieldOption { value, label }
}

fn strip_prefix_ignore_case<'a>(raw: &'a str, prefix: &str) -> Option<&'a str> {
	let head = raw.get(..prefix.len())?;

	head.eq_ignore_ascii_case(prefix).then(|| &raw[prefix.len()..])
}
