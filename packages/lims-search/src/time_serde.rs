//! RFC 3339 timestamps on the wire, plus the display string used in grid rows.

use serde::{Deserialize, Deserializer, Serializer, de};
use time::{
	OffsetDateTime, UtcOffset,
	format_description::{BorrowedFormatItem, well_known::Rfc3339},
	macros::format_description,
};

const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
	format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

	serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	parse(&String::deserialize(deserializer)?)
}

/// Grid display string, normalised to UTC so it does not depend on the viewer's locale.
pub fn display(value: &OffsetDateTime) -> String {
	value
		.to_offset(UtcOffset::UTC)
		.format(DISPLAY_FORMAT)
		.unwrap_or_else(|_| value.unix_timestamp().to_string())
}

fn parse<E>(raw: &str) -> Result<OffsetDateTime, E>
where
	E: de::Error,
{
	OffsetDateTime::parse(raw.trim(), &Rfc3339).map_err(E::custom)
}

pub mod option {
	use serde::{Deserialize, Deserializer, Serializer};
	use time::OffsetDateTime;

	pub fn serialize<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match value {
			Some(value) => super::serialize(value, serializer),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
	where
		D: Deserializer<'de>,
	{
		Option::<String>::deserialize(deserializer)?
			.filter(|raw| !raw.trim().is_empty())
			.map(|raw| super::parse(&raw))
			.transpose()
	}
}
