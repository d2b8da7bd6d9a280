//! Global full-text search across every entity kind, materials included.

use std::cmp::Ordering;

use lims_search::{GlobalHit, GlobalObjectKind, entity::EntityCore};

use crate::Snapshot;

const CODE_WEIGHT: f64 = 10.0;
const IDENTIFIER_WEIGHT: f64 = 5.0;
const PROPERTY_WEIGHT: f64 = 1.0;

/// One ranked hit, pointing back into the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GlobalMatch {
	pub(crate) object_kind: GlobalObjectKind,
	pub(crate) index: usize,
	pub(crate) score: f64,
	pub(crate) matched: Option<String>,
}

/// Scores every entity against the whitespace-separated tokens of `text`, best first.
/// Blank text matches everything with a zero score.
pub(crate) fn rank(snapshot: &Snapshot, text: &str) -> Vec<GlobalMatch> {
	let tokens: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
	let cores = indexed(GlobalObjectKind::Sample, &snapshot.samples, |sample| &sample.core)
		.chain(indexed(GlobalObjectKind::Experiment, &snapshot.experiments, |experiment| {
			&experiment.core
		}))
		.chain(indexed(GlobalObjectKind::DataSet, &snapshot.data_sets, |data_set| &data_set.core))
		.chain(indexed(GlobalObjectKind::Material, &snapshot.materials, |material| &material.core));
	let mut matches: Vec<(GlobalMatch, &str)> = cores
		.filter_map(|(index, object_kind, core)| {
			let (score, matched) = score(core, &tokens);

			(tokens.is_empty() || score > 0.0).then(|| {
				(
					GlobalMatch { object_kind, index, score, matched },
					core.code().unwrap_or_default(),
				)
			})
		})
		.collect();

	matches.sort_by(|(a, a_code), (b, b_code)| {
		b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then_with(|| a_code.cmp(b_code))
	});

	matches.into_iter().map(|(hit, _)| hit).collect()
}

pub(crate) fn to_hit(snapshot: &Snapshot, hit: &GlobalMatch) -> Option<GlobalHit> {
	let mut out = GlobalHit {
		object_kind: hit.object_kind,
		sample: None,
		experiment: None,
		data_set: None,
		material: None,
		matched: hit.matched.clone(),
		score: hit.score,
	};

	match hit.object_kind {
		GlobalObjectKind::Sample => out.sample = Some(snapshot.samples.get(hit.index)?.clone()),
		GlobalObjectKind::Experiment =>
			out.experiment = Some(snapshot.experiments.get(hit.index)?.clone()),
		GlobalObjectKind::DataSet =>
			out.data_set = Some(snapshot.data_sets.get(hit.index)?.clone()),
		GlobalObjectKind::Material =>
			out.material = Some(snapshot.materials.get(hit.index)?.clone()),
	}

	Some(out)
}

fn score(core: &EntityCore, tokens: &[String]) -> (f64, Option<String>) {
	let mut fields: Vec<(String, f64, &str)> = Vec::new();

	if let Some(code) = core.code() {
		fields.push(("Code".to_string(), CODE_WEIGHT, code));
	}
	if let Some(perm_id) = core.perm_id() {
		fields.push(("Perm Id".to_string(), CODE_WEIGHT, perm_id));
	}
	if let Some(identifier) = core.identifier() {
		fields.push(("Identifier".to_string(), IDENTIFIER_WEIGHT, identifier));
	}
	if let Some(type_code) = core.type_code() {
		fields.push(("Type".to_string(), IDENTIFIER_WEIGHT, type_code));
	}
	for (code, value) in &core.properties {
		fields.push((format!("Property '{code}'"), PROPERTY_WEIGHT, value.as_str()));
	}

	let mut total = 0.0;
	let mut matched = Vec::new();

	for (label, weight, value) in &fields {
		let value = value.to_lowercase();
		let occurrences: usize =
			tokens.iter().map(|token| value.matches(token.as_str()).count()).sum();

		if occurrences > 0 {
			total += weight * occurrences as f64;

			matched.push(label.as_str());
		}
	}

	let matched = (!matched.is_empty()).then(|| matched.join(", "));

	(total, matched)
}

fn indexed<'a, T>(
	object_kind: GlobalObjectKind,
	entities: &'a [T],
	core: fn(&T) -> &EntityCore,
) -> impl Iterator<Item = (usize, GlobalObjectKind, &'a EntityCore)> {
	entities.iter().enumerate().map(move |(index, entity)| (index, object_kind, core(entity)))
}
