//! In-memory entity service over an exported inventory snapshot.

mod cache;
mod error;
mod eval;
mod global;

pub use error::{Error, Result};

use std::{fs, path::Path};

use serde::Deserialize;

use lims_search::{
	BoxFuture, Criteria, DataSet, EntitySearch, Experiment, FetchOptions, GlobalHit, Material,
	Result as SearchResult, Sample, SearchPage,
};

use crate::{cache::ResultCache, eval::Searchable, global::GlobalMatch};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
	#[serde(default)]
	pub samples: Vec<Sample>,
	#[serde(default)]
	pub experiments: Vec<Experiment>,
	#[serde(default)]
	pub data_sets: Vec<DataSet>,
	#[serde(default)]
	pub materials: Vec<Material>,
}
impl Snapshot {
	pub fn load(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path)
			.map_err(|err| Error::ReadSnapshot { path: path.to_path_buf(), source: err })?;

		serde_json::from_str(&raw)
			.map_err(|err| Error::ParseSnapshot { path: path.to_path_buf(), source: err })
	}

	pub fn from_json(raw: &str) -> Result<Self> {
		serde_json::from_str(raw).map_err(|err| Error::Snapshot { message: err.to_string() })
	}

	pub fn len(&self) -> usize {
		self.samples.len() + self.experiments.len() + self.data_sets.len() + self.materials.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

pub struct InventoryRemote {
	snapshot: Snapshot,
	typed: ResultCache<usize>,
	global: ResultCache<GlobalMatch>,
}
impl InventoryRemote {
	/// `max_cached_result_sets` bounds the typed and the global result caches separately.
	pub fn new(snapshot: Snapshot, max_cached_result_sets: usize) -> Self {
		tracing::info!(
			entities = snapshot.len(),
			max_cached_result_sets,
			"Inventory snapshot loaded."
		);

		Self {
			snapshot,
			typed: ResultCache::new(max_cached_result_sets),
			global: ResultCache::new(max_cached_result_sets),
		}
	}

	pub fn snapshot(&self) -> &Snapshot {
		&self.snapshot
	}

	pub fn cached_result_sets(&self) -> usize {
		self.typed.len() + self.global.len()
	}

	fn search_typed<T>(
		&self,
		entities: &[T],
		criteria: &Criteria,
		options: &FetchOptions,
	) -> SearchResult<SearchPage<T>>
	where
		T: Searchable,
	{
		eval::validate::<T>(criteria)?;

		let key = cache::criteria_key(criteria)?;
		let matched = self.typed.resolve(&key, options.cache, || {
			Ok(entities
				.iter()
				.enumerate()
				.filter(|(_, entity)| eval::matches(*entity, criteria))
				.map(|(index, _)| index)
				.collect())
		})?;
		let mut ordered = matched.to_vec();

		if let Some(sort) = options.sort.sort() {
			eval::sort_indices(entities, &mut ordered, sort);
		}

		let total_count = ordered.len() as u64;
		let objects: Vec<T> = window(&ordered, options)
			.iter()
			.filter_map(|&index| entities.get(index))
			.map(|entity| project(entity.clone(), options))
			.collect();

		tracing::debug!(
			kind = %T::KIND,
			total_count,
			returned = objects.len(),
			"Served typed search."
		);

		Ok(SearchPage { objects, total_count })
	}

	fn search_text(
		&self,
		text: &str,
		options: &FetchOptions,
	) -> SearchResult<SearchPage<GlobalHit>> {
		let key = cache::text_key(text)?;
		let ranked =
			self.global.resolve(&key, options.cache, || Ok(global::rank(&self.snapshot, text)))?;
		let total_count = ranked.len() as u64;
		let objects: Vec<GlobalHit> = window(&ranked, options)
			.iter()
			.filter_map(|hit| global::to_hit(&self.snapshot, hit))
			.collect();

		tracing::debug!(total_count, returned = objects.len(), "Served global search.");

		Ok(SearchPage { objects, total_count })
	}
}
impl EntitySearch for InventoryRemote {
	fn search_samples<'a>(
		&'a self,
		criteria: &'a Criteria,
		options: &'a FetchOptions,
	) -> BoxFuture<'a, SearchResult<SearchPage<Sample>>> {
		Box::pin(async move { self.search_typed(&self.snapshot.samples, criteria, options) })
	}

	fn search_experiments<'a>(
		&'a self,
		criteria: &'a Criteria,
		options: &'a FetchOptions,
	) -> BoxFuture<'a, SearchResult<SearchPage<Experiment>>> {
		Box::pin(async move { self.search_typed(&self.snapshot.experiments, criteria, options) })
	}

	fn search_data_sets<'a>(
		&'a self,
		criteria: &'a Criteria,
		options: &'a FetchOptions,
	) -> BoxFuture<'a, SearchResult<SearchPage<DataSet>>> {
		Box::pin(async move { self.search_typed(&self.snapshot.data_sets, criteria, options) })
	}

	fn search_global<'a>(
		&'a self,
		text: &'a str,
		options: &'a FetchOptions,
	) -> BoxFuture<'a, SearchResult<SearchPage<GlobalHit>>> {
		Box::pin(async move { self.search_text(text, options) })
	}
}

fn window<'a, T>(items: &'a [T], options: &FetchOptions) -> &'a [T] {
	let from = usize::try_from(options.from).unwrap_or(usize::MAX).min(items.len());
	let count = usize::try_from(options.count).unwrap_or(usize::MAX);
	let end = from.saturating_add(count).min(items.len());

	&items[from..end]
}

fn project<T>(mut entity: T, options: &FetchOptions) -> T
where
	T: Searchable,
{
	if !options.with_properties {
		entity.core_mut().properties.clear();
	}
	if !options.with_experiment {
		entity.drop_experiment();
	}

	entity
}
