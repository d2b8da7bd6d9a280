use std::{
	collections::{HashMap, VecDeque},
	sync::{Arc, Mutex, MutexGuard},
};

use lims_search::{
	CacheMode, Criteria, Result,
	cache::{cache_key_prefix, hash_cache_key},
};

/// Matched result sets keyed by what was asked, so later pages skip re-evaluation. Holds at
/// most `capacity` sets; storing one more evicts the least recently stored.
pub(crate) struct ResultCache<T> {
	capacity: usize,
	entries: Mutex<Entries<T>>,
}
impl<T> ResultCache<T> {
	pub(crate) fn new(capacity: usize) -> Self {
		Self { capacity: capacity.max(1), entries: Mutex::new(Entries::default()) }
	}

	/// `CACHE` reads a stored set when there is one; a miss, like `RELOAD_AND_CACHE`, computes
	/// and stores a fresh one.
	pub(crate) fn resolve<F>(&self, key: &str, mode: CacheMode, compute: F) -> Result<Arc<Vec<T>>>
	where
		F: FnOnce() -> Result<Vec<T>>,
	{
		if mode == CacheMode::Cache
			&& let Some(hit) = self.lock().sets.get(key)
		{
			tracing::debug!(key = cache_key_prefix(key), "Result set cache hit.");

			return Ok(hit.clone());
		}

		let computed = Arc::new(compute()?);

		tracing::debug!(
			key = cache_key_prefix(key),
			?mode,
			matches = computed.len(),
			"Result set computed."
		);

		let evicted = self.lock().store(key, computed.clone(), self.capacity);

		if evicted > 0 {
			tracing::debug!(evicted, capacity = self.capacity, "Result sets evicted.");
		}

		Ok(computed)
	}

	pub(crate) fn len(&self) -> usize {
		self.lock().sets.len()
	}

	fn lock(&self) -> MutexGuard<'_, Entries<T>> {
		self.entries.lock().unwrap_or_else(|err| err.into_inner())
	}
}

struct Entries<T> {
	sets: HashMap<String, Arc<Vec<T>>>,
	order: VecDeque<String>,
}
impl<T> Entries<T> {
	fn store(&mut self, key: &str, set: Arc<Vec<T>>, capacity: usize) -> usize {
		if self.sets.insert(key.to_string(), set).is_some() {
			self.order.retain(|existing| existing != key);
		}

		self.order.push_back(key.to_string());

		let mut evicted = 0;

		while self.sets.len() > capacity {
			let Some(oldest) = self.order.pop_front() else { break };

			self.sets.remove(&oldest);

			evicted += 1;
		}

		evicted
	}
}
impl<T> Default for Entries<T> {
	fn default() -> Self {
		Self { sets: HashMap::new(), order: VecDeque::new() }
	}
}

/// Key over the meaning of the criteria. Rule ids are left out: request-scoped copies carry
/// freshly generated ids for the same free-text rules.
pub(crate) fn criteria_key(criteria: &Criteria) -> Result<String> {
	let mut rules = criteria
		.rules()
		.map(|(_, rule)| serde_json::to_string(rule))
		.collect::<Result<Vec<_>, _>>()?;

	rules.sort();

	hash_cache_key(&serde_json::json!({
		"kind": "inventory_search",
		"entity_kind": criteria.entity_kind(),
		"logical_operator": criteria.logical_operator(),
		"rules": rules,
	}))
}

pub(crate) fn text_key(text: &str) -> Result<String> {
	hash_cache_key(&serde_json::json!({ "kind": "inventory_global", "text": text.trim() }))
}
