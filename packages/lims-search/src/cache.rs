//! Cache Controller: decides per search whether the remote side must recompute the result set
//! or may page through the one it computed last time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result, criteria::Criteria};

const SEARCH_CACHE_SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheMode {
	ReloadAndCache,
	Cache,
}

/// Transient cache bookkeeping owned by one [`Criteria`] instance. Never serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheState {
	cached: bool,
	cached_search: Option<String>,
	cached_key: Option<String>,
}
impl CacheState {
	pub fn is_cached(&self) -> bool {
		self.cached
	}

	pub fn cached_search(&self) -> Option<&str> {
		self.cached_search.as_deref()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDecision {
	pub mode: CacheMode,
	/// Key of the result set this request reads or rebuilds.
	pub key: String,
}

pub fn hash_cache_key(payload: &Value) -> Result<String> {
	let raw = serde_json::to_vec(payload).map_err(|err| Error::Encoding {
		message: format!("Failed to encode cache key payload: {err}"),
	})?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}

/// First 12 characters of `key`, for log lines.
pub fn cache_key_prefix(key: &str) -> &str {
	match key.char_indices().nth(12) {
		Some((end, _)) => &key[..end],
		None => key,
	}
}

/// Key over everything the result set depends on: the stored criteria and the free-text token.
pub fn build_search_cache_key(criteria: &Criteria, token: &str) -> Result<String> {
	let payload = serde_json::json!({
		"kind": "advanced_search",
		"schema_version": SEARCH_CACHE_SCHEMA_VERSION,
		"criteria": criteria.canonical_value(),
		"search": token,
	});

	hash_cache_key(&payload)
}

/// Reuse is allowed only when this criteria instance already reloaded for exactly the same
/// token and rules. Anything else reloads once and records the new key. Only the criteria's
/// cache fields are touched.
pub fn decide(criteria: &mut Criteria, token: &str) -> Result<CacheDecision> {
	let key = build_search_cache_key(criteria, token)?;
	let state = &mut criteria.cache;
	let reusable = state.cached && state.cached_key.as_deref() == Some(key.as_str());
	let mode = if reusable { CacheMode::Cache } else { CacheMode::ReloadAndCache };

	if mode == CacheMode::ReloadAndCache {
		state.cached = true;
		state.cached_search = Some(token.to_string());
		state.cached_key = Some(key.clone());
	}

	tracing::debug!(?mode, key = cache_key_prefix(&key), "Resolved search cache mode.");

	Ok(CacheDecision { mode, key })
}

/// Forgets the recorded result set, so the next decision reloads.
pub fn invalidate(criteria: &mut Criteria) {
	criteria.cache = CacheState::default();
}
