use std::sync::{
	Arc, Mutex,
	atomic::{AtomicBool, AtomicUsize, Ordering},
};

use lims_config::{Config, Grid, Inventory, Search, Service};
use lims_search::{
	BoxFuture, BroadQueryGate, CacheMode, Criteria, DataSet, EntityKind, EntitySearch, Error,
	Experiment, FetchOptions, GlobalHit, GlobalObjectKind, GridOptions, Result, Rule,
	RuleOperator, Sample, SearchOutcome, SearchPage, SearchService,
	entity::{EntityCore, Material, PermId},
};

#[derive(Default)]
struct Calls {
	typed: Vec<(EntityKind, serde_json::Value)>,
	global: Vec<String>,
	options: Vec<FetchOptions>,
}

#[derive(Default)]
struct DummyRemote {
	samples: Vec<Sample>,
	global: Vec<GlobalHit>,
	total_count: Option<u64>,
	fail: bool,
	calls: Mutex<Calls>,
}
impl DummyRemote {
	fn record(&self, kind: EntityKind, criteria: &Criteria, options: &FetchOptions) {
		let mut calls = self.calls.lock().expect("Calls lock.");

		calls.typed.push((kind, criteria.canonical_value()));
		calls.options.push(options.clone());
	}

	fn page<T: Clone>(&self, objects: &[T]) -> Result<SearchPage<T>> {
		if self.fail {
			return Err(Error::Remote { message: "connection reset".to_string() });
		}

		Ok(SearchPage {
			objects: objects.to_vec(),
			total_count: self.total_count.unwrap_or(objects.len() as u64),
		})
	}

	fn request_count(&self) -> usize {
		let calls = self.calls.lock().expect("Calls lock.");

		calls.typed.len() + calls.global.len()
	}

	fn cache_modes(&self) -> Vec<CacheMode> {
		self.calls.lock().expect("Calls lock.").options.iter().map(|options| options.cache).collect()
	}
}
impl EntitySearch for DummyRemote {
	fn search_samples<'a>(
		&'a self,
		criteria: &'a Criteria,
		options: &'a FetchOptions,
	) -> BoxFuture<'a, Result<SearchPage<Sample>>> {
		self.record(EntityKind::Sample, criteria, options);

		Box::pin(async move { self.page(&self.samples) })
	}

	fn search_experiments<'a>(
		&'a self,
		criteria: &'a Criteria,
		options: &'a FetchOptions,
	) -> BoxFuture<'a, Result<SearchPage<Experiment>>> {
		self.record(EntityKind::Experiment, criteria, options);

		Box::pin(async move { self.page::<Experiment>(&[]) })
	}

	fn search_data_sets<'a>(
		&'a self,
		criteria: &'a Criteria,
		options: &'a FetchOptions,
	) -> BoxFuture<'a, Result<SearchPage<DataSet>>> {
		self.record(EntityKind::Dataset, criteria, options);

		Box::pin(async move { self.page::<DataSet>(&[]) })
	}

	fn search_global<'a>(
		&'a self,
		text: &'a str,
		options: &'a FetchOptions,
	) -> BoxFuture<'a, Result<SearchPage<GlobalHit>>> {
		{
			let mut calls = self.calls.lock().expect("Calls lock.");

			calls.global.push(text.to_string());
			calls.options.push(options.clone());
		}

		Box::pin(async move { self.page(&self.global) })
	}
}

struct SpyGate {
	answer: AtomicBool,
	calls: Arc<AtomicUsize>,
}
impl SpyGate {
	fn new(answer: bool) -> Self {
		Self { answer: AtomicBool::new(answer), calls: Arc::new(AtomicUsize::new(0)) }
	}

	fn count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl BroadQueryGate for SpyGate {
	fn confirm<'a>(&'a self, _criteria: &'a Criteria) -> BoxFuture<'a, bool> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let answer = self.answer.load(Ordering::SeqCst);

		Box::pin(async move { answer })
	}
}

fn test_config() -> Config {
	Config {
		service: Service { log_level: "info".to_string() },
		search: Search {
			default_page_size: 10,
			max_page_size: 100,
			confirm_broad_queries: true,
			min_table_info: true,
			free_text_separators: " ,".to_string(),
		},
		grid: Grid::default(),
		inventory: Inventory::default(),
	}
}

fn sample(code: &str) -> Sample {
	Sample {
		core: EntityCore {
			code: Some(code.to_string()),
			perm_id: Some(PermId { perm_id: format!("20240101-{code}") }),
			..Default::default()
		},
		..Default::default()
	}
}

fn service(remote: Arc<DummyRemote>, gate: Arc<SpyGate>) -> SearchService {
	SearchService::with_gate(test_config(), remote, gate).expect("Service must build.")
}

fn code_criteria(code: &str) -> Criteria {
	let mut criteria = Criteria::empty(EntityKind::Sample);

	criteria
		.add_rule("r1".into(), Rule::attribute("CODE", RuleOperator::ThatEquals, code))
		.expect("Rule must be accepted.");

	criteria
}

fn grid(search: Option<&str>) -> GridOptions {
	GridOptions { search: search.map(str::to_string), ..GridOptions::first_page(10) }
}

#[tokio::test]
async fn sample_round_trip_yields_one_row() {
	let remote = Arc::new(DummyRemote { samples: vec![sample("BAC1")], ..Default::default() });
	let gate = Arc::new(SpyGate::new(true));
	let service = service(remote.clone(), gate.clone());
	let mut criteria = code_criteria("BAC1");
	let outcome = service.search(&mut criteria, &grid(None)).await.expect("Search must succeed.");
	let page = outcome.page().expect("Search must produce a page.");

	assert_eq!(page.total_count, 1);
	assert_eq!(page.objects.len(), 1);
	assert_eq!(page.objects[0].code, "BAC1");
	assert_eq!(gate.count(), 0);

	let json = serde_json::to_value(page).expect("Page must encode.");

	assert_eq!(json["totalCount"], 1);
	assert_eq!(json["objects"][0]["code"], "BAC1");
	assert_eq!(json["objects"][0]["entityKind"], "SAMPLE");
}

#[tokio::test]
async fn declined_broad_query_sends_nothing() {
	let remote = Arc::new(DummyRemote::default());
	let gate = Arc::new(SpyGate::new(false));
	let service = service(remote.clone(), gate.clone());
	let mut criteria = Criteria::new(EntityKind::Sample);
	let outcome =
		service.search(&mut criteria, &grid(Some("  "))).await.expect("Decline is not an error.");

	assert_eq!(outcome, SearchOutcome::Declined);
	assert_eq!(gate.count(), 1);
	assert_eq!(remote.request_count(), 0);
	assert!(!criteria.cache_state().is_cached());
}

#[tokio::test]
async fn free_text_makes_query_specific_without_touching_stored_rules() {
	let remote = Arc::new(DummyRemote::default());
	let gate = Arc::new(SpyGate::new(false));
	let service = service(remote.clone(), gate.clone());
	let mut criteria = Criteria::new(EntityKind::Sample);

	service.search(&mut criteria, &grid(Some("BAC, yeast"))).await.expect("Search must succeed.");

	assert_eq!(gate.count(), 0);
	assert_eq!(criteria.rule_count(), 1);

	let calls = remote.calls.lock().expect("Calls lock.");
	let sent_rules = calls.typed[0].1["rules"].as_array().map(Vec::len);

	assert_eq!(sent_rules, Some(3));
}

#[tokio::test]
async fn remote_error_is_surfaced_unchanged() {
	let remote = Arc::new(DummyRemote { fail: true, ..Default::default() });
	let service = service(remote.clone(), Arc::new(SpyGate::new(true)));
	let mut criteria = code_criteria("BAC1");
	let err = service.search(&mut criteria, &grid(None)).await.expect_err("Remote failure.");

	assert!(matches!(err, Error::Remote { ref message } if message == "connection reset"));
	assert_eq!(remote.request_count(), 1);
	assert!(!criteria.cache_state().is_cached());
}

#[tokio::test]
async fn global_search_joins_rule_values_and_drops_materials() {
	let mut on_sample = GlobalHit {
		object_kind: GlobalObjectKind::Sample,
		sample: Some(sample("S1")),
		experiment: None,
		data_set: None,
		material: None,
		matched: Some("Code".to_string()),
		score: 10.0,
	};
	let on_material = GlobalHit {
		object_kind: GlobalObjectKind::Material,
		material: Some(Material { core: sample("M1").core }),
		sample: None,
		score: 5.0,
		..on_sample.clone()
	};

	on_sample.score = 20.0;

	let remote = Arc::new(DummyRemote {
		global: vec![on_sample, on_material],
		total_count: Some(2),
		..Default::default()
	});
	let service = service(remote.clone(), Arc::new(SpyGate::new(true)));
	let mut criteria = Criteria::empty(EntityKind::All);

	criteria.push_rule(Rule::all("yeast")).expect("Rule must be accepted.");
	criteria.push_rule(Rule::all("*")).expect("Rule must be accepted.");

	let outcome = service.search(&mut criteria, &grid(Some("plate"))).await.expect("Search.");
	let page = outcome.page().expect("Search must produce a page.");

	assert_eq!(page.objects.len(), 1);
	assert_eq!(page.objects[0].code, "S1");
	assert_eq!(page.total_count, 2);

	let calls = remote.calls.lock().expect("Calls lock.");

	assert_eq!(calls.global, ["yeast plate"]);
	assert!(calls.typed.is_empty());
	assert!(!calls.options[0].with_experiment);
}

#[tokio::test]
async fn cache_mode_follows_free_text_token() {
	let remote = Arc::new(DummyRemote { samples: vec![sample("BAC1")], ..Default::default() });
	let service = service(remote.clone(), Arc::new(SpyGate::new(true)));
	let mut criteria = code_criteria("BAC1");
	let next_page =
		GridOptions { page_index: 1, search: Some("x".to_string()), ..GridOptions::first_page(10) };

	for options in [grid(Some("x")), next_page, grid(Some("y")), grid(Some("y"))] {
		service.search(&mut criteria, &options).await.expect("Search must succeed.");
	}

	assert_eq!(
		remote.cache_modes(),
		[CacheMode::ReloadAndCache, CacheMode::Cache, CacheMode::ReloadAndCache, CacheMode::Cache]
	);
}

#[tokio::test]
async fn invalid_page_size_leaves_cache_untouched() {
	let remote = Arc::new(DummyRemote::default());
	let service = service(remote.clone(), Arc::new(SpyGate::new(true)));
	let mut criteria = code_criteria("BAC1");
	let err = service
		.search(&mut criteria, &GridOptions::first_page(0))
		.await
		.expect_err("Zero page size must be rejected.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
	assert_eq!(remote.request_count(), 0);
	assert!(!criteria.cache_state().is_cached());
}
