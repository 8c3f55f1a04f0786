use serde_json::json;

use sift_domain::{FilterCondition, FilterOp, FilterSet, Predicate, SortSpec, candidate};
use sift_storage::{
	Error, LexicalQuery, ListQuery, MemoryStore, PrefixQuery, SearchStore, TextField, VectorQuery,
};
use sift_testkit::fixtures::{self, DOCS, SHOP};

fn store() -> MemoryStore {
	let mut store = MemoryStore::new();

	for (tenant, item) in fixtures::catalog() {
		store.insert(&tenant, item);
	}

	store
}

fn ids(candidates: &[sift_domain::RankedCandidate]) -> Vec<&str> {
	candidates.iter().map(|candidate| candidate.item_id.as_str()).collect()
}

fn lexical<'a>(text: &'a str, tolerance: u8, predicate: &'a Predicate) -> LexicalQuery<'a> {
	LexicalQuery {
		field: TextField::SearchableText,
		text,
		tolerance,
		conjunctive: false,
		predicate,
		top_k: 60,
	}
}

#[tokio::test]
async fn lexical_exact_and_fuzzy_matching() {
	let store = store();
	let always = Predicate::always();
	let exact =
		store.lexical_search(SHOP, lexical("shoe", 0, &always)).await.expect("lexical search");
	let fuzzy =
		store.lexical_search(SHOP, lexical("shoe", 1, &always)).await.expect("lexical search");

	assert_eq!(ids(&exact), vec!["p1", "p2"]);
	assert!(ids(&fuzzy).contains(&"p3"), "{fuzzy:?}");
	assert!(candidate::ranks_are_contiguous(&fuzzy));
}

#[tokio::test]
async fn lexical_filters_before_ranking() {
	let store = store();
	let cheap = Predicate::compile(&FilterSet::all(vec![FilterCondition::new(
		"price",
		FilterOp::Lt,
		json!(100),
	)]))
	.expect("compile");
	let ranked = store.lexical_search(SHOP, lexical("shoe", 0, &cheap)).await.expect("search");

	assert_eq!(ids(&ranked), vec!["p2"]);
	assert_eq!(ranked[0].rank, 1);
}

#[tokio::test]
async fn tenants_never_see_each_other() {
	let store = store();
	let always = Predicate::always();
	let shop = store.lexical_search(SHOP, lexical("shoe", 0, &always)).await.expect("search");
	let docs = store.lexical_search(DOCS, lexical("shoe", 0, &always)).await.expect("search");
	let ghost = store.lexical_search("ghost", lexical("shoe", 0, &always)).await.expect("search");

	assert!(ids(&shop).iter().all(|id| id.starts_with('p')));
	assert_eq!(ids(&docs), vec!["d1"]);
	assert!(ghost.is_empty());
	assert!(store.get_by_id(SHOP, "d1").await.expect("lookup").is_none());
}

#[tokio::test]
async fn vector_orders_by_distance_and_skips_missing_embeddings() {
	let store = store();
	let always = Predicate::always();
	let query = VectorQuery { embedding: &[1.0, 0.0, 0.0], predicate: &always, top_k: 10 };
	let ranked = store.vector_search(SHOP, query).await.expect("vector search");

	assert_eq!(ids(&ranked), vec!["p1", "p2", "p3", "p5", "p4", "p6"]);
	assert!(ranked[0].score.abs() < 1e-6);
	assert!(ranked.windows(2).all(|pair| pair[0].score <= pair[1].score));
}

#[tokio::test]
async fn vector_ranks_restart_after_filtering() {
	let store = store();
	let bags = Predicate::compile(&FilterSet::all(vec![FilterCondition::new(
		"category",
		FilterOp::Eq,
		json!("bags"),
	)]))
	.expect("compile");
	let query = VectorQuery { embedding: &[1.0, 0.0, 0.0], predicate: &bags, top_k: 1 };
	let ranked = store.vector_search(SHOP, query).await.expect("vector search");

	assert_eq!(ids(&ranked), vec!["p5"]);
	assert_eq!(ranked[0].rank, 1);
}

#[tokio::test]
async fn vector_rejects_unusable_query_embeddings() {
	let store = store();
	let always = Predicate::always();

	for embedding in [&[1.0_f32, 0.0][..], &[0.0, 0.0, 0.0][..]] {
		let err = store
			.vector_search(SHOP, VectorQuery { embedding, predicate: &always, top_k: 10 })
			.await
			.expect_err("Unusable embedding must be rejected.");

		assert!(matches!(err, Error::InvalidArgument(_)), "{err:?}");
	}
}

#[tokio::test]
async fn lexical_sees_items_written_after_a_search() {
	let mut store = store();
	let always = Predicate::always();
	let before = store.lexical_search(SHOP, lexical("shoe", 0, &always)).await.expect("search");

	store.insert(SHOP, fixtures::item(("p8", "Court Shoe", json!({ "category": "shoes" }), None)));

	let after = store.lexical_search(SHOP, lexical("shoe", 0, &always)).await.expect("search");

	assert_eq!(ids(&before), vec!["p1", "p2"]);
	assert!(ids(&after).contains(&"p8"), "{after:?}");
}

#[tokio::test]
async fn prefix_is_case_insensitive_and_id_ordered() {
	let store = store();
	let ranked = store
		.prefix_search(SHOP, PrefixQuery { field: TextField::Title, prefix: "S", top_k: 10 })
		.await
		.expect("prefix search");

	assert_eq!(ids(&ranked), vec!["p7"]);
	assert!(ranked.iter().all(|candidate| candidate.score == 1.0));

	let ranked = store
		.prefix_search(SHOP, PrefixQuery { field: TextField::Title, prefix: "", top_k: 3 })
		.await
		.expect("prefix search");

	assert_eq!(ids(&ranked), vec!["p1", "p2", "p3"]);
}

#[tokio::test]
async fn list_sorts_with_missing_values_last() {
	let store = store();
	let always = Predicate::always();
	let sort = SortSpec::desc("price");
	let items = store
		.list(SHOP, ListQuery { predicate: &always, sort: Some(&sort), offset: 0, limit: 30 })
		.await
		.expect("list");
	let order = items.iter().map(|item| item.id.as_str()).collect::<Vec<_>>();

	assert_eq!(order, vec!["p5", "p1", "p2", "p3", "p4", "p6", "p7"]);

	let page = store
		.list(SHOP, ListQuery { predicate: &always, sort: None, offset: 2, limit: 2 })
		.await
		.expect("list");

	assert_eq!(page.iter().map(|item| item.id.as_str()).collect::<Vec<_>>(), vec!["p3", "p4"]);
}

#[tokio::test]
async fn get_many_preserves_request_order() {
	let store = store();
	let wanted = vec!["p4".to_string(), "missing".to_string(), "p1".to_string()];
	let items = store.get_many(SHOP, &wanted).await.expect("get_many");

	assert_eq!(items.iter().map(|item| item.id.as_str()).collect::<Vec<_>>(), vec!["p4", "p1"]);
	assert_eq!(store.get_embedding_of(SHOP, "p7").await.expect("embedding"), None);
	assert_eq!(
		store.get_embedding_of(SHOP, "p4").await.expect("embedding"),
		Some(vec![0.0, 1.0, 0.0])
	);
}

#[tokio::test]
async fn incompatible_stored_values_surface_type_mismatch() {
	let store = store();
	let predicate = Predicate::compile(&FilterSet::all(vec![FilterCondition::new(
		"category",
		FilterOp::Gt,
		json!(5),
	)]))
	.expect("compile");
	let err = store
		.list(SHOP, ListQuery { predicate: &predicate, sort: None, offset: 0, limit: 10 })
		.await
		.expect_err("expected type mismatch");

	assert!(matches!(err, Error::Domain(sift_domain::Error::TypeMismatch { .. })), "{err:?}");
}

#[test]
fn upsert_replaces_in_place() {
	let mut store = store();
	let mut replacement = sift_domain::Item::new("p1", "Trail Runner Shoe v2");

	replacement.searchable_text = "trail runner".to_string();
	store.insert(SHOP, replacement);

	assert_eq!(store.len(SHOP), 7);
	assert_eq!(store.len("ghost"), 0);
}
