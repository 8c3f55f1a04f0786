//! Postgres backend: ParadeDB `pg_search` for BM25, pgvector for cosine distance, one schema per
//! tenant. Predicates are pushed down over the `custom_data` jsonb column.

use std::collections::HashMap;

use serde_json::{Map, Value};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, postgres::PgPoolOptions};

use sift_domain::{Bound, Clause, Combine, Item, Predicate, RankedCandidate, SortSpec};

use crate::{
	BoxFuture, Error, LexicalQuery, ListQuery, PrefixQuery, Result, SearchStore, VectorQuery,
	schema, text, vector,
};

const ITEM_COLUMNS: &str = "\
id, title, searchable_content, text_embedding::text AS text_embedding, custom_data, media_ref, \
ai_summary, related_excerpts";
const SCHEMA_LOCK_ID: i64 = 7_340_211;

#[derive(FromRow)]
struct ItemRow {
	id: String,
	title: String,
	searchable_content: String,
	text_embedding: Option<String>,
	custom_data: Value,
	media_ref: Option<String>,
	ai_summary: Option<Value>,
	related_excerpts: Value,
}
impl ItemRow {
	fn into_item(self) -> Item {
		let mut item = Item::new(self.id, self.title);

		item.searchable_text = self.searchable_content;
		item.embedding = self.text_embedding.as_deref().and_then(vector::parse_pg_vector);
		item.attributes = match self.custom_data {
			Value::Object(map) => map,
			_ => Map::new(),
		};
		item.media_ref = self.media_ref;
		item.summary = self.ai_summary;
		item.related_excerpts = match self.related_excerpts {
			Value::Array(values) =>
				values.into_iter().filter_map(|value| value.as_str().map(str::to_string)).collect(),
			_ => Vec::new(),
		};

		item.normalize();

		item
	}
}

pub struct PgStore {
	pub pool: PgPool,
	vector_dim: u32,
}
impl PgStore {
	pub async fn connect(cfg: &sift_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool, vector_dim: cfg.vector_dim })
	}

	pub fn vector_dim(&self) -> u32 {
		self.vector_dim
	}

	/// Creates extensions, the type-mismatch helper and one schema per tenant.
	pub async fn ensure_schema<'t, I>(&self, tenants: I) -> Result<()>
	where
		I: IntoIterator<Item = &'t str>,
	{
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)")
			.bind(SCHEMA_LOCK_ID)
			.execute(&mut *tx)
			.await?;
		sqlx::query(schema::render_functions()).execute(&mut *tx).await?;

		for tenant_id in tenants {
			let sql = schema::render_schema(&schema_name(tenant_id)?, self.vector_dim);

			for statement in schema::statements(&sql) {
				sqlx::query(statement).execute(&mut *tx).await?;
			}
		}

		tx.commit().await?;

		Ok(())
	}

	pub async fn upsert_item(&self, tenant_id: &str, item: &Item) -> Result<()> {
		let table = table(tenant_id)?;
		let embedding = match item.embedding.as_deref() {
			Some(embedding) => {
				self.check_dimensions(embedding)?;

				Some(vector::to_pg_vector(embedding))
			},
			None => None,
		};
		let sql = format!(
			"\
INSERT INTO {table} (
	id, title, searchable_content, text_embedding, custom_data, media_ref, ai_summary,
	related_excerpts
)
VALUES ($1, $2, $3, $4::text::vector, $5, $6, $7, $8)
ON CONFLICT (id) DO UPDATE SET
	title = EXCLUDED.title,
	searchable_content = EXCLUDED.searchable_content,
	text_embedding = EXCLUDED.text_embedding,
	custom_data = EXCLUDED.custom_data,
	media_ref = EXCLUDED.media_ref,
	ai_summary = EXCLUDED.ai_summary,
	related_excerpts = EXCLUDED.related_excerpts"
		);
		let mut item = item.clone();

		item.normalize();

		sqlx::query(&sql)
			.bind(&item.id)
			.bind(&item.title)
			.bind(&item.searchable_text)
			.bind(embedding)
			.bind(Value::Object(item.attributes.clone()))
			.bind(&item.media_ref)
			.bind(&item.summary)
			.bind(serde_json::json!(item.related_excerpts))
			.execute(&self.pool)
			.await?;

		Ok(())
	}

	fn check_dimensions(&self, embedding: &[f32]) -> Result<()> {
		if embedding.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"embedding has {} dimensions, expected {}.",
				embedding.len(),
				self.vector_dim
			)));
		}

		Ok(())
	}

	async fn lexical(
		&self,
		tenant_id: &str,
		query: LexicalQuery<'_>,
	) -> Result<Vec<RankedCandidate>> {
		if query.text.trim().is_empty() || query.top_k == 0 {
			return Ok(Vec::new());
		}

		let mut qb = QueryBuilder::<Postgres>::new(format!(
			"SELECT id, paradedb.score(id)::real AS score FROM {} \
			WHERE id @@@ paradedb.match(field => ",
			table(tenant_id)?
		));

		qb.push_bind(query.field.column());
		qb.push(", value => ");
		qb.push_bind(query.text);
		qb.push(", distance => ");
		qb.push_bind(i32::from(query.tolerance));
		qb.push(", conjunction_mode => ");
		qb.push_bind(query.conjunctive);
		qb.push(") AND ");
		push_predicate(&mut qb, query.predicate);
		qb.push(" ORDER BY score DESC, id LIMIT ");
		qb.push_bind(i64::from(query.top_k));

		let rows: Vec<(String, f32)> =
			qb.build_query_as().fetch_all(&self.pool).await.map_err(map_query_error)?;

		Ok(RankedCandidate::ranked(rows))
	}

	async fn vector(
		&self,
		tenant_id: &str,
		query: VectorQuery<'_>,
	) -> Result<Vec<RankedCandidate>> {
		if query.top_k == 0 {
			return Ok(Vec::new());
		}

		vector::validate_query(query.embedding, Some(self.vector_dim as usize))?;

		let mut qb = QueryBuilder::<Postgres>::new("SELECT id, (text_embedding <=> ");

		qb.push_bind(vector::to_pg_vector(query.embedding));
		qb.push(format!(
			"::text::vector)::real AS score FROM {} WHERE text_embedding IS NOT NULL AND ",
			table(tenant_id)?
		));
		push_predicate(&mut qb, query.predicate);
		qb.push(" ORDER BY score, id LIMIT ");
		qb.push_bind(i64::from(query.top_k));

		let rows: Vec<(String, f32)> =
			qb.build_query_as().fetch_all(&self.pool).await.map_err(map_query_error)?;

		Ok(RankedCandidate::ranked(rows))
	}

	async fn prefix(
		&self,
		tenant_id: &str,
		query: PrefixQuery<'_>,
	) -> Result<Vec<RankedCandidate>> {
		let pattern = format!("{}%", escape_like(&text::fold(query.prefix.trim())));
		let sql = format!(
			"SELECT id, 1.0::real AS score FROM {} \
			WHERE lower({}) LIKE $1 ESCAPE '\\' ORDER BY id LIMIT $2",
			table(tenant_id)?,
			query.field.column()
		);
		let rows: Vec<(String, f32)> = sqlx::query_as(&sql)
			.bind(pattern)
			.bind(i64::from(query.top_k))
			.fetch_all(&self.pool)
			.await?;

		Ok(RankedCandidate::ranked(rows))
	}

	async fn listing(&self, tenant_id: &str, query: ListQuery<'_>) -> Result<Vec<Item>> {
		let mut qb = QueryBuilder::<Postgres>::new(format!(
			"SELECT {ITEM_COLUMNS} FROM {} WHERE ",
			table(tenant_id)?
		));

		push_predicate(&mut qb, query.predicate);
		qb.push(" ORDER BY ");
		push_sort(&mut qb, query.sort);
		qb.push("id LIMIT ");
		qb.push_bind(i64::from(query.limit));
		qb.push(" OFFSET ");
		qb.push_bind(i64::from(query.offset));

		let rows: Vec<ItemRow> =
			qb.build_query_as().fetch_all(&self.pool).await.map_err(map_query_error)?;

		Ok(rows.into_iter().map(ItemRow::into_item).collect())
	}

	async fn fetch_one(&self, tenant_id: &str, item_id: &str) -> Result<Option<Item>> {
		let sql = format!("SELECT {ITEM_COLUMNS} FROM {} WHERE id = $1", table(tenant_id)?);
		let row: Option<ItemRow> =
			sqlx::query_as(&sql).bind(item_id).fetch_optional(&self.pool).await?;

		Ok(row.map(ItemRow::into_item))
	}

	async fn fetch_many(&self, tenant_id: &str, ids: &[String]) -> Result<Vec<Item>> {
		if ids.is_empty() {
			return Ok(Vec::new());
		}

		let sql = format!("SELECT {ITEM_COLUMNS} FROM {} WHERE id = ANY($1)", table(tenant_id)?);
		let rows: Vec<ItemRow> = sqlx::query_as(&sql).bind(ids).fetch_all(&self.pool).await?;
		let mut by_id: HashMap<String, Item> =
			rows.into_iter().map(|row| (row.id.clone(), row.into_item())).collect();

		Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
	}

	async fn embedding_of(&self, tenant_id: &str, item_id: &str) -> Result<Option<Vec<f32>>> {
		let sql =
			format!("SELECT text_embedding::text FROM {} WHERE id = $1", table(tenant_id)?);
		let row: Option<(Option<String>,)> =
			sqlx::query_as(&sql).bind(item_id).fetch_optional(&self.pool).await?;

		Ok(row.and_then(|(text,)| text).as_deref().and_then(vector::parse_pg_vector))
	}
}

impl SearchStore for PgStore {
	fn lexical_search<'a>(
		&'a self,
		tenant_id: &'a str,
		query: LexicalQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<RankedCandidate>>> {
		Box::pin(self.lexical(tenant_id, query))
	}

	fn vector_search<'a>(
		&'a self,
		tenant_id: &'a str,
		query: VectorQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<RankedCandidate>>> {
		Box::pin(self.vector(tenant_id, query))
	}

	fn prefix_search<'a>(
		&'a self,
		tenant_id: &'a str,
		query: PrefixQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<RankedCandidate>>> {
		Box::pin(self.prefix(tenant_id, query))
	}

	fn list<'a>(
		&'a self,
		tenant_id: &'a str,
		query: ListQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<Item>>> {
		Box::pin(self.listing(tenant_id, query))
	}

	fn get_by_id<'a>(
		&'a self,
		tenant_id: &'a str,
		item_id: &'a str,
	) -> BoxFuture<'a, Result<Option<Item>>> {
		Box::pin(self.fetch_one(tenant_id, item_id))
	}

	fn get_many<'a>(
		&'a self,
		tenant_id: &'a str,
		ids: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Item>>> {
		Box::pin(self.fetch_many(tenant_id, ids))
	}

	fn get_embedding_of<'a>(
		&'a self,
		tenant_id: &'a str,
		item_id: &'a str,
	) -> BoxFuture<'a, Result<Option<Vec<f32>>>> {
		Box::pin(self.embedding_of(tenant_id, item_id))
	}
}

fn schema_name(tenant_id: &str) -> Result<&str> {
	if !sift_config::tenant_name_is_valid(tenant_id) {
		return Err(Error::InvalidArgument(format!("invalid tenant name '{tenant_id}'.")));
	}

	Ok(tenant_id)
}

fn table(tenant_id: &str) -> Result<String> {
	Ok(format!(r#""{}".products"#, schema_name(tenant_id)?))
}

fn escape_like(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for ch in raw.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}

fn map_query_error(err: sqlx::Error) -> Error {
	if let sqlx::Error::Database(db) = &err
		&& db.code().as_deref() == Some(schema::TYPE_MISMATCH_SQLSTATE)
	{
		return Error::Domain(sift_domain::Error::TypeMismatch {
			path: "$.attributes".to_string(),
			message: db.message().to_string(),
		});
	}

	Error::Sqlx(err)
}

fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
	if predicate.is_always() {
		qb.push("TRUE");

		return;
	}

	let joiner = match predicate.combine() {
		Combine::And => " AND ",
		Combine::Or => " OR ",
	};

	qb.push("(");

	for (idx, clause) in predicate.clauses().iter().enumerate() {
		if idx > 0 {
			qb.push(joiner);
		}

		push_clause(qb, clause);
	}

	qb.push(")");
}

fn push_clause(qb: &mut QueryBuilder<'_, Postgres>, clause: &Clause) {
	let field = clause.field().to_string();

	match clause {
		Clause::Eq { value, .. } => {
			qb.push("COALESCE(custom_data -> ");
			qb.push_bind(field);
			qb.push(" = ");
			qb.push_bind(value.to_value());
			qb.push("::jsonb, FALSE)");
		},
		Clause::Neq { value, .. } => {
			qb.push("(custom_data -> ");
			qb.push_bind(field);
			qb.push(" IS DISTINCT FROM ");
			qb.push_bind(value.to_value());
			qb.push("::jsonb)");
		},
		Clause::In { values, .. } => {
			let list = Value::Array(values.iter().map(|value| value.to_value()).collect());

			qb.push("COALESCE(jsonb_typeof(custom_data -> ");
			qb.push_bind(field.clone());
			qb.push(") NOT IN ('array', 'object', 'null') AND ");
			qb.push_bind(list);
			qb.push("::jsonb @> (custom_data -> ");
			qb.push_bind(field);
			qb.push("), FALSE)");
		},
		Clause::Range { op, bound, .. } => {
			let (kind, cast, collate) = match bound {
				Bound::Number(_) => ("number", "::float8", ""),
				Bound::String(_) => ("string", "", r#" COLLATE "C""#),
			};

			qb.push("(CASE WHEN jsonb_typeof(custom_data -> ");
			qb.push_bind(field.clone());
			qb.push(") IS NULL OR jsonb_typeof(custom_data -> ");
			qb.push_bind(field.clone());
			qb.push(") = 'null' THEN FALSE WHEN jsonb_typeof(custom_data -> ");
			qb.push_bind(field.clone());
			qb.push(format!(") = '{kind}' THEN (custom_data ->> "));
			qb.push_bind(field.clone());
			qb.push(format!("){cast}{collate} {} ", op.as_sql()));

			match bound {
				Bound::Number(number) => qb.push_bind(*number),
				Bound::String(text) => qb.push_bind(text.clone()),
			};

			qb.push(" ELSE public.sift_type_mismatch(");
			qb.push_bind(field);
			qb.push(format!(", '{kind}') END)"));
		},
	}
}

fn push_sort(qb: &mut QueryBuilder<'_, Postgres>, sort: Option<&SortSpec>) {
	let Some(sort) = sort else {
		return;
	};

	qb.push("NULLIF(custom_data -> ");
	qb.push_bind(sort.field.clone());
	qb.push(format!(", 'null'::jsonb) {} NULLS LAST, ", sort.direction.as_sql()));
}
