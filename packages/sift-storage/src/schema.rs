/// Raised by range predicates whose stored attribute has an incompatible jsonb type.
pub const TYPE_MISMATCH_SQLSTATE: &str = "SF001";

/// Plain statements for one tenant partition, split on `;`.
pub fn render_schema(tenant_id: &str, vector_dim: u32) -> String {
	let init = include_str!("../../../sql/init.sql");
	let expanded = expand_includes(init);

	expanded.replace("<TENANT>", tenant_id).replace("<VECTOR_DIM>", &vector_dim.to_string())
}

/// A single plpgsql statement; its body contains `;` so it must not be split.
pub fn render_functions() -> &'static str {
	include_str!("../../../sql/functions/001_sift_type_mismatch.sql")
}

pub fn statements(sql: &str) -> impl Iterator<Item = &str> {
	sql.split(';').map(str::trim).filter(|statement| !statement.is_empty())
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"00_extensions.sql" => out.push_str(include_str!("../../../sql/00_extensions.sql")),
				"tables/001_products.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_products.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
