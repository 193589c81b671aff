pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_users.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_users.sql")),
				"tables/002_vulnerabilities.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_vulnerabilities.sql")),
				"tables/003_comments.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_comments.sql")),
				"tables/004_attachments.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_attachments.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn expands_every_include() {
		let schema = render_schema();

		assert!(!schema.contains("\\ir "));
		assert!(schema.contains("CREATE TABLE IF NOT EXISTS users"));
		assert!(schema.contains("CREATE TABLE IF NOT EXISTS vulnerabilities"));
		assert!(schema.contains("CREATE TABLE IF NOT EXISTS comments"));
		assert!(schema.contains("CREATE TABLE IF NOT EXISTS attachments"));
	}

	#[test]
	fn children_cascade_on_delete() {
		let schema = render_schema();

		assert_eq!(schema.matches("ON DELETE CASCADE").count(), 4);
	}
}
