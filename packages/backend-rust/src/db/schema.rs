pub const SCHEMA_VERSION: &str = "1";

pub const LEARNER_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS "_db_metadata" (
    "key" TEXT PRIMARY KEY,
    "value" TEXT NOT NULL
);

-- Per-(user, topic) mastery. "state" holds the full serialized model state;
-- the other columns mirror it for querying.
CREATE TABLE IF NOT EXISTS "topic_mastery" (
    "user_id" TEXT NOT NULL,
    "topic_id" TEXT NOT NULL,
    "mastery_probability" REAL NOT NULL,
    "confidence_score" REAL NOT NULL,
    "attempt_count" INTEGER NOT NULL,
    "success_count" INTEGER NOT NULL,
    "improvement_trend" TEXT NOT NULL,
    "state" TEXT NOT NULL,
    "version" INTEGER NOT NULL DEFAULT 1,
    "updated_at" TEXT NOT NULL,
    PRIMARY KEY ("user_id", "topic_id")
);

CREATE TABLE IF NOT EXISTS "revision_schedule" (
    "user_id" TEXT NOT NULL,
    "topic_id" TEXT NOT NULL,
    "retention_probability" REAL NOT NULL,
    "stability_days" REAL NOT NULL,
    "next_revision_date" TEXT NOT NULL,
    "urgency_level" TEXT NOT NULL,
    "state" TEXT NOT NULL,
    "version" INTEGER NOT NULL DEFAULT 1,
    "updated_at" TEXT NOT NULL,
    PRIMARY KEY ("user_id", "topic_id")
);

CREATE INDEX IF NOT EXISTS "idx_revision_schedule_next"
    ON "revision_schedule" ("user_id", "next_revision_date");
"#;

/// Split a script on `;`, ignoring semicolons inside quotes and dropping
/// `--` comment lines.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let body: String = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in body.chars() {
        match (ch, quote) {
            ('\'' | '"', None) => quote = Some(ch),
            (c, Some(q)) if c == q => quote = None,
            (';', None) => {
                let stmt = current.trim();
                if !stmt.is_empty() {
                    statements.push(stmt.to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    let tail = current.trim();
    if !tail.is_empty() {
        statements.push(tail.to_string());
    }
    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_splits_into_statements() {
        let statements = split_sql_statements(LEARNER_SCHEMA_SQL);
        assert_eq!(statements.len(), 4);
        assert!(statements.iter().all(|s| !s.contains("--")));
        assert!(statements[1].contains("\"topic_mastery\""));
    }

    #[test]
    fn test_semicolon_inside_quotes_kept() {
        let statements = split_sql_statements("INSERT INTO t VALUES ('a;b'); SELECT 1");
        assert_eq!(statements, vec!["INSERT INTO t VALUES ('a;b')", "SELECT 1"]);
    }
}
