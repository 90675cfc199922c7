//! Findings import into `findings_consolidated`
//!
//! Findings come from external tools, not extractors, so they bypass the
//! stager and are written in their own transaction.

use super::sqlite::Database;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub const FINDINGS_TABLE: &str = "findings_consolidated";

const DEFAULT_SEVERITY: &str = "medium";
const UNKNOWN_RULE: &str = "unknown-rule";

/// One tool finding as reported, before normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub file: String,
    #[serde(default)]
    pub line: Option<i64>,
    #[serde(default, alias = "col")]
    pub column: Option<i64>,
    #[serde(default)]
    pub rule: Option<String>,
    /// Fallback rule name for tools that report patterns
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub code_snippet: Option<String>,
    #[serde(default)]
    pub cwe: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl Finding {
    /// `rule`, then `pattern`, then `"unknown-rule"`
    pub fn rule_name(&self) -> &str {
        self.rule
            .as_deref()
            .filter(|r| !r.is_empty())
            .or_else(|| self.pattern.as_deref().filter(|p| !p.is_empty()))
            .unwrap_or(UNKNOWN_RULE)
    }

    pub fn severity_or_default(&self) -> &str {
        self.severity
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SEVERITY)
    }
}

const INSERT_FINDING: &str = "INSERT INTO findings_consolidated \
     (file, line, col, rule, tool, message, severity, category, confidence, code_snippet, cwe, timestamp, details_json) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)";

impl Database<'_> {
    /// Normalize and insert findings reported by `tool`, in batch-size chunks.
    ///
    /// Returns the number of rows written. All or nothing.
    pub fn write_findings(&mut self, findings: &[Finding], tool: &str) -> Result<usize> {
        if !self.registry().is_external(FINDINGS_TABLE) {
            return Err(Error::contract(format!(
                "Table '{FINDINGS_TABLE}' is not registered as externally populated"
            )));
        }
        if findings.is_empty() {
            return Ok(0);
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
            .to_string();

        let conn = self.connection();
        let owns_transaction = conn.is_autocommit();
        conn.execute_batch(if owns_transaction {
            "BEGIN IMMEDIATE; SAVEPOINT write_findings"
        } else {
            "SAVEPOINT write_findings"
        })?;

        let outcome = (|| -> Result<usize> {
            let mut stmt = conn.prepare_cached(INSERT_FINDING)?;
            for (chunk_no, chunk) in findings.chunks(self.batch_size()).enumerate() {
                for finding in chunk {
                    let details = finding
                        .details
                        .as_ref()
                        .map_or_else(|| "{}".to_string(), ToString::to_string);
                    stmt.execute(rusqlite::params![
                        finding.file,
                        finding.line.unwrap_or(0),
                        finding.column,
                        finding.rule_name(),
                        finding.tool.as_deref().unwrap_or(tool),
                        finding.message,
                        finding.severity_or_default(),
                        finding.category,
                        finding.confidence,
                        finding.code_snippet,
                        finding.cwe,
                        timestamp,
                        details,
                    ])?;
                }
                tracing::debug!(chunk = chunk_no, rows = chunk.len(), tool, "wrote findings chunk");
            }
            conn.execute_batch("RELEASE write_findings")?;
            if owns_transaction {
                conn.execute_batch("COMMIT")?;
            }
            Ok(findings.len())
        })();

        if outcome.is_err() {
            let mut sql = String::from("ROLLBACK TO write_findings; RELEASE write_findings;");
            if owns_transaction {
                sql.push_str(" ROLLBACK;");
            }
            if let Err(e) = conn.execute_batch(&sql) {
                tracing::warn!(error = %e, "could not roll back findings import");
            }
        } else {
            tracing::info!(rows = findings.len(), tool, "findings imported");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Filter, QueryBuilder};
    use crate::{SchemaRegistry, Value};

    #[test]
    fn test_normalization_defaults() {
        let bare = Finding {
            file: "a.py".into(),
            ..Default::default()
        };
        assert_eq!(bare.rule_name(), "unknown-rule");
        assert_eq!(bare.severity_or_default(), "medium");

        let patterned = Finding {
            pattern: Some("sql-concat".into()),
            ..bare.clone()
        };
        assert_eq!(patterned.rule_name(), "sql-concat");

        let ruled = Finding {
            rule: Some("jwt-none".into()),
            ..patterned
        };
        assert_eq!(ruled.rule_name(), "jwt-none");
    }

    #[test]
    fn test_deserialize_tool_output() {
        let json = r#"[{"file": "app.js", "line": 12, "column": 4, "rule": "xss", "severity": "high",
                        "details": {"sink": "innerHTML"}}, {"file": "b.js"}]"#;
        let findings: Vec<Finding> = serde_json::from_str(json).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].column, Some(4));
        assert!(findings[1].line.is_none());
    }

    #[test]
    fn test_write_findings_in_chunks() {
        let registry = SchemaRegistry::builtin().unwrap();
        let mut db = Database::open_in_memory(&registry).unwrap();
        db.set_batch_size(2);

        let findings: Vec<Finding> = (0..5)
            .map(|i| Finding {
                file: format!("f{i}.py"),
                line: if i == 0 { None } else { Some(i) },
                tool: if i == 4 { Some("semgrep".into()) } else { None },
                ..Default::default()
            })
            .collect();
        assert_eq!(db.write_findings(&findings, "patterns").unwrap(), 5);

        let query = QueryBuilder::new(&registry)
            .build_select(
                FINDINGS_TABLE,
                Some(&["file", "line", "rule", "tool", "severity", "details_json"]),
                &[Filter::eq("file", "f0.py")],
                &[],
                None,
            )
            .unwrap();
        assert_eq!(
            db.fetch(&query).unwrap(),
            vec![vec![
                Value::from("f0.py"),
                Value::from(0),
                Value::from("unknown-rule"),
                Value::from("patterns"),
                Value::from("medium"),
                Value::from("{}"),
            ]]
        );

        let tools = QueryBuilder::new(&registry)
            .build_select(FINDINGS_TABLE, Some(&["tool"]), &[Filter::eq("tool", "semgrep")], &[], None)
            .unwrap();
        assert_eq!(db.fetch(&tools).unwrap().len(), 1);
    }

    #[test]
    fn test_failure_in_later_chunk_writes_nothing() {
        let registry = SchemaRegistry::builtin().unwrap();
        let mut db = Database::open_in_memory(&registry).unwrap();
        db.set_batch_size(2);
        db.connection()
            .execute_batch(
                "CREATE TRIGGER reject_broken_file BEFORE INSERT ON findings_consolidated \
                 WHEN NEW.file = 'broken.py' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
            )
            .unwrap();

        let mut findings: Vec<Finding> = (0..4)
            .map(|i| Finding {
                file: format!("f{i}.py"),
                ..Default::default()
            })
            .collect();
        findings.push(Finding {
            file: "broken.py".into(),
            ..Default::default()
        });

        assert!(db.write_findings(&findings, "patterns").is_err());
        assert!(db.connection().is_autocommit());
        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM findings_consolidated", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
