// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! SQL text utilities.
//!
//! The generator never plans or validates queries. It only needs two things
//! from the SQL a DAO declares:
//!
//! - rewriting `:name` parameters into dialect placeholders
//! - telling mutating statements apart from reads, and which table they touch
//!
//! # Placeholder Rewriting
//!
//! | Dialect | `WHERE a = :x AND b = :y OR c = :x` | Bound values |
//! |---------|-------------------------------------|--------------|
//! | Sqlite | `WHERE a = ? AND b = ? OR c = ?` | `x, y, x` |
//! | Postgres | `WHERE a = $1 AND b = $2 OR c = $1` | `x, y` |
//!
//! Quoted text and `::` casts are left alone.

use crate::target::Dialect;

/// Query with dialect placeholders and the parameters to bind, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundQuery {
    /// Rewritten SQL.
    pub sql:    String,
    /// Parameter names, one per placeholder value.
    pub params: Vec<String>
}

/// Statement kind, judged from the leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `SELECT` or `WITH`.
    Select,
    /// `INSERT`.
    Insert,
    /// `UPDATE`.
    Update,
    /// `DELETE`.
    Delete,
    /// `REPLACE`.
    Replace,
    /// Anything else (DDL, pragmas).
    Other
}

impl StatementKind {
    /// Check whether the statement writes rows.
    #[must_use]
    pub fn is_mutation(self) -> bool {
        matches!(self, Self::Insert | Self::Update | Self::Delete | Self::Replace)
    }
}

/// Rewrite `:name` parameters into placeholders of the dialect.
#[must_use]
pub fn bind_named(sql: &str, dialect: Dialect) -> BoundQuery {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut params: Vec<String> = Vec::new();
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
                i += 1;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if chars.get(i + 1).is_some_and(|n| is_ident_start(*n)) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_ident_char(chars[end]) {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                out.push_str(&placeholder_for(dialect, &name, &mut params));
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    BoundQuery {
        sql: out,
        params
    }
}

fn placeholder_for(dialect: Dialect, name: &str, params: &mut Vec<String>) -> String {
    match dialect {
        Dialect::Sqlite => {
            params.push(name.to_string());
            dialect.placeholder(params.len())
        }
        Dialect::Postgres => {
            let index = match params.iter().position(|p| p == name) {
                Some(existing) => existing + 1,
                None => {
                    params.push(name.to_string());
                    params.len()
                }
            };
            dialect.placeholder(index)
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn words(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .filter(|w| !w.is_empty())
}

/// Classify a statement by its leading keyword.
#[must_use]
pub fn classify(sql: &str) -> StatementKind {
    let Some(first) = words(sql).next() else {
        return StatementKind::Other;
    };

    match first.to_uppercase().as_str() {
        "SELECT" | "WITH" => StatementKind::Select,
        "INSERT" => StatementKind::Insert,
        "UPDATE" => StatementKind::Update,
        "DELETE" => StatementKind::Delete,
        "REPLACE" => StatementKind::Replace,
        _ => StatementKind::Other
    }
}

/// Check whether an insert overwrites existing rows: `REPLACE`,
/// `INSERT OR REPLACE` or `INSERT .. ON CONFLICT .. DO UPDATE`.
#[must_use]
pub fn replaces_rows(sql: &str) -> bool {
    let upper: Vec<String> = words(sql).map(str::to_uppercase).collect();
    match classify(sql) {
        StatementKind::Replace => true,
        StatementKind::Insert => {
            upper.get(1..3).is_some_and(|w| w == ["OR", "REPLACE"])
                || upper.windows(2).any(|w| w == ["DO", "UPDATE"])
        }
        _ => false
    }
}

/// Table written by a mutating statement.
///
/// Handles `INSERT [OR ...] INTO t`, `REPLACE INTO t`, `UPDATE [OR ...] t`
/// and `DELETE FROM t`. Returns `None` for reads or unrecognized shapes.
#[must_use]
pub fn mutated_table(sql: &str) -> Option<String> {
    let words: Vec<&str> = words(sql).collect();
    let upper: Vec<String> = words.iter().map(|w| w.to_uppercase()).collect();
    let keyword = |i: usize| upper.get(i).map(String::as_str);

    let table_at = match classify(sql) {
        StatementKind::Insert | StatementKind::Replace => {
            upper.iter().position(|w| w == "INTO").map(|i| i + 1)
        }
        StatementKind::Update => {
            if keyword(1) == Some("OR") {
                Some(3)
            } else {
                Some(1)
            }
        }
        StatementKind::Delete => (keyword(1) == Some("FROM")).then_some(2),
        StatementKind::Select | StatementKind::Other => None
    }?;

    let table = words.get(table_at)?.trim_matches(|c: char| matches!(c, '"' | '`' | '[' | ']'));
    (!table.is_empty()).then(|| table.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY: &str = "SELECT * FROM person WHERE a = :x AND b = :y OR c = :x";

    #[test]
    fn sqlite_binds_every_occurrence() {
        let bound = bind_named(QUERY, Dialect::Sqlite);
        assert_eq!(bound.sql, "SELECT * FROM person WHERE a = ? AND b = ? OR c = ?");
        assert_eq!(bound.params, vec!["x", "y", "x"]);
    }

    #[test]
    fn postgres_numbers_by_first_use() {
        let bound = bind_named(QUERY, Dialect::Postgres);
        assert_eq!(bound.sql, "SELECT * FROM person WHERE a = $1 AND b = $2 OR c = $1");
        assert_eq!(bound.params, vec!["x", "y"]);
    }

    #[test]
    fn casts_and_literals_are_untouched() {
        let bound = bind_named(
            "SELECT id::text FROM t WHERE note = ':skip' AND id = :id",
            Dialect::Postgres
        );
        assert_eq!(bound.sql, "SELECT id::text FROM t WHERE note = ':skip' AND id = $1");
        assert_eq!(bound.params, vec!["id"]);
    }

    #[test]
    fn query_without_parameters() {
        let bound = bind_named("SELECT count(*) FROM person", Dialect::Sqlite);
        assert_eq!(bound.sql, "SELECT count(*) FROM person");
        assert!(bound.params.is_empty());
    }

    #[test]
    fn classification() {
        assert_eq!(classify("  select * from t"), StatementKind::Select);
        assert_eq!(classify("INSERT INTO t VALUES (1)"), StatementKind::Insert);
        assert_eq!(classify("replace into t values (1)"), StatementKind::Replace);
        assert_eq!(classify("UPDATE t SET a = 1"), StatementKind::Update);
        assert_eq!(classify("DELETE FROM t"), StatementKind::Delete);
        assert_eq!(classify("PRAGMA user_version"), StatementKind::Other);
        assert!(classify("DELETE FROM t").is_mutation());
        assert!(!classify("SELECT 1").is_mutation());
    }

    #[test]
    fn replacing_inserts() {
        assert!(replaces_rows("REPLACE INTO t VALUES (1)"));
        assert!(replaces_rows("insert or replace into t values (1)"));
        assert!(replaces_rows(
            "INSERT INTO t (id, a) VALUES ($1, $2) ON CONFLICT (id) DO UPDATE SET a = EXCLUDED.a"
        ));
        assert!(!replaces_rows("INSERT INTO t VALUES (1)"));
        assert!(!replaces_rows("INSERT OR IGNORE INTO t VALUES (1)"));
        assert!(!replaces_rows("INSERT INTO t VALUES (1) ON CONFLICT DO NOTHING"));
        assert!(!replaces_rows("UPDATE t SET a = 1"));
    }

    #[test]
    fn mutated_tables() {
        assert_eq!(mutated_table("INSERT INTO person(id) VALUES (:id)").as_deref(), Some("person"));
        assert_eq!(
            mutated_table("INSERT OR REPLACE INTO \"person\" VALUES (1)").as_deref(),
            Some("person")
        );
        assert_eq!(mutated_table("REPLACE INTO tag VALUES (1)").as_deref(), Some("tag"));
        assert_eq!(mutated_table("UPDATE person SET a = 1").as_deref(), Some("person"));
        assert_eq!(mutated_table("UPDATE OR IGNORE person SET a = 1").as_deref(), Some("person"));
        assert_eq!(mutated_table("DELETE FROM `tag` WHERE id = 1").as_deref(), Some("tag"));
        assert_eq!(mutated_table("DELETE tag"), None);
        assert_eq!(mutated_table("SELECT * FROM person"), None);
    }
}
