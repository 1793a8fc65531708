//! DDL for the item tables, one set per dialect.
//!
//! Every statement is idempotent (`IF NOT EXISTS`), so stores run the full set
//! on every connect. `tech` and `story_tech` are created for downstream
//! consumers; nothing in this workspace writes them.

/// Tables every dialect creates, in dependency order.
pub const TABLES: &[&str] = &["story", "comment", "tech", "story_tech"];

pub const SQLITE: &[&str] = &[
  "CREATE TABLE IF NOT EXISTS story (
    id          INTEGER PRIMARY KEY,
    author      TEXT,
    descendants INTEGER,
    score       INTEGER,
    time        TEXT,                        -- RFC 3339, UTC
    title       TEXT NOT NULL,
    url         TEXT,
    kids        TEXT NOT NULL DEFAULT '[]'   -- JSON array of ids
)",
  "CREATE TABLE IF NOT EXISTS comment (
    id     INTEGER PRIMARY KEY,
    author TEXT,
    parent INTEGER,
    time   TEXT,
    text   TEXT
)",
  "CREATE INDEX IF NOT EXISTS comment_parent_idx ON comment (parent)",
  "CREATE TABLE IF NOT EXISTS tech (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
)",
  "CREATE TABLE IF NOT EXISTS story_tech (
    story_id INTEGER NOT NULL REFERENCES story(id),
    tech_id  INTEGER NOT NULL REFERENCES tech(id),
    PRIMARY KEY (story_id, tech_id)
)",
];

pub const POSTGRES: &[&str] = &[
  "CREATE TABLE IF NOT EXISTS story (
    id          BIGINT PRIMARY KEY,
    author      TEXT,
    descendants BIGINT,
    score       BIGINT,
    time        TIMESTAMPTZ,
    title       TEXT NOT NULL,
    url         TEXT,
    kids        JSONB NOT NULL DEFAULT '[]'::jsonb
)",
  "CREATE TABLE IF NOT EXISTS comment (
    id     BIGINT PRIMARY KEY,
    author TEXT,
    parent BIGINT,
    time   TIMESTAMPTZ,
    text   TEXT
)",
  "CREATE INDEX IF NOT EXISTS comment_parent_idx ON comment (parent)",
  "CREATE TABLE IF NOT EXISTS tech (
    id   BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
)",
  "CREATE TABLE IF NOT EXISTS story_tech (
    story_id BIGINT NOT NULL REFERENCES story(id),
    tech_id  BIGINT NOT NULL REFERENCES tech(id),
    PRIMARY KEY (story_id, tech_id)
)",
];

pub const MYSQL: &[&str] = &[
  "CREATE TABLE IF NOT EXISTS story (
    id          BIGINT PRIMARY KEY,
    author      VARCHAR(255),
    descendants BIGINT,
    score       BIGINT,
    time        DATETIME(6),
    title       TEXT NOT NULL,
    url         TEXT,
    kids        JSON NOT NULL
)",
  "CREATE TABLE IF NOT EXISTS comment (
    id     BIGINT PRIMARY KEY,
    author VARCHAR(255),
    parent BIGINT,
    time   DATETIME(6),
    text   MEDIUMTEXT,
    INDEX comment_parent_idx (parent)
)",
  "CREATE TABLE IF NOT EXISTS tech (
    id   BIGINT AUTO_INCREMENT PRIMARY KEY,
    name VARCHAR(255) NOT NULL UNIQUE
)",
  "CREATE TABLE IF NOT EXISTS story_tech (
    story_id BIGINT NOT NULL,
    tech_id  BIGINT NOT NULL,
    PRIMARY KEY (story_id, tech_id),
    FOREIGN KEY (story_id) REFERENCES story(id),
    FOREIGN KEY (tech_id) REFERENCES tech(id)
)",
];

/// Portable types only; no index, since `CREATE INDEX IF NOT EXISTS` is not.
pub const PLAIN: &[&str] = &[
  "CREATE TABLE IF NOT EXISTS story (
    id          BIGINT PRIMARY KEY,
    author      VARCHAR(255),
    descendants BIGINT,
    score       BIGINT,
    time        TIMESTAMP,
    title       VARCHAR(4000) NOT NULL,
    url         VARCHAR(4000),
    kids        VARCHAR(4000) NOT NULL
)",
  "CREATE TABLE IF NOT EXISTS comment (
    id     BIGINT PRIMARY KEY,
    author VARCHAR(255),
    parent BIGINT,
    time   TIMESTAMP,
    text   CLOB
)",
  "CREATE TABLE IF NOT EXISTS tech (
    id   BIGINT PRIMARY KEY,
    name VARCHAR(255) NOT NULL UNIQUE
)",
  "CREATE TABLE IF NOT EXISTS story_tech (
    story_id BIGINT NOT NULL REFERENCES story(id),
    tech_id  BIGINT NOT NULL REFERENCES tech(id),
    PRIMARY KEY (story_id, tech_id)
)",
];

/// SQLite connection settings applied before the DDL.
pub const SQLITE_PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Recorded in `PRAGMA user_version` once the SQLite DDL has run.
pub const SQLITE_SCHEMA_VERSION: i64 = 1;

/// Key of the transaction-scoped advisory lock serialising PostgreSQL DDL.
pub const POSTGRES_DDL_LOCK: i64 = 0x686e_5f73_6368;

/// Join a statement list into one script for display or batch execution.
pub fn script(statements: &[&str]) -> String {
  let mut out = String::new();
  for stmt in statements {
    out.push_str(stmt);
    out.push_str(";\n");
  }
  out
}
