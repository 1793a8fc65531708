use clap::Args;
use hn_store_sql::{
  dialect::{self, COMMENT, STORY, UpsertDialect},
  schema,
};

use super::{Outcome, exit};

#[derive(Args, Debug)]
pub struct SchemaArgs {
  /// sqlite, postgresql, mysql or plain.
  #[arg(short, long, default_value = "sqlite", value_parser = parse_dialect)]
  pub dialect: &'static dyn UpsertDialect,
}

fn parse_dialect(name: &str) -> Result<&'static dyn UpsertDialect, String> {
  dialect::by_name(&name.to_ascii_lowercase())
    .ok_or_else(|| format!("unknown dialect `{name}` (expected sqlite, postgresql, mysql or plain)"))
}

pub fn run(args: SchemaArgs) -> Outcome {
  print!("{}", render(args.dialect));
  Ok(exit::OK)
}

/// The DDL followed by the single-row upsert for each table.
fn render(dialect: &dyn UpsertDialect) -> String {
  let mut out = format!("-- {} schema\n", dialect.name());
  out.push_str(&schema::script(dialect.schema()));
  out.push_str("\n-- upsert, one row\n");
  for table in [&STORY, &COMMENT] {
    out.push_str(&dialect.upsert_sql(table, 1));
    out.push_str(";\n");
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn aliases_resolve() {
    assert_eq!(parse_dialect("PostgreSQL").unwrap().name(), "postgresql");
    assert_eq!(parse_dialect("mariadb").unwrap().name(), "mysql");
    assert!(parse_dialect("oracle").is_err());
  }

  #[test]
  fn sqlite_render() {
    let text = render(parse_dialect("sqlite").unwrap());
    assert!(text.starts_with("-- sqlite schema\nCREATE TABLE IF NOT EXISTS story ("));
    assert!(text.contains("INSERT INTO story (id, author"));
    assert!(text.contains("ON CONFLICT (id) DO UPDATE SET author = excluded.author"));
  }

  #[test]
  fn plain_render_has_no_conflict_clause() {
    let text = render(parse_dialect("plain").unwrap());
    assert!(text.contains("VALUES (?, ?, ?, ?, ?);\n"));
    assert!(!text.contains("ON CONFLICT"));
  }
}
