//! SQLite → PostgreSQL dump rewriting
//!
//! A `sqlite3 .dump` is almost-valid PostgreSQL; these rules close the gap:
//! SQLite pragmas and the sqlite_sequence bookkeeping table disappear,
//! autoincrementing integer keys become SERIAL, sized integer/text column
//! types are mapped to their PostgreSQL shapes, and absurdly wide varchars
//! are clamped to PostgreSQL's maximum.
//!
//! The transform is pure text → text; dumping and loading shell out to the
//! database CLIs in the migration resource.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

/// PostgreSQL's varchar ceiling; anything wider gets clamped to it
const MAX_VARCHAR: &str = "varchar(10485760)";

static SERIAL_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"INTEGER PRIMARY KEY")
        .case_insensitive(true)
        .build()
        .expect("serial key regex is valid")
});

static SIZED_INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"integer\([^)]*\)").expect("sized integer regex is valid"));

static SIZED_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"text\(([0-9]+)\)").expect("sized text regex is valid"));

static WIDE_VARCHAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"varchar\([1-9][0-9]{7,}\)").expect("wide varchar regex is valid")
});

/// Rewrite a SQLite dump into loadable PostgreSQL SQL.
pub fn transform_dump(dump: &str) -> String {
    let mut out = String::with_capacity(dump.len());

    for line in dump.lines() {
        if line.contains("PRAGMA") || line.contains("sqlite_sequence") {
            continue;
        }

        let line = line.replace("AUTOINCREMENT ", "");
        let line = SERIAL_KEY_RE.replace_all(&line, "SERIAL PRIMARY KEY");
        let line = line.replace("datetime", "timestamp");
        let line = SIZED_INTEGER_RE.replace_all(&line, "integer");
        let line = SIZED_TEXT_RE.replace_all(&line, "varchar($1)");
        let line = line.replace("TINYINT", "INTEGER");
        let line = WIDE_VARCHAR_RE.replace_all(&line, MAX_VARCHAR);

        out.push_str(&line);
        out.push('\n');
    }

    out
}

/// Derive the table name from a PostgreSQL id sequence name.
///
/// SERIAL columns produce `<table>_id_seq` sequences.
pub fn table_for_sequence(sequence: &str) -> &str {
    sequence.strip_suffix("_id_seq").unwrap_or(sequence)
}

/// Statements realigning every id sequence with its table's max id.
///
/// Run after the dump load: COPY keeps the original ids, so the sequences
/// still start at 1.
pub fn sequence_fixups(sequences: &[String]) -> Vec<String> {
    sequences
        .iter()
        .map(|sequence| {
            let table = table_for_sequence(sequence);
            format!("select setval('{sequence}', (select max(id) from {table}))")
        })
        .collect()
}
