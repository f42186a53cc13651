// tests/lookup_tests.rs

use std::fs;

use pretty_assertions::assert_eq;
use quill_lang::{
    Document, Evaluator,
    error::ErrorKind,
    lookup::{DirectorySource, LookupTable, MemorySource, TableConfig, TableSource, parse_csv_line},
};

const STATES_CONFIG: &str = "\
# state codes
primaryKeyColumnIndex=1
hasHeader=true
caseSensitive=false
";

const STATES_ROWS: &str = "\
code,name,rate
CA,California,7.25
\"NY\",\"New York, State\",4
ca,Duplicate,0
";

fn states() -> MemorySource {
    MemorySource::new().with_table("States", STATES_CONFIG, STATES_ROWS)
}

fn lookup(source: impl TableSource + 'static, script: &str) -> String {
    Evaluator::new()
        .with_table_source(source)
        .eval_script(script, &Document::empty())
        .unwrap_or_else(|e| panic!("{} failed: {}", script, e))
        .to_string()
}

// ============================================================================
// Lookup Function
// ============================================================================

#[test]
fn test_lookup_by_key() {
    assert_eq!(lookup(states(), "Lookup('CA', 'States', 2)"), "California");
    assert_eq!(lookup(states(), "Lookup('CA', 'States', 3)"), "7.25");
}

#[test]
fn test_lookup_quoted_cells() {
    assert_eq!(lookup(states(), "Lookup('NY', 'States', 2)"), "New York, State");
}

#[test]
fn test_first_row_for_a_key_wins() {
    // caseSensitive=false folds "ca" onto "CA"
    assert_eq!(lookup(states(), "Lookup('ca', 'States', 2)"), "California");
}

#[test]
fn test_header_row_is_not_a_key() {
    assert_eq!(lookup(states(), "Lookup('code', 'States', 2)"), "");
}

#[test]
fn test_missing_key_uses_default() {
    assert_eq!(lookup(states(), "Lookup('TX', 'States', 2, 'n/a')"), "n/a");
    assert_eq!(lookup(states(), "Lookup('TX', 'States', 2)"), "");

    let source = MemorySource::new().with_table("T", "primaryKeyColumnIndex=1", "key,v\nY,1\n");
    assert_eq!(lookup(source, "Lookup('X','T',1,'dflt')"), "dflt");
}

#[test]
fn test_out_of_range_column_uses_default() {
    assert_eq!(lookup(states(), "Lookup('CA', 'States', 9, 'none')"), "none");
    assert_eq!(lookup(states(), "Lookup('CA', 'States', 0, 'none')"), "none");
}

#[test]
fn test_numeric_key_matches_text() {
    let source = MemorySource::new().with_table(
        "Zones",
        "primaryKeyColumnIndex=2\nhasHeader=false",
        "north,10\nsouth,20\n",
    );
    assert_eq!(lookup(source, "Lookup(20, 'Zones', 1)"), "south");
}

#[test]
fn test_missing_table_is_an_error() {
    let err = Evaluator::new()
        .with_table_source(states())
        .eval_script("Lookup('X', 'T', 1, 'dflt')", &Document::empty())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Domain);
    assert!(err.to_string().contains("'T'"));
}

#[test]
fn test_blank_key_recovers_on_missing_table() {
    assert_eq!(lookup(states(), "Lookup(Missing/Field, 'T', 1)"), "");
}

#[test]
fn test_tables_load_once() {
    let evaluator = Evaluator::new().with_table_source(states());
    assert!(!evaluator.tables().is_loaded("States"));

    evaluator
        .eval_script("Lookup('CA', 'States', 2)", &Document::empty())
        .unwrap();
    assert!(evaluator.tables().is_loaded("States"));

    let first = evaluator.tables().get("States").unwrap();
    let second = evaluator.tables().get("States").unwrap();
    assert!(std::rc::Rc::ptr_eq(&first, &second));
}

// ============================================================================
// Table Configuration
// ============================================================================

#[test]
fn test_config_defaults_every_flag_on() {
    let config = TableConfig::parse("T", "primaryKeyColumnIndex: 2").unwrap();
    assert_eq!(
        config,
        TableConfig {
            primary_key_column: 2,
            has_header: true,
            trim_cells: true,
            case_sensitive: true,
        }
    );
}

#[test]
fn test_config_errors() {
    for text in [
        "hasHeader=true",
        "primaryKeyColumnIndex=abc",
        "primaryKeyColumnIndex=0",
        "! only a comment",
    ] {
        let err = TableConfig::parse("T", text).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Domain, "config: {:?}", text);
    }
}

#[test]
fn test_key_normalization() {
    let config = TableConfig::parse("T", "primaryKeyColumnIndex=1\ncaseSensitive=FALSE").unwrap();
    assert_eq!(config.normalize_key("  Ab "), "ab");

    let config =
        TableConfig::parse("T", "primaryKeyColumnIndex=1\ntrimCells=false").unwrap();
    assert_eq!(config.normalize_key("  Ab "), "  Ab ");
}

#[test]
fn test_trimmed_keys_match() {
    let config = TableConfig::parse("T", "primaryKeyColumnIndex=1\nhasHeader=false").unwrap();
    let table = LookupTable::parse("T", config, " NY ,New York\n").unwrap();
    assert_eq!(table.cell("NY", 2), Some("New York"));
    assert_eq!(table.cell("ny", 2), None);
}

#[test]
fn test_short_rows_are_skipped() {
    let config = TableConfig::parse("T", "primaryKeyColumnIndex=3\nhasHeader=false").unwrap();
    let table = LookupTable::parse("T", config, "a,b\nc,d,key,e\n").unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.find_row("key").map(<[String]>::len), Some(4));
}

#[test]
fn test_empty_table_is_an_error() {
    let config = TableConfig::parse("T", "primaryKeyColumnIndex=1").unwrap();
    let err = LookupTable::parse("T", config, "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Domain);
}

#[test]
fn test_csv_line_splitting() {
    assert_eq!(parse_csv_line("a,b,c"), vec!["a", "b", "c"]);
    assert_eq!(parse_csv_line(""), vec![""]);
    assert_eq!(parse_csv_line(r#""x,y",z"#), vec!["x,y", "z"]);
}

// ============================================================================
// Directory Source
// ============================================================================

fn table_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("LookupConfigs")).unwrap();
    fs::create_dir_all(dir.path().join("Lookups")).unwrap();
    fs::write(
        dir.path().join("LookupConfigs").join("Rates.properties"),
        "primaryKeyColumnIndex=1\nhasHeader=true\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("Lookups").join("Rates.csv"),
        "tier,rate\ngold,0.15\nsilver,0.10\n",
    )
    .unwrap();
    dir
}

#[test]
fn test_directory_source_layout() {
    let source = DirectorySource::new("/data");
    assert_eq!(
        source.config_path("Rates"),
        std::path::Path::new("/data/LookupConfigs/Rates.properties")
    );
    assert_eq!(
        source.rows_path("Rates"),
        std::path::Path::new("/data/Lookups/Rates.csv")
    );
}

#[test]
fn test_directory_source_lookup() {
    let dir = table_dir();
    let source = DirectorySource::new(dir.path());
    assert_eq!(lookup(source, "Lookup('gold', 'Rates', 2)"), "0.15");
}

#[test]
fn test_directory_source_missing_files() {
    let dir = table_dir();
    let source = DirectorySource::new(dir.path());
    assert_eq!(source.read_config("Nope").unwrap(), None);
    assert_eq!(source.read_rows("Nope").unwrap(), None);

    fs::remove_file(dir.path().join("Lookups").join("Rates.csv")).unwrap();
    let err = Evaluator::new()
        .with_table_source(DirectorySource::new(dir.path()))
        .eval_script("Lookup('gold', 'Rates', 2)", &Document::empty())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Domain);
}
