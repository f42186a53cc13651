//! Lookup tables for the `Lookup` function.
//!
//! A table is two text resources: a properties-style configuration and
//! comma-separated rows. Where they come from is a [`TableSource`]; the
//! [`TableCache`] parses each table once and keeps it for the life of the
//! evaluator.

use std::{
    cell::RefCell,
    collections::HashMap,
    fs, io,
    path::{Path as FsPath, PathBuf},
    rc::Rc,
};

use tracing::debug;

use crate::error::EvalError;

/// Provider of raw table text, looked up by table name.
///
/// `Ok(None)` means the resource does not exist; `Err` means it exists but
/// could not be read.
pub trait TableSource {
    fn read_config(&self, table: &str) -> io::Result<Option<String>>;
    fn read_rows(&self, table: &str) -> io::Result<Option<String>>;
}

/// Reads `<root>/LookupConfigs/<name>.properties` and `<root>/Lookups/<name>.csv`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectorySource { root: root.into() }
    }

    pub fn config_path(&self, table: &str) -> PathBuf {
        self.root
            .join("LookupConfigs")
            .join(format!("{}.properties", table))
    }

    pub fn rows_path(&self, table: &str) -> PathBuf {
        self.root.join("Lookups").join(format!("{}.csv", table))
    }
}

fn read_optional(path: &FsPath) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

impl TableSource for DirectorySource {
    fn read_config(&self, table: &str) -> io::Result<Option<String>> {
        read_optional(&self.config_path(table))
    }

    fn read_rows(&self, table: &str) -> io::Result<Option<String>> {
        read_optional(&self.rows_path(table))
    }
}

/// Tables held in memory, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<String, (String, String)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: &str, config: &str, rows: &str) {
        self.tables
            .insert(table.to_string(), (config.to_string(), rows.to_string()));
    }

    pub fn with_table(mut self, table: &str, config: &str, rows: &str) -> Self {
        self.insert(table, config, rows);
        self
    }
}

impl TableSource for MemorySource {
    fn read_config(&self, table: &str) -> io::Result<Option<String>> {
        Ok(self.tables.get(table).map(|(config, _)| config.clone()))
    }

    fn read_rows(&self, table: &str) -> io::Result<Option<String>> {
        Ok(self.tables.get(table).map(|(_, rows)| rows.clone()))
    }
}

/// Per-table settings from the `.properties` resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    /// 1-based column holding the key
    pub primary_key_column: usize,
    pub has_header: bool,
    pub trim_cells: bool,
    pub case_sensitive: bool,
}

impl TableConfig {
    /// Parses properties text: `key=value` or `key: value`, `#`/`!` comments.
    pub fn parse(table: &str, text: &str) -> Result<Self, EvalError> {
        let properties = parse_properties(text);
        let flag = |key: &str| {
            properties
                .get(key)
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(true)
        };

        let raw = properties.get("primaryKeyColumnIndex").ok_or_else(|| {
            EvalError::Domain(format!(
                "lookup '{}': missing config key 'primaryKeyColumnIndex'",
                table
            ))
        })?;
        let column: i64 = raw.trim().parse().map_err(|_| {
            EvalError::Domain(format!(
                "lookup '{}': bad integer for 'primaryKeyColumnIndex'",
                table
            ))
        })?;
        if column < 1 {
            return Err(EvalError::Domain(format!(
                "lookup '{}': primaryKeyColumnIndex must be >= 1",
                table
            )));
        }

        Ok(TableConfig {
            primary_key_column: column as usize,
            has_header: flag("hasHeader"),
            trim_cells: flag("trimCells"),
            case_sensitive: flag("caseSensitive"),
        })
    }

    /// Key as stored in (and looked up from) the index.
    pub fn normalize_key(&self, key: &str) -> String {
        let key = if self.trim_cells { key.trim() } else { key };
        if self.case_sensitive {
            key.to_string()
        } else {
            key.to_lowercase()
        }
    }
}

fn parse_properties(text: &str) -> HashMap<String, String> {
    let mut properties = HashMap::new();
    for line in text.lines() {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let (key, value) = match line.find(['=', ':']) {
            Some(at) => (&line[..at], &line[at + 1..]),
            None => (line, ""),
        };
        properties.insert(key.trim_end().to_string(), value.trim_start().to_string());
    }
    properties
}

/// Splits one CSV line. Quoted fields may contain commas; `""` inside
/// quotes is a literal quote.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) => in_quotes = true,
            (',', false) => cells.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    cells.push(cell);
    cells
}

/// A parsed, indexed lookup table.
#[derive(Debug, Clone)]
pub struct LookupTable {
    name: String,
    config: TableConfig,
    rows: HashMap<String, Vec<String>>,
}

impl LookupTable {
    /// Builds the key index. The first row seen for a key wins; rows too
    /// short to have a key are skipped.
    pub fn parse(name: &str, config: TableConfig, text: &str) -> Result<Self, EvalError> {
        let lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() {
            return Err(EvalError::Domain(format!("lookup '{}' is empty", name)));
        }

        let skip = usize::from(config.has_header);
        let mut rows = HashMap::new();
        for line in lines.into_iter().skip(skip) {
            let row = parse_csv_line(line);
            let Some(key) = row.get(config.primary_key_column - 1) else {
                continue;
            };
            rows.entry(config.normalize_key(key)).or_insert(row);
        }

        Ok(LookupTable {
            name: name.to_string(),
            config,
            rows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row whose key matches `key` after normalization.
    pub fn find_row(&self, key: &str) -> Option<&[String]> {
        self.rows
            .get(&self.config.normalize_key(key))
            .map(Vec::as_slice)
    }

    /// Cell at 1-based `column` of the row keyed by `key`.
    pub fn cell(&self, key: &str, column: usize) -> Option<&str> {
        let row = self.find_row(key)?;
        column
            .checked_sub(1)
            .and_then(|i| row.get(i))
            .map(String::as_str)
    }
}

/// Loads tables from a source on first use and caches them by name.
pub struct TableCache {
    source: Box<dyn TableSource>,
    tables: RefCell<HashMap<String, Rc<LookupTable>>>,
}

impl TableCache {
    pub fn new(source: impl TableSource + 'static) -> Self {
        TableCache {
            source: Box::new(source),
            tables: RefCell::new(HashMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Result<Rc<LookupTable>, EvalError> {
        if let Some(table) = self.tables.borrow().get(name) {
            return Ok(Rc::clone(table));
        }

        let table = Rc::new(self.load(name)?);
        debug!(table = name, rows = table.len(), "loaded lookup table");
        self.tables
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&table));
        Ok(table)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.tables.borrow().contains_key(name)
    }

    fn load(&self, name: &str) -> Result<LookupTable, EvalError> {
        let io_error = |what: &str, e: io::Error| {
            EvalError::Io(format!("cannot read lookup {} for '{}': {}", what, name, e))
        };

        let config_text = self
            .source
            .read_config(name)
            .map_err(|e| io_error("config", e))?
            .ok_or_else(|| EvalError::Domain(format!("missing lookup config for '{}'", name)))?;
        let config = TableConfig::parse(name, &config_text)?;

        let rows_text = self
            .source
            .read_rows(name)
            .map_err(|e| io_error("table", e))?
            .ok_or_else(|| EvalError::Domain(format!("missing lookup table '{}'", name)))?;
        LookupTable::parse(name, config, &rows_text)
    }
}

impl Default for TableCache {
    fn default() -> Self {
        TableCache::new(MemorySource::new())
    }
}

impl std::fmt::Debug for TableCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableCache")
            .field("loaded", &self.tables.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

#[test]
fn test_csv_quotes() {
    assert_eq!(
        parse_csv_line(r#"a,"b,c","say ""hi""",,"#),
        vec!["a", "b,c", "say \"hi\"", "", ""]
    );
}
