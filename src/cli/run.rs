//! Run a pipeline definition against an input document

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use super::CliError;
use crate::{
    Document, Error, Evaluator, Format, RunConfig,
    lookup::DirectorySource,
    pipeline::{NullSink, Pipeline, PipelineReport, SnapshotPoint, SnapshotSink},
};

/// Options for the run command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Pipeline definition (JSON)
    pub pipeline: PathBuf,
    /// Input document
    pub input: PathBuf,
    /// Where to write the final document; not written when absent
    pub output: Option<PathBuf>,
    /// Input format; guessed from the extension when absent
    pub format: Option<Format>,
    pub config: RunConfig,
}

/// Writes `node_<n>.<ext>` into a directory, replacing the previous
/// instruction's snapshot of the same node.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    format: Format,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>, format: Format) -> Self {
        DirectorySink {
            dir: dir.into(),
            format,
        }
    }

    pub fn path_for(&self, node: usize) -> PathBuf {
        self.dir
            .join(format!("node_{}.{}", node, self.format.extension()))
    }
}

impl SnapshotSink for DirectorySink {
    /// Creates the directory and removes snapshots left by earlier runs.
    fn begin(&mut self) -> Result<(), Error> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let entries = fs::read_dir(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| Error::io(&self.dir, e))?.path();
            let stale = path.is_file()
                && matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("json") | Some("xml")
                );
            if stale {
                debug!(path = %path.display(), "removing old snapshot");
                fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
            }
        }
        Ok(())
    }

    fn snapshot(&mut self, point: SnapshotPoint, document: &Document) -> Result<(), Error> {
        let path = self.path_for(point.node());
        fs::write(&path, document.render()?).map_err(|e| Error::io(&path, e))
    }
}

/// Loads everything `options` names, runs the pipeline and writes the result.
pub fn execute_run(options: &RunOptions) -> Result<PipelineReport, CliError> {
    let pipeline = Pipeline::load(&options.pipeline)?;
    let input = Document::load(&options.input, options.format)?;
    let config = &options.config;

    let mut evaluator = Evaluator::with_options(config.options.clone());
    if let Some(dir) = &config.tables_dir {
        evaluator = evaluator.with_table_source(DirectorySource::new(dir));
    }

    let report = match &config.intermediate_dir {
        Some(dir) => {
            let mut sink = DirectorySink::new(dir, input.format());
            pipeline.run(&evaluator, input, &mut sink)?
        }
        None => pipeline.run(&evaluator, input, &mut NullSink)?,
    };

    if let Some(path) = &options.output {
        write_document(path, &report.document)?;
        info!(path = %path.display(), "wrote result");
    }
    Ok(report)
}

fn write_document(path: &Path, document: &Document) -> Result<(), Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, document.render()?).map_err(|e| Error::io(path, e))
}
