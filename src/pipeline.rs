//! Multi-node pipeline executor.
//!
//! A [`Pipeline`] is an ordered list of nodes, each an ordered list of
//! `(path, script)` instructions. Every node starts from a copy of the
//! output snapshot (the *intermediate* document), writes each result into
//! that copy, and promotes it to the new output snapshot when the node ends.
//!
//! While a script runs, a path equal to the instruction's own target reads
//! the intermediate document; any other path reads the output snapshot
//! left by the previous node.

use std::{collections::HashMap, fmt, fs, path::Path as FsPath, rc::Rc};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    ast::Expr,
    document::Document,
    entities::decode_entities,
    error::Error,
    evaluator::Evaluator,
    parser::parse_script,
};

/// One derived field: where to write it and how to compute it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub path: String,
    /// Blank scripts write the empty string without parsing
    #[serde(default)]
    pub script: String,
}

impl Instruction {
    pub fn new(path: impl Into<String>, script: impl Into<String>) -> Self {
        Instruction {
            path: path.into(),
            script: script.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl Node {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Node {
            name: None,
            instructions,
        }
    }

    pub fn named(name: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        Node {
            name: Some(name.into()),
            instructions,
        }
    }
}

/// A pipeline definition, usually loaded from JSON:
///
/// ```
/// use quill_lang::pipeline::Pipeline;
///
/// let pipeline = Pipeline::from_json_str(r#"{
///     "nodes": [
///         {"name": "names", "instructions": [
///             {"path": "Letter/FullName", "script": "Concat(Owner/First, ' ', Owner/Last)"}
///         ]}
///     ]
/// }"#).unwrap();
/// assert_eq!(pipeline.nodes.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Pipeline {
    pub fn new(nodes: Vec<Node>) -> Self {
        Pipeline { nodes }
    }

    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|e| Error::Config(format!("invalid pipeline: {}", e)))
    }

    pub fn load(path: &FsPath) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Pipeline::from_json_str(&text)
    }

    /// Total instruction count across all nodes.
    pub fn instruction_count(&self) -> usize {
        self.nodes.iter().map(|node| node.instructions.len()).sum()
    }

    /// Runs every node against `input`.
    pub fn run(
        &self,
        evaluator: &Evaluator,
        input: Document,
        sink: &mut dyn SnapshotSink,
    ) -> Result<PipelineReport, Error> {
        Executor::new(self, evaluator, input, sink).run()
    }
}

/// Where the executor is. Node indices are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    ProcessingNode(usize),
    NodeComplete(usize),
    Done,
}

/// When a snapshot was taken. Numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPoint {
    Instruction { node: usize, instruction: usize },
    NodeComplete { node: usize },
}

impl SnapshotPoint {
    pub fn node(&self) -> usize {
        match *self {
            SnapshotPoint::Instruction { node, .. } | SnapshotPoint::NodeComplete { node } => node,
        }
    }
}

impl fmt::Display for SnapshotPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotPoint::Instruction { node, instruction } => {
                write!(f, "node {} instruction {}", node, instruction)
            }
            SnapshotPoint::NodeComplete { node } => write!(f, "node {} complete", node),
        }
    }
}

/// Receives the intermediate document after every instruction and the
/// promoted snapshot after every node.
pub trait SnapshotSink {
    /// Called once before the first node.
    fn begin(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn snapshot(&mut self, point: SnapshotPoint, document: &Document) -> Result<(), Error>;
}

/// Discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn snapshot(&mut self, _point: SnapshotPoint, _document: &Document) -> Result<(), Error> {
        Ok(())
    }
}

/// Keeps every snapshot in memory, in order.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    snapshots: Vec<(SnapshotPoint, Document)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> &[(SnapshotPoint, Document)] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// The snapshot taken at `point`, if any.
    pub fn at(&self, point: SnapshotPoint) -> Option<&Document> {
        self.snapshots
            .iter()
            .find(|(p, _)| *p == point)
            .map(|(_, document)| document)
    }
}

impl SnapshotSink for MemorySink {
    fn begin(&mut self) -> Result<(), Error> {
        self.snapshots.clear();
        Ok(())
    }

    fn snapshot(&mut self, point: SnapshotPoint, document: &Document) -> Result<(), Error> {
        self.snapshots.push((point, document.clone()));
        Ok(())
    }
}

/// A function failure turned into `""` because of a blank argument.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryWarning {
    pub node: usize,
    pub instruction: usize,
    pub path: String,
    pub function: String,
    pub message: String,
}

impl fmt::Display for RecoveryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node {}, instruction {} (path '{}'): {} returned '' after: {}",
            self.node, self.instruction, self.path, self.function, self.message
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Final output snapshot
    pub document: Document,
    pub warnings: Vec<RecoveryWarning>,
}

/// Steps a [`Pipeline`] through its states.
///
/// [`Executor::run`] drives it to completion; [`Executor::step`] advances
/// one transition at a time.
pub struct Executor<'a> {
    pipeline: &'a Pipeline,
    evaluator: &'a Evaluator,
    sink: &'a mut dyn SnapshotSink,
    state: PipelineState,
    output: Document,
    intermediate: Document,
    scripts: HashMap<String, Rc<Expr>>,
    warnings: Vec<RecoveryWarning>,
}

impl<'a> Executor<'a> {
    pub fn new(
        pipeline: &'a Pipeline,
        evaluator: &'a Evaluator,
        input: Document,
        sink: &'a mut dyn SnapshotSink,
    ) -> Self {
        Executor {
            pipeline,
            evaluator,
            sink,
            state: PipelineState::NotStarted,
            intermediate: input.clone(),
            output: input,
            scripts: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Output snapshot as of the last completed node.
    pub fn output(&self) -> &Document {
        &self.output
    }

    pub fn warnings(&self) -> &[RecoveryWarning] {
        &self.warnings
    }

    /// Performs one state transition. Returns false once `Done`.
    pub fn step(&mut self) -> Result<bool, Error> {
        self.state = match self.state {
            PipelineState::NotStarted => {
                info!(
                    nodes = self.pipeline.nodes.len(),
                    instructions = self.pipeline.instruction_count(),
                    "starting pipeline"
                );
                self.sink.begin()?;
                self.enter(0)
            }
            PipelineState::ProcessingNode(index) => {
                self.process(index)?;
                self.output = std::mem::replace(&mut self.intermediate, Document::empty());
                self.sink
                    .snapshot(SnapshotPoint::NodeComplete { node: index + 1 }, &self.output)?;
                info!(node = index + 1, "node complete");
                PipelineState::NodeComplete(index)
            }
            PipelineState::NodeComplete(index) => self.enter(index + 1),
            PipelineState::Done => return Ok(false),
        };
        Ok(true)
    }

    /// Runs to `Done` and returns the final snapshot.
    pub fn run(mut self) -> Result<PipelineReport, Error> {
        while self.step()? {}
        info!(warnings = self.warnings.len(), "pipeline done");
        Ok(PipelineReport {
            document: self.output,
            warnings: self.warnings,
        })
    }

    fn enter(&mut self, index: usize) -> PipelineState {
        match self.pipeline.nodes.get(index) {
            Some(node) => {
                info!(
                    node = index + 1,
                    name = node.name.as_deref().unwrap_or(""),
                    instructions = node.instructions.len(),
                    "processing node"
                );
                self.intermediate = self.output.clone();
                PipelineState::ProcessingNode(index)
            }
            None => PipelineState::Done,
        }
    }

    fn process(&mut self, index: usize) -> Result<(), Error> {
        let pipeline = self.pipeline;
        for (position, instruction) in pipeline.nodes[index].instructions.iter().enumerate() {
            let (node, number) = (index + 1, position + 1);
            self.execute(node, number, instruction)
                .map_err(|source| Error::Instruction {
                    node,
                    instruction: number,
                    path: instruction.path.clone(),
                    source: Box::new(source),
                })?;
            self.sink.snapshot(
                SnapshotPoint::Instruction {
                    node,
                    instruction: number,
                },
                &self.intermediate,
            )?;
        }
        Ok(())
    }

    fn execute(&mut self, node: usize, number: usize, instruction: &Instruction) -> Result<(), Error> {
        if instruction.script.trim().is_empty() {
            debug!(node, instruction = number, path = %instruction.path, "blank script");
            self.intermediate.set(&instruction.path, "")?;
            return Ok(());
        }

        let expr = self.compile(&instruction.script)?;
        let context = self
            .evaluator
            .context(&self.output, &self.intermediate, Some(&instruction.path));
        let value = context.evaluate(&expr)?;
        let recovered = context.into_recovered();

        let text = value.to_string();
        debug!(
            node,
            instruction = number,
            path = %instruction.path,
            script = %instruction.script,
            result = %text,
            "evaluated"
        );
        self.intermediate.set(&instruction.path, &text)?;

        self.warnings
            .extend(recovered.into_iter().map(|failure| RecoveryWarning {
                node,
                instruction: number,
                path: instruction.path.clone(),
                function: failure.function,
                message: failure.error.to_string(),
            }));
        Ok(())
    }

    /// Parses a script once per distinct decoded text.
    fn compile(&mut self, script: &str) -> Result<Rc<Expr>, Error> {
        let decoded = decode_entities(script);
        if let Some(expr) = self.scripts.get(decoded.as_ref()) {
            return Ok(Rc::clone(expr));
        }
        let expr = Rc::new(parse_script(&decoded)?);
        self.scripts.insert(decoded.into_owned(), Rc::clone(&expr));
        Ok(expr)
    }
}
