//! Check and evaluate single scripts

use std::path::PathBuf;

use super::CliError;
use crate::{
    Document, EvalOptions, Evaluator, Format, Value, entities::decode_entities,
    lookup::DirectorySource, parser::parse_script,
};

/// Options for the check and eval commands
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The script to check or evaluate
    pub script: String,
    /// Document text
    pub input: Option<String>,
    /// Document format; JSON when absent
    pub format: Option<Format>,
    /// Blank-argument recovery is always off when evaluating
    pub options: EvalOptions,
    /// Directory holding `Lookups/` and `LookupConfigs/`
    pub tables: Option<PathBuf>,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Script evaluated successfully
    Success(Value),
}

/// Parses the script and, unless `syntax_only`, evaluates it.
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let expr = parse_script(&decode_entities(&options.script))?;
    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid);
    }

    let document = match &options.input {
        Some(text) => Document::parse(text, options.format.unwrap_or(Format::Json))?,
        None => return Err(CliError::NoInput),
    };

    // recovery is a pipeline policy; a single script reports every failure
    let eval_options = EvalOptions {
        recover_blank_arguments: false,
        ..options.options.clone()
    };
    let mut evaluator = Evaluator::with_options(eval_options);
    if let Some(dir) = &options.tables {
        evaluator = evaluator.with_table_source(DirectorySource::new(dir));
    }

    let value = evaluator.eval_expression(&expr, &document)?;
    Ok(CheckResult::Success(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_only_needs_no_input() {
        let options = CheckOptions {
            script: "If(A &lt; 3, 'x', 'y')".to_string(),
            syntax_only: true,
            ..Default::default()
        };
        assert!(matches!(execute_check(&options), Ok(CheckResult::SyntaxValid)));
    }

    #[test]
    fn test_eval_reads_xml() {
        let options = CheckOptions {
            script: "Concat(Policy/@number, '-', Policy/Holder)".to_string(),
            input: Some(r#"<Policy number="P1"><Holder>Ada</Holder></Policy>"#.to_string()),
            format: Some(Format::Xml),
            ..Default::default()
        };
        match execute_check(&options) {
            Ok(CheckResult::Success(value)) => assert_eq!(value.to_string(), "P1-Ada"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
