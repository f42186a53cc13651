// tests/evaluator_tests.rs

use pretty_assertions::assert_eq;
use quill_lang::{
    Arity, Document, EvalOptions, Evaluator, Value,
    error::{ErrorKind, EvalError},
    parser::parse_script,
};
use rust_decimal::Decimal;

fn eval(script: &str) -> Value {
    Evaluator::new().eval_script(script, &Document::empty()).unwrap()
}

fn eval_err(script: &str) -> EvalError {
    eval_err_with(EvalOptions::default(), script)
}

fn eval_err_with(options: EvalOptions, script: &str) -> EvalError {
    let expr = parse_script(script).unwrap();
    Evaluator::with_options(options)
        .eval_expression(&expr, &Document::empty())
        .unwrap_err()
}

fn eval_strict(script: &str) -> Result<Value, EvalError> {
    let expr = parse_script(script).unwrap();
    Evaluator::with_options(EvalOptions::strict()).eval_expression(&expr, &Document::empty())
}

fn eval_on(json: &str, script: &str) -> Value {
    let doc = Document::from_json_str(json).unwrap();
    Evaluator::new().eval_script(script, &doc).unwrap()
}

fn num(n: i64) -> Value {
    Value::Numeric(Decimal::from(n))
}

fn dec(s: &str) -> Value {
    Value::Numeric(s.parse().unwrap())
}

fn text(s: &str) -> Value {
    Value::String(s.to_string())
}

// ============================================================================
// Reference Scenarios
// ============================================================================

#[test]
fn test_concat_with_conditional() {
    assert_eq!(eval("Concat('Hi ', If(true, 'Yes', 'No'))"), text("Hi Yes"));
}

#[test]
fn test_call_result_in_arithmetic() {
    assert_eq!(eval("Add(2, 3) * 4"), num(20));
}

#[test]
fn test_uppercase() {
    assert_eq!(eval("UpperCase('abc')"), text("ABC"));
}

#[test]
fn test_function_names_ignore_case() {
    assert_eq!(eval("uppercase('abc')"), text("ABC"));
    assert_eq!(eval("UPPERCASE('abc')"), text("ABC"));
    assert_eq!(eval("if(false, 1, 2)"), num(2));
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_basic_arithmetic() {
    assert_eq!(eval("1 + 2"), num(3));
    assert_eq!(eval("10 - 4 - 3"), num(3));
    assert_eq!(eval("2 * 3.5"), num(7));
    assert_eq!(eval("-(2 + 3)"), num(-5));
}

#[test]
fn test_division_scale() {
    assert_eq!(eval("10 / 4"), dec("2.5"));
    assert_eq!(eval("1 / 3").to_string(), "0.3333333333");
    assert_eq!(eval("2 / 3").to_string(), "0.6666666667");
}

#[test]
fn test_divide_by_zero() {
    assert_eq!(eval_err("5 / 0"), EvalError::DivideByZero);
    assert_eq!(eval_err("Divide(5, 0)"), EvalError::DivideByZero);
    assert_eq!(eval_err("5 % 0"), EvalError::DivideByZero);
}

#[test]
fn test_modulo_is_floored() {
    assert_eq!(eval("7 % 3"), num(1));
    assert_eq!(eval("-7 % 3"), num(2));
    assert_eq!(eval("7 % -3"), num(-2));
    assert_eq!(eval("Mod(-7, 3)"), num(2));
}

#[test]
fn test_modulo_requires_integers() {
    assert_eq!(eval_err("7.5 % 2").kind(), ErrorKind::Type);
    assert_eq!(eval_err("Mod(7, 2.5)").kind(), ErrorKind::Type);
}

#[test]
fn test_printing_strips_trailing_zeros() {
    assert_eq!(eval("1.50 + 1.50").to_string(), "3");
    assert_eq!(eval("0.10 * 1").to_string(), "0.1");
}

// ============================================================================
// Coercive Discipline
// ============================================================================

#[test]
fn test_plus_adds_numeric_text() {
    assert_eq!(eval("'2' + '3'"), num(5));
    assert_eq!(eval("' 2 ' + 3"), num(5));
}

#[test]
fn test_plus_concatenates_otherwise() {
    assert_eq!(eval("'a' + 1"), text("a1"));
    assert_eq!(eval("'Hi ' + 'there'"), text("Hi there"));
    assert_eq!(eval("true + 1"), text("true1"));
}

#[test]
fn test_blank_text_is_zero() {
    assert_eq!(eval("'' + 5"), num(5));
}

#[test]
fn test_comparisons_prefer_numbers() {
    assert_eq!(eval("'10' > '9'"), Value::Boolean(true));
    assert_eq!(eval("'abc' < 'abd'"), Value::Boolean(true));
    assert_eq!(eval("'b' > 'a10'"), Value::Boolean(true));
    assert_eq!(eval("2.0 == 2"), Value::Boolean(true));
    assert_eq!(eval("'2.50' == 2.5"), Value::Boolean(true));
}

#[test]
fn test_boolean_equality_uses_truthiness() {
    assert_eq!(eval("true == 'TRUE'"), Value::Boolean(true));
    assert_eq!(eval("false == 'no'"), Value::Boolean(false));
    assert_eq!(eval("true != false"), Value::Boolean(true));
}

#[test]
fn test_logical_operators_use_truthiness() {
    assert_eq!(eval("'true' && 1"), Value::Boolean(true));
    assert_eq!(eval("'false' || 0"), Value::Boolean(false));
    assert_eq!(eval("'x' && ''"), Value::Boolean(false));
}

#[test]
fn test_logical_operators_do_not_short_circuit() {
    assert_eq!(eval_err("false && Divide(1, 0) == 1"), EvalError::DivideByZero);
    assert_eq!(eval_err("true || Divide(1, 0) == 1"), EvalError::DivideByZero);
}

#[test]
fn test_negate_text() {
    assert_eq!(eval("-'5'"), num(-5));
    assert_eq!(eval_err("-'five'").kind(), ErrorKind::Type);
    assert_eq!(eval_err("-true").kind(), ErrorKind::Type);
}

// ============================================================================
// Strict Discipline
// ============================================================================

#[test]
fn test_strict_plus() {
    assert_eq!(eval_strict("2 + 3").unwrap(), num(5));
    assert_eq!(eval_strict("'2' + '3'").unwrap(), text("23"));
    assert_eq!(eval_strict("'2' + 3").unwrap_err().kind(), ErrorKind::Type);
}

#[test]
fn test_strict_arithmetic_needs_numbers() {
    assert_eq!(eval_strict("'4' * 2").unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(eval_strict("-'4'").unwrap_err().kind(), ErrorKind::Type);
}

#[test]
fn test_strict_comparisons() {
    assert_eq!(eval_strict("'10' > '9'").unwrap(), Value::Boolean(false));
    assert_eq!(eval_strict("10 > 9").unwrap(), Value::Boolean(true));
    assert_eq!(eval_strict("'a' == 'a'").unwrap(), Value::Boolean(true));
    assert_eq!(eval_strict("true == 'true'").unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(eval_strict("1 < 'a'").unwrap_err().kind(), ErrorKind::Type);
}

#[test]
fn test_strict_logic_needs_booleans() {
    assert_eq!(eval_strict("true && false").unwrap(), Value::Boolean(false));
    assert_eq!(eval_strict("1 && true").unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(eval_strict("If('yes', 1, 2)").unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(eval("If('yes', 1, 2)"), num(1));
}

#[test]
fn test_strict_functions_still_coerce_arguments() {
    assert_eq!(eval_strict("Add('2', 3)").unwrap(), num(5));
}

// ============================================================================
// Conditional
// ============================================================================

#[test]
fn test_if_skips_untaken_branch() {
    assert_eq!(eval("If(false, Divide(1, 0), 'safe')"), text("safe"));
    assert_eq!(eval("If(true, 'safe', Nope())"), text("safe"));
}

#[test]
fn test_if_branches_may_differ_in_type() {
    assert_eq!(eval("If(1 > 2, 'text', 42)"), num(42));
}

#[test]
fn test_if_arity() {
    let err = eval_err("If(true, 1)");
    assert_eq!(err.kind(), ErrorKind::Arity);
    assert!(err.to_string().contains("'If'"));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_function_keeps_spelling() {
    assert_eq!(eval_err("NoSuch(1)"), EvalError::UnknownFunction("NoSuch".to_string()));
    assert_eq!(eval_err("NoSuch(1)").to_string(), "UNKNOWN_FUNCTION: 'NoSuch'");
}

#[test]
fn test_arity_message_names_function() {
    assert_eq!(
        eval_err("UpperCase('a', 'b')").to_string(),
        "ARITY_MISMATCH: 'UpperCase' expects 1 argument(s), got 2"
    );
    assert!(eval_err("Lookup('k')").to_string().contains("expects 3 or 4 argument(s)"));
}

#[test]
fn test_type_message_names_position() {
    let message = eval_err("Round(1.25, 'x')").to_string();
    assert!(message.starts_with("TYPE_ERROR"), "{}", message);
    assert!(message.contains("'Round' argument 2"), "{}", message);
}

// ============================================================================
// Blank-Argument Recovery
// ============================================================================

#[test]
fn test_blank_argument_failure_becomes_empty() {
    let doc = Document::from_json_str(r#"{"Amount": "10"}"#).unwrap();
    let evaluator = Evaluator::new();
    let expr = parse_script("Divide(Amount, Missing)").unwrap();

    let ctx = evaluator.context(&doc, &doc, None);
    assert_eq!(ctx.evaluate(&expr).unwrap(), text(""));

    let recovered = ctx.into_recovered();
    assert_eq!(recovered.len(), 1);
    assert_eq!(recovered[0].function, "Divide");
    assert_eq!(recovered[0].error, EvalError::DivideByZero);
}

#[test]
fn test_recovery_can_be_disabled() {
    let options = EvalOptions {
        recover_blank_arguments: false,
        ..Default::default()
    };
    assert_eq!(eval_err_with(options, "Divide(1, '')"), EvalError::DivideByZero);
}

#[test]
fn test_recovery_needs_a_blank_argument() {
    assert_eq!(eval_err("Divide(1, 0)"), EvalError::DivideByZero);
}

#[test]
fn test_unknown_function_is_never_recovered() {
    assert_eq!(eval_err("NoSuch('')").kind(), ErrorKind::UnknownFunction);
}

#[test]
fn test_operators_are_never_recovered() {
    assert_eq!(eval_err("'' % 0"), EvalError::DivideByZero);
}

// ============================================================================
// Paths and Contexts
// ============================================================================

#[test]
fn test_paths_read_document_text() {
    let json = r#"{"Owner": {"First": "Ada", "Last": "Lovelace"}, "Amount": "12.50"}"#;
    assert_eq!(eval_on(json, "Concat(Owner/First, ' ', Owner/Last)"), text("Ada Lovelace"));
    assert_eq!(eval_on(json, "Amount * 2"), num(25));
}

#[test]
fn test_missing_path_is_empty() {
    assert_eq!(eval_on(r#"{"A": {}}"#, "A/B/C/D"), text(""));
    assert_eq!(eval_on(r#"{"A": {}}"#, "Length(A/B)"), num(0));
}

#[test]
fn test_target_path_reads_intermediate() {
    let output = Document::from_json_str(r#"{"P": "old", "Q": "old-q"}"#).unwrap();
    let intermediate = Document::from_json_str(r#"{"P": "new", "Q": "new-q"}"#).unwrap();
    let evaluator = Evaluator::new();
    let expr = parse_script("Concat(P, '/', Q)").unwrap();

    let ctx = evaluator.context(&output, &intermediate, Some("P"));
    assert_eq!(ctx.evaluate(&expr).unwrap(), text("new/old-q"));

    let ctx = evaluator.context(&output, &intermediate, Some("Q"));
    assert_eq!(ctx.evaluate(&expr).unwrap(), text("old/new-q"));

    let ctx = evaluator.context(&output, &intermediate, None);
    assert_eq!(ctx.evaluate(&expr).unwrap(), text("old/old-q"));
}

#[test]
fn test_target_comparison_ignores_extra_slashes() {
    let output = Document::from_json_str(r#"{"A": {"B": "out"}}"#).unwrap();
    let intermediate = Document::from_json_str(r#"{"A": {"B": "in"}}"#).unwrap();
    let evaluator = Evaluator::new();
    let ctx = evaluator.context(&output, &intermediate, Some("/A/B/"));
    assert_eq!(ctx.resolve("A/B"), "in");
}

#[test]
fn test_entities_are_decoded() {
    assert_eq!(eval("If(1 &lt; 2 &amp;&amp; 3 &gt; 2, &quot;y&quot;, 'n')"), text("y"));
}

// ============================================================================
// Options and Extension
// ============================================================================

#[test]
fn test_fixed_clock() {
    let options = EvalOptions {
        now: Some("2024-03-01T09:30:00".parse().unwrap()),
        ..Default::default()
    };
    let result = Evaluator::with_options(options)
        .eval_script("Now('yyyy-MM-dd HH:mm')", &Document::empty())
        .unwrap();
    assert_eq!(result, text("2024-03-01 09:30"));
}

#[test]
fn test_registered_function() {
    let mut evaluator = Evaluator::new();
    evaluator
        .registry_mut()
        .register("Initial", Arity::Exact(1), |_, args| {
            let first = args.string(0)?.chars().next().map(String::from);
            Ok(Value::String(first.unwrap_or_default()))
        });

    let doc = Document::from_json_str(r#"{"Name": "ada"}"#).unwrap();
    let result = evaluator.eval_script("UpperCase(initial(Name))", &doc).unwrap();
    assert_eq!(result, text("A"));
    assert!(evaluator.eval_script("Initial()", &doc).is_err());
}
