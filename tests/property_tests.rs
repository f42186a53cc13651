//! Property-based tests for operators, string helpers, paths and dates.

use proptest::prelude::*;
use quill_lang::{
    Document, Evaluator, Lexer, Value, error::ErrorKind, functions::SUPPORTED_INPUT_MASKS,
};
use rust_decimal::Decimal;

fn eval(script: &str) -> Result<Value, quill_lang::Error> {
    Evaluator::new().eval_script(script, &Document::empty())
}

fn eval_number(script: &str) -> Decimal {
    match eval(script).unwrap() {
        Value::Numeric(n) => n,
        other => panic!("{} gave {:?}", script, other),
    }
}

// -- Strategies --

fn nonzero() -> impl Strategy<Value = i64> {
    (-50i64..50).prop_filter("divisor must be nonzero", |b| *b != 0)
}

fn missing_path() -> impl Strategy<Value = String> {
    prop::string::string_regex("Q[a-z]{0,8}(/Q[a-z]{0,8}){0,3}(/@q[a-z]{0,4})?")
        .expect("valid regex")
}

fn date() -> impl Strategy<Value = (u32, u32, u32)> {
    (1900u32..2100, 1u32..=12, 1u32..=28)
}

// -- Properties --

proptest! {
    #[test]
    fn modulo_takes_the_sign_of_the_divisor(a in -1000i64..1000, b in nonzero()) {
        let r = eval_number(&format!("{} % {}", a, b));
        prop_assert!(r.is_zero() || r.is_sign_negative() == (b < 0));
        prop_assert!(r.abs() < Decimal::from(b.abs()));
        prop_assert!(((Decimal::from(a) - r) % Decimal::from(b)).is_zero());
    }

    #[test]
    fn mod_function_agrees_with_operator(a in -1000i64..1000, b in nonzero()) {
        let op = eval_number(&format!("{} % {}", a, b));
        let call = eval_number(&format!("Mod({}, {})", a, b));
        prop_assert_eq!(op, call);
    }

    #[test]
    fn division_by_zero_always_fails(n in -10_000i64..10_000) {
        let err = eval(&format!("{} / 0", n)).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::DivideByZero);
        let err = eval(&format!("Divide({}, 0)", n)).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::DivideByZero);
    }

    #[test]
    fn substring_helpers_keep_text_without_separator(text in "[a-z ]{0,20}") {
        let before = eval(&format!("SubStringBefore('{}', '#')", text)).unwrap();
        let after = eval(&format!("SubStringAfter('{}', '#')", text)).unwrap();
        prop_assert_eq!(before, Value::String(text.clone()));
        prop_assert_eq!(after, Value::String(text));
    }

    #[test]
    fn substring_helpers_split_at_first_separator(
        head in "[a-z]{0,10}",
        tail in "[a-z#]{0,10}",
    ) {
        let text = format!("{}#{}", head, tail);
        let before = eval(&format!("SubStringBefore('{}', '#')", text)).unwrap();
        let after = eval(&format!("SubStringAfter('{}', '#')", text)).unwrap();
        prop_assert_eq!(before.to_string(), head);
        prop_assert_eq!(after.to_string(), tail);
    }

    #[test]
    fn missing_paths_read_as_empty(path in missing_path()) {
        prop_assert_eq!(eval(&path).unwrap(), Value::String(String::new()));
    }

    #[test]
    fn dates_convert_between_masks((year, month, day) in date()) {
        let us = format!("{:02}/{:02}/{}", month, day, year);
        let iso = format!("{}-{:02}-{:02}", year, month, day);

        let converted = eval(&format!("ToDateTime('{}', 'yyyy-MM-dd')", us)).unwrap();
        prop_assert_eq!(converted.to_string(), iso.clone());

        let back = eval(&format!("ToDateTime('{}', 'MM/dd/yyyy')", iso)).unwrap();
        prop_assert_eq!(back.to_string(), us);
    }

    #[test]
    fn every_input_mask_round_trips(
        (year, month, day) in date(),
        hour in 0u32..24,
        minute in 0u32..60,
        second in 0u32..60,
    ) {
        let seed = format!(
            "{}-{:02}-{:02}T{:02}:{:02}:{:02}",
            year, month, day, hour, minute, second
        );
        for mask in SUPPORTED_INPUT_MASKS {
            let text = eval(&format!("ToDateTime('{}', \"{}\")", seed, mask))
                .unwrap()
                .to_string();
            let again = eval(&format!("ToDateTime('{}', \"{}\")", text, mask))
                .unwrap()
                .to_string();
            prop_assert_eq!(again, text, "mask {}", mask);
        }
    }

    #[test]
    fn integer_sums_print_canonically(a in -100_000i64..100_000, b in -100_000i64..100_000) {
        let sum = eval(&format!("Add({}, {})", a, b)).unwrap();
        prop_assert_eq!(sum.to_string(), (a + b).to_string());
    }

    #[test]
    fn lexer_never_panics(input in "\\PC{0,40}") {
        let _ = Lexer::new(&input).tokenize();
    }
}
