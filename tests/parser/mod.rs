// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{anyhow, bail, Result};
use isic_filter::unstable::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use test_generator::test_resources;

macro_rules! my_assert_eq {
    ($left:expr, $right:expr, $($arg:tt)+) => {
        match (&($left), &($right)) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    return Err(anyhow!("mismatch:\nleft  = {}\nright = {}\n{}",
                                       &$left, &$right, format_args!($($arg)+)));
                }
            }
        }
    }
}

fn match_span(s: &Span, text: &str) -> Result<()> {
    my_assert_eq!(
        s.text(),
        text,
        "{}",
        s.message("match-error", "mismatch happened here.")
    );
    Ok(())
}

fn match_spans(expr: &Expr, spans: &[String]) -> Result<()> {
    let comparisons = expr.comparisons();
    my_assert_eq!(
        comparisons.len(),
        spans.len(),
        "{}",
        expr.span()
            .message("match-error", "mismatch in number of comparisons")
    );
    for (c, text) in comparisons.iter().zip(spans) {
        match_span(c.span(), text)?;
    }
    Ok(())
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct TestCase {
    expr: String,
    note: String,
    ast: Option<JsonValue>,
    display: Option<String>,
    span: Option<String>,
    comparisons: Option<Vec<String>>,
    error: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");

    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        print!("\ncase {} ", case.note);
        let source = Source::from_contents("case.expr".to_string(), case.expr.clone())?;
        let mut parser = Parser::new(&source)?;
        match parser.parse() {
            Ok(expr) => {
                if let Some(e) = &case.error {
                    bail!("error `{}` not raised by parser.", e);
                }
                if let Some(ast) = &case.ast {
                    let actual = serde_json::to_value(&expr)?;
                    my_assert_eq!(
                        actual,
                        *ast,
                        "{}",
                        expr.span().message("match-error", "ast mismatch")
                    );
                }
                if let Some(display) = &case.display {
                    my_assert_eq!(expr.to_string(), *display, "display mismatch");
                }
                if let Some(span) = &case.span {
                    match_span(expr.span(), span)?;
                }
                if let Some(spans) = &case.comparisons {
                    match_spans(&expr, spans)?;
                }
            }
            Err(actual) => match &case.error {
                Some(expected) => {
                    let actual = actual.to_string();
                    if !actual.contains(expected) {
                        bail!(
                            "Error message\n`{}\n`\ndoes not contain `{}`",
                            actual,
                            expected
                        );
                    }
                    println!("{actual}");
                }
                _ => return Err(actual),
            },
        }

        println!("passed");
    }

    println!("{} cases passed.", test.cases.len());
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/parser/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn grammar_is_reusable() -> Result<()> {
    let grammar = Grammar::new();
    let first = grammar.parse("(a = 1)")?;
    assert!(grammar.parse("(a = ").is_err());
    let second = grammar.parse("(a = 1)")?;
    assert_eq!(first.to_string(), second.to_string());
    Ok(())
}
