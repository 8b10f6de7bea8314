// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use isic_filter::unstable::*;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

fn get_tokens(source: &Source) -> Result<Vec<Token>> {
    let mut tokens = vec![];
    let mut lex = Lexer::new(source);
    loop {
        let tok = lex.next_token()?;
        if tok.0 == TokenKind::Eof {
            break;
        }
        tokens.push(tok);
    }

    Ok(tokens)
}

// The caret printed for a token must point at the token's text.
fn check_loc(tok: &Token) -> Result<()> {
    let msg = tok.1.message("", "");
    let lines: Vec<&str> = msg.split('\n').collect();
    let (source_line, caret_line) = (lines[3], lines[4]);
    let Some(idx) = caret_line.find('^') else {
        bail!("could not find caret for {tok:?} {msg}");
    };
    match source_line.get(idx..) {
        Some(s) if s.starts_with(tok.1.text()) => Ok(()),
        _ => bail!("location mismatch for {tok:?} {msg}"),
    }
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Case {
    pub expr: String,
    pub note: String,
    #[serde(default)]
    pub tokens: Vec<String>,
    pub kinds: Option<Vec<String>>,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Test {
    cases: Vec<Case>,
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");

    let yaml = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml)?;

    for case in &test.cases {
        let source = Source::from_contents("case.expr".to_string(), case.expr.clone())?;

        print!("case {} ", &case.note);

        match get_tokens(&source) {
            Ok(tokens) => {
                if let Some(e) = &case.error {
                    bail!("error `{e}` not raised by lexer. tokens: {tokens:?}");
                }
                for (idx, tok) in tokens.iter().enumerate().take(case.tokens.len()) {
                    assert_eq!(
                        tok.1.text(),
                        case.tokens[idx],
                        "{} Expected token `{}` not found",
                        tok.1.message("mismatch-error", &case.tokens[idx]),
                        &case.tokens[idx]
                    );

                    if let Some(k) = &case.kinds {
                        if idx < k.len() {
                            assert_eq!(
                                format!("{:?}", tok.0),
                                k[idx],
                                "{}",
                                tok.1.message("mismatch-error", "token kind mismatch")
                            );
                        }
                    }

                    check_loc(tok)?;
                }
                assert_eq!(
                    tokens.len(),
                    case.tokens.len(),
                    "\n. Token count mismatch.\nLexed tokens:{tokens:?}"
                );
                if let Some(k) = &case.kinds {
                    assert_eq!(
                        tokens.len(),
                        k.len(),
                        "\n. Kind count mismatch.\nLexed tokens:{tokens:?}"
                    );
                }
            }
            Err(actual) => match &case.error {
                Some(expected) => {
                    let actual = actual.to_string();
                    if !actual.contains(expected) {
                        bail!("Error message\n`{actual}\n`\ndoes not contain `{expected}`");
                    }
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

#[test_resources("tests/lexer/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
