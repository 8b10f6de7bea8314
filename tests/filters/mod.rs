// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use isic_filter::*;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::rc::Rc;
use test_generator::test_resources;

#[derive(Deserialize, Debug)]
struct FacetSpec {
    id: String,
    #[serde(default)]
    labels: Vec<String>,
    interval: Option<IntervalLayout>,
}

impl FacetSpec {
    fn complete(&self) -> CompleteFacet {
        match &self.interval {
            Some(layout) => CompleteFacet::new(self.id.as_str(), layout.bins()),
            None => CompleteFacet::from_labels(self.id.as_str(), self.labels.iter().cloned()),
        }
    }
}

#[derive(Deserialize, Debug)]
struct Selection {
    facet: String,
    labels: Vec<String>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    // Defaults to the archive's own facets.
    schemas: Option<Vec<FacetSchema>>,
    facets: Vec<FacetSpec>,
    #[serde(default)]
    exclude_all: Vec<String>,
    #[serde(default)]
    exclude: Vec<Selection>,
    #[serde(default)]
    include: Vec<Selection>,
    decoded: Option<String>,
    display: Option<String>,
    ast: Option<JsonValue>,
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn display_values(c: &JsonValue, e: &JsonValue) -> Result<String> {
    Ok(format!(
        "\nleft  = {}\nright = {}\n",
        serde_json::to_string_pretty(c)?,
        serde_json::to_string_pretty(e)?
    ))
}

fn match_text(what: &str, computed: &str, expected: &str) -> Result<()> {
    if computed != expected {
        bail!(
            "{what} mismatch:\n{}",
            prettydiff::diff_chars(expected, computed)
        );
    }
    Ok(())
}

fn build(case: &TestCase) -> Result<FilterAggregator> {
    let registry = match &case.schemas {
        Some(schemas) => FacetRegistry::from_schemas(schemas.iter().cloned())?,
        None => FacetRegistry::isic(),
    };
    let mut aggregator =
        FilterAggregator::new(Rc::new(registry), case.facets.iter().map(FacetSpec::complete))?;

    for id in &case.exclude_all {
        aggregator.facet_filter_mut(id)?.set_all_included(false);
    }
    for s in &case.exclude {
        let filter = aggregator.facet_filter_mut(&s.facet)?;
        for label in &s.labels {
            filter.set_included(label, false)?;
        }
    }
    for s in &case.include {
        let filter = aggregator.facet_filter_mut(&s.facet)?;
        for label in &s.labels {
            filter.set_included(label, true)?;
        }
    }
    Ok(aggregator)
}

fn check(case: &TestCase, aggregator: &FilterAggregator) -> Result<()> {
    let expression = aggregator.as_expression()?;
    let ast = aggregator.as_ast()?;

    if let Some(decoded) = &case.decoded {
        match_text("decoded expression", &dehexify(&expression)?, decoded)?;
    }
    if let Some(display) = &case.display {
        match &ast {
            Some(ast) => match_text("ast", &ast.to_string(), display)?,
            None => bail!("expected `{display}` but no filter was produced"),
        }
    }

    let computed = serde_json::to_value(&ast)?;
    if let Some(expected) = &case.ast {
        if computed != *expected {
            bail!("ast mismatch{}", display_values(&computed, expected)?);
        }
    }

    // The empty expression and the absent syntax tree always go together.
    if expression.is_empty() != ast.is_none() {
        bail!("expression `{expression}` disagrees with ast {computed}");
    }
    match aggregator.as_query_param()? {
        Some(param) if serde_json::from_str::<JsonValue>(&param)? == computed => (),
        None if ast.is_none() => (),
        param => bail!("query parameter {param:?} does not match ast {computed}"),
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    println!("\nrunning {file}");

    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        print!("\ncase {} ", case.note);
        match build(case).and_then(|aggregator| check(case, &aggregator)) {
            Ok(()) => {
                if let Some(e) = &case.error {
                    bail!("error `{e}` not raised.");
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

#[test_resources("tests/filters/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn labels_survive_the_round_trip() -> Result<()> {
    let labels = [
        "plain",
        "with space",
        "(parenthesized)",
        "\"quoted\"",
        "'single'",
        "[0 - 5)",
        "a, b] or (x = 1",
        "not in",
        "%41",
        "back\\slash",
        "tab\tand\nnewline",
        "naevus · ü",
        "",
    ];
    let registry = FacetRegistry::from_schemas([
        FacetSchema::categorical("weird (facet) \"id\"", CoerceType::String),
        FacetSchema::tags("tags", CoerceType::Object),
    ])?;
    let mut aggregator = FilterAggregator::new(
        Rc::new(registry),
        [
            CompleteFacet::from_labels("weird (facet) \"id\"", labels),
            CompleteFacet::from_labels("tags", labels.into_iter().chain([NULL_LABEL])),
        ],
    )?;
    aggregator
        .facet_filter_mut("weird (facet) \"id\"")?
        .set_all_included(false);
    aggregator.facet_filter_mut("tags")?.set_included("plain", false)?;

    let Some(ast) = aggregator.as_ast()? else {
        bail!("no filter produced");
    };
    let json = serde_json::to_value(&ast)?;

    let categorical = &json["operands"][0]["operands"];
    assert_eq!(categorical[0]["identifier"], "weird (facet) \"id\"");
    assert_eq!(categorical[0]["type"], "string");
    let expected: Vec<JsonValue> = labels.iter().map(|l| JsonValue::from(*l)).collect();
    assert_eq!(categorical[1], JsonValue::Array(expected));

    let tags = &json["operands"][1]["operands"];
    assert_eq!(tags[0]["identifier"], "tags");
    assert_eq!(tags[0]["type"], JsonValue::Null);
    let mut expected: Vec<JsonValue> = labels[1..].iter().map(|l| JsonValue::from(*l)).collect();
    expected.push(JsonValue::Array(vec![]));
    assert_eq!(tags[1], JsonValue::Array(expected));
    Ok(())
}

#[test]
fn listener_sees_every_facet() -> Result<()> {
    use std::cell::RefCell;

    let histogram = Histogram::from_json(
        r#"{
            "__passedFilters__": [{"count": 3}],
            "meta.clinical.sex": [{"label": "male", "count": 2}, {"label": null, "count": 1}],
            "meta.clinical.melanocytic": [{"label": true, "count": 2}, {"label": false, "count": 1}],
            "meta.clinical.age_approx": [
                {"label": "[0 - 5)", "lowBound": 0, "highBound": 5, "count": 3},
                {"label": "__null__", "count": 0}
            ]
        }"#,
    )?;
    assert_eq!(histogram.total, 3);

    let mut aggregator = FilterAggregator::from_histogram(Rc::new(FacetRegistry::isic()), &histogram)?;
    let seen = Rc::new(RefCell::new(vec![]));
    let s = seen.clone();
    aggregator.on_change(move |change| s.borrow_mut().push(change.facet_id.to_string()));

    aggregator
        .facet_filter_mut("meta.clinical.sex")?
        .set_included(NULL_LABEL, false)?;
    aggregator
        .facet_filter_mut("meta.clinical.melanocytic")?
        .set_included("false", false)?;
    aggregator
        .facet_filter_mut("meta.clinical.age_approx")?
        .set_included("[0 - 5)", false)?;

    assert_eq!(
        *seen.borrow(),
        [
            "meta.clinical.sex",
            "meta.clinical.melanocytic",
            "meta.clinical.age_approx"
        ]
    );
    assert_eq!(
        aggregator.as_ast()?.map(|ast| ast.to_string()),
        Some(
            "(((meta.clinical.sex not in [null]) and (meta.clinical.melanocytic not in [\"false\"])) \
             and (not (meta.clinical.age_approx >= 0) or not (meta.clinical.age_approx < 5)))"
                .to_string()
        )
    );
    Ok(())
}
