// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use isic_filter::{BinFilter, FacetRegistry, FilterAggregator, Histogram, PostProcessor};

fn load_registry(config: Option<String>) -> Result<FacetRegistry> {
    let Some(file) = config else {
        return Ok(FacetRegistry::isic());
    };
    let contents =
        std::fs::read_to_string(&file).with_context(|| format!("Failed to read {file}"))?;

    Ok(if file.ends_with(".json") {
        FacetRegistry::from_json(&contents)?
    } else if file.ends_with(".yaml") {
        FacetRegistry::from_yaml(&contents)?
    } else {
        bail!("Unsupported facet config `{file}`. Must be json or yaml.")
    })
}

// `facet=label`, split at the first `=`.
fn parse_selection(selection: &str) -> Result<(&str, &str)> {
    selection
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid selection `{selection}`. Expected facet=label"))
}

fn filter_compile(
    histogram: String,
    config: Option<String>,
    exclude: Vec<String>,
    exclude_all: Vec<String>,
) -> Result<()> {
    let registry = Rc::new(load_registry(config)?);

    let contents = std::fs::read_to_string(&histogram)
        .with_context(|| format!("Failed to read {histogram}"))?;
    let histogram = Histogram::from_json(&contents)?;
    println!("images passing current filter: {}", histogram.total);

    let mut aggregator = FilterAggregator::from_histogram(registry, &histogram)?;
    aggregator.on_change(|change| log::info!("filter changed: {}", change.facet_id));

    for facet in &exclude_all {
        aggregator.facet_filter_mut(facet)?.set_all_included(false);
    }
    for selection in &exclude {
        let (facet, label) = parse_selection(selection)?;
        aggregator
            .facet_filter_mut(facet)?
            .set_included(label, false)?;
    }

    println!("expression:\n{}", aggregator.as_expression()?);
    match aggregator.as_ast()? {
        Some(ast) => println!("ast:\n{}", serde_json::to_string_pretty(&ast)?),
        None => println!("ast: none (no filter)"),
    }
    Ok(())
}

fn filter_lex(expr: String, verbose: bool) -> Result<()> {
    use isic_filter::unstable::{Lexer, Source, TokenKind};

    let source = Source::from_contents("<expr>".to_string(), expr)?;
    let mut lexer = Lexer::new(&source);

    // Read tokens until EOF.
    loop {
        let token = lexer.next_token()?;
        if token.0 == TokenKind::Eof {
            break;
        }

        if verbose {
            // Print each token's line and mark it with ^.
            println!("{}", token.1.message("", ""));
        }

        println!("{token:?}");
    }
    Ok(())
}

fn filter_parse(expr: String, config: Option<String>, raw: bool) -> Result<()> {
    let ast = if raw {
        isic_filter::Grammar::new().parse(&expr)?
    } else {
        let post = PostProcessor::new(Rc::new(load_registry(config)?));
        post.compile(&expr)?
    };
    println!("{ast}");
    println!("{}", serde_json::to_string_pretty(&ast)?);
    Ok(())
}

fn filter_facets(config: Option<String>) -> Result<()> {
    let registry = load_registry(config)?;
    for schema in registry.iter() {
        println!("{}", serde_json::to_string(schema)?);
    }
    Ok(())
}

#[derive(Subcommand)]
enum FilterCommand {
    /// Compile exclusions against a histogram snapshot.
    Compile {
        /// Histogram json, as returned by the image histogram endpoint.
        #[arg(long, short = 'H', value_name = "histogram.json")]
        histogram: String,

        /// Facet configuration. Defaults to the archive's facets.
        #[arg(long, short, value_name = "facets.json|facets.yaml")]
        config: Option<String>,

        /// Bin to exclude.
        #[arg(long, short, value_name = "facet=label")]
        exclude: Vec<String>,

        /// Facet whose bins are all excluded.
        #[arg(long, value_name = "facet")]
        exclude_all: Vec<String>,
    },

    /// Tokenize a filter expression.
    Lex {
        /// Filter expression.
        expr: String,

        /// Verbose output.
        #[arg(long, short)]
        verbose: bool,
    },

    /// Parse a filter expression.
    Parse {
        /// Filter expression.
        expr: String,

        /// Facet configuration. Defaults to the archive's facets.
        #[arg(long, short, value_name = "facets.json|facets.yaml")]
        config: Option<String>,

        /// Skip decoding and type annotation.
        #[arg(long)]
        raw: bool,
    },

    /// List the configured facets.
    Facets {
        /// Facet configuration. Defaults to the archive's facets.
        #[arg(long, short, value_name = "facets.json|facets.yaml")]
        config: Option<String>,
    },
}

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: FilterCommand,
}

fn main() -> Result<()> {
    env_logger::init();

    // Parse and dispatch command.
    let cli = Cli::parse();
    match cli.command {
        FilterCommand::Compile {
            histogram,
            config,
            exclude,
            exclude_all,
        } => filter_compile(histogram, config, exclude, exclude_all),
        FilterCommand::Lex { expr, verbose } => filter_lex(expr, verbose),
        FilterCommand::Parse { expr, config, raw } => filter_parse(expr, config, raw),
        FilterCommand::Facets { config } => filter_facets(config),
    }
}
