// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;

use anyhow::{Context, Result};
use config::Config;
use outsource_app::SortDirection;
use outsource_db::{
    ConnectionManager, EventSink, FileLog, TableView, TabularModel, reset_schema, tables,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `outsource --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let log_path = config.log_path(&options.config_path);
    let log: Arc<dyn EventSink> = Arc::new(
        FileLog::open(&log_path)
            .with_context(|| format!("open event log {}", log_path.display()))?,
    );

    let params = config.connect_params();
    let mut manager = ConnectionManager::new(log);
    {
        let db = manager
            .connect(&params)
            .with_context(|| format!("connect to {}", params.endpoint()))?;

        if options.reset_schema {
            reset_schema(db).context("reset schema")?;
            println!("schema reset on {}", params.endpoint());
        }

        if !options.check_only
            && let Some(table_name) = &options.table
        {
            let mut model = TabularModel::new(table_name)?;
            if let Some(sort_column) = &options.sort_column {
                let column = model
                    .table()
                    .column_index(sort_column)
                    .with_context(|| format!("table {table_name} has no column {sort_column}"))?;
                model.sort_by(db, column, options.sort_direction)?;
            } else {
                model.refresh(db)?;
            }
            print_table(&model);
        } else if !options.check_only && !options.reset_schema {
            for table in tables() {
                let mut model = TabularModel::for_table(table);
                model.refresh(db)?;
                println!("{}: {} row(s)", table.name, model.row_count());
            }
        }
    }
    manager.disconnect();
    Ok(())
}

/// Renders the model as aligned columns with a header row.
fn print_table(model: &TabularModel) {
    let titles = model.column_titles();
    let mut widths = titles.iter().map(|title| title.len()).collect::<Vec<_>>();
    let mut rows = Vec::with_capacity(model.row_count());
    for row in 0..model.row_count() {
        let mut cells = Vec::with_capacity(model.column_count());
        for column in 0..model.column_count() {
            // Every (row, column) in range by construction.
            let cell = model.cell_at(row, column).unwrap_or_default();
            widths[column] = widths[column].max(cell.chars().count());
            cells.push(cell);
        }
        rows.push(cells);
    }

    let render = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let pad = width - cell.chars().count();
                format!("{cell}{}", " ".repeat(pad))
            })
            .collect::<Vec<_>>()
            .join("  ")
    };

    let header = titles.iter().map(|title| (*title).to_owned()).collect::<Vec<_>>();
    println!("{}", render(&header).trim_end());
    for cells in &rows {
        println!("{}", render(cells).trim_end());
    }
    println!("{} row(s)", rows.len());
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    reset_schema: bool,
    table: Option<String>,
    sort_column: Option<String>,
    sort_direction: SortDirection,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        reset_schema: false,
        table: None,
        sort_column: None,
        sort_direction: SortDirection::Asc,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--reset-schema" => {
                options.reset_schema = true;
            }
            "--table" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--table requires a table name"))?;
                options.table = Some(value.as_ref().to_owned());
            }
            "--sort" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--sort requires a column name"))?;
                options.sort_column = Some(value.as_ref().to_owned());
            }
            "--desc" => {
                options.sort_direction = SortDirection::Desc;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("outsource");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config and connectivity, then exit");
    println!("  --reset-schema           Drop and recreate all tables (destructive)");
    println!("  --table <name>           Print the named table");
    println!("  --sort <column>          Sort the printed table by this column");
    println!("  --desc                   Sort descending instead of ascending");
    println!("  --help                   Show this help");
}
