// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use gridline_app::{DisplayMode, Field, GridCommand, GridState, RendererTable, SortKey};
use gridline_source::{Loader, ResponseCache, SourceLocation};
use gridline_tui::GridRuntime;
use logging::LogTarget;
use runtime::{DemoRuntime, SourceRuntime};
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};

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
            "load config {}; run `gridline --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let target = if options.dump || options.check_only {
        LogTarget::Stderr
    } else {
        LogTarget::File
    };
    let _log_guard = logging::init(target)?;
    debug!(config = %options.config_path.display(), "config loaded");

    let mut state = config.grid_state();
    apply_view_options(&mut state, &options);

    if options.demo {
        launch(DemoRuntime, state, &options)
    } else {
        let location = resolve_location(&options, &config)?;
        let cache_ttl = config.cache_ttl()?;
        let cache = if cache_ttl.is_zero() {
            ResponseCache::disabled()
        } else {
            ResponseCache::new(cache_ttl)
        };
        let loader = Loader::new(config.timeout()?, cache).with_context(|| {
            format!(
                "invalid [source] config in {}",
                options.config_path.display()
            )
        })?;
        launch(SourceRuntime::new(loader, location), state, &options)
    }
}

fn resolve_location(options: &CliOptions, config: &Config) -> Result<SourceLocation> {
    let Some(raw) = options.data.clone().or_else(|| config.source_path()) else {
        bail!(
            "no data source -- pass --data <path|url>, set [source].path in {} or GRIDLINE_DATA_PATH, or run with --demo",
            options.config_path.display()
        );
    };
    SourceLocation::parse(&raw)
}

fn launch<R: GridRuntime>(mut runtime: R, mut state: GridState, options: &CliOptions) -> Result<()> {
    if options.check_only {
        let records = runtime.load_records(false)?;
        info!(source = %runtime.source_label(), count = records.len(), "check passed");
        return Ok(());
    }

    if options.dump {
        let records = runtime.load_records(false)?;
        state.display = DisplayMode::Paged;
        state.dispatch(GridCommand::SetRecords(records));
        print!("{}", dump_text(&state, &RendererTable::standard()));
        return Ok(());
    }

    gridline_tui::run_app(&mut state, &mut runtime)
}

/// Search and sort go through the reducer. The page is stored as-is and
/// clamped once records arrive.
fn apply_view_options(state: &mut GridState, options: &CliOptions) {
    if let Some(search) = &options.search {
        state.dispatch(GridCommand::SetSearch(search.clone()));
    }
    if !options.sort.is_empty() {
        state.dispatch(GridCommand::SetSortSpec(options.sort.clone()));
    }
    if let Some(page) = options.page {
        state.page = page;
    }
    state.dispatch(GridCommand::ClearStatus);
}

fn dump_text(state: &GridState, renderers: &RendererTable) -> String {
    let columns = state.ordered_columns();
    let visible = state.visible_rows();

    let mut lines = Vec::with_capacity(visible.rows.len() + 2);
    lines.push(format_line(
        state,
        &columns,
        columns.iter().map(|field| field.label().to_owned()),
    ));
    for record in &visible.rows {
        lines.push(format_line(
            state,
            &columns,
            columns.iter().map(|field| renderers.render(*field, record)),
        ));
    }
    if let Some(page) = visible.page {
        lines.push(format!(
            "page {}/{} ({} of {} rows)",
            page.page,
            page.total_pages.max(1),
            visible.total,
            state.records.len()
        ));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn format_line(
    state: &GridState,
    columns: &[Field],
    values: impl Iterator<Item = String>,
) -> String {
    let cells: Vec<String> = columns
        .iter()
        .zip(values)
        .map(|(field, value)| fit_cell(&value, usize::from(state.column_width(*field))))
        .collect();
    cells.join("  ").trim_end().to_owned()
}

fn fit_cell(value: &str, width: usize) -> String {
    let count = value.chars().count();
    if count <= width {
        return format!("{value}{}", " ".repeat(width - count));
    }
    if width == 0 {
        return String::new();
    }
    let mut cut: String = value.chars().take(width - 1).collect();
    cut.push('…');
    cut
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    data: Option<String>,
    demo: bool,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    dump: bool,
    search: Option<String>,
    sort: Vec<SortKey>,
    page: Option<usize>,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        data: None,
        demo: false,
        print_config_path: false,
        print_example: false,
        check_only: false,
        dump: false,
        search: None,
        sort: Vec::new(),
        page: None,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--data" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--data requires a JSON file path or URL"))?;
                options.data = Some(value.as_ref().to_owned());
            }
            "--search" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--search requires a term"))?;
                options.search = Some(value.as_ref().to_owned());
            }
            "--sort" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--sort requires <column>[:asc|desc]"))?;
                let raw = value.as_ref();
                let key = SortKey::parse(raw).ok_or_else(|| {
                    let known: Vec<&str> = Field::ALL.iter().map(|field| field.key()).collect();
                    anyhow!(
                        "invalid --sort {raw:?} -- use <column>[:asc|desc] with one of: {}",
                        known.join(", ")
                    )
                })?;
                options.sort.retain(|existing| existing.field != key.field);
                options.sort.push(key);
            }
            "--page" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--page requires a page number"))?;
                let raw = value.as_ref();
                let page: usize = raw
                    .parse()
                    .ok()
                    .filter(|page| *page > 0)
                    .ok_or_else(|| anyhow!("--page must be a positive number, got {raw:?}"))?;
                options.page = Some(page);
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--dump" => {
                options.dump = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("gridline");
    println!("  --config <path>          Use a specific config path");
    println!("  --data <path|url>        Load records from a JSON file or http(s) URL");
    println!("  --demo                   Launch with generated demo records");
    println!("  --search <term>          Start with a global search");
    println!("  --sort <col[:asc|desc]>  Start sorted (repeat for more keys)");
    println!("  --page <n>               Start on page n (paged mode and --dump)");
    println!("  --dump                   Print one page as text and exit");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config and load the data source");
    println!("  --help                   Show this help");
}
