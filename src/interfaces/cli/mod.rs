use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::application::use_cases::catalog_builder::Catalog;
use crate::application::use_cases::report_pipeline::{Report, ReportPipeline};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::query::{value_to_text, QueryRequest, ResultSet};
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::{AppConfig, ConfigService};

#[derive(Parser, Debug)]
#[command(
    name = "report-builder",
    about = "Load spreadsheets into a local database and query them with plain English or SQL",
    version
)]
pub struct Cli {
    /// TOML config file (default: report_builder.toml, if present)
    #[arg(long, env = "REPORT_BUILDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory scanned for spreadsheets
    #[arg(long)]
    pub raw_dir: Option<PathBuf>,

    /// Database file the sheets are loaded into
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// CSV file the result is written to
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the loaded tables and their columns
    Tables,
    /// Ask a question in plain English; the model writes the SQL
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Run a read-only SQL query
    Sql {
        #[arg(required = true, num_args = 1..)]
        sql: Vec<String>,
    },
    /// Store the API key for the configured provider in the OS keychain (read from stdin)
    SetKey,
}

impl Cli {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(raw_dir) = &self.raw_dir {
            config.paths.raw_dir = raw_dir.clone();
        }
        if let Some(database) = &self.database {
            config.paths.database = database.clone();
        }
        if let Some(output) = &self.output {
            config.paths.output_csv = output.clone();
        }
    }
}

pub async fn execute(cli: Cli) -> Result<()> {
    let config_service = ConfigService::new();
    let mut config = config_service.load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    if cli.command == Some(Command::SetKey) {
        let key = read_line(
            &mut io::stdin().lock(),
            &format!("{} API key: ", config.llm.provider.display_name()),
        )?;
        if key.is_empty() {
            return Err(AppError::ValidationError("API key is empty".to_string()));
        }
        config_service.save_api_key(&config.llm, &key)?;
        println!("Saved API key to the OS keychain");
        return Ok(());
    }

    info!("Starting report builder");
    let pipeline = bootstrap::setup(&config).await?;
    let catalog = pipeline
        .load_directory(&config.paths.raw_dir, &config.ingest.extensions)
        .await?;

    println!("\nLoaded tables:");
    for table in &catalog.tables {
        println!(" - {}", table);
    }
    for skipped in &catalog.skipped {
        println!(" (skipped {} / {}: {})", skipped.source, skipped.sheet, skipped.reason);
    }

    let (request, report) = match cli.command {
        Some(Command::Tables) => {
            if catalog.schema.is_empty() {
                println!("\n(no tables loaded)");
            } else {
                println!("\n{}", catalog.schema);
            }
            return Ok(());
        }
        Some(Command::Ask { question }) => {
            let request = QueryRequest::Question(question.join(" "));
            let report = pipeline.run(&config.llm, &catalog.schema, &request).await?;
            (request, report)
        }
        Some(Command::Sql { sql }) => {
            let request = QueryRequest::Sql(sql.join(" "));
            let report = pipeline.run(&config.llm, &catalog.schema, &request).await?;
            (request, report)
        }
        Some(Command::SetKey) | None => {
            run_interactive(&pipeline, &config.llm, &catalog, &mut io::stdin().lock()).await?
        }
    };

    if matches!(request, QueryRequest::Question(_)) {
        println!("\nGenerated SQL:\n{}", report.query.as_str());
    }

    println!("\nResult (top {}):", config.preview_rows);
    println!("{}", render_preview(&report.result, config.preview_rows));
    println!("\nSaved to {}", pipeline.writer().path().display());

    Ok(())
}

/// Prompt until a request runs. A rejected or failing query is reported and the
/// user is asked again; any other error, or end of input, ends the session.
async fn run_interactive(
    pipeline: &ReportPipeline,
    config: &LLMConfig,
    catalog: &Catalog,
    input: &mut impl BufRead,
) -> Result<(QueryRequest, Report)> {
    loop {
        let request = prompt_request(input, &catalog.tables)?;
        match pipeline.run(config, &catalog.schema, &request).await {
            Ok(report) => return Ok((request, report)),
            Err(e) if e.is_query_rejection() => {
                warn!(error = %e, "Query rejected, prompting again");
                eprintln!("\nQuery rejected: {}", e);
            }
            Err(e) => return Err(e),
        }
    }
}

/// The two-mode interactive prompt used when no subcommand is given.
fn prompt_request(input: &mut impl BufRead, tables: &[String]) -> Result<QueryRequest> {
    println!("\nChoose input type:");
    println!("1) English prompt (AI writes SQL)");
    println!("2) Manual SQL");
    let choice = read_line(input, "> ")?;

    if choice == "1" {
        let question = read_line(input, "\nAsk your question in plain English:\n> ")?;
        Ok(QueryRequest::Question(question))
    } else {
        let example = tables.first().map(String::as_str).unwrap_or("my_table");
        println!(
            "\nEnter SQL manually (example: SELECT * FROM {} LIMIT 5)",
            example
        );
        let sql = read_line(input, "SQL > ")?;
        Ok(QueryRequest::Sql(sql))
    }
}

fn read_line(input: &mut impl BufRead, label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(AppError::ValidationError("No input provided".to_string()));
    }
    Ok(line.trim().to_string())
}

/// Aligned text table of the first `limit` rows.
pub fn render_preview(result: &ResultSet, limit: usize) -> String {
    if result.columns.is_empty() {
        return "(no columns)".to_string();
    }

    let rows: Vec<Vec<String>> = result
        .preview(limit)
        .iter()
        .map(|row| row.iter().map(value_to_text).collect())
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![
        format_row(result.columns.as_slice()),
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    ];
    lines.extend(rows.iter().map(|row| format_row(row.as_slice())));

    if result.row_count() > rows.len() {
        lines.push(format!("... {} of {} rows shown", rows.len(), result.row_count()));
    } else if rows.is_empty() {
        lines.push("(no rows)".to_string());
    }

    lines.join("\n")
}
