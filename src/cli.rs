use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{Days, NaiveDate};
use clap::Parser;
use serde_json::{Map, Value};

use crate::config::AppConfig;
use crate::model::{CaseRecord, CauseList};
use crate::normalize::parse_date;
use crate::process::{save_cause_list, save_results, CallContext, Lookup, Portal};
use crate::{store, web};

/// How many cause list rows get printed per court.
const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Parser)]
#[command(
    name = "ecourts",
    version,
    about = "Fetch case details and cause lists from the eCourts portal"
)]
pub struct Cli {
    /// Case Number Record (CNR) to search
    #[arg(long)]
    pub cnr: Option<String>,

    /// Case type, used together with --case-number and --year
    #[arg(long, requires_all = ["case_number", "year"], conflicts_with = "cnr")]
    pub case_type: Option<String>,

    #[arg(long, requires = "case_type")]
    pub case_number: Option<String>,

    #[arg(long, requires = "case_type")]
    pub year: Option<String>,

    /// Report whether the case is listed today
    #[arg(long)]
    pub today: bool,

    /// Report whether the case is listed tomorrow; fetches tomorrow's cause list
    #[arg(long, conflicts_with = "today")]
    pub tomorrow: bool,

    /// Download the cause list
    #[arg(long)]
    pub causelist: bool,

    /// Court code(s) for the cause list, comma separated
    #[arg(long = "court-code", default_value = "01", value_delimiter = ',')]
    pub court_codes: Vec<String>,

    /// Cause list date (defaults to today)
    #[arg(long, value_parser = parse_cli_date)]
    pub date: Option<NaiveDate>,

    /// Output directory for files
    #[arg(long, env = "ECOURTS_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Download the case PDF if available
    #[arg(long)]
    pub download_pdf: bool,

    /// Use the built-in sample portal instead of the network
    #[arg(long)]
    pub offline: bool,

    #[arg(long, env = "ECOURTS_BASE_URL")]
    pub base_url: Option<String>,

    /// Per request timeout in seconds
    #[arg(long, env = "ECOURTS_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    #[arg(long, env = "ECOURTS_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// JSON config file
    #[arg(long, env = "ECOURTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, env = "ECOURTS_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Start the web interface on this address instead of running a search
    #[arg(long, value_name = "ADDR")]
    pub serve: Option<SocketAddr>,
}

fn parse_cli_date(raw: &str) -> core::result::Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("unrecognised date '{raw}', try YYYY-MM-DD"))
}

impl Cli {
    /// Config file (if any) with flags layered on top.
    pub fn app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if self.log_file.is_some() {
            config.log_file = self.log_file.clone();
        }
        config.offline |= self.offline;
        Ok(config)
    }

    fn cause_list_date(&self, today: NaiveDate) -> NaiveDate {
        match self.date {
            Some(date) => date,
            None if self.tomorrow => today.checked_add_days(Days::new(1)).unwrap_or(today),
            None => today,
        }
    }

    fn wants_case(&self) -> bool {
        self.cnr.is_some() || self.case_type.is_some()
    }
}

pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let portal = if config.offline {
        Portal::offline()
    } else {
        Portal::http(config.client_config())?
    };

    if let Some(addr) = cli.serve {
        return web::serve(addr, web::AppState::new(portal, config.output_dir)).await;
    }

    if !cli.wants_case() && !cli.causelist {
        println!("Nothing to do: pass --cnr, --case-type/--case-number/--year or --causelist (see --help).");
        return Ok(());
    }

    let output_dir = config.output_dir;
    store::ensure_directory(&output_dir)?;
    let ctx = CallContext::today();
    let mut results = Map::new();

    let case = match (&cli.cnr, &cli.case_type, &cli.case_number, &cli.year) {
        (Some(cnr), ..) => Some(portal.fetch_case_by_cnr(cnr, &ctx).await?),
        (None, Some(case_type), Some(number), Some(year)) => Some(
            portal
                .fetch_case_by_details(case_type, number, year, &ctx)
                .await?,
        ),
        _ => None,
    };

    match case {
        Some(Lookup::Found(record)) => {
            print_case(&record, &cli);
            results.insert("case_search".into(), serde_json::to_value(&record)?);

            if cli.download_pdf {
                match portal
                    .download_case_pdf(&record.cnr, &output_dir, &ctx)
                    .await?
                {
                    Lookup::Found(path) => {
                        println!("PDF downloaded to: {}", path.display());
                        results.insert("pdf_downloaded".into(), path.display().to_string().into());
                    }
                    Lookup::NotFound => println!("No document available for {}", record.cnr),
                }
            }
        }
        Some(Lookup::NotFound) => println!("\nNo case found."),
        None => {}
    }

    let mut failure = None;
    if cli.causelist {
        let date = cli.cause_list_date(ctx.as_of);
        let mut lists = Vec::new();
        let mut files = Vec::new();

        for (code, res) in portal.fetch_cause_lists(&cli.court_codes, date, &ctx).await? {
            match res {
                Ok(list) if list.is_empty() => {
                    println!("\nNo cause list found for court {code} on {date}.");
                }
                Ok(list) => {
                    print_cause_list(&list);
                    let path = save_cause_list(&list, &output_dir).await?;
                    println!("Cause list saved to: {}", path.display());
                    files.push(Value::from(path.display().to_string()));
                    lists.push(list);
                }
                Err(err) => {
                    eprintln!("Cause list for court {code} failed: {err}");
                    failure.get_or_insert(err);
                }
            }
        }

        if !lists.is_empty() {
            results.insert("cause_list".into(), serde_json::to_value(&lists)?);
            results.insert("cause_list_file".into(), Value::Array(files));
        }
    }

    let saved = results.len();
    if !results.is_empty() {
        let path = save_results(Value::Object(results), output_dir.join("results.json")).await?;
        println!("\nAll results saved to: {}", path.display());
    }

    println!("\n{}", "=".repeat(50));
    println!("SUMMARY");
    println!("{}", "=".repeat(50));
    println!("Output directory: {}", output_dir.display());
    println!("Results saved: {saved} items");

    match failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn print_case(record: &CaseRecord, cli: &Cli) {
    let na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".into());
    println!("\nCase found:");
    println!("CNR: {}", record.cnr);
    println!("Case Number: {}", na(&record.case_number));
    println!("Title: {}", na(&record.case_title));
    println!("Court: {}", na(&record.court_name));
    println!("Status: {}", record.status);
    println!(
        "Next Hearing: {}",
        record
            .next_hearing
            .map(|d| d.to_string())
            .unwrap_or_else(|| "N/A".into())
    );
    println!("Serial Number: {}", na(&record.serial_number));
    println!("Listed Today: {}", yes_no(record.listed_today));
    println!("Listed Tomorrow: {}", yes_no(record.listed_tomorrow));

    if cli.today && !record.listed_today {
        println!("The case is not listed today.");
    }
    if cli.tomorrow && !record.listed_tomorrow {
        println!("The case is not listed tomorrow.");
    }
}

fn print_cause_list(list: &CauseList) {
    println!(
        "\nCause list for court {} on {} with {} cases:",
        list.court_code,
        list.date,
        list.entries.len()
    );
    for entry in list.in_serial_order().into_iter().take(PREVIEW_ROWS) {
        println!(
            "Serial: {} | Case: {} | Time: {}",
            entry.serial_number, entry.case_number, entry.time
        );
    }
}
