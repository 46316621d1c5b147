use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tokio::task::{spawn_blocking, JoinSet};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::fixtures::FixtureFetcher;
use crate::model::{self, CaseRecord, CauseList, CourtDescriptor};
use crate::normalize::{normalize_case, normalize_cause_entry, normalize_cnr};
use crate::parse::{parse_page, Parsed, Shape};
use crate::request::{
    FetchRequest, Fetcher, HttpFetcher, CASE_BY_CNR_PATH, CASE_DOCUMENT_PATH, CASE_SEARCH_PATH,
    CAUSE_LIST_PATH,
};
use crate::{info_time, store, Error, ParseError, Result};

/// Either the portal had a record, or it answered cleanly that it had none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(t) => Some(t),
            Lookup::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// Per call inputs: the day "today" means, and an optional hard deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub as_of: NaiveDate,
    pub deadline: Option<Instant>,
}

impl CallContext {
    pub fn today() -> Self {
        Self::as_of(Local::now().date_naive())
    }

    pub fn as_of(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            deadline: None,
        }
    }

    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.deadline = Some(Instant::now() + limit);
        self
    }
}

/// Entry point shared by the CLI and the web server.
#[derive(Clone)]
pub struct Portal {
    fetcher: Arc<dyn Fetcher>,
}

impl Portal {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub fn http(config: ClientConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpFetcher::new(config)?)))
    }

    pub fn offline() -> Self {
        Self::new(Arc::new(FixtureFetcher::new()))
    }

    pub fn courts(&self) -> &'static [CourtDescriptor] {
        model::courts()
    }

    pub async fn fetch_case_by_cnr(
        &self,
        cnr: &str,
        ctx: &CallContext,
    ) -> Result<Lookup<CaseRecord>> {
        let cnr = normalize_cnr(cnr);
        validate_cnr(&cnr)?;
        info!(%cnr, "searching case by CNR");

        let req = FetchRequest::new(CASE_BY_CNR_PATH)
            .param("cino", cnr.clone())
            .deadline(ctx.deadline);
        let lookup = self.fetch_case(&req, Some(&cnr), ctx).await?;

        if let Lookup::Found(record) = &lookup {
            if record.cnr != cnr {
                return Err(ParseError::mismatch(format!(
                    "asked for {cnr}, page describes {}",
                    record.cnr
                ))
                .into());
            }
        }
        Ok(lookup)
    }

    pub async fn fetch_case_by_details(
        &self,
        case_type: &str,
        case_number: &str,
        year: &str,
        ctx: &CallContext,
    ) -> Result<Lookup<CaseRecord>> {
        let (case_type, case_number, year) = (case_type.trim(), case_number.trim(), year.trim());
        if case_type.is_empty() || case_number.is_empty() || year.is_empty() {
            return Err(Error::InvalidInput(
                "case type, case number and year are all required".into(),
            ));
        }
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidInput(format!("'{year}' is not a year")));
        }
        info!(case_type, case_number, year, "searching case by details");

        let req = FetchRequest::new(CASE_SEARCH_PATH)
            .param("case_type", case_type)
            .param("case_no", case_number)
            .param("rgyear", year)
            .deadline(ctx.deadline);
        self.fetch_case(&req, None, ctx).await
    }

    /// Rows keep the order they had on the page.
    pub async fn fetch_cause_list(
        &self,
        court_code: &str,
        date: NaiveDate,
        ctx: &CallContext,
    ) -> Result<CauseList> {
        let start_time = Local::now();
        let court = model::find_court(court_code)
            .ok_or_else(|| Error::InvalidInput(format!("unknown court code '{court_code}'")))?;

        let req = FetchRequest::new(CAUSE_LIST_PATH)
            .param("court_code", court.code)
            .param("causelist_date", date.format("%d-%m-%Y").to_string())
            .deadline(ctx.deadline);
        let res = self.fetcher.fetch(&req).await?;

        let rows = match parse_page(res.text(), Shape::CauseList).await? {
            Parsed::Records(rows) => rows,
            Parsed::NoRecords => Vec::new(),
        };

        let mut entries = Vec::with_capacity(rows.len());
        for (idx, raw) in rows.iter().enumerate() {
            match normalize_cause_entry(raw) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(court = court.code, row = idx, error = %err, "skipping row"),
            }
        }
        if entries.is_empty() && !rows.is_empty() {
            return Err(ParseError::mismatch("no usable rows in cause list table").into());
        }

        info_time!(start_time, court = court.code, %date, rows = entries.len(), "fetched cause list");
        Ok(CauseList {
            court_code: court.code.to_string(),
            date,
            entries,
        })
    }

    /// Fetches several courts at once. Results come back in the order asked for.
    pub async fn fetch_cause_lists(
        &self,
        court_codes: &[String],
        date: NaiveDate,
        ctx: &CallContext,
    ) -> Result<Vec<(String, Result<CauseList>)>> {
        let mut task_set = JoinSet::new();
        for (idx, code) in court_codes.iter().enumerate() {
            task_set.spawn({
                // Portal is an Arc inside, so cloning is cheap.
                let portal = self.clone();
                let ctx = *ctx;
                let code = code.clone();
                async move {
                    let res = portal.fetch_cause_list(&code, date, &ctx).await;
                    (idx, code, res)
                }
            });
        }

        let mut results = Vec::with_capacity(court_codes.len());
        while let Some(task) = task_set.join_next().await {
            results.push(task?);
        }
        results.sort_by_key(|(idx, _, _)| *idx);
        Ok(results
            .into_iter()
            .map(|(_, code, res)| (code, res))
            .collect())
    }

    /// Saves the case document as `case_<cnr>.pdf` under `dir`.
    pub async fn download_case_pdf(
        &self,
        cnr: &str,
        dir: &Path,
        ctx: &CallContext,
    ) -> Result<Lookup<PathBuf>> {
        let cnr = normalize_cnr(cnr);
        validate_cnr(&cnr)?;

        let req = FetchRequest::new(CASE_DOCUMENT_PATH)
            .param("cino", cnr.clone())
            .deadline(ctx.deadline);
        let res = self.fetcher.fetch(&req).await?;

        if !res.body.starts_with(b"%PDF") {
            return match parse_page(res.text(), Shape::CaseDetails).await {
                Ok(Parsed::NoRecords) => Ok(Lookup::NotFound),
                Ok(Parsed::Records(_)) => Err(ParseError::mismatch("expected a PDF document").into()),
                Err(err) => Err(err),
            };
        }

        let path = dir.join(format!("case_{}.pdf", store::sanitize_file_stem(&cnr)));
        let body = res.body;
        let path = spawn_blocking(move || store::write_bytes(&body, &path)).await??;
        Ok(Lookup::Found(path))
    }

    async fn fetch_case(
        &self,
        req: &FetchRequest,
        requested_cnr: Option<&str>,
        ctx: &CallContext,
    ) -> Result<Lookup<CaseRecord>> {
        let res = self.fetcher.fetch(req).await?;
        let mut records = match parse_page(res.text(), Shape::CaseDetails).await? {
            Parsed::NoRecords => {
                info!(path = req.path, "no matching case");
                return Ok(Lookup::NotFound);
            }
            Parsed::Records(records) => records,
        };
        if records.is_empty() {
            return Err(ParseError::mismatch("empty case details").into());
        }

        let mut raw = records.swap_remove(0);
        // The CNR page doesn't always repeat the number it was asked for.
        if raw.get("cnr").is_none() {
            if let Some(cnr) = requested_cnr {
                raw.insert("cnr", cnr);
            }
        }
        let record = normalize_case(&raw, ctx.as_of)?;
        info!(cnr = %record.cnr, status = %record.status, "case found");
        Ok(Lookup::Found(record))
    }
}

/// Writes `<dir>/cause_list_<court>_<date>.csv`.
pub async fn save_cause_list(list: &CauseList, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(format!("{}.csv", list.file_stem()));
    let entries = list.entries.clone();
    let path = spawn_blocking(move || store::write_csv(&entries, &path)).await??;
    Ok(path)
}

pub async fn save_results(results: serde_json::Value, path: PathBuf) -> Result<PathBuf> {
    let path = spawn_blocking(move || store::write_json(&results, &path)).await??;
    Ok(path)
}

fn validate_cnr(cnr: &str) -> Result<()> {
    if cnr.is_empty() {
        return Err(Error::InvalidInput("CNR is required".into()));
    }
    if cnr.len() > 32 || !cnr.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(Error::InvalidInput(format!("'{cnr}' is not a valid CNR")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cnr_validation() {
        assert!(validate_cnr("DLCT01-123456-2023").is_ok());
        assert!(validate_cnr("DLCT010123452023").is_ok());
        assert!(matches!(validate_cnr(""), Err(Error::InvalidInput(_))));
        assert!(matches!(validate_cnr("../etc"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn lookup_found_unwraps() {
        assert_eq!(Lookup::Found(3).found(), Some(3));
        assert_eq!(Lookup::<u8>::NotFound.found(), None);
        assert!(!Lookup::<u8>::NotFound.is_found());
    }

    #[test]
    fn timeout_sets_deadline() {
        let ctx = CallContext::today().with_timeout(Duration::from_secs(5));
        assert!(ctx.deadline.is_some());
        assert_eq!(CallContext::today().deadline, None);
    }
}
