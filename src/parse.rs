use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::{ParseError, Result};

/// Which page the caller asked the portal for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    CaseDetails,
    CauseList,
}

/// Field values exactly as they appear on the page, keyed by canonical field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields(BTreeMap<&'static str, String>);

impl RawFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blank values are dropped so that absent and empty look the same downstream.
    pub fn insert(&mut self, key: &'static str, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.0.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[(&'static str, &str); N]> for RawFields {
    fn from(pairs: [(&'static str, &str); N]) -> Self {
        let mut fields = RawFields::new();
        for (k, v) in pairs {
            fields.insert(k, v);
        }
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Records(Vec<RawFields>),
    /// A well formed answer saying nothing matched.
    NoRecords,
}

const CAPTCHA_SELECTOR: &str =
    r#"img#captcha_image, input[name="captcha"], input[name="fcaptcha_code"], .g-recaptcha"#;
const NO_RECORD_SELECTOR: &str = ".no-record, #norecord";
/// Message boxes the portal writes its "nothing found" answers into.
const NOTICE_SELECTOR: &str = ".alert, .error_msg, #errmsg, #nodata";
const CASE_TABLE_SELECTOR: &str = "table.case_details_table";
const CAUSE_TABLE_SELECTOR: &str = "table#cause_list";

const CAPTCHA_PHRASES: [&str; 3] = ["invalid captcha", "enter captcha", "captcha code"];
const NO_RECORD_PHRASES: [&str; 4] = [
    "record not found",
    "no record found",
    "does not exist",
    "no cases listed",
];

/// Column order assumed when a cause list table carries no header row.
const DEFAULT_CAUSE_COLUMNS: [&str; 7] = [
    "serial_number",
    "case_number",
    "petitioner",
    "respondent",
    "advocate",
    "court_room",
    "time",
];

/// Parses a page on the blocking pool. `Html` isn't `Send`, so the whole parse
/// lives on that thread.
pub async fn parse_page(html: String, shape: Shape) -> Result<Parsed> {
    let parsed = spawn_blocking(move || parse(&html, shape)).await??;
    Ok(parsed)
}

/// CAPTCHA first, then the table for `shape`. A no-record answer is only
/// accepted when the table is absent.
pub fn parse(html: &str, shape: Shape) -> core::result::Result<Parsed, ParseError> {
    let doc = Html::parse_document(html);

    let captcha = create_selector(CAPTCHA_SELECTOR)?;
    let page_text = cell_text(doc.root_element()).to_lowercase();
    if doc.select(&captcha).next().is_some()
        || CAPTCHA_PHRASES.iter().any(|p| page_text.contains(p))
    {
        return Err(ParseError::mismatch("captcha challenge page"));
    }

    let parsed = match shape {
        Shape::CaseDetails => parse_case_details(&doc)?,
        Shape::CauseList => parse_cause_list(&doc)?,
    };
    if let Some(parsed) = parsed {
        return Ok(parsed);
    }

    if reports_no_records(&doc)? {
        debug!(?shape, "portal reported no matching records");
        return Ok(Parsed::NoRecords);
    }
    Err(ParseError::mismatch(match shape {
        Shape::CaseDetails => "no case details table",
        Shape::CauseList => "no cause list table",
    }))
}

/// The dedicated marker, or a known phrase inside one of the portal's notice boxes.
fn reports_no_records(doc: &Html) -> core::result::Result<bool, ParseError> {
    let marker = create_selector(NO_RECORD_SELECTOR)?;
    if doc.select(&marker).next().is_some() {
        return Ok(true);
    }
    let notice = create_selector(NOTICE_SELECTOR)?;
    Ok(doc.select(&notice).any(|el| {
        let text = cell_text(el).to_lowercase();
        NO_RECORD_PHRASES.iter().any(|p| text.contains(p))
    }))
}

/// Label/value rows. A row may hold more than one pair.
fn parse_case_details(doc: &Html) -> core::result::Result<Option<Parsed>, ParseError> {
    let table_selector = create_selector(CASE_TABLE_SELECTOR)?;

    let rows: Vec<ElementRef<'_>> = doc.select(&table_selector).flat_map(direct_rows).collect();
    if rows.is_empty() {
        return Ok(None);
    }

    let mut fields = RawFields::new();
    for row in rows {
        let cells: Vec<String> = child_cells(row, &["th", "td"]).map(cell_text).collect();
        for pair in cells.chunks_exact(2) {
            if let Some(key) = case_field_for_label(&pair[0]) {
                fields.insert(key, pair[1].as_str());
            }
        }
    }

    if fields.is_empty() {
        return Err(ParseError::mismatch(
            "case details table has no recognised fields",
        ));
    }
    Ok(Some(Parsed::Records(vec![fields])))
}

/// Rows come out in document order.
fn parse_cause_list(doc: &Html) -> core::result::Result<Option<Parsed>, ParseError> {
    let table_selector = create_selector(CAUSE_TABLE_SELECTOR)?;
    let Some(table) = doc.select(&table_selector).next() else {
        return Ok(None);
    };

    let mut columns: Option<Vec<Option<&'static str>>> = None;
    let mut records = Vec::new();
    for row in direct_rows(table) {
        let headers: Vec<String> = child_cells(row, &["th"]).map(cell_text).collect();
        if !headers.is_empty() {
            columns = Some(headers.iter().map(|h| cause_field_for_header(h)).collect());
            continue;
        }

        let cells: Vec<String> = child_cells(row, &["td"]).map(cell_text).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }

        let mut fields = RawFields::new();
        match &columns {
            Some(columns) => {
                for (key, value) in columns.iter().zip(&cells) {
                    if let Some(key) = *key {
                        fields.insert(key, value.as_str());
                    }
                }
            }
            None => {
                for (key, value) in DEFAULT_CAUSE_COLUMNS.iter().zip(&cells) {
                    fields.insert(*key, value.as_str());
                }
            }
        }
        records.push(fields);
    }

    debug!(rows = records.len(), "parsed cause list table");
    Ok(Some(Parsed::Records(records)))
}

/// Rows that belong to `table` itself, not to tables nested in its cells.
fn direct_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| el.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn child_cells<'a>(
    row: ElementRef<'a>,
    names: &'static [&'static str],
) -> impl Iterator<Item = ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| names.iter().any(|n| *n == el.value().name()))
}

/// All text under the element with whitespace collapsed.
fn cell_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_label(label: &str) -> String {
    label
        .to_lowercase()
        .replace(['.', ':'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn case_field_for_label(label: &str) -> Option<&'static str> {
    let key = match normalize_label(label).as_str() {
        "cnr" | "cnr number" | "cnr no" => "cnr",
        "case number" | "case no" | "registration number" | "registration no" => "case_number",
        "case title" | "title" | "parties" => "case_title",
        "court" | "court name" | "court establishment" => "court_name",
        "case type" => "case_type",
        "filing date" | "date of filing" => "filing_date",
        "status" | "case status" | "stage of case" => "status",
        "next hearing" | "next hearing date" | "next date" => "next_hearing",
        "serial number" | "serial no" | "sr no" | "cause list serial" => "serial_number",
        _ => return None,
    };
    Some(key)
}

fn cause_field_for_header(header: &str) -> Option<&'static str> {
    let key = match normalize_label(header).as_str() {
        "sr no" | "s no" | "sno" | "serial" | "serial no" | "serial number" => "serial_number",
        "case number" | "case no" => "case_number",
        "case title" | "title" => "case_title",
        "party name" | "parties" => "parties",
        "petitioner" => "petitioner",
        "respondent" => "respondent",
        "advocate" | "advocate name" => "advocate",
        "court room" | "court no" | "room" => "court_room",
        "time" | "hearing time" => "time",
        _ => return None,
    };
    Some(key)
}

#[inline]
fn create_selector(sel_str: &str) -> core::result::Result<Selector, ParseError> {
    Selector::parse(sel_str).map_err(|_| ParseError::Selector(sel_str.into()))
}
