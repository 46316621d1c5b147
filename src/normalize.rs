//! Turns page fields into records.
//!
//! Dates are compared as calendar days, never as strings, and anything the
//! portal spells in an unexpected way degrades to `None`/`Unknown` instead of
//! failing the whole record.

use chrono::{Days, NaiveDate};

use crate::model::{CaseRecord, CaseStatus, CauseListEntry};
use crate::parse::RawFields;
use crate::ParseError;

const DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%B %d %Y",
];

pub fn normalize_case(raw: &RawFields, as_of: NaiveDate) -> Result<CaseRecord, ParseError> {
    let cnr = raw
        .get("cnr")
        .map(normalize_cnr)
        .ok_or(ParseError::MissingField("cnr"))?;

    let next_hearing = raw.get("next_hearing").and_then(parse_date);
    let (listed_today, listed_tomorrow) = listed_flags(next_hearing, as_of);

    Ok(CaseRecord {
        cnr,
        case_number: text(raw, "case_number"),
        case_title: text(raw, "case_title"),
        court_name: text(raw, "court_name"),
        case_type: text(raw, "case_type"),
        filing_date: raw.get("filing_date").and_then(parse_date),
        status: raw
            .get("status")
            .map(parse_status)
            .unwrap_or(CaseStatus::Unknown),
        next_hearing,
        serial_number: text(raw, "serial_number"),
        listed_today,
        listed_tomorrow,
    })
}

pub fn normalize_cause_entry(raw: &RawFields) -> Result<CauseListEntry, ParseError> {
    let serial_number = raw
        .get("serial_number")
        .map(|s| s.trim_end_matches('.').trim().to_string())
        .ok_or(ParseError::MissingField("serial_number"))?;
    let case_number = raw
        .get("case_number")
        .map(|s| s.trim().to_string())
        .ok_or(ParseError::MissingField("case_number"))?;

    let (mut petitioner, mut respondent) = (text(raw, "petitioner"), text(raw, "respondent"));
    if petitioner.is_none() && respondent.is_none() {
        if let Some((p, r)) = raw.get("parties").and_then(split_parties) {
            petitioner = Some(p);
            respondent = Some(r);
        }
    }
    let petitioner = petitioner.unwrap_or_default();
    let respondent = respondent.unwrap_or_default();

    let case_title = text(raw, "case_title")
        .or_else(|| raw.get("parties").map(str::to_string))
        .unwrap_or_else(|| match (petitioner.is_empty(), respondent.is_empty()) {
            (false, false) => format!("{petitioner} vs. {respondent}"),
            (false, true) => petitioner.clone(),
            _ => String::new(),
        });

    Ok(CauseListEntry {
        serial_number,
        case_number,
        case_title,
        petitioner,
        respondent,
        advocate: text(raw, "advocate").unwrap_or_default(),
        court_room: text(raw, "court_room").unwrap_or_default(),
        time: text(raw, "time").unwrap_or_default(),
    })
}

/// `(listed_today, listed_tomorrow)`. Both false without a hearing date.
pub fn listed_flags(next_hearing: Option<NaiveDate>, as_of: NaiveDate) -> (bool, bool) {
    match next_hearing {
        Some(date) => (
            date == as_of,
            as_of.checked_add_days(Days::new(1)) == Some(date),
        ),
        None => (false, false),
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = strip_ordinals(&raw.replace(',', " "));
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
}

pub fn parse_status(raw: &str) -> CaseStatus {
    let key: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect();
    match key.as_str() {
        "pending" => CaseStatus::Pending,
        "listed" => CaseStatus::Listed,
        "adjourned" => CaseStatus::Adjourned,
        "forhearing" | "hearing" => CaseStatus::ForHearing,
        "disposed" | "disposedof" => CaseStatus::Disposed,
        _ => CaseStatus::Unknown,
    }
}

pub fn normalize_cnr(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn text(raw: &RawFields, key: &str) -> Option<String> {
    raw.get(key).map(|s| s.trim().to_string())
}

/// "20th October 2025" -> "20 October 2025"
fn strip_ordinals(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let digits = word.chars().take_while(char::is_ascii_digit).count();
            let suffix = &lower[digits..];
            if digits > 0 && matches!(suffix, "st" | "nd" | "rd" | "th") {
                &word[..digits]
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_parties(parties: &str) -> Option<(String, String)> {
    [" versus ", " vs. ", " vs ", " v. ", " v/s "]
        .iter()
        .find_map(|sep| find_ignore_ascii_case(parties, sep).map(|idx| (idx, sep.len())))
        .map(|(idx, len)| {
            (
                parties[..idx].trim().to_string(),
                parties[idx + len..].trim().to_string(),
            )
        })
}

/// Byte offset of `needle` (ASCII) in `haystack`, on a char boundary of `haystack`.
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack.char_indices().map(|(idx, _)| idx).find(|&idx| {
        haystack
            .as_bytes()
            .get(idx..idx + needle.len())
            .is_some_and(|window| window.eq_ignore_ascii_case(needle))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn listed_flags_use_calendar_equality() {
        let as_of = date(2025, 10, 20);
        assert_eq!(listed_flags(Some(date(2025, 10, 20)), as_of), (true, false));
        assert_eq!(listed_flags(Some(date(2025, 10, 21)), as_of), (false, true));
        assert_eq!(listed_flags(Some(date(2025, 10, 19)), as_of), (false, false));
        assert_eq!(listed_flags(Some(date(2025, 11, 20)), as_of), (false, false));
        assert_eq!(listed_flags(None, as_of), (false, false));
    }

    #[test]
    fn listed_tomorrow_crosses_month_and_year() {
        assert_eq!(
            listed_flags(Some(date(2026, 1, 1)), date(2025, 12, 31)),
            (false, true)
        );
        assert_eq!(
            listed_flags(Some(date(2024, 3, 1)), date(2024, 2, 29)),
            (false, true)
        );
    }

    #[test]
    fn flags_are_never_both_set() {
        let as_of = date(2025, 10, 20);
        for offset in 0..40 {
            let hearing = date(2025, 10, 1).checked_add_days(Days::new(offset));
            let (today, tomorrow) = listed_flags(hearing, as_of);
            assert!(!(today && tomorrow));
        }
    }

    #[test]
    fn date_formats_collapse_to_one_canonical_date() {
        let expected = Some(date(2025, 10, 20));
        for raw in [
            "2025-10-20",
            "20-10-2025",
            "20/10/2025",
            "20.10.2025",
            "20-Oct-2025",
            "20 Oct 2025",
            "20th October 2025",
            "October 20th, 2025",
        ] {
            assert_eq!(parse_date(raw), expected, "{raw}");
        }
        assert_eq!(parse_date("next week"), None);
        assert_eq!(parse_date("31-02-2025"), None);
    }

    #[test]
    fn status_mapping_is_lenient() {
        assert_eq!(parse_status("Pending"), CaseStatus::Pending);
        assert_eq!(parse_status(" FOR HEARING "), CaseStatus::ForHearing);
        assert_eq!(parse_status("For-Hearing"), CaseStatus::ForHearing);
        assert_eq!(parse_status("Disposed of"), CaseStatus::Disposed);
        assert_eq!(parse_status("Stayed by higher court"), CaseStatus::Unknown);
    }

    #[test]
    fn case_without_cnr_is_rejected() {
        let raw = RawFields::from([("case_number", "1/2024")]);
        assert_eq!(
            normalize_case(&raw, date(2025, 1, 1)),
            Err(ParseError::MissingField("cnr"))
        );
    }

    #[test]
    fn case_with_sparse_fields_fills_defaults() {
        let raw = RawFields::from([
            ("cnr", " dlct01-123456-2023 "),
            ("status", "Adjourned to later date"),
            ("next_hearing", "21-10-2025"),
        ]);
        let record = normalize_case(&raw, date(2025, 10, 20)).unwrap();
        assert_eq!(record.cnr, "DLCT01-123456-2023");
        assert_eq!(record.status, CaseStatus::Unknown);
        assert_eq!(record.court_name, None);
        assert!(record.listed_tomorrow);
        assert!(!record.listed_today);
    }

    #[test]
    fn cause_entry_splits_party_column() {
        let raw = RawFields::from([
            ("serial_number", "3."),
            ("case_number", "22222/2022"),
            ("parties", "Ravi Kumar Vs. State"),
            ("time", "11:30 AM"),
        ]);
        let entry = normalize_cause_entry(&raw).unwrap();
        assert_eq!(entry.serial_number, "3");
        assert_eq!(entry.petitioner, "Ravi Kumar");
        assert_eq!(entry.respondent, "State");
        assert_eq!(entry.case_title, "Ravi Kumar Vs. State");
        assert_eq!(entry.advocate, "");
    }

    #[test]
    fn cause_entry_title_derived_from_parties() {
        let raw = RawFields::from([
            ("serial_number", "1"),
            ("case_number", "1/2024"),
            ("petitioner", "A"),
            ("respondent", "B"),
        ]);
        assert_eq!(normalize_cause_entry(&raw).unwrap().case_title, "A vs. B");
    }

    #[test]
    fn cause_entry_requires_serial() {
        let raw = RawFields::from([("case_number", "1/2024")]);
        assert_eq!(
            normalize_cause_entry(&raw),
            Err(ParseError::MissingField("serial_number"))
        );
    }

    #[test]
    fn non_ascii_party_names_split_on_char_boundaries() {
        let raw = RawFields::from([
            ("serial_number", "4"),
            ("case_number", "4/2024"),
            ("parties", "İ é vs éé"),
        ]);
        let entry = normalize_cause_entry(&raw).unwrap();
        assert_eq!(entry.petitioner, "İ é");
        assert_eq!(entry.respondent, "éé");

        assert_eq!(
            split_parties("Śrī Rāmaṇa VERSUS Ölçer İnşaat"),
            Some(("Śrī Rāmaṇa".to_string(), "Ölçer İnşaat".to_string()))
        );
        assert_eq!(split_parties("İİİ only"), None);
    }
}
