use std::sync::Arc;

use chrono::NaiveDate;
use ecourts::{
    fixtures::{known_cnrs, FixtureFetcher},
    logging,
    process::{save_cause_list, CallContext, Lookup, Portal},
    store, CaseStatus, Error, ParseError,
};
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ctx() -> CallContext {
    CallContext::as_of(date(2025, 10, 20))
}

#[tokio::test]
async fn every_known_cnr_is_found() {
    logging::init_test();
    let portal = Portal::offline();
    for cnr in known_cnrs() {
        let record = portal
            .fetch_case_by_cnr(cnr, &ctx())
            .await
            .unwrap()
            .found()
            .unwrap_or_else(|| panic!("{cnr} should be found"));
        assert_eq!(record.cnr, cnr);
    }
}

#[tokio::test]
async fn lowercase_cnr_is_normalized() {
    let record = Portal::offline()
        .fetch_case_by_cnr("  dlct01-123456-2023 ", &ctx())
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(record.cnr, "DLCT01-123456-2023");
}

#[tokio::test]
async fn absent_cnr_is_not_found() {
    let lookup = Portal::offline()
        .fetch_case_by_cnr("ZZZZ99-000000-1999", &ctx())
        .await
        .unwrap();
    assert_eq!(lookup, Lookup::NotFound);
}

#[tokio::test]
async fn delhi_case_is_fully_normalized() {
    let record = Portal::offline()
        .fetch_case_by_cnr("DLCT01-123456-2023", &ctx())
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(record.court_name.as_deref(), Some("Delhi High Court"));
    assert_eq!(record.case_number.as_deref(), Some("12345/2023"));
    assert_eq!(record.status, CaseStatus::Pending);
    assert_eq!(record.serial_number.as_deref(), Some("1"));
    assert_eq!(record.filing_date, Some(date(2023, 1, 15)));
    assert_eq!(record.next_hearing, Some(date(2025, 10, 20)));
}

#[tokio::test]
async fn listed_flags_follow_the_call_date() {
    let portal = Portal::offline();

    let today = portal
        .fetch_case_by_cnr("DLCT01-123456-2023", &ctx())
        .await
        .unwrap()
        .found()
        .unwrap();
    assert!(today.listed_today);
    assert!(!today.listed_tomorrow);

    let tomorrow = portal
        .fetch_case_by_cnr("MHMC02-654321-2022", &ctx())
        .await
        .unwrap()
        .found()
        .unwrap();
    assert!(!tomorrow.listed_today);
    assert!(tomorrow.listed_tomorrow);

    let past = portal
        .fetch_case_by_cnr("KLER03-111222-2021", &ctx())
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(past.next_hearing, Some(date(2025, 10, 15)));
    assert!(!past.listed_today && !past.listed_tomorrow);

    // Same record a day later.
    let later = portal
        .fetch_case_by_cnr("DLCT01-123456-2023", &CallContext::as_of(date(2025, 10, 19)))
        .await
        .unwrap()
        .found()
        .unwrap();
    assert!(!later.listed_today);
    assert!(later.listed_tomorrow);
}

#[tokio::test]
async fn captcha_is_a_parse_error_not_a_miss() {
    let portal = Portal::new(Arc::new(FixtureFetcher::challenged()));
    let err = portal
        .fetch_case_by_cnr("DLCT01-123456-2023", &ctx())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Parse(ParseError::SchemaMismatch { .. })
    ));
    assert_eq!(err.kind(), "schema_mismatch");

    let err = portal
        .fetch_cause_list("01", date(2025, 10, 20), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Parse(ParseError::SchemaMismatch { .. })));
}

#[tokio::test]
async fn search_by_details() {
    let portal = Portal::offline();
    let record = portal
        .fetch_case_by_details("civil", "12345", "2023", &ctx())
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(record.cnr, "DLCT01-123456-2023");

    let miss = portal
        .fetch_case_by_details("Civil", "99999", "2023", &ctx())
        .await
        .unwrap();
    assert!(!miss.is_found());

    let err = portal
        .fetch_case_by_details("Civil", "12345", "23", &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn concurrent_cause_lists_write_independent_files() {
    logging::init_test();
    let dir = tempdir().unwrap();
    let day = date(2025, 10, 20);
    let courts = vec!["01".to_string(), "02".to_string()];

    let results = Portal::offline()
        .fetch_cause_lists(&courts, day, &ctx())
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "01");
    assert_eq!(results[1].0, "02");

    let mut paths = Vec::new();
    for (_, res) in results {
        let list = res.unwrap();
        paths.push((save_cause_list(&list, dir.path()).await.unwrap(), list));
    }
    assert_ne!(paths[0].0, paths[1].0);

    let (first_path, first) = &paths[0];
    let (second_path, second) = &paths[1];
    assert_eq!(first.entries.len(), 5);
    let serials: Vec<&str> = second
        .entries
        .iter()
        .map(|e| e.serial_number.as_str())
        .collect();
    assert_eq!(serials, ["3", "1", "2"]);

    assert_eq!(&store::read_csv(first_path).unwrap(), &first.entries);
    assert_eq!(&store::read_csv(second_path).unwrap(), &second.entries);
}

#[tokio::test]
async fn cause_list_rows_split_parties() {
    let list = Portal::offline()
        .fetch_cause_list("01", date(2025, 10, 20), &ctx())
        .await
        .unwrap();
    let first = &list.entries[0];
    assert_eq!(first.serial_number, "1");
    assert_eq!(first.case_number, "12345/2023");
    assert_eq!(first.petitioner, "John Doe");
    assert_eq!(first.respondent, "Jane Smith");
    assert_eq!(first.time, "10:00 AM");
}

#[tokio::test]
async fn court_without_listing_is_empty_and_unknown_court_is_rejected() {
    let portal = Portal::offline();
    let list = portal
        .fetch_cause_list("04", date(2025, 10, 20), &ctx())
        .await
        .unwrap();
    assert!(list.is_empty());

    let err = portal
        .fetch_cause_list("99", date(2025, 10, 20), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn pdf_download_found_and_missing() {
    let dir = tempdir().unwrap();
    let portal = Portal::offline();

    let path = portal
        .download_case_pdf("DLCT01-123456-2023", dir.path(), &ctx())
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(path, dir.path().join("case_DLCT01-123456-2023.pdf"));
    assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF"));

    let missing = portal
        .download_case_pdf("ZZZZ99-000000-1999", dir.path(), &ctx())
        .await
        .unwrap();
    assert_eq!(missing, Lookup::NotFound);
}
