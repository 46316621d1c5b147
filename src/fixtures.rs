//! Offline stand-in for the portal.
//!
//! Serves a small fixed dataset as HTML shaped like the real pages so the whole
//! fetch, parse and normalize pipeline runs without network access.

use async_trait::async_trait;
use tracing::debug;

use crate::request::{
    FetchRequest, Fetcher, RawResponse, CASE_BY_CNR_PATH, CASE_DOCUMENT_PATH, CASE_SEARCH_PATH,
    CAUSE_LIST_PATH,
};
use crate::FetchError;

struct DemoCase {
    cnr: &'static str,
    case_number: &'static str,
    title: &'static str,
    court: &'static str,
    case_type: &'static str,
    filing_date: &'static str,
    status: &'static str,
    next_hearing: &'static str,
    serial: &'static str,
}

const CASES: [DemoCase; 5] = [
    DemoCase {
        cnr: "DLCT01-123456-2023",
        case_number: "12345/2023",
        title: "John Doe vs. Jane Smith",
        court: "Delhi High Court",
        case_type: "Civil",
        filing_date: "15-01-2023",
        status: "Pending",
        next_hearing: "2025-10-20",
        serial: "1",
    },
    DemoCase {
        cnr: "MHMC02-654321-2022",
        case_number: "65432/2022",
        title: "ABC Pvt Ltd vs. XYZ Traders",
        court: "Mumbai City Civil Court",
        case_type: "Commercial",
        filing_date: "10/06/2022",
        status: "Pending",
        next_hearing: "21-10-2025",
        serial: "7",
    },
    DemoCase {
        cnr: "KLER03-111222-2021",
        case_number: "11122/2021",
        title: "State vs. Raman Nair",
        court: "Ernakulam District Court",
        case_type: "Criminal",
        filing_date: "2021-09-05",
        status: "Listed",
        next_hearing: "15th October 2025",
        serial: "15",
    },
    DemoCase {
        cnr: "TNCH04-777888-2020",
        case_number: "77788/2020",
        title: "Mohan vs. Housing Board",
        court: "Chennai City Civil Court",
        case_type: "Civil",
        filing_date: "20-Nov-2020",
        status: "Adjourned",
        next_hearing: "22-10-2025",
        serial: "23",
    },
    DemoCase {
        cnr: "RJJP05-333444-2019",
        case_number: "33344/2019",
        title: "Pooja Sharma vs. RTO Jaipur",
        court: "Jaipur District Court",
        case_type: "Motor Accident Claims",
        filing_date: "18-03-2019",
        status: "For Hearing",
        next_hearing: "16-10-2025",
        serial: "3",
    },
];

/// serial, case number, parties, advocate, room, time
type CauseRow = (&'static str, &'static str, &'static str, &'static str, &'static str, &'static str);

const CAUSE_ROWS: [CauseRow; 5] = [
    ("1", "12345/2023", "John Doe vs. Jane Smith", "Advocate ABC", "Room 1", "10:00 AM"),
    ("2", "67890/2023", "Alice Johnson vs. Bob Wilson", "Advocate XYZ", "Room 2", "11:00 AM"),
    ("3", "22222/2022", "Ravi Kumar vs. State", "Adv. Mehta", "Room 3", "11:30 AM"),
    ("4", "33333/2021", "Sita Devi vs. Nagar Nigam", "Adv. Rao", "Room 4", "12:00 PM"),
    ("5", "44444/2020", "Om Prakash vs. National Insurance", "Adv. Khan", "Room 5", "12:30 PM"),
];

/// The CNRs the fixture knows about.
pub fn known_cnrs() -> impl Iterator<Item = &'static str> {
    CASES.iter().map(|c| c.cnr)
}

pub const CAPTCHA_PAGE: &str = r#"<html><body>
<form id="captcha_form">
  <img id="captcha_image" src="/securimage/securimage_show.php">
  <label>Enter Captcha</label>
  <input type="text" name="fcaptcha_code">
</form>
</body></html>"#;

pub const NO_RECORD_PAGE: &str =
    r#"<html><body><div class="no-record">This Case Code does not exists</div></body></html>"#;

#[derive(Debug, Clone, Default)]
pub struct FixtureFetcher {
    challenged: bool,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every request with a CAPTCHA challenge.
    pub fn challenged() -> Self {
        Self { challenged: true }
    }

    fn respond(&self, req: &FetchRequest) -> Result<Vec<u8>, FetchError> {
        let captcha_requested = req
            .params
            .iter()
            .any(|(_, v)| v.to_lowercase().contains("captcha"));
        if self.challenged || captcha_requested {
            return Ok(CAPTCHA_PAGE.into());
        }

        let page = match req.path {
            CASE_BY_CNR_PATH => {
                let cnr = req.get_param("cino").unwrap_or_default();
                CASES
                    .iter()
                    .find(|c| c.cnr.eq_ignore_ascii_case(cnr))
                    .map(case_page)
            }
            CASE_SEARCH_PATH => {
                let case_type = req.get_param("case_type").unwrap_or_default();
                let number = format!(
                    "{}/{}",
                    req.get_param("case_no").unwrap_or_default(),
                    req.get_param("rgyear").unwrap_or_default()
                );
                CASES
                    .iter()
                    .find(|c| c.case_type.eq_ignore_ascii_case(case_type) && c.case_number == number)
                    .map(case_page)
            }
            CAUSE_LIST_PATH => cause_list_page(req.get_param("court_code").unwrap_or_default()),
            CASE_DOCUMENT_PATH => {
                let cnr = req.get_param("cino").unwrap_or_default();
                return Ok(CASES
                    .iter()
                    .find(|c| c.cnr.eq_ignore_ascii_case(cnr))
                    .map(document)
                    .unwrap_or_else(|| NO_RECORD_PAGE.into()));
            }
            _ => return Err(FetchError::HttpStatus(404)),
        };
        Ok(page.unwrap_or_else(|| NO_RECORD_PAGE.to_string()).into_bytes())
    }
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<RawResponse, FetchError> {
        debug!(path = req.path, params = ?req.params, "fixture request");
        let body = self.respond(req)?;
        Ok(RawResponse {
            url: format!("fixture://{}", req.path),
            status: 200,
            body,
        })
    }
}

fn case_page(case: &DemoCase) -> String {
    let rows = [
        ("CNR Number", case.cnr),
        ("Case Number", case.case_number),
        ("Case Title", case.title),
        ("Court", case.court),
        ("Case Type", case.case_type),
        ("Filing Date", case.filing_date),
        ("Case Status", case.status),
        ("Next Hearing Date", case.next_hearing),
        ("Serial Number", case.serial),
    ];
    let body: String = rows
        .iter()
        .map(|(label, value)| format!("<tr><td>{label}</td><td>{value}</td></tr>\n"))
        .collect();
    format!(
        "<html><body><h2>Case Details</h2>\n<table class=\"case_details_table\">\n{body}</table></body></html>"
    )
}

/// Court 01 lists every row. Court 02 lists a few, out of serial order.
fn cause_list_page(court_code: &str) -> Option<String> {
    let rows: Vec<&CauseRow> = match court_code {
        "01" => CAUSE_ROWS.iter().collect(),
        "02" => [2, 0, 1].iter().map(|&i| &CAUSE_ROWS[i]).collect(),
        _ => return None,
    };
    let body: String = rows
        .iter()
        .map(|(serial, number, parties, advocate, room, time)| {
            format!(
                "<tr><td>{serial}</td><td>{number}</td><td>{parties}</td><td>{advocate}</td><td>{room}</td><td>{time}</td></tr>\n"
            )
        })
        .collect();
    Some(format!(
        "<html><body><table id=\"cause_list\">\n\
         <tr><th>Sr No</th><th>Case Number</th><th>Party Name</th><th>Advocate</th><th>Court Room</th><th>Time</th></tr>\n\
         {body}</table></body></html>"
    ))
}

fn document(case: &DemoCase) -> Vec<u8> {
    format!(
        "%PDF-1.4\n% {} {}\n1 0 obj << /Type /Catalog >> endobj\ntrailer << /Root 1 0 R >>\n%%EOF\n",
        case.cnr, case.title
    )
    .into_bytes()
}
