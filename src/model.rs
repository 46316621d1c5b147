//! Value types produced by the pipeline.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStatus {
    Pending,
    Listed,
    Adjourned,
    #[serde(rename = "For Hearing")]
    ForHearing,
    Disposed,
    Unknown,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Pending => "Pending",
            CaseStatus::Listed => "Listed",
            CaseStatus::Adjourned => "Adjourned",
            CaseStatus::ForHearing => "For Hearing",
            CaseStatus::Disposed => "Disposed",
            CaseStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single case as reported by the portal.
///
/// `listed_today` and `listed_tomorrow` are derived from `next_hearing` and the
/// date the record was normalized against; at most one of them is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub cnr: String,
    pub case_number: Option<String>,
    pub case_title: Option<String>,
    pub court_name: Option<String>,
    pub case_type: Option<String>,
    pub filing_date: Option<NaiveDate>,
    pub status: CaseStatus,
    pub next_hearing: Option<NaiveDate>,
    pub serial_number: Option<String>,
    pub listed_today: bool,
    pub listed_tomorrow: bool,
}

/// One row of a cause list. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseListEntry {
    pub serial_number: String,
    pub case_number: String,
    pub case_title: String,
    pub petitioner: String,
    pub respondent: String,
    pub advocate: String,
    pub court_room: String,
    pub time: String,
}

impl CauseListEntry {
    pub const COLUMNS: [&'static str; 8] = [
        "serial_number",
        "case_number",
        "case_title",
        "petitioner",
        "respondent",
        "advocate",
        "court_room",
        "time",
    ];

    /// Numeric serial when the portal uses plain numbers, used for display ordering.
    pub fn serial_key(&self) -> (u64, &str) {
        let digits: String = self
            .serial_number
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        (digits.parse().unwrap_or(u64::MAX), &self.serial_number)
    }
}

/// All the rows listed before one court on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseList {
    pub court_code: String,
    pub date: NaiveDate,
    pub entries: Vec<CauseListEntry>,
}

impl CauseList {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by serial number. Document order is kept in `entries`.
    pub fn in_serial_order(&self) -> Vec<&CauseListEntry> {
        let mut sorted: Vec<&CauseListEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.serial_key().cmp(&b.serial_key()));
        sorted
    }

    /// File stem unique per (court, date).
    pub fn file_stem(&self) -> String {
        format!("cause_list_{}_{}", self.court_code, self.date.format("%Y-%m-%d"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourtTier {
    Supreme,
    High,
    District,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourtDescriptor {
    pub code: &'static str,
    pub name: &'static str,
    pub tier: CourtTier,
}

const COURTS: &[CourtDescriptor] = &[
    CourtDescriptor {
        code: "01",
        name: "Supreme Court of India",
        tier: CourtTier::Supreme,
    },
    CourtDescriptor {
        code: "02",
        name: "Delhi High Court",
        tier: CourtTier::High,
    },
    CourtDescriptor {
        code: "03",
        name: "Mumbai High Court",
        tier: CourtTier::High,
    },
    CourtDescriptor {
        code: "04",
        name: "Ernakulam District Court",
        tier: CourtTier::District,
    },
    CourtDescriptor {
        code: "05",
        name: "Jaipur District Court",
        tier: CourtTier::District,
    },
];

pub fn courts() -> &'static [CourtDescriptor] {
    COURTS
}

pub fn find_court(code: &str) -> Option<&'static CourtDescriptor> {
    COURTS.iter().find(|c| c.code == code.trim())
}
