use anyhow::Context;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// IST is UTC+05:30.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Indian fiscal quarter. Q1 ends in June, Q4 ends in March.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub fn as_str(self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "Q1" => Some(Quarter::Q1),
            "Q2" => Some(Quarter::Q2),
            "Q3" => Some(Quarter::Q3),
            "Q4" => Some(Quarter::Q4),
            _ => None,
        }
    }

    /// Last day of the quarter, dated in the calendar year `year`.
    pub fn end_date(self, year: i32) -> Option<NaiveDate> {
        match self {
            Quarter::Q1 => NaiveDate::from_ymd_opt(year, 6, 30),
            Quarter::Q2 => NaiveDate::from_ymd_opt(year, 9, 30),
            Quarter::Q3 => NaiveDate::from_ymd_opt(year, 12, 31),
            Quarter::Q4 => NaiveDate::from_ymd_opt(year, 3, 31),
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub quarter: Quarter,
    pub year: i32,
}

impl ReportingPeriod {
    /// Parses `Q2-2025` (a space or `/` also works as the separator).
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        let (q, y) = s
            .split_once(['-', ' ', '/'])
            .with_context(|| format!("reporting period must look like Q2-2025 (got {s:?})"))?;
        let quarter =
            Quarter::parse(q).with_context(|| format!("unknown quarter {q:?} in {s:?}"))?;
        let year = y
            .trim()
            .parse::<i32>()
            .with_context(|| format!("invalid year {y:?} in {s:?}"))?;
        Ok(Self { quarter, year })
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.quarter, self.year)
    }
}

/// Explicit argument wins; otherwise the latest quarter that ended before today's IST date.
pub fn resolve_reporting_period(
    period_arg: Option<&str>,
    now_utc: DateTime<Utc>,
) -> anyhow::Result<ReportingPeriod> {
    if let Some(s) = period_arg {
        return ReportingPeriod::parse(s);
    }

    let ist = chrono::FixedOffset::east_opt(IST_OFFSET_SECS).context("invalid IST offset")?;
    let today = now_utc.with_timezone(&ist).date_naive();
    latest_completed_quarter(today)
}

fn latest_completed_quarter(today: NaiveDate) -> anyhow::Result<ReportingPeriod> {
    // Walk quarter ends backwards from the end of this calendar year.
    let order = [Quarter::Q3, Quarter::Q2, Quarter::Q1, Quarter::Q4];
    for year in [today.year(), today.year() - 1] {
        for quarter in order {
            let Some(end) = quarter.end_date(year) else {
                continue;
            };
            if end < today {
                return Ok(ReportingPeriod { quarter, year });
            }
        }
    }
    anyhow::bail!("no completed quarter found before {today}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn explicit_period_argument_wins() {
        let now = Utc.with_ymd_and_hms(2026, 1, 3, 8, 0, 0).unwrap();
        let p = resolve_reporting_period(Some("q4-2025"), now).unwrap();
        assert_eq!(
            p,
            ReportingPeriod {
                quarter: Quarter::Q4,
                year: 2025
            }
        );
        assert!(resolve_reporting_period(Some("2025"), now).is_err());
        assert!(resolve_reporting_period(Some("Q5-2025"), now).is_err());
    }

    #[test]
    fn picks_latest_completed_quarter() {
        let now = Utc.with_ymd_and_hms(2025, 10, 5, 6, 0, 0).unwrap();
        let p = resolve_reporting_period(None, now).unwrap();
        assert_eq!(p.to_string(), "Q2-2025");

        // January: the December quarter is Q3 of the previous calendar year.
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 6, 0, 0).unwrap();
        assert_eq!(resolve_reporting_period(None, now).unwrap().to_string(), "Q3-2025");

        let now = Utc.with_ymd_and_hms(2025, 4, 1, 6, 0, 0).unwrap();
        assert_eq!(resolve_reporting_period(None, now).unwrap().to_string(), "Q4-2025");
    }

    #[test]
    fn quarter_end_day_itself_is_not_completed() {
        // 2025-09-30 12:00 UTC = 17:30 IST, still the last day of Q2.
        let now = Utc.with_ymd_and_hms(2025, 9, 30, 12, 0, 0).unwrap();
        assert_eq!(resolve_reporting_period(None, now).unwrap().to_string(), "Q1-2025");

        // 2025-09-30 19:00 UTC = 2025-10-01 00:30 IST.
        let now = Utc.with_ymd_and_hms(2025, 9, 30, 19, 0, 0).unwrap();
        assert_eq!(resolve_reporting_period(None, now).unwrap().to_string(), "Q2-2025");
    }
}
