//! Reporting ranges and CSV export link construction.
//!
//! The backend owns all aggregation and CSV generation; this module only
//! enumerates the fixed range labels the reports endpoint accepts and shapes
//! the download link for the export endpoint.

use chrono::Utc;

/// The fixed set of report time ranges the backend accepts. The label is
/// the wire value, passed verbatim as `time_range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    OneMinute,
    FifteenMinutes,
    TwoHours,
    SixHours,
    TwelveHours,
    TwentyFourHours,
    OneWeek,
    OneMonth,
    SixMonths,
    OneYear,
}

impl TimeRange {
    pub const ALL: [TimeRange; 10] = [
        TimeRange::OneMinute,
        TimeRange::FifteenMinutes,
        TimeRange::TwoHours,
        TimeRange::SixHours,
        TimeRange::TwelveHours,
        TimeRange::TwentyFourHours,
        TimeRange::OneWeek,
        TimeRange::OneMonth,
        TimeRange::SixMonths,
        TimeRange::OneYear,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::OneMinute => "1 Minute",
            TimeRange::FifteenMinutes => "15 Minutes",
            TimeRange::TwoHours => "2 Hours",
            TimeRange::SixHours => "6 Hours",
            TimeRange::TwelveHours => "12 Hours",
            TimeRange::TwentyFourHours => "24 Hours",
            TimeRange::OneWeek => "1 Week",
            TimeRange::OneMonth => "1 Month",
            TimeRange::SixMonths => "6 Months",
            TimeRange::OneYear => "1 Year",
        }
    }

    /// Parses an operator-entered label, case-insensitively.
    pub fn parse(input: &str) -> Option<TimeRange> {
        let wanted = input.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.label().to_lowercase() == wanted)
    }
}

impl Default for TimeRange {
    /// Matches the backend's default when no range is supplied.
    fn default() -> Self {
        TimeRange::TwentyFourHours
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which verification subset a CSV export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportCategory {
    Verified,
    Rejected,
    Pending,
}

impl ExportCategory {
    /// Path segment used by the export endpoint.
    pub fn as_path(&self) -> &'static str {
        match self {
            ExportCategory::Verified => "verified",
            ExportCategory::Rejected => "rejected",
            ExportCategory::Pending => "pending",
        }
    }

    pub fn parse(input: &str) -> Option<ExportCategory> {
        match input.trim().to_lowercase().as_str() {
            "verified" => Some(ExportCategory::Verified),
            "rejected" => Some(ExportCategory::Rejected),
            "pending" => Some(ExportCategory::Pending),
            _ => None,
        }
    }

    /// Suggested local filename for a download, dated like the backend's
    /// Content-Disposition.
    pub fn suggested_filename(&self) -> String {
        format!(
            "{}_customers_{}.csv",
            self.as_path(),
            Utc::now().format("%Y%m%d")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_the_wire_values() {
        assert_eq!(TimeRange::OneMinute.label(), "1 Minute");
        assert_eq!(TimeRange::OneYear.label(), "1 Year");
        assert_eq!(TimeRange::default().label(), "24 Hours");
    }

    #[test]
    fn parse_round_trips_every_label() {
        for range in TimeRange::ALL {
            assert_eq!(TimeRange::parse(range.label()), Some(range));
            assert_eq!(TimeRange::parse(&range.label().to_uppercase()), Some(range));
        }
        assert_eq!(TimeRange::parse("fortnight"), None);
    }

    #[test]
    fn export_category_paths() {
        assert_eq!(ExportCategory::Verified.as_path(), "verified");
        assert_eq!(ExportCategory::parse("REJECTED"), Some(ExportCategory::Rejected));
        assert_eq!(ExportCategory::parse("all"), None);
    }

    #[test]
    fn suggested_filename_has_category_and_date() {
        let name = ExportCategory::Pending.suggested_filename();
        assert!(name.starts_with("pending_customers_"));
        assert!(name.ends_with(".csv"));
    }
}
