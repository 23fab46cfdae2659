use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::{ExportError, ExportResult};
use crate::utils::time::parse_filter_datetime;

/// A validated date boundary. Keeps the caller's text for artifact naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDate {
    raw: String,
    value: PrimitiveDateTime,
}

impl FilterDate {
    pub fn parse(raw: &str) -> ExportResult<Self> {
        let value = parse_filter_datetime(raw)
            .map_err(|error| ExportError::invalid_filter(format!("{error:#}")))?;
        Ok(Self {
            raw: raw.trim().to_string(),
            value,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn value(&self) -> PrimitiveDateTime {
        self.value
    }

    /// Naive boundaries are UTC, matching stored event timestamps.
    #[must_use]
    pub fn instant(&self) -> OffsetDateTime {
        self.value.assume_utc()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpecification {
    resource_ids: Vec<String>,
    start_date: Option<FilterDate>,
    end_date: Option<FilterDate>,
    include_bot_messages: bool,
    include_lifecycle_start: bool,
}

impl FilterSpecification {
    /// Resource ids are trimmed, validated and deduplicated keeping first-seen order.
    pub fn new<I, S>(resource_ids: I) -> ExportResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let resource_ids = dedupe_preserving_order(resource_ids);
        if resource_ids.is_empty() {
            return Err(ExportError::invalid_filter(
                "at least one resource id is required",
            ));
        }
        for resource_id in &resource_ids {
            validate_resource_id(resource_id)?;
        }

        Ok(Self {
            resource_ids,
            start_date: None,
            end_date: None,
            include_bot_messages: false,
            include_lifecycle_start: false,
        })
    }

    pub fn with_date_range(
        mut self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> ExportResult<Self> {
        self.start_date = start_date.map(FilterDate::parse).transpose()?;
        self.end_date = end_date.map(FilterDate::parse).transpose()?;

        if let (Some(start), Some(end)) = (&self.start_date, &self.end_date)
            && start.value() > end.value()
        {
            return Err(ExportError::invalid_filter(format!(
                "start_date {} is after end_date {}",
                start.as_str(),
                end.as_str()
            )));
        }
        Ok(self)
    }

    #[must_use]
    pub fn with_bot_messages(mut self, include: bool) -> Self {
        self.include_bot_messages = include;
        self
    }

    #[must_use]
    pub fn with_lifecycle_start(mut self, include: bool) -> Self {
        self.include_lifecycle_start = include;
        self
    }

    #[must_use]
    pub fn resource_ids(&self) -> &[String] {
        &self.resource_ids
    }

    #[must_use]
    pub fn start_date(&self) -> Option<&FilterDate> {
        self.start_date.as_ref()
    }

    #[must_use]
    pub fn end_date(&self) -> Option<&FilterDate> {
        self.end_date.as_ref()
    }

    /// Closed `[start_date, end_date]` check on a parsed event timestamp.
    #[must_use]
    pub fn contains_instant(&self, timestamp: OffsetDateTime) -> bool {
        let after_start = self
            .start_date
            .as_ref()
            .is_none_or(|start| timestamp >= start.instant());
        let before_end = self
            .end_date
            .as_ref()
            .is_none_or(|end| timestamp <= end.instant());
        after_start && before_end
    }

    #[must_use]
    pub fn include_bot_messages(&self) -> bool {
        self.include_bot_messages
    }

    #[must_use]
    pub fn include_lifecycle_start(&self) -> bool {
        self.include_lifecycle_start
    }
}

/// Drops blanks and repeats, keeping the first occurrence of each id.
#[must_use]
pub fn dedupe_preserving_order<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(|value| value.as_ref().trim().to_string())
        .filter(|value| !value.is_empty())
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

fn validate_resource_id(resource_id: &str) -> ExportResult<()> {
    if resource_id == "." || resource_id == ".." || !resource_id_regex().is_match(resource_id) {
        return Err(ExportError::invalid_filter(format!(
            "resource id `{resource_id}` contains unsupported characters"
        )));
    }
    Ok(())
}

fn resource_id_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._:@+\-]+$").expect("resource id regex should compile")
    })
}

#[cfg(test)]
mod tests {
    use super::{FilterSpecification, dedupe_preserving_order};
    use crate::error::ExportError;
    use time::macros::datetime;

    #[test]
    fn dedupes_resource_ids_in_caller_order() {
        let ids = dedupe_preserving_order(["b", "a", " b ", "", "c", "a"]);
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn rejects_empty_resource_ids() {
        let err = FilterSpecification::new(Vec::<String>::new())
            .expect_err("empty ids should be rejected");
        assert!(matches!(err, ExportError::InvalidFilter(_)));
    }

    #[test]
    fn rejects_path_like_resource_ids() {
        for bad in ["../etc", "a/b", "..", "a b"] {
            let err = FilterSpecification::new([bad]).expect_err("unsafe id should be rejected");
            assert!(
                err.to_string().contains("unsupported characters"),
                "unexpected error for {bad}: {err}"
            );
        }
    }

    #[test]
    fn keeps_caller_text_and_utc_boundaries() {
        let filters = FilterSpecification::new(["r1"])
            .and_then(|filters| filters.with_date_range(Some("2024-01-01"), Some("2024-01-31 23:59:59")))
            .expect("filters should build");

        let start = filters.start_date().expect("start date should be set");
        let end = filters.end_date().expect("end date should be set");
        assert_eq!(start.as_str(), "2024-01-01");
        assert_eq!(start.instant(), datetime!(2024-01-01 0:00 UTC));
        assert_eq!(end.instant(), datetime!(2024-01-31 23:59:59 UTC));
    }

    #[test]
    fn window_is_closed_on_both_ends() {
        let filters = FilterSpecification::new(["r1"])
            .and_then(|filters| {
                filters.with_date_range(Some("2024-01-01 09:00:00"), Some("2024-01-01T11:00:00"))
            })
            .expect("filters should build");

        assert!(filters.contains_instant(datetime!(2024-01-01 9:00 UTC)));
        assert!(filters.contains_instant(datetime!(2024-01-01 11:00 UTC)));
        assert!(filters.contains_instant(datetime!(2024-01-01 12:00 +02:00)));
        assert!(!filters.contains_instant(datetime!(2024-01-01 8:59:59 UTC)));
        assert!(!filters.contains_instant(datetime!(2024-01-01 11:00:01 UTC)));

        let open = FilterSpecification::new(["r1"]).expect("filters should build");
        assert!(open.contains_instant(datetime!(1999-12-31 23:59 UTC)));
    }

    #[test]
    fn rejects_inverted_date_range() {
        let err = FilterSpecification::new(["r1"])
            .and_then(|filters| filters.with_date_range(Some("2024-02-01"), Some("2024-01-01")))
            .expect_err("inverted range should fail");
        assert!(err.to_string().contains("is after end_date"));
    }

    #[test]
    fn rejects_malformed_dates() {
        let err = FilterSpecification::new(["r1"])
            .and_then(|filters| filters.with_date_range(Some("last week"), None))
            .expect_err("malformed date should fail");
        assert!(matches!(err, ExportError::InvalidFilter(_)));
    }
}
