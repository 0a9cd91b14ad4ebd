//! Filter fields, committed filter sets and the in-progress filter draft
//!
//! A [`FilterSet`] only ever contains *active* constraints: blank text and the
//! default status (`"all"`) are normalised away on insert, so "every field is
//! unset" is simply an empty map.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Status value meaning "no status constraint"
pub const DEFAULT_STATUS: &str = "all";

/// Named filter field
///
/// Covers the shared constraints (search, status, date range, channel) and the
/// resource-specific ids used by the activity log view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterField {
    /// Free-text search
    Search,
    /// Status enum (`"all"` means unset)
    Status,
    /// Inclusive lower date bound
    StartDate,
    /// Inclusive upper date bound
    EndDate,
    /// Registration channel
    Channel,
    /// Activity log type
    LogType,
    /// CRM contact id
    ContactId,
    /// CRM lead id
    LeadId,
    /// Operator/user display name
    UserName,
    /// Tenant client id
    ClientId,
    /// Origin of a log entry
    SourceName,
    /// Who performed a change (`bot`, `manual`, `system`)
    ChangedBy,
}

impl FilterField {
    /// Every field, in canonical order
    pub const ALL: [Self; 12] = [
        Self::Search,
        Self::Status,
        Self::StartDate,
        Self::EndDate,
        Self::Channel,
        Self::LogType,
        Self::ContactId,
        Self::LeadId,
        Self::UserName,
        Self::ClientId,
        Self::SourceName,
        Self::ChangedBy,
    ];

    /// Wire name used in query strings
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Status => "status",
            Self::StartDate => "startDate",
            Self::EndDate => "endDate",
            Self::Channel => "channel",
            Self::LogType => "logType",
            Self::ContactId => "contactId",
            Self::LeadId => "leadId",
            Self::UserName => "userName",
            Self::ClientId => "clientId",
            Self::SourceName => "sourceName",
            Self::ChangedBy => "changedBy",
        }
    }

    /// Whether the field holds a date bound
    #[inline]
    #[must_use]
    pub const fn is_date(self) -> bool {
        matches!(self, Self::StartDate | Self::EndDate)
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown filter field name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter field: '{0}'")]
pub struct UnknownFilterField(pub String);

impl FromStr for FilterField {
    type Err = UnknownFilterField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFilterField(s.to_string()))
    }
}

/// Value of one filter field
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterValue {
    /// Free text or enum value
    Text(String),
    /// Point in time (date range bounds)
    Instant(DateTime<Utc>),
}

impl FilterValue {
    /// Interpret raw operator input for `field`
    ///
    /// Date fields accept RFC 3339 timestamps or plain `YYYY-MM-DD` dates; a
    /// plain start date means the start of that day, a plain end date the last
    /// millisecond of it. Anything unparseable stays text and is passed through
    /// to the server untouched.
    #[must_use]
    pub fn parse(field: FilterField, raw: &str) -> Self {
        if field.is_date() {
            if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
                return Self::Instant(ts.with_timezone(&Utc));
            }
            if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                let time = if field == FilterField::EndDate {
                    NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
                } else {
                    Some(NaiveTime::MIN)
                };
                if let Some(time) = time {
                    return Self::Instant(Utc.from_utc_datetime(&day.and_time(time)));
                }
            }
        }
        Self::Text(raw.to_string())
    }

    /// Render for a query string (dates as RFC 3339 UTC, millisecond precision)
    #[must_use]
    pub fn to_query_value(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Instant(ts) => ts.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Text content, if any
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Instant(_) => None,
        }
    }

    /// Whether this value constrains nothing for `field`
    fn is_inert(&self, field: FilterField) -> bool {
        match self {
            Self::Text(text) => {
                text.trim().is_empty()
                    || (field == FilterField::Status && text.eq_ignore_ascii_case(DEFAULT_STATUS))
            }
            Self::Instant(_) => false,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Instant(value)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_value())
    }
}

/// Date range view over a filter set; either bound may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    /// Lower bound
    pub start: Option<DateTime<Utc>>,
    /// Upper bound
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Both bounds set and start after end
    ///
    /// The engine does not correct this; it only reports it.
    #[inline]
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start > end)
    }
}

/// Committed set of active constraints
///
/// Two sets are equal iff every field is equal; ordering is canonical so the
/// set hashes stably for query keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilterSet {
    fields: BTreeMap<FilterField, FilterValue>,
}

impl FilterSet {
    /// Empty (unconstrained) set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, field: FilterField, value: impl Into<FilterValue>) -> Self {
        self.set(field, Some(value.into()));
        self
    }

    /// Set or unset a field; returns whether the set changed
    pub fn set(&mut self, field: FilterField, value: Option<FilterValue>) -> bool {
        match value.filter(|v| !v.is_inert(field)) {
            Some(value) => self.fields.insert(field, value.clone()).as_ref() != Some(&value),
            None => self.fields.remove(&field).is_some(),
        }
    }

    /// Value of a field
    #[inline]
    #[must_use]
    pub fn get(&self, field: FilterField) -> Option<&FilterValue> {
        self.fields.get(&field)
    }

    /// Whether the field is constrained
    #[inline]
    #[must_use]
    pub fn contains(&self, field: FilterField) -> bool {
        self.fields.contains_key(&field)
    }

    /// No active constraint at all
    #[inline]
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of active constraints
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Same as [`is_unconstrained`](Self::is_unconstrained)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Active constraints in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (FilterField, &FilterValue)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    /// Date bounds, if set as instants
    #[must_use]
    pub fn date_range(&self) -> DateRange {
        let instant = |field| match self.fields.get(&field) {
            Some(FilterValue::Instant(ts)) => Some(*ts),
            _ => None,
        };
        DateRange {
            start: instant(FilterField::StartDate),
            end: instant(FilterField::EndDate),
        }
    }
}

impl FromIterator<(FilterField, FilterValue)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (FilterField, FilterValue)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (field, value) in iter {
            set.set(field, Some(value));
        }
        set
    }
}

/// In-progress filter values typed by the operator
///
/// Edits land here immediately; the committed [`FilterSet`] only changes when
/// a debounced or explicit commit takes a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDraft {
    values: FilterSet,
}

impl FilterDraft {
    /// Empty draft
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit; `None` (or blank text) clears the field
    pub fn set(&mut self, field: FilterField, value: Option<FilterValue>) -> bool {
        self.values.set(field, value)
    }

    /// Current value of a field
    #[inline]
    #[must_use]
    pub fn get(&self, field: FilterField) -> Option<&FilterValue> {
        self.values.get(field)
    }

    /// Copy of the full draft, ready to commit
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> FilterSet {
        self.values.clone()
    }

    /// Drop every in-progress value
    #[inline]
    pub fn clear(&mut self) {
        self.values = FilterSet::new();
    }

    /// Whether the draft differs from `committed`
    #[inline]
    #[must_use]
    pub fn differs_from(&self, committed: &FilterSet) -> bool {
        &self.values != committed
    }
}
