//! Testing utilities for the opsdeck workspace
//!
//! A scripted in-memory page source plus fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use opsdeck_query::{
    FetchError, FilterField, FilterSet, Page, PageRequest, PageSource, Record, RecordId,
    SortDirection, SortSpec, DEFAULT_STATUS,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    pub id: String,
    pub label: String,
    pub status: String,
    pub amount: u64,
}

impl Record for TestRecord {
    fn record_id(&self) -> RecordId {
        RecordId::new(self.id.clone())
    }
}

/// Summary block computed over the whole matching set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestStats {
    pub matching: u64,
    pub amount_sum: u64,
    /// 1-based sequence number of the response that carried this block
    pub served: u64,
}

/// One recorded call to the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub filters: FilterSet,
    pub sort: SortSpec,
    pub request: PageRequest,
}

impl FetchCall {
    pub fn search(&self) -> Option<&str> {
        self.filters
            .get(FilterField::Search)
            .and_then(|value| value.as_text())
    }
}

#[derive(Debug, Default)]
struct Script {
    calls: Vec<FetchCall>,
    served: u64,
    delay: Duration,
    page_delays: HashMap<u32, Duration>,
    search_delays: HashMap<String, Duration>,
    failures: VecDeque<FetchError>,
    page_failures: HashMap<u32, FetchError>,
}

/// In-memory page source with scriptable latency and failures
///
/// Filtering: `search` matches labels case-insensitively, `status` matches
/// exactly unless it is the default; other fields are accepted and ignored.
/// Descending sort keeps dataset order, ascending reverses it.
#[derive(Debug)]
pub struct ScriptedSource {
    records: Vec<TestRecord>,
    unsupported: Vec<FilterField>,
    script: Mutex<Script>,
}

impl ScriptedSource {
    pub fn new(records: Vec<TestRecord>) -> Self {
        Self {
            records,
            unsupported: Vec::new(),
            script: Mutex::new(Script::default()),
        }
    }

    /// Declare `field` unsupported, like a resource without that query param
    pub fn without_filter(mut self, field: FilterField) -> Self {
        self.unsupported.push(field);
        self
    }

    /// Latency applied to every response
    pub fn with_delay(self, delay: Duration) -> Self {
        self.script.lock().delay = delay;
        self
    }

    /// Latency for one page number (overrides the default)
    pub fn delay_page(&self, page: u32, delay: Duration) {
        self.script.lock().page_delays.insert(page, delay);
    }

    /// Latency for requests whose search term is exactly `search`
    pub fn delay_search(&self, search: &str, delay: Duration) {
        self.script
            .lock()
            .search_delays
            .insert(search.to_string(), delay);
    }

    /// Fail the next call with `error`
    pub fn fail_next(&self, error: FetchError) {
        self.script.lock().failures.push_back(error);
    }

    /// Fail the next call for `page` with `error`
    pub fn fail_page(&self, page: u32, error: FetchError) {
        self.script.lock().page_failures.insert(page, error);
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.script.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.script.lock().calls.len()
    }

    pub fn reset_calls(&self) {
        self.script.lock().calls.clear();
    }

    pub fn matching(&self, filters: &FilterSet, sort: &SortSpec) -> Vec<TestRecord> {
        let search = filters
            .get(FilterField::Search)
            .and_then(|value| value.as_text())
            .map(str::to_lowercase);
        let status = filters
            .get(FilterField::Status)
            .and_then(|value| value.as_text())
            .filter(|status| *status != DEFAULT_STATUS);

        let mut matching: Vec<TestRecord> = self
            .records
            .iter()
            .filter(|record| {
                search
                    .as_deref()
                    .map_or(true, |term| record.label.to_lowercase().contains(term))
            })
            .filter(|record| status.map_or(true, |status| record.status == status))
            .cloned()
            .collect();

        if sort.direction == SortDirection::Ascending {
            matching.reverse();
        }
        matching
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    type Record = TestRecord;
    type Stats = TestStats;

    fn name(&self) -> &str {
        "scripted"
    }

    fn supports(&self, field: FilterField) -> bool {
        !self.unsupported.contains(&field)
    }

    async fn fetch_page(
        &self,
        filters: &FilterSet,
        sort: &SortSpec,
        request: PageRequest,
    ) -> Result<Page<TestRecord, TestStats>, FetchError> {
        let page_number = request.page_number();
        let (delay, failure) = {
            let mut script = self.script.lock();
            script.calls.push(FetchCall {
                filters: filters.clone(),
                sort: sort.clone(),
                request,
            });

            let search_delay = filters
                .get(FilterField::Search)
                .and_then(|value| value.as_text())
                .and_then(|term| script.search_delays.get(term).copied());
            let delay = search_delay
                .or_else(|| script.page_delays.get(&page_number).copied())
                .unwrap_or(script.delay);

            let failure = script
                .failures
                .pop_front()
                .or_else(|| script.page_failures.remove(&page_number));
            (delay, failure)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = failure {
            return Err(error);
        }

        let matching = self.matching(filters, sort);
        let total = matching.len() as u64;
        let amount_sum = matching.iter().map(|record| record.amount).sum();
        let start = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let records: Vec<TestRecord> = matching
            .into_iter()
            .skip(start)
            .take(request.limit() as usize)
            .collect();
        let has_next = (start + records.len()) < total as usize;

        let served = {
            let mut script = self.script.lock();
            script.served += 1;
            script.served
        };

        Ok(Page::new(
            records,
            total,
            has_next,
            TestStats {
                matching: total,
                amount_sum,
                served,
            },
        ))
    }
}

/// `count` records `r0..`, labelled "record N", alternating pending/processed
pub fn records(count: usize) -> Vec<TestRecord> {
    (0..count)
        .map(|i| TestRecord {
            id: format!("r{i}"),
            label: format!("record {i}"),
            status: if i % 2 == 0 { "pending" } else { "processed" }.to_string(),
            amount: (i as u64 + 1) * 100,
        })
        .collect()
}

/// Records labelled after `labels`, ids `r0..`
pub fn labelled(labels: &[&str]) -> Vec<TestRecord> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| TestRecord {
            id: format!("r{i}"),
            label: (*label).to_string(),
            status: "pending".to_string(),
            amount: 100,
        })
        .collect()
}

pub fn ids(raw: &[&str]) -> Vec<RecordId> {
    raw.iter().map(|id| RecordId::from(*id)).collect()
}
