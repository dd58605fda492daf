//! Lazy accumulation of conditions against one driver.
//!
//! A [`QueryBuilder`] collects [`Condition`]s and pagination options but
//! touches the driver only when execution is requested: `get()`, `count()`
//! and `paginate()` reduce the conditions left-to-right through the
//! driver's `add_condition_to_query` and then execute. Condition order is
//! preserved — occurrence grouping is sensitive to it.

use std::sync::Arc;

use crate::condition::{Condition, FieldSelector};
use crate::document::Record;
use crate::driver::{Driver, NativeQuery, QueryOptions};

/// Accumulates conditions and options against exactly one driver.
///
/// # Examples
///
/// ```no_run
/// use sagitta::config::SearchConfig;
/// use sagitta::search::Search;
///
/// # fn example() -> sagitta::error::Result<()> {
/// let search = Search::new(SearchConfig::default());
/// let records = search.query()?.query_field("title", "shoes").limit(5).get();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    driver: Arc<dyn Driver>,
    conditions: Vec<Condition>,
    limit: Option<usize>,
    offset: Option<usize>,
    columns: Option<Vec<String>>,
}

impl QueryBuilder {
    /// Create an empty builder over the given driver.
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        QueryBuilder {
            driver,
            conditions: Vec::new(),
            limit: None,
            offset: None,
            columns: None,
        }
    }

    /// Append a condition.
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Append a relevance match against all fields.
    pub fn query<V: AsRef<str>>(self, value: V) -> Self {
        self.condition(Condition::all(value))
    }

    /// Append a relevance match against specific field(s).
    pub fn query_field<F: Into<FieldSelector>, V: AsRef<str>>(self, field: F, value: V) -> Self {
        self.condition(Condition::new(field, value))
    }

    /// Append an exact filter on a field.
    pub fn filter<F: Into<FieldSelector>, V: AsRef<str>>(self, field: F, value: V) -> Self {
        self.condition(Condition::new(field, value).filter())
    }

    /// Restrict the fields returned with each record.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Maximum number of records to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Number of records to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The accumulated conditions, in call order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Reduce the conditions into the driver-native query.
    pub fn build(&self) -> NativeQuery {
        self.conditions
            .iter()
            .fold(self.driver.new_query(), |query, condition| {
                self.driver.add_condition_to_query(query, condition)
            })
    }

    fn options(&self) -> QueryOptions {
        QueryOptions {
            limit: self.limit,
            offset: self.offset,
            columns: self.columns.clone(),
        }
    }

    /// Execute and return the matching records.
    pub fn get(&self) -> Vec<Record> {
        self.driver.run_query(&self.build(), &self.options())
    }

    /// Execute and return the total number of matching records.
    pub fn count(&self) -> u64 {
        self.driver.run_count(&self.build())
    }

    /// Fetch one page (1-based) of `per_page` records plus the total.
    ///
    /// The total is answered from the count cache populated by the page
    /// query itself, so no second backend round-trip is made.
    pub fn paginate(&self, page: usize, per_page: usize) -> (Vec<Record>, u64) {
        let query = self.build();
        let options = QueryOptions {
            limit: Some(per_page),
            offset: Some(page.saturating_sub(1) * per_page),
            columns: self.columns.clone(),
        };

        let records = self.driver.run_query(&query, &options);
        let total = self.driver.run_count(&query);
        (records, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Driver double that records every call it receives.
    #[derive(Debug, Default)]
    struct RecordingDriver {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingDriver {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn log(&self, call: impl Into<String>) {
            self.calls.lock().push(call.into());
        }
    }

    impl Driver for RecordingDriver {
        fn name(&self) -> &str {
            "recording"
        }

        fn create_index(&self, _fields: &[String]) -> Result<bool> {
            Ok(true)
        }

        fn new_query(&self) -> NativeQuery {
            self.log("new_query");
            json!({"values": []})
        }

        fn add_condition_to_query(
            &self,
            mut query: NativeQuery,
            condition: &Condition,
        ) -> NativeQuery {
            self.log(format!("add:{}", condition.value));
            query["values"]
                .as_array_mut()
                .unwrap()
                .push(json!(condition.value));
            query
        }

        fn run_query(&self, query: &NativeQuery, options: &QueryOptions) -> Vec<Record> {
            self.log(format!(
                "run_query:{}:{}:{}",
                query["values"],
                options.limit_or_default(),
                options.offset_or_default()
            ));
            Vec::new()
        }

        fn run_count(&self, query: &NativeQuery) -> u64 {
            self.log(format!("run_count:{}", query["values"]));
            7
        }

        fn insert(&self, _document: &crate::document::Document) -> Result<bool> {
            Ok(true)
        }

        fn delete(&self, _id: &str) -> Result<bool> {
            Ok(true)
        }

        fn delete_index(&self) -> Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_building_is_lazy() {
        let driver = Arc::new(RecordingDriver::default());
        let builder = QueryBuilder::new(driver.clone())
            .query("red")
            .query_field("title", "shoes");

        // Nothing touches the driver until execution.
        assert!(driver.calls().is_empty());

        builder.get();
        assert!(!driver.calls().is_empty());
    }

    #[test]
    fn test_conditions_fold_in_call_order() {
        let driver = Arc::new(RecordingDriver::default());
        QueryBuilder::new(driver.clone())
            .query("first")
            .query("second")
            .query("third")
            .get();

        let calls = driver.calls();
        assert_eq!(calls[0], "new_query");
        assert_eq!(calls[1], "add:first");
        assert_eq!(calls[2], "add:second");
        assert_eq!(calls[3], "add:third");
        assert!(calls[4].starts_with("run_query:[\"first\",\"second\",\"third\"]"));
    }

    #[test]
    fn test_options_reach_the_driver() {
        let driver = Arc::new(RecordingDriver::default());
        QueryBuilder::new(driver.clone())
            .query("shoes")
            .limit(5)
            .offset(10)
            .get();

        let calls = driver.calls();
        assert!(calls.last().unwrap().ends_with(":5:10"));
    }

    #[test]
    fn test_paginate_runs_query_then_count_on_same_query() {
        let driver = Arc::new(RecordingDriver::default());
        let (records, total) = QueryBuilder::new(driver.clone())
            .query("shoes")
            .paginate(3, 20);

        assert!(records.is_empty());
        assert_eq!(total, 7);

        let calls = driver.calls();
        // Page 3 of 20 → offset 40.
        assert!(calls.iter().any(|c| c.ends_with(":20:40")));
        assert_eq!(calls.last().unwrap(), "run_count:[\"shoes\"]");
    }

    #[test]
    fn test_filter_builds_filter_condition() {
        let driver = Arc::new(RecordingDriver::default());
        let builder = QueryBuilder::new(driver).filter("color", "red");

        assert!(builder.conditions()[0].filter);
    }
}
