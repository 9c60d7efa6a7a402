//! Metric and annotation query expressions.
//!
//! The query endpoints identify a series by a compact colon-separated
//! expression, e.g. `-1d:-0d:test.scope:test.metric{host=a}:sum:test.namespace`.
//! The builders here produce that string deterministically: tag filters are
//! kept sorted by key, so two queries with the same contents always render the
//! same expression.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Start or end of a query window.
///
/// Relative expressions such as `-1d` or `-30m` are evaluated by the service
/// and passed through untouched.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimeSpec {
    /// Milliseconds since the Unix epoch.
    Absolute(i64),
    /// Offset expression relative to "now", e.g. `-1d`.
    Relative(String),
}

impl TimeSpec {
    /// Absolute time spec for a UTC timestamp.
    pub fn at(time: DateTime<Utc>) -> Self {
        TimeSpec::Absolute(time.timestamp_millis())
    }

    /// Relative time spec.
    pub fn relative(expr: impl Into<String>) -> Self {
        TimeSpec::Relative(expr.into())
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSpec::Absolute(ms) => write!(f, "{}", ms),
            TimeSpec::Relative(expr) => write!(f, "{}", expr),
        }
    }
}

impl From<i64> for TimeSpec {
    fn from(ms: i64) -> Self {
        TimeSpec::Absolute(ms)
    }
}

impl From<&str> for TimeSpec {
    fn from(expr: &str) -> Self {
        TimeSpec::Relative(expr.to_string())
    }
}

impl From<String> for TimeSpec {
    fn from(expr: String) -> Self {
        TimeSpec::Relative(expr)
    }
}

impl From<DateTime<Utc>> for TimeSpec {
    fn from(time: DateTime<Utc>) -> Self {
        TimeSpec::at(time)
    }
}

/// `scope:metric{k=v,...}` part shared by both query kinds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SeriesSelector {
    scope: String,
    metric: String,
    tags: BTreeMap<String, String>,
}

impl fmt::Display for SeriesSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.metric)?;
        if !self.tags.is_empty() {
            let tags: Vec<String> = self
                .tags
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "{{{}}}", tags.join(","))?;
        }
        Ok(())
    }
}

/// Time window shared by both query kinds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
struct TimeWindow {
    start: Option<TimeSpec>,
    end: Option<TimeSpec>,
}

impl TimeWindow {
    fn validate(&self) -> Result<()> {
        if self.start.is_none() && self.end.is_none() {
            return Err(Error::InvalidQuery(
                "one of start or end time must be given".to_string(),
            ));
        }
        Ok(())
    }

    fn write_prefix(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for spec in [&self.start, &self.end].into_iter().flatten() {
            write!(f, "{}:", spec)?;
        }
        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidQuery(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// A metric query, rendered as
/// `[start:][end:]scope:metric[{tags}]:aggregator[:downsampler][:namespace]`.
///
/// # Example
///
/// ```ignore
/// use argus_client::MetricQuery;
///
/// let query = MetricQuery::builder("test.scope", "test.metric", "sum")
///     .tag("test.tag", "test.value")
///     .namespace("test.namespace")
///     .start("-1d")
///     .end("-0d")
///     .build()?;
///
/// assert_eq!(
///     query.to_string(),
///     "-1d:-0d:test.scope:test.metric{test.tag=test.value}:sum:test.namespace"
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MetricQuery {
    window: TimeWindow,
    selector: SeriesSelector,
    aggregator: String,
    downsampler: Option<String>,
    namespace: Option<String>,
}

impl MetricQuery {
    /// Start building a metric query.
    pub fn builder(
        scope: impl Into<String>,
        metric: impl Into<String>,
        aggregator: impl Into<String>,
    ) -> MetricQueryBuilder {
        MetricQueryBuilder {
            query: MetricQuery {
                window: TimeWindow::default(),
                selector: SeriesSelector {
                    scope: scope.into(),
                    metric: metric.into(),
                    tags: BTreeMap::new(),
                },
                aggregator: aggregator.into(),
                downsampler: None,
                namespace: None,
            },
        }
    }

    /// Scope of the queried series.
    pub fn scope(&self) -> &str {
        &self.selector.scope
    }

    /// Metric name of the queried series.
    pub fn metric(&self) -> &str {
        &self.selector.metric
    }

    /// Aggregator applied across series.
    pub fn aggregator(&self) -> &str {
        &self.aggregator
    }

    /// Tag filters, ordered by key.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.selector.tags
    }

    /// Namespace, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The wire expression.
    pub fn expression(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MetricQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.window.write_prefix(f)?;
        write!(f, "{}:{}", self.selector, self.aggregator)?;
        if let Some(downsampler) = &self.downsampler {
            write!(f, ":{}", downsampler)?;
        }
        if let Some(namespace) = &self.namespace {
            write!(f, ":{}", namespace)?;
        }
        Ok(())
    }
}

/// Builder for [`MetricQuery`].
#[derive(Clone, Debug)]
pub struct MetricQueryBuilder {
    query: MetricQuery,
}

impl MetricQueryBuilder {
    /// Adds a tag filter. A repeated key replaces the earlier value.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.selector.tags.insert(key.into(), value.into());
        self
    }

    /// Adds several tag filters.
    #[must_use]
    pub fn tags<K, V>(mut self, tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .selector
            .tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets the namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.query.namespace = Some(namespace.into());
        self
    }

    /// Sets the downsampler, e.g. `1h-avg`.
    #[must_use]
    pub fn downsampler(mut self, downsampler: impl Into<String>) -> Self {
        self.query.downsampler = Some(downsampler.into());
        self
    }

    /// Sets the start of the window.
    #[must_use]
    pub fn start(mut self, spec: impl Into<TimeSpec>) -> Self {
        self.query.window.start = Some(spec.into());
        self
    }

    /// Sets the end of the window.
    #[must_use]
    pub fn end(mut self, spec: impl Into<TimeSpec>) -> Self {
        self.query.window.end = Some(spec.into());
        self
    }

    /// Finish the query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] if neither start nor end is set, or if
    /// scope, metric or aggregator is empty.
    pub fn build(self) -> Result<MetricQuery> {
        let query = self.query;
        require("scope", &query.selector.scope)?;
        require("metric", &query.selector.metric)?;
        require("aggregator", &query.aggregator)?;
        query.window.validate()?;
        Ok(query)
    }
}

/// An annotation query, rendered as `[start:][end:]scope:metric[{tags}]:source`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnnotationQuery {
    window: TimeWindow,
    selector: SeriesSelector,
    source: String,
}

impl AnnotationQuery {
    /// Start building an annotation query.
    pub fn builder(
        scope: impl Into<String>,
        metric: impl Into<String>,
        source: impl Into<String>,
    ) -> AnnotationQueryBuilder {
        AnnotationQueryBuilder {
            query: AnnotationQuery {
                window: TimeWindow::default(),
                selector: SeriesSelector {
                    scope: scope.into(),
                    metric: metric.into(),
                    tags: BTreeMap::new(),
                },
                source: source.into(),
            },
        }
    }

    /// Source of the annotations.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Tag filters, ordered by key.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.selector.tags
    }

    /// The wire expression.
    pub fn expression(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AnnotationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.window.write_prefix(f)?;
        write!(f, "{}:{}", self.selector, self.source)
    }
}

/// Builder for [`AnnotationQuery`].
#[derive(Clone, Debug)]
pub struct AnnotationQueryBuilder {
    query: AnnotationQuery,
}

impl AnnotationQueryBuilder {
    /// Adds a tag filter. A repeated key replaces the earlier value.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.selector.tags.insert(key.into(), value.into());
        self
    }

    /// Sets the start of the window.
    #[must_use]
    pub fn start(mut self, spec: impl Into<TimeSpec>) -> Self {
        self.query.window.start = Some(spec.into());
        self
    }

    /// Sets the end of the window.
    #[must_use]
    pub fn end(mut self, spec: impl Into<TimeSpec>) -> Self {
        self.query.window.end = Some(spec.into());
        self
    }

    /// Finish the query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] if neither start nor end is set, or if
    /// scope, metric or source is empty.
    pub fn build(self) -> Result<AnnotationQuery> {
        let query = self.query;
        require("scope", &query.selector.scope)?;
        require("metric", &query.selector.metric)?;
        require("source", &query.source)?;
        query.window.validate()?;
        Ok(query)
    }
}
