//! Outcome of a multi-item write.
//!
//! A bulk write succeeds or fails per item. [`BatchResponse`] keeps one
//! [`ItemOutcome`] per submitted item, in submission order. When the service
//! reports per-item results, a caller can tell exactly which inputs were
//! stored and why the others were rejected. When it only reports totals
//! (`{"Success":"1 metrics","Error":"1 metrics","Error Messages":[..]}`), the
//! counts and messages are kept and every item is [`ItemOutcome::Unconfirmed`].
//! Item rejections are data here, never errors.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::resource::Resource;

/// What happened to one submitted item.
#[derive(Clone, Debug, PartialEq)]
pub enum ItemOutcome<K> {
    /// Stored; the resource carries its assigned identity.
    Stored(K),
    /// Rejected by the service.
    Rejected {
        /// The item as it was submitted.
        item: K,
        /// Reason given by the service.
        message: String,
    },
    /// Submitted, but the service only reported totals for the write.
    Unconfirmed(K),
}

impl<K> ItemOutcome<K> {
    /// Returns true if the item was stored.
    pub fn is_stored(&self) -> bool {
        matches!(self, ItemOutcome::Stored(_))
    }
}

/// Aggregate result of a multi-item write.
///
/// `error_count() + success_count()` always equals the number of submitted
/// items. For a correlated response `error_messages()` lines up with the
/// rejected items in submission order; otherwise it holds the service's
/// messages as sent.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchResponse<K> {
    outcomes: Vec<ItemOutcome<K>>,
    totals: Option<Totals>,
}

/// Counts reported by a service that gave no per-item results.
#[derive(Clone, Debug, PartialEq)]
struct Totals {
    stored: usize,
    rejected: usize,
    messages: Vec<String>,
}

/// Bulk write result as sent by the service, e.g.
/// `{"Success":"1 metrics","Error":"1 metrics","Error Messages":["..."]}`,
/// optionally with `"Results":[{"id":17},{"error":"..."}]`.
#[derive(Debug, Deserialize)]
struct WireBatchResult {
    #[serde(rename = "Success", default)]
    success: Option<String>,
    #[serde(rename = "Error", default)]
    error: Option<String>,
    #[serde(rename = "Error Messages", default)]
    messages: Vec<String>,
    #[serde(rename = "Results", default)]
    results: Option<Vec<WireItemResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireItemResult {
    Stored { id: u64 },
    Rejected { error: String },
}

impl<K: Resource> BatchResponse<K> {
    /// Correlate a bulk write result with the submitted items.
    ///
    /// A result without `Results` is read from its `Success`/`Error` totals
    /// and `Error Messages`; its items come back as
    /// [`ItemOutcome::Unconfirmed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if per-item results cover a different
    /// number of items than were submitted, if the summary counts disagree
    /// with them, or if a result without per-item outcomes lacks parseable
    /// totals adding up to the submitted count.
    pub fn from_wire(submitted: Vec<K>, body: Value) -> Result<Self> {
        let wire: WireBatchResult = serde_json::from_value(body)?;
        let response = match wire.results {
            Some(results) => {
                let response = Self::correlate(submitted, results)?;
                check_summary("Success", wire.success.as_deref(), response.success_count())?;
                check_summary("Error", wire.error.as_deref(), response.error_count())?;
                response
            }
            None => {
                let totals = Totals {
                    stored: require_count("Success", wire.success.as_deref())?,
                    rejected: require_count("Error", wire.error.as_deref())?,
                    messages: wire.messages,
                };
                Self::from_totals(submitted, totals)?
            }
        };

        tracing::debug!(
            kind = %K::KIND,
            stored = response.success_count(),
            rejected = response.error_count(),
            correlated = response.is_correlated(),
            "bulk write completed"
        );
        Ok(response)
    }

    fn correlate(submitted: Vec<K>, results: Vec<WireItemResult>) -> Result<Self> {
        if results.len() != submitted.len() {
            return Err(Error::Protocol(format!(
                "bulk {} write reported {} outcomes for {} submitted items",
                K::KIND,
                results.len(),
                submitted.len()
            )));
        }

        let outcomes = submitted
            .into_iter()
            .zip(results)
            .map(|(mut item, result)| match result {
                WireItemResult::Stored { id } => {
                    item.set_id(id);
                    ItemOutcome::Stored(item)
                }
                WireItemResult::Rejected { error } => ItemOutcome::Rejected {
                    item,
                    message: error,
                },
            })
            .collect();
        Ok(Self::from_outcomes(outcomes))
    }

    fn from_totals(submitted: Vec<K>, totals: Totals) -> Result<Self> {
        if totals.stored + totals.rejected != submitted.len() {
            return Err(Error::Protocol(format!(
                "bulk {} write reported {} stored and {} rejected for {} submitted items",
                K::KIND,
                totals.stored,
                totals.rejected,
                submitted.len()
            )));
        }
        Ok(Self {
            outcomes: submitted.into_iter().map(ItemOutcome::Unconfirmed).collect(),
            totals: Some(totals),
        })
    }
}

impl<K> BatchResponse<K> {
    /// Build a response from outcomes gathered client-side.
    pub fn from_outcomes(outcomes: Vec<ItemOutcome<K>>) -> Self {
        Self {
            outcomes,
            totals: None,
        }
    }

    /// Number of rejected items.
    pub fn error_count(&self) -> usize {
        match &self.totals {
            Some(totals) => totals.rejected,
            None => self
                .outcomes
                .iter()
                .filter(|o| matches!(o, ItemOutcome::Rejected { .. }))
                .count(),
        }
    }

    /// Number of stored items.
    pub fn success_count(&self) -> usize {
        match &self.totals {
            Some(totals) => totals.stored,
            None => self.outcomes.len() - self.error_count(),
        }
    }

    /// Rejection messages: one per rejected item in submission order, or the
    /// service's messages when it only reported totals.
    pub fn error_messages(&self) -> Vec<&str> {
        if let Some(totals) = &self.totals {
            return totals.messages.iter().map(String::as_str).collect();
        }
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ItemOutcome::Rejected { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Stored items, in submission order.
    ///
    /// Empty when the service did not say which items were stored.
    pub fn stored(&self) -> impl Iterator<Item = &K> {
        self.outcomes.iter().filter_map(|o| match o {
            ItemOutcome::Stored(item) => Some(item),
            _ => None,
        })
    }

    /// Returns true if every outcome is tied to its submitted item.
    pub fn is_correlated(&self) -> bool {
        self.totals.is_none()
    }

    /// Every outcome, position-correlated with the submitted items.
    pub fn outcomes(&self) -> &[ItemOutcome<K>] {
        &self.outcomes
    }

    /// Consume the response, yielding the outcomes.
    pub fn into_outcomes(self) -> Vec<ItemOutcome<K>> {
        self.outcomes
    }

    /// Number of submitted items.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if nothing was submitted.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Returns true if every item was stored.
    pub fn is_success(&self) -> bool {
        self.error_count() == 0
    }

    /// Unwrap the outcome of a one-item write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the item was rejected and
    /// [`Error::Protocol`] if the response does not hold exactly one outcome.
    /// An unconfirmed item is returned as submitted, without an identity.
    pub fn into_single(self) -> Result<K> {
        let count = self.outcomes.len();
        let mut outcomes = self.outcomes.into_iter();
        match (outcomes.next(), count, self.totals) {
            (Some(ItemOutcome::Stored(item)), 1, _) => Ok(item),
            (Some(ItemOutcome::Rejected { message, .. }), 1, _) => Err(Error::Validation { message }),
            (Some(ItemOutcome::Unconfirmed(item)), 1, Some(totals)) => {
                if totals.rejected == 0 {
                    Ok(item)
                } else {
                    Err(Error::Validation {
                        message: totals
                            .messages
                            .into_iter()
                            .next()
                            .unwrap_or_else(|| "rejected by the service".to_string()),
                    })
                }
            }
            _ => Err(Error::Protocol(format!(
                "expected a single write outcome, got {}",
                count
            ))),
        }
    }
}

/// Counts come as `"<n> <things>"`, e.g. `"1 metrics"`.
fn parse_count(summary: &str) -> Option<usize> {
    summary.split_whitespace().next()?.parse().ok()
}

fn require_count(label: &str, summary: Option<&str>) -> Result<usize> {
    let summary = summary.ok_or_else(|| {
        Error::Protocol(format!(
            "bulk write result has neither per-item outcomes nor a '{}' summary",
            label
        ))
    })?;
    parse_count(summary).ok_or_else(|| {
        Error::Protocol(format!(
            "unparseable bulk write {} summary '{}'",
            label, summary
        ))
    })
}

fn check_summary(label: &str, summary: Option<&str>, actual: usize) -> Result<()> {
    let Some(summary) = summary else {
        return Ok(());
    };
    match parse_count(summary) {
        Some(reported) if reported == actual => Ok(()),
        Some(reported) => Err(Error::Protocol(format!(
            "bulk write summary '{}' reports {} items but per-item outcomes count {}",
            label, reported, actual
        ))),
        None => Err(Error::Protocol(format!(
            "unparseable bulk write {} summary '{}'",
            label, summary
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metric;
    use serde_json::json;

    fn metrics(n: usize) -> Vec<Metric> {
        (0..n)
            .map(|i| Metric::new("test.scope", format!("test.metric.{}", i)))
            .collect()
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("0 metrics"), Some(0));
        assert_eq!(parse_count("12 annotations"), Some(12));
        assert_eq!(parse_count("metrics"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn test_mixed_outcomes() {
        let response = BatchResponse::from_wire(
            metrics(3),
            json!({
                "Success": "2 metrics",
                "Error": "1 metrics",
                "Error Messages": ["datapoints must not be empty"],
                "Results": [{"id": 100}, {"error": "datapoints must not be empty"}, {"id": 101}]
            }),
        )
        .unwrap();

        assert_eq!(response.len(), 3);
        assert_eq!(response.error_count(), 1);
        assert_eq!(response.success_count(), 2);
        assert_eq!(response.error_messages(), vec!["datapoints must not be empty"]);
        assert_eq!(response.error_count(), response.error_messages().len());
        assert!(!response.is_success());

        let ids: Vec<_> = response.stored().map(|m| m.id).collect();
        assert_eq!(ids, vec![Some(100), Some(101)]);

        match &response.outcomes()[1] {
            ItemOutcome::Rejected { item, .. } => {
                assert_eq!(item.metric, "test.metric.1");
                assert_eq!(item.id, None);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_summary_only_result() {
        let response = BatchResponse::from_wire(
            metrics(2),
            json!({"Error Messages": ["bad metric"], "Error": "1 metrics", "Success": "1 metrics"}),
        )
        .unwrap();

        assert!(!response.is_correlated());
        assert_eq!(response.len(), 2);
        assert_eq!(response.error_count(), 1);
        assert_eq!(response.success_count(), 1);
        assert_eq!(response.error_messages(), vec!["bad metric"]);
        assert!(!response.is_success());
        assert_eq!(response.stored().count(), 0);
        assert!(
            response
                .outcomes()
                .iter()
                .all(|o| matches!(o, ItemOutcome::Unconfirmed(m) if m.id.is_none()))
        );
    }

    #[test]
    fn test_summary_only_totals_must_cover_submission() {
        let err = BatchResponse::from_wire(
            metrics(3),
            json!({"Error Messages": [], "Error": "0 metrics", "Success": "1 metrics"}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Protocol(ref msg) if msg.contains("3 submitted")));

        let err = BatchResponse::from_wire(metrics(1), json!({"Success": "1 metrics"})).unwrap_err();
        assert!(matches!(err, Error::Protocol(ref msg) if msg.contains("'Error'")));
    }

    #[test]
    fn test_summary_only_single() {
        let stored = BatchResponse::from_wire(
            metrics(1),
            json!({"Error Messages": [], "Error": "0 metrics", "Success": "1 metrics"}),
        )
        .unwrap();
        assert_eq!(stored.into_single().unwrap().metric, "test.metric.0");

        let rejected = BatchResponse::from_wire(
            metrics(1),
            json!({"Error Messages": ["no datapoints"], "Error": "1 metrics", "Success": "0 metrics"}),
        )
        .unwrap();
        assert!(matches!(
            rejected.into_single(),
            Err(Error::Validation { ref message }) if message == "no datapoints"
        ));
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let err = BatchResponse::from_wire(metrics(2), json!({"Results": [{"id": 1}]})).unwrap_err();
        assert!(matches!(err, Error::Protocol(ref msg) if msg.contains("1 outcomes for 2")));
    }

    #[test]
    fn test_summary_mismatch_is_rejected() {
        let err = BatchResponse::from_wire(
            metrics(1),
            json!({"Error": "1 metrics", "Success": "0 metrics", "Results": [{"id": 1}]}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_into_single() {
        let stored = BatchResponse::from_wire(metrics(1), json!({"Results": [{"id": 5}]})).unwrap();
        assert_eq!(stored.into_single().unwrap().id, Some(5));

        let rejected =
            BatchResponse::from_wire(metrics(1), json!({"Results": [{"error": "bad scope"}]})).unwrap();
        let err = rejected.into_single().unwrap_err();
        assert!(matches!(err, Error::Validation { ref message } if message == "bad scope"));

        let empty: BatchResponse<Metric> = BatchResponse::from_outcomes(Vec::new());
        assert!(empty.is_empty());
        assert!(matches!(empty.into_single(), Err(Error::Protocol(_))));
    }
}
