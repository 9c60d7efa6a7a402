//! Resource types as they appear on the wire.
//!
//! Field names follow the service's camelCase JSON. Every resource keeps its
//! server-assigned `id` as `Option<u64>` and its creator/modifier stamps in
//! [`Audit`].

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::resource::{Resource, ResourceKind, sealed};
use crate::session::Session;
use crate::transport::Transport;

/// Creator and modifier stamps maintained by the service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Audit {
    /// Id of the user that created the resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_id: Option<u64>,
    /// Creation time, epoch millis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<i64>,
    /// Id of the user that last modified the resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_by_id: Option<u64>,
    /// Last modification time, epoch millis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<i64>,
}

macro_rules! impl_resource {
    ($ty:ty, $kind:expr) => {
        impl_resource!($ty, $kind, None);
    };
    ($ty:ty, $kind:expr, $bulk:expr) => {
        impl sealed::Sealed for $ty {}

        impl Resource for $ty {
            const KIND: ResourceKind = $kind;
            const BULK_PATH: Option<&'static str> = $bulk;

            fn id(&self) -> Option<u64> {
                self.id
            }

            fn set_id(&mut self, id: u64) {
                self.id = Some(id);
            }
        }
    };
}

/// A namespace that metrics can be posted into.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub qualifier: String,
    /// Users allowed to post metrics to the namespace.
    #[serde(default)]
    pub usernames: Vec<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Namespace {
    /// Create a new namespace.
    pub fn new(qualifier: impl Into<String>) -> Self {
        Self {
            id: None,
            qualifier: qualifier.into(),
            usernames: Vec::new(),
            audit: Audit::default(),
        }
    }

    /// Adds a user allowed to post into this namespace.
    #[must_use]
    pub fn with_user(mut self, username: impl Into<String>) -> Self {
        self.usernames.push(username.into());
        self
    }
}

impl_resource!(Namespace, ResourceKind::Namespace);

/// A time series and the datapoints to submit for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub scope: String,
    pub metric: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// Values keyed by epoch-millisecond timestamp.
    #[serde(default, deserialize_with = "datapoints::deserialize")]
    pub datapoints: BTreeMap<i64, f64>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Metric {
    /// Create a metric with no tags and no datapoints.
    pub fn new(scope: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            id: None,
            scope: scope.into(),
            metric: metric.into(),
            tags: BTreeMap::new(),
            namespace: None,
            display_name: None,
            units: None,
            datapoints: BTreeMap::new(),
            audit: Audit::default(),
        }
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Sets the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Records a datapoint; a later value for the same timestamp wins.
    pub fn add_datapoint(&mut self, timestamp_ms: i64, value: f64) {
        self.datapoints.insert(timestamp_ms, value);
    }
}

impl_resource!(Metric, ResourceKind::Metric, Some("collection/metrics"));

/// An event attached to a series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub source: String,
    pub scope: String,
    pub metric: String,
    /// Event time, epoch millis.
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub annotation_type: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Free-form event fields.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Annotation {
    /// Create an annotation with no tags or fields.
    pub fn new(
        source: impl Into<String>,
        scope: impl Into<String>,
        metric: impl Into<String>,
        timestamp: i64,
        annotation_type: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            source: source.into(),
            scope: scope.into(),
            metric: metric.into(),
            timestamp,
            annotation_type: annotation_type.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            audit: Audit::default(),
        }
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Records a field; a later value for the same key wins.
    pub fn add_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }
}

impl_resource!(Annotation, ResourceKind::Annotation, Some("collection/annotations"));

/// A dashboard. Names are unique per owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    /// Dashboard markup.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub shared: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Dashboard {
    /// Create an unshared dashboard.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            content: content.into(),
            description: None,
            shared: false,
            owner_name: None,
            audit: Audit::default(),
        }
    }
}

impl_resource!(Dashboard, ResourceKind::Dashboard);

/// A service user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub privileged: bool,
    #[serde(flatten)]
    pub audit: Audit,
}

impl_resource!(User, ResourceKind::User);

/// Comparison a trigger applies to the alert's series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
    Equal,
    NotEqual,
    Between,
    NotBetween,
    NoData,
}

/// A threshold condition owned by an [`Alert`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_threshold: Option<f64>,
    /// Milliseconds the condition must hold before firing.
    pub inertia: i64,
    /// Owning alert; set by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<u64>,
    #[serde(default)]
    pub notification_ids: Vec<u64>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Trigger {
    /// Create a trigger not yet attached to an alert.
    pub fn new(name: impl Into<String>, trigger_type: TriggerType, threshold: f64, inertia: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            trigger_type,
            threshold,
            secondary_threshold: None,
            inertia,
            alert_id: None,
            notification_ids: Vec::new(),
            audit: Audit::default(),
        }
    }
}

impl sealed::Sealed for Trigger {}

impl Resource for Trigger {
    const KIND: ResourceKind = ResourceKind::Trigger;

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }

    fn decode_created(submitted: &Self, body: Value) -> Result<Self> {
        pick_created_child(body, &submitted.name, |t: &Trigger| t.name.as_str())
    }
}

/// Notifier implementation used by a [`Notification`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Notifier {
    #[serde(rename = "com.salesforce.dva.argus.service.alert.notifier.EmailNotifier")]
    Email,
    #[serde(rename = "com.salesforce.dva.argus.service.alert.notifier.AuditNotifier")]
    Audit,
    #[serde(rename = "com.salesforce.dva.argus.service.alert.notifier.GOCNotifier")]
    Goc,
    #[serde(rename = "com.salesforce.dva.argus.service.alert.notifier.GusNotifier")]
    Gus,
}

/// A delivery target owned by an [`Alert`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub notifier_name: Notifier,
    /// Notifier-specific targets, e.g. email addresses.
    #[serde(default)]
    pub subscriptions: Vec<String>,
    #[serde(default)]
    pub metrics_to_annotate: Vec<String>,
    #[serde(default)]
    pub cooldown_period: i64,
    #[serde(default)]
    pub cooldown_expiration: i64,
    #[serde(default)]
    pub triggers_ids: Vec<u64>,
    /// Owning alert; set by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<u64>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Notification {
    /// Create a notification not yet attached to an alert.
    pub fn new(name: impl Into<String>, notifier_name: Notifier) -> Self {
        Self {
            id: None,
            name: name.into(),
            notifier_name,
            subscriptions: Vec::new(),
            metrics_to_annotate: Vec::new(),
            cooldown_period: 0,
            cooldown_expiration: 0,
            triggers_ids: Vec::new(),
            alert_id: None,
            audit: Audit::default(),
        }
    }

    /// Adds a subscription.
    #[must_use]
    pub fn with_subscription(mut self, subscription: impl Into<String>) -> Self {
        self.subscriptions.push(subscription.into());
        self
    }
}

impl sealed::Sealed for Notification {}

impl Resource for Notification {
    const KIND: ResourceKind = ResourceKind::Notification;

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }

    fn decode_created(submitted: &Self, body: Value) -> Result<Self> {
        pick_created_child(body, &submitted.name, |n: &Notification| n.name.as_str())
    }
}

/// An alert: a scheduled query plus its triggers and notifications.
///
/// Triggers and notifications placed on a new alert are created right after
/// the alert itself, since they are addressed through the alert's id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    /// Metric query expression evaluated by the alert.
    pub expression: String,
    pub cron_entry: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub missing_data_notification_enabled: bool,
    #[serde(default)]
    pub shared: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub triggers_ids: Vec<u64>,
    #[serde(default)]
    pub notifications_ids: Vec<u64>,
    /// Child triggers; read from the service, created separately.
    #[serde(default, skip_serializing)]
    pub triggers: Vec<Trigger>,
    /// Child notifications; read from the service, created separately.
    #[serde(default, skip_serializing)]
    pub notifications: Vec<Notification>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Alert {
    /// Create a disabled alert with no children.
    pub fn new(
        name: impl Into<String>,
        expression: impl Into<String>,
        cron_entry: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            expression: expression.into(),
            cron_entry: cron_entry.into(),
            enabled: false,
            missing_data_notification_enabled: false,
            shared: false,
            owner_name: None,
            triggers_ids: Vec::new(),
            notifications_ids: Vec::new(),
            triggers: Vec::new(),
            notifications: Vec::new(),
            audit: Audit::default(),
        }
    }

    /// Adds a trigger to be created along with the alert.
    #[must_use]
    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Adds a notification to be created along with the alert.
    #[must_use]
    pub fn with_notification(mut self, notification: Notification) -> Self {
        self.notifications.push(notification);
        self
    }

    /// The only trigger, if there is exactly one.
    pub fn trigger(&self) -> Option<&Trigger> {
        match self.triggers.as_slice() {
            [single] => Some(single),
            _ => None,
        }
    }

    /// The only notification, if there is exactly one.
    pub fn notification(&self) -> Option<&Notification> {
        match self.notifications.as_slice() {
            [single] => Some(single),
            _ => None,
        }
    }
}

impl sealed::Sealed for Alert {}

impl Resource for Alert {
    const KIND: ResourceKind = ResourceKind::Alert;

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }

    fn validate_new(&self) -> Result<()> {
        let owned_trigger = self
            .triggers
            .iter()
            .find(|t| t.id.is_some() || t.alert_id.is_some())
            .map(|t| t.name.as_str());
        let owned_notification = self
            .notifications
            .iter()
            .find(|n| n.id.is_some() || n.alert_id.is_some())
            .map(|n| n.name.as_str());

        match owned_trigger.or(owned_notification) {
            Some(name) => Err(Error::Validation {
                message: format!("'{}' already belongs to another alert", name),
            }),
            None => Ok(()),
        }
    }

    fn complete_create<T: Transport>(
        session: &Session<T>,
        submitted: Self,
        created: Self,
    ) -> impl Future<Output = Result<Self>> + Send {
        crate::alerts::create_children(session, submitted, created)
    }
}

/// Child create endpoints answer with every child of the alert; find ours.
fn pick_created_child<C, F>(body: Value, name: &str, name_of: F) -> Result<C>
where
    C: Resource,
    F: Fn(&C) -> &str,
{
    if body.is_object() {
        return Ok(serde_json::from_value(body)?);
    }

    let children: Vec<C> = serde_json::from_value(body)?;
    children
        .into_iter()
        .find(|c| name_of(c) == name)
        .ok_or_else(|| {
            Error::Protocol(format!(
                "{} '{}' not found in the response to its create request",
                C::KIND,
                name
            ))
        })
}

mod datapoints {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    /// The service sends datapoint values as numbers or numeric strings.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawValue {
        Number(f64),
        Text(String),
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<i64, f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, RawValue>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(ts, value)| {
                let ts = ts
                    .parse::<i64>()
                    .map_err(|e| D::Error::custom(format!("invalid timestamp '{}': {}", ts, e)))?;
                let value = match value {
                    RawValue::Number(n) => n,
                    RawValue::Text(s) => s
                        .parse::<f64>()
                        .map_err(|e| D::Error::custom(format!("invalid value '{}': {}", s, e)))?,
                };
                Ok((ts, value))
            })
            .collect()
    }
}
