//! The closed set of resource kinds exposed by the web service.

use std::fmt;
use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;
use crate::session::Session;
use crate::transport::Transport;

/// Tag identifying a resource kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Metric namespace.
    Namespace,
    /// Time series with datapoints.
    Metric,
    /// Event annotation on a series.
    Annotation,
    /// Dashboard.
    Dashboard,
    /// Alert definition.
    Alert,
    /// Trigger owned by an alert.
    Trigger,
    /// Notification owned by an alert.
    Notification,
    /// Service user.
    User,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Namespace => "namespace",
            ResourceKind::Metric => "metric",
            ResourceKind::Annotation => "annotation",
            ResourceKind::Dashboard => "dashboard",
            ResourceKind::Alert => "alert",
            ResourceKind::Trigger => "trigger",
            ResourceKind::Notification => "notification",
            ResourceKind::User => "user",
        };
        write!(f, "{}", s)
    }
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Capabilities shared by every resource kind.
///
/// Wire encoding comes from the serde derives; this trait adds identity
/// access and the hooks [`Collection`](crate::Collection) uses to create a
/// resource. It is sealed: the set of kinds is fixed by the service.
pub trait Resource:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + sealed::Sealed + 'static
{
    /// Kind tag.
    const KIND: ResourceKind;

    /// Bulk write endpoint, for kinds that are only ever created in batches.
    const BULK_PATH: Option<&'static str> = None;

    /// Server-assigned identity; `None` until the resource has been created.
    fn id(&self) -> Option<u64>;

    /// Sets the identity.
    fn set_id(&mut self, id: u64);

    /// Kind-specific checks on a resource about to be created.
    #[doc(hidden)]
    fn validate_new(&self) -> Result<()> {
        Ok(())
    }

    /// Decode the body returned by a create request.
    #[doc(hidden)]
    fn decode_created(submitted: &Self, body: Value) -> Result<Self> {
        let _ = submitted;
        Ok(serde_json::from_value(body)?)
    }

    /// Finish a create once the server has answered, e.g. by creating
    /// children that can only be addressed through the new identity.
    #[doc(hidden)]
    fn complete_create<T: Transport>(
        session: &Session<T>,
        submitted: Self,
        created: Self,
    ) -> impl Future<Output = Result<Self>> + Send {
        let _ = (session, submitted);
        async move { Ok(created) }
    }
}
