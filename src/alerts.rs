//! Alerts and the triggers and notifications they own.
//!
//! Children live under their alert (`alerts/{id}/triggers/...`), so they can
//! only be created once the alert has an id. Adding an alert that carries
//! children creates the alert first, then each child, and links a lone
//! trigger to a lone notification.

use reqwest::Method;

use crate::collection::{Collection, decode_list, decode_one};
use crate::error::{Error, Result};
use crate::model::{Alert, Notification, Trigger};
use crate::resource::Resource;
use crate::session::Session;
use crate::transport::{Request, Transport};

impl<'s, T: Transport> Collection<'s, Alert, T> {
    /// Triggers of alert `alert_id`.
    pub fn triggers(&self, alert_id: u64) -> Collection<'s, Trigger, T> {
        Collection::new(self.session(), format!("{}/{}/triggers", self.path(), alert_id))
    }

    /// Notifications of alert `alert_id`.
    pub fn notifications(&self, alert_id: u64) -> Collection<'s, Notification, T> {
        Collection::new(self.session(), format!("{}/{}/notifications", self.path(), alert_id))
    }

    fn notification_triggers_path(&self, alert_id: u64, notification_id: u64) -> String {
        format!(
            "{}/{}/notifications/{}/triggers",
            self.path(),
            alert_id,
            notification_id
        )
    }

    /// Triggers associated with a notification.
    pub async fn notification_triggers(
        &self,
        alert_id: u64,
        notification_id: u64,
    ) -> Result<Vec<Trigger>> {
        let path = self.notification_triggers_path(alert_id, notification_id);
        decode_list(self.session().execute(Request::new(Method::GET, path)).await?)
    }

    /// A trigger, only if it is associated with the notification.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the trigger is not associated.
    pub async fn notification_trigger(
        &self,
        alert_id: u64,
        notification_id: u64,
        trigger_id: u64,
    ) -> Result<Trigger> {
        let path = format!(
            "{}/{}",
            self.notification_triggers_path(alert_id, notification_id),
            trigger_id
        );
        decode_one(self.session().execute(Request::new(Method::GET, path)).await?)
    }

    /// Associate a trigger with a notification of the same alert.
    pub async fn link_notification_trigger(
        &self,
        alert_id: u64,
        notification_id: u64,
        trigger_id: u64,
    ) -> Result<Trigger> {
        let path = format!(
            "{}/{}",
            self.notification_triggers_path(alert_id, notification_id),
            trigger_id
        );
        decode_one(self.session().execute(Request::new(Method::POST, path)).await?)
    }

    /// Remove the association between a trigger and a notification.
    pub async fn unlink_notification_trigger(
        &self,
        alert_id: u64,
        notification_id: u64,
        trigger_id: u64,
    ) -> Result<()> {
        let path = format!(
            "{}/{}",
            self.notification_triggers_path(alert_id, notification_id),
            trigger_id
        );
        self.session()
            .execute(Request::new(Method::DELETE, path))
            .await?;
        Ok(())
    }
}

/// Create the children of a freshly created alert.
///
/// If a child fails, the error is returned and the alert stays on the
/// service with the children created so far.
pub(crate) async fn create_children<T: Transport>(
    session: &Session<T>,
    submitted: Alert,
    mut created: Alert,
) -> Result<Alert> {
    if submitted.triggers.is_empty() && submitted.notifications.is_empty() {
        return Ok(created);
    }
    let alert_id = created
        .id()
        .ok_or_else(|| Error::Protocol("created alert has no identity".to_string()))?;

    let alerts = session.alerts();

    let triggers = alerts.triggers(alert_id);
    created.triggers = Vec::with_capacity(submitted.triggers.len());
    for trigger in submitted.triggers {
        created.triggers.push(triggers.add(trigger).await?);
    }

    let notifications = alerts.notifications(alert_id);
    created.notifications = Vec::with_capacity(submitted.notifications.len());
    for notification in submitted.notifications {
        created.notifications.push(notifications.add(notification).await?);
    }

    created.triggers_ids = created.triggers.iter().filter_map(|t| t.id).collect();
    created.notifications_ids = created.notifications.iter().filter_map(|n| n.id).collect();

    if let ([trigger], [notification]) = (
        created.triggers.as_mut_slice(),
        created.notifications.as_mut_slice(),
    ) {
        if let (Some(trigger_id), Some(notification_id)) = (trigger.id, notification.id) {
            alerts
                .link_notification_trigger(alert_id, notification_id, trigger_id)
                .await?;
            trigger.notification_ids = vec![notification_id];
            notification.triggers_ids = vec![trigger_id];
        }
    }

    tracing::debug!(
        alert_id,
        triggers = created.triggers.len(),
        notifications = created.notifications.len(),
        "alert children created"
    );
    Ok(created)
}
