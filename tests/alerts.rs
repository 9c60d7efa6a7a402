//! Alerts with their triggers and notifications.

mod common;

use argus_client::{Alert, Error, Method, Notification, Notifier, Trigger, TriggerType};
use common::{alert_json, logged_in_session, notification_json, trigger_json};
use serde_json::json;

fn new_alert() -> Alert {
    Alert::new("test.alert", "-1d:hdara:test:sum", "*/15 * * * *")
}

fn new_trigger(name: &str) -> Trigger {
    Trigger::new(name, TriggerType::GreaterThan, 10000.0, 600000)
}

fn new_notification(name: &str) -> Notification {
    Notification::new(name, Notifier::Email).with_subscription("user@test.com")
}

// ============================================================================
// Creating alerts with children
// ============================================================================

#[tokio::test]
async fn test_add_alert_with_trigger_and_notification() {
    let session = logged_in_session().await;
    let transport = session.transport();
    transport.respond(200, alert_json(10));
    transport.respond(200, json!([trigger_json(20, 10, "test.trigger")]));
    transport.respond(200, json!([notification_json(30, 10, "test.notification")]));
    transport.respond(200, trigger_json(20, 10, "test.trigger"));

    let alert = new_alert()
        .with_trigger(new_trigger("test.trigger"))
        .with_notification(new_notification("test.notification"));
    let created = session.alerts().add(alert).await.unwrap();

    assert_eq!(created.id, Some(10));
    assert_eq!(created.triggers_ids, vec![20]);
    assert_eq!(created.notifications_ids, vec![30]);

    let trigger = created.trigger().unwrap();
    let notification = created.notification().unwrap();
    assert_eq!(trigger.id, Some(20));
    assert_eq!(trigger.alert_id, Some(10));
    assert_eq!(notification.id, Some(30));
    assert_eq!(notification.alert_id, Some(10));
    assert_eq!(trigger.notification_ids, vec![30]);
    assert_eq!(notification.triggers_ids, vec![20]);

    assert_eq!(
        transport.paths(),
        vec![
            "v2/auth/login",
            "alerts",
            "alerts/10/triggers",
            "alerts/10/notifications",
            "alerts/10/notifications/30/triggers/20",
        ]
    );
    assert!(transport.requests()[1..].iter().all(|r| r.method == Method::POST));

    // Children are not part of the alert's own body.
    let alert_body = transport.requests()[1].body.clone().unwrap();
    assert!(alert_body.get("triggers").is_none());
    assert!(alert_body.get("notifications").is_none());
}

#[tokio::test]
async fn test_add_alert_picks_child_by_name() {
    let session = logged_in_session().await;
    let transport = session.transport();
    transport.respond(200, alert_json(10));
    transport.respond(
        200,
        json!([trigger_json(20, 10, "first"), trigger_json(21, 10, "second")]),
    );

    let created = session
        .alerts()
        .add(new_alert().with_trigger(new_trigger("second")))
        .await
        .unwrap();

    assert_eq!(created.triggers_ids, vec![21]);
    assert!(created.notifications.is_empty());
    // Nothing to link without a notification.
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn test_add_alert_with_several_children_does_not_link() {
    let session = logged_in_session().await;
    let transport = session.transport();
    transport.respond(200, alert_json(10));
    transport.respond(200, json!([trigger_json(20, 10, "t1")]));
    transport.respond(200, json!([trigger_json(20, 10, "t1"), trigger_json(21, 10, "t2")]));
    transport.respond(200, json!([notification_json(30, 10, "n1")]));

    let created = session
        .alerts()
        .add(
            new_alert()
                .with_trigger(new_trigger("t1"))
                .with_trigger(new_trigger("t2"))
                .with_notification(new_notification("n1")),
        )
        .await
        .unwrap();

    assert_eq!(created.triggers_ids, vec![20, 21]);
    assert_eq!(created.notifications_ids, vec![30]);
    assert!(created.trigger().is_none());
    assert_eq!(transport.request_count(), 5);
}

#[tokio::test]
async fn test_add_alert_with_owned_child_is_rejected_locally() {
    let session = logged_in_session().await;
    let mut trigger = new_trigger("test.trigger");
    trigger.alert_id = Some(3);

    let err = session
        .alerts()
        .add(new_alert().with_trigger(trigger))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { ref message } if message.contains("test.trigger")));
    assert_eq!(session.transport().request_count(), 1);
}

#[tokio::test]
async fn test_child_failure_is_returned() {
    let session = logged_in_session().await;
    let transport = session.transport();
    transport.respond(200, alert_json(10));
    transport.respond(400, json!({"message": "threshold is required"}));

    let err = session
        .alerts()
        .add(new_alert().with_trigger(new_trigger("test.trigger")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
}

#[tokio::test]
async fn test_child_missing_from_create_response() {
    let session = logged_in_session().await;
    let transport = session.transport();
    transport.respond(200, alert_json(10));
    transport.respond(200, json!([trigger_json(20, 10, "someone.else")]));

    let err = session
        .alerts()
        .add(new_alert().with_trigger(new_trigger("test.trigger")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}

#[tokio::test]
async fn test_add_all_alerts_reports_rejections() {
    let session = logged_in_session().await;
    let transport = session.transport();
    transport.respond(200, alert_json(10));
    transport.respond(400, json!({"message": "invalid cron entry"}));

    let response = session
        .alerts()
        .add_all(vec![new_alert(), Alert::new("bad", "-1d:a:b:sum", "not cron")])
        .await
        .unwrap();
    assert_eq!(response.success_count(), 1);
    assert_eq!(response.error_messages(), vec!["invalid cron entry"]);
}

// ============================================================================
// Child collections
// ============================================================================

#[tokio::test]
async fn test_child_paths() {
    let session = logged_in_session().await;
    let transport = session.transport();
    transport.respond(200, trigger_json(20, 10, "t"));
    transport.respond(200, json!([notification_json(30, 10, "n")]));
    transport.respond_empty(200);
    transport.respond_empty(404);

    let alerts = session.alerts();
    let trigger = alerts.triggers(10).get(20).await.unwrap();
    assert_eq!(trigger.trigger_type, TriggerType::GreaterThan);
    assert_eq!(transport.last_request().path, "alerts/10/triggers/20");

    let notifications = alerts.notifications(10).values().await.unwrap();
    assert_eq!(notifications[0].notifier_name, Notifier::Email);
    assert_eq!(transport.last_request().path, "alerts/10/notifications");

    alerts.notifications(10).delete(30).await.unwrap();
    let err = alerts.notifications(10).delete(30).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(transport.last_request().path, "alerts/10/notifications/30");
}

#[tokio::test]
async fn test_notification_trigger_links() {
    let session = logged_in_session().await;
    let transport = session.transport();
    transport.respond(200, json!([trigger_json(20, 10, "t")]));
    transport.respond(404, json!({"message": "Trigger is not associated"}));
    transport.respond_empty(200);

    let alerts = session.alerts();
    let linked = alerts.notification_triggers(10, 30).await.unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(transport.last_request().path, "alerts/10/notifications/30/triggers");

    let err = alerts.notification_trigger(10, 30, 21).await.unwrap_err();
    assert!(err.is_not_found());

    alerts.unlink_notification_trigger(10, 30, 20).await.unwrap();
    let request = transport.last_request();
    assert_eq!(request.method, Method::DELETE);
    assert_eq!(request.path, "alerts/10/notifications/30/triggers/20");
}

#[tokio::test]
async fn test_alert_from_wire_with_children() {
    let session = logged_in_session().await;
    let mut alert = alert_json(10);
    alert["triggers"] = json!([trigger_json(20, 10, "t")]);
    alert["triggersIds"] = json!([20]);
    session.transport().respond(200, alert);

    let alert = session.alerts().get(10).await.unwrap();
    assert_eq!(alert.triggers_ids, vec![20]);
    assert_eq!(alert.trigger().and_then(|t| t.id), Some(20));
}
