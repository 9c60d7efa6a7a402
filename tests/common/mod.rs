//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use argus_client::{Credentials, Error, Request, Response, Result, Session, Transport};
use serde_json::{Value, json};

pub const USERNAME: &str = "test.user";
pub const PASSWORD: &str = "test.password";

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<Response>>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with a JSON body.
    pub fn respond(&self, status: u16, body: Value) {
        self.push(Ok(Response::new(status, Some(body))));
    }

    /// Queue a response with an empty body.
    pub fn respond_empty(&self, status: u16) {
        self.push(Ok(Response::new(status, None)));
    }

    /// Queue a transport-level failure.
    pub fn fail(&self, message: &str) {
        self.push(Err(Error::Transport(message.to_string())));
    }

    fn push(&self, response: Result<Response>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Request {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(Error::Transport("no scripted response left".to_string())))
    }
}

/// A session that has not logged in.
pub fn new_session() -> Session<MockTransport> {
    Session::with_transport(MockTransport::new(), Credentials::new(USERNAME, PASSWORD))
}

/// A session that has logged in, with the login request already recorded.
pub async fn logged_in_session() -> Session<MockTransport> {
    let session = new_session();
    session
        .transport()
        .respond(200, json!({"accessToken": "access", "refreshToken": "refresh"}));
    session.login().await.unwrap();
    session
}

pub fn dashboard_json(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "createdById": 101402,
        "createdDate": 1425598578661i64,
        "modifiedById": 101402,
        "modifiedDate": 1445273708714i64,
        "name": name,
        "content": "test content",
        "ownerName": USERNAME,
        "shared": true,
        "description": "Test description"
    })
}

pub fn alert_json(id: u64) -> Value {
    json!({
        "id": id,
        "createdById": 101997,
        "createdDate": 1459857033871i64,
        "name": "test.alert",
        "expression": "-1d:hdara:test:sum",
        "cronEntry": "*/15 * * * *",
        "enabled": false,
        "missingDataNotificationEnabled": false,
        "notificationsIds": [],
        "triggersIds": [],
        "ownerName": USERNAME
    })
}

pub fn trigger_json(id: u64, alert_id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "type": "GREATER_THAN",
        "name": name,
        "threshold": 10000,
        "secondaryThreshold": 0,
        "inertia": 600000,
        "alertId": alert_id,
        "notificationIds": []
    })
}

pub fn notification_json(id: u64, alert_id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "notifierName": "com.salesforce.dva.argus.service.alert.notifier.EmailNotifier",
        "subscriptions": ["user@test.com"],
        "metricsToAnnotate": [],
        "cooldownPeriod": 0,
        "cooldownExpiration": 0,
        "triggersIds": [],
        "alertId": alert_id
    })
}
