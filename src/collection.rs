//! Generic CRUD proxy over a collection endpoint.
//!
//! Every resource kind is reached through the same [`Collection`] shape:
//! `get`, `values`, `add`, `add_all`, `update` and `delete`. Kind-specific
//! lookups are extra methods on the concrete instantiations below and in
//! [`crate::alerts`]. Nothing is cached; every call is one or more requests.

use std::marker::PhantomData;

use reqwest::Method;
use serde_json::Value;

use crate::batch::{BatchResponse, ItemOutcome};
use crate::error::{Error, Result};
use crate::model::{Alert, Annotation, Dashboard, Metric, Namespace, User};
use crate::query::{AnnotationQuery, MetricQuery};
use crate::resource::Resource;
use crate::session::Session;
use crate::transport::{HttpTransport, Request, Transport, encode_segment};

/// Resources of kind `K`, reached through a session.
///
/// A collection holds only the borrowed session and its endpoint paths.
///
/// # Example
///
/// ```ignore
/// use argus_client::Dashboard;
///
/// let dashboards = session.dashboards();
/// let created = dashboards.add(Dashboard::new("Oracle stats", "<ag-dashboard/>")).await?;
/// let id = created.id.expect("created dashboards have an id");
///
/// dashboards.delete(id).await?;
/// assert!(dashboards.delete(id).await.unwrap_err().is_not_found());
/// ```
pub struct Collection<'s, K, T: Transport = HttpTransport> {
    session: &'s Session<T>,
    path: String,
    item_path: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K, T: Transport> Clone for Collection<'_, K, T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session,
            path: self.path.clone(),
            item_path: self.item_path.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K, T: Transport> std::fmt::Debug for Collection<'_, K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("path", &self.path)
            .field("item_path", &self.item_path)
            .finish_non_exhaustive()
    }
}

impl<'s, K: Resource, T: Transport> Collection<'s, K, T> {
    /// Create a collection rooted at `path`; single items live at `path/{id}`.
    pub fn new(session: &'s Session<T>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            session,
            item_path: path.clone(),
            path,
            _kind: PhantomData,
        }
    }

    /// Use a different prefix for single-item paths (`item_path/{id}`).
    #[must_use]
    pub fn with_item_path(mut self, item_path: impl Into<String>) -> Self {
        self.item_path = item_path.into();
        self
    }

    /// Path listing and creation requests go to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The session this collection is bound to.
    pub fn session(&self) -> &'s Session<T> {
        self.session
    }

    fn item(&self, id: u64) -> String {
        format!("{}/{}", self.item_path, id)
    }

    /// Fetch one resource.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the service has no such id, plus the session
    /// and transport errors every call can return.
    pub async fn get(&self, id: u64) -> Result<K> {
        let body = self
            .session
            .execute(Request::new(Method::GET, self.item(id)))
            .await?;
        decode_one(body)
    }

    /// Fetch every resource visible to the session.
    ///
    /// Always asks the service; an empty collection yields an empty vector.
    pub async fn values(&self) -> Result<Vec<K>> {
        let body = self
            .session
            .execute(Request::new(Method::GET, self.path.clone()))
            .await?;
        decode_list(body)
    }

    /// Fetch every resource and return the first one matching `predicate`.
    pub async fn find<P>(&self, predicate: P) -> Result<Option<K>>
    where
        P: Fn(&K) -> bool,
    {
        Ok(self.values().await?.into_iter().find(|r| predicate(r)))
    }

    /// Create one resource and return the service's copy, identity included.
    ///
    /// Metrics and annotations only get an identity when the bulk endpoint
    /// reports per-item results; otherwise they come back as submitted.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if the resource already has an identity or the
    /// service rejects it.
    pub async fn add(&self, resource: K) -> Result<K> {
        self.session.ensure_authenticated()?;
        check_new(&resource)?;

        match K::BULK_PATH {
            Some(bulk_path) => self.bulk_write(bulk_path, vec![resource]).await?.into_single(),
            None => self.create_one(resource).await,
        }
    }

    /// Create many resources.
    ///
    /// Items the service rejects are reported in the returned
    /// [`BatchResponse`]; only session, transport and protocol failures abort
    /// the whole call. Kinds without a bulk endpoint are created one request
    /// at a time.
    pub async fn add_all(&self, resources: Vec<K>) -> Result<BatchResponse<K>> {
        self.session.ensure_authenticated()?;
        if resources.is_empty() {
            return Ok(BatchResponse::from_outcomes(Vec::new()));
        }

        if let Some(bulk_path) = K::BULK_PATH {
            return self.bulk_write(bulk_path, resources).await;
        }

        let mut outcomes = Vec::with_capacity(resources.len());
        for resource in resources {
            let outcome = match check_new(&resource) {
                Ok(()) => self.create_one(resource.clone()).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(created) => outcomes.push(ItemOutcome::Stored(created)),
                Err(Error::Validation { message }) => outcomes.push(ItemOutcome::Rejected {
                    item: resource,
                    message,
                }),
                Err(e) => return Err(e),
            }
        }

        let response = BatchResponse::from_outcomes(outcomes);
        tracing::debug!(
            kind = %K::KIND,
            stored = response.success_count(),
            rejected = response.error_count(),
            "batch create completed"
        );
        Ok(response)
    }

    /// Replace the resource at `id`.
    ///
    /// A resource without an identity takes `id`; one with a different
    /// identity is rejected before any request is made.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if `id` does not exist, [`Error::Validation`] if
    /// the content is rejected.
    pub async fn update(&self, id: u64, mut resource: K) -> Result<K> {
        self.session.ensure_authenticated()?;
        match resource.id() {
            Some(existing) if existing != id => {
                return Err(Error::validation(format!(
                    "{} id {} does not match the id {} being updated",
                    K::KIND,
                    existing,
                    id
                )));
            }
            Some(_) => {}
            None => resource.set_id(id),
        }

        let request = Request::new(Method::PUT, self.item(id)).with_body(serde_json::to_value(&resource)?);
        decode_one(self.session.execute(request).await?)
    }

    /// Delete the resource at `id`.
    ///
    /// Deleting the same id twice fails the second time with
    /// [`Error::NotFound`].
    pub async fn delete(&self, id: u64) -> Result<()> {
        self.session
            .execute(Request::new(Method::DELETE, self.item(id)))
            .await?;
        Ok(())
    }

    async fn create_one(&self, resource: K) -> Result<K> {
        let request =
            Request::new(Method::POST, self.path.clone()).with_body(serde_json::to_value(&resource)?);
        let body = self.session.execute(request).await?.ok_or_else(|| {
            Error::Protocol(format!("create {} returned an empty body", K::KIND))
        })?;

        let created = K::decode_created(&resource, body)?;
        if created.id().is_none() {
            return Err(Error::Protocol(format!(
                "created {} has no identity",
                K::KIND
            )));
        }
        K::complete_create(self.session, resource, created).await
    }

    async fn bulk_write(&self, bulk_path: &str, resources: Vec<K>) -> Result<BatchResponse<K>> {
        let request =
            Request::new(Method::POST, bulk_path).with_body(serde_json::to_value(&resources)?);
        let body = self.session.execute(request).await?.ok_or_else(|| {
            Error::Protocol(format!("bulk {} write returned an empty body", K::KIND))
        })?;
        BatchResponse::from_wire(resources, body)
    }
}

fn check_new<K: Resource>(resource: &K) -> Result<()> {
    if let Some(id) = resource.id() {
        return Err(Error::validation(format!(
            "a new {} can't have an id (got {})",
            K::KIND,
            id
        )));
    }
    resource.validate_new()
}

pub(crate) fn decode_one<K: Resource>(body: Option<Value>) -> Result<K> {
    let body =
        body.ok_or_else(|| Error::Protocol(format!("expected a {} but got an empty body", K::KIND)))?;
    Ok(serde_json::from_value(body)?)
}

pub(crate) fn decode_list<K: Resource>(body: Option<Value>) -> Result<Vec<K>> {
    match body {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(body) => Ok(serde_json::from_value(body)?),
    }
}

impl<T: Transport> Session<T> {
    /// Namespaces.
    pub fn namespaces(&self) -> Collection<'_, Namespace, T> {
        Collection::new(self, "namespace")
    }

    /// Metrics. Written through the bulk collection endpoint.
    pub fn metrics(&self) -> Collection<'_, Metric, T> {
        Collection::new(self, "metrics")
    }

    /// Annotations. Written through the bulk collection endpoint.
    pub fn annotations(&self) -> Collection<'_, Annotation, T> {
        Collection::new(self, "annotations")
    }

    /// Dashboards.
    pub fn dashboards(&self) -> Collection<'_, Dashboard, T> {
        Collection::new(self, "dashboards")
    }

    /// Alerts, with their triggers and notifications.
    pub fn alerts(&self) -> Collection<'_, Alert, T> {
        Collection::new(self, "alerts")
    }

    /// Users, addressed as `users/id/{id}` or looked up by username.
    ///
    /// The service has no user listing endpoint, so `values()` and `find()`
    /// on this collection fail with whatever the service answers for
    /// `GET users` (usually [`Error::NotFound`]). Use
    /// [`find_by_username`](Collection::find_by_username) instead.
    pub fn users(&self) -> Collection<'_, User, T> {
        Collection::new(self, "users").with_item_path("users/id")
    }
}

impl<T: Transport> Collection<'_, Metric, T> {
    /// Fetch the series matching `query`.
    pub async fn query(&self, query: &MetricQuery) -> Result<Vec<Metric>> {
        let request =
            Request::new(Method::GET, self.path.clone()).with_param("expression", query.expression());
        decode_list(self.session.execute(request).await?)
    }
}

impl<T: Transport> Collection<'_, Annotation, T> {
    /// Fetch the annotations matching `query`.
    pub async fn query(&self, query: &AnnotationQuery) -> Result<Vec<Annotation>> {
        let request =
            Request::new(Method::GET, self.path.clone()).with_param("expression", query.expression());
        decode_list(self.session.execute(request).await?)
    }
}

impl<T: Transport> Collection<'_, Dashboard, T> {
    /// Look up a dashboard by owner and name.
    ///
    /// Returns `Ok(None)` when the owner has no dashboard of that name.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the service reports more than one match, since
    /// names are unique per owner.
    pub async fn find_by_owner(&self, owner: &str, name: &str) -> Result<Option<Dashboard>> {
        let request = Request::new(Method::GET, self.path.clone())
            .with_param("dashboardName", name)
            .with_param("owner", owner);
        let dashboards: Vec<Dashboard> = match self.session.execute(request).await {
            Ok(body) => decode_list(body)?,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut matches = dashboards.into_iter().filter(|d| d.name == name);
        let first = matches.next();
        if matches.next().is_some() {
            return Err(Error::Protocol(format!(
                "more than one dashboard named '{}' owned by '{}'",
                name, owner
            )));
        }
        Ok(first)
    }
}

impl<T: Transport> Collection<'_, Namespace, T> {
    /// Replace the users allowed to post into namespace `id`.
    pub async fn update_users<I, S>(&self, id: u64, usernames: I) -> Result<Namespace>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let usernames: Vec<String> = usernames.into_iter().map(Into::into).collect();
        let request = Request::new(Method::PUT, format!("{}/users", self.item(id)))
            .with_body(serde_json::to_value(&usernames)?);
        decode_one(self.session.execute(request).await?)
    }
}

impl<T: Transport> Collection<'_, User, T> {
    /// Look up a user by username; `Ok(None)` if there is none.
    ///
    /// The username is escaped as a single path segment, so `/`, `?` and
    /// `#` in it are sent literally.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for an empty, `.` or `..` username.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let segment = encode_segment(username)?;
        let request = Request::new(Method::GET, format!("{}/username/{}", self.path, segment));
        match self.session.execute(request).await {
            Ok(None) => Ok(None),
            Ok(body) => decode_one(body).map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
