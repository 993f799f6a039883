use crate::config::Config;
use crate::error::AppError;
use crate::model::{BackendPayload, BackendTask, StatusBody, TaskId};
use crate::remote::{
    DeleteAck, ListEnvelope, Operation, RemoteError, TaskApi, TaskEnvelope, classify_status,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// `reqwest` implementation of the task API routes.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpTaskApi {
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| AppError::invalid_data(format!("invalid api url '{base_url}': {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::invalid_data(format!(
                "api url '{base_url}' cannot carry a path"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::invalid_data(format!("http client: {err}")))?;

        Ok(Self {
            client,
            base_url,
            auth_token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config.api_url(),
            config.auth_token().map(str::to_string),
            config.timeout(),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self.client.request(method, self.url(segments));
        match self.auth_token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        builder: RequestBuilder,
        operation: Operation,
    ) -> Result<String, RemoteError> {
        let response = builder
            .send()
            .await
            .map_err(|err| classify_transport(&err, operation))?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            error!(operation = operation.name(), error = %err, "failed to read response body");
            RemoteError::Rejected {
                status: Some(status.as_u16()),
                message: operation.failure_message().to_string(),
            }
        })?;

        if status.is_success() {
            debug!(operation = operation.name(), %status, "task api call succeeded");
            return Ok(body);
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!(operation = operation.name(), "task api refused the auth token");
        }

        let classified = classify_status(status.as_u16(), &body, operation);
        if !classified.is_unavailable() {
            error!(
                operation = operation.name(),
                %status,
                error = %classified,
                "task api call failed"
            );
        }
        Err(classified)
    }
}

fn classify_transport(err: &reqwest::Error, operation: Operation) -> RemoteError {
    if err.is_connect() {
        return RemoteError::Unavailable(format!("{} could not connect: {err}", operation.name()));
    }

    error!(operation = operation.name(), error = %err, "task api transport error");
    RemoteError::Rejected {
        status: None,
        message: operation.failure_message().to_string(),
    }
}

fn parse<T: DeserializeOwned>(body: &str, operation: Operation) -> Result<T, RemoteError> {
    serde_json::from_str(body).map_err(|err| {
        error!(operation = operation.name(), error = %err, "undecodable task api response");
        RemoteError::Rejected {
            status: None,
            message: operation.failure_message().to_string(),
        }
    })
}

fn parse_ack(body: &str) -> DeleteAck {
    if body.trim().is_empty() {
        return DeleteAck::default();
    }
    serde_json::from_str(body).unwrap_or_default()
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<BackendTask>, RemoteError> {
        let body = self
            .send(self.request(Method::GET, &["tasks"]), Operation::List)
            .await?;
        parse::<ListEnvelope>(&body, Operation::List).map(ListEnvelope::into_tasks)
    }

    #[instrument(skip(self))]
    async fn create(&self, payload: &BackendPayload) -> Result<BackendTask, RemoteError> {
        let builder = self.request(Method::POST, &["tasks"]).json(payload);
        let body = self.send(builder, Operation::Create).await?;
        parse::<TaskEnvelope>(&body, Operation::Create).map(TaskEnvelope::into_task)
    }

    #[instrument(skip(self))]
    async fn update(
        &self,
        id: &TaskId,
        payload: &BackendPayload,
    ) -> Result<BackendTask, RemoteError> {
        let id = id.to_string();
        let builder = self.request(Method::PUT, &["tasks", &id]).json(payload);
        let body = self.send(builder, Operation::Update).await?;
        parse::<TaskEnvelope>(&body, Operation::Update).map(TaskEnvelope::into_task)
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        id: &TaskId,
        body: StatusBody,
    ) -> Result<BackendTask, RemoteError> {
        let id = id.to_string();
        let builder = self
            .request(Method::PATCH, &["tasks", &id, "status"])
            .json(&body);
        let body = self.send(builder, Operation::UpdateStatus).await?;
        parse::<TaskEnvelope>(&body, Operation::UpdateStatus).map(TaskEnvelope::into_task)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &TaskId) -> Result<DeleteAck, RemoteError> {
        let id = id.to_string();
        let body = self
            .send(self.request(Method::DELETE, &["tasks", &id]), Operation::Delete)
            .await?;
        Ok(parse_ack(&body))
    }
}
