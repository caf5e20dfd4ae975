//! CloudStack HTTP request methods and async job polling

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::{DriverError, Result};
use crate::http_client::HttpUtils;
use crate::pagination::{Page, collect_pages, next_page_number};
use crate::traits::{ErrorContext, ErrorMapper, RawApiError};

use super::types::{AsyncJobResult, CloudStackErrorBody, JobRef, SuccessResponse};
use super::{CloudStackConnection, PAGE_SIZE, PROVIDER, Params, params};

const JOB_PENDING: u8 = 0;
const JOB_SUCCEEDED: u8 = 1;
const JOB_FAILED: u8 = 2;

/// Takes the `<command>response` object out of a response body.
fn unwrap_response(command: &str, mut body: Value) -> Option<Value> {
    let key = format!("{}response", command.to_lowercase());
    let object = body.as_object_mut()?;
    if let Some(inner) = object.remove(&key) {
        return Some(inner);
    }
    // Some commands answer under a different name
    let other = object.keys().find(|k| k.ends_with("response")).cloned()?;
    object.remove(&other)
}

/// `success` comes back as `"true"` or `true` depending on the command.
fn is_success(resp: &SuccessResponse) -> bool {
    match &resp.success {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

impl CloudStackConnection {
    fn decode<T: DeserializeOwned>(&self, value: Value) -> Result<T> {
        serde_json::from_value(value).map_err(|e| {
            log::error!("[{PROVIDER}] Unexpected response shape: {e}");
            self.parse_error(e)
        })
    }

    /// Send one command and return the body of its `<command>response` object.
    async fn send(&self, command: &str, params: &Params, ctx: ErrorContext) -> Result<Value> {
        let url = format!("{}?{}", self.base_url, self.signed_query(command, params));
        let request = self.client.get(&url);

        let response = HttpUtils::execute_request_with_retry(
            request,
            self.provider_name(),
            "GET",
            command,
            self.max_retries,
        )
        .await?;

        if !response.is_success() {
            let error = serde_json::from_str::<Value>(&response.body)
                .ok()
                .and_then(|body| unwrap_response(command, body))
                .and_then(|inner| serde_json::from_value::<CloudStackErrorBody>(inner).ok());
            let Some(CloudStackErrorBody {
                errorcode: Some(code),
                cserrorcode,
                errortext,
            }) = error
            else {
                return Err(self.map_status(
                    response.status,
                    RawApiError::new(format!("HTTP {}", response.status)),
                    ctx,
                ));
            };
            let message = errortext.unwrap_or_else(|| format!("HTTP {}", response.status));
            log::error!(
                "[{PROVIDER}] {command} failed: {code}/{} - {message}",
                cserrorcode.unwrap_or_default()
            );
            return Err(self.map_error(RawApiError::with_code(code.to_string(), message), ctx));
        }

        let body: Value = HttpUtils::parse_json(&response.body, self.provider_name())?;
        unwrap_response(command, body)
            .ok_or_else(|| self.parse_error(format!("missing {command} response object")))
    }

    /// Synchronous command.
    pub(crate) async fn request<T>(&self, command: &str, params: &Params, ctx: ErrorContext) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let inner = self.send(command, params, ctx).await?;
        self.decode(inner)
    }

    /// Synchronous command answering `{"success": true}`.
    pub(crate) async fn request_ack(
        &self,
        command: &str,
        params: &Params,
        ctx: ErrorContext,
    ) -> Result<()> {
        let resp: SuccessResponse = self.request(command, params, ctx).await?;
        if is_success(&resp) {
            return Ok(());
        }
        Err(self.unknown_error(RawApiError::new(
            resp.displaytext
                .unwrap_or_else(|| format!("{command} was not acknowledged")),
        )))
    }

    /// Every page of a `list*` command. `item_key` names the array in the response.
    pub(crate) async fn list_all<T>(
        &self,
        command: &str,
        params: &Params,
        item_key: &str,
        ctx: ErrorContext,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        collect_pages(PROVIDER, 1u32, |page| {
            let mut page_params = params.clone();
            page_params.insert("page".to_string(), page.to_string());
            page_params.insert("pagesize".to_string(), PAGE_SIZE.to_string());
            let ctx = ctx.clone();
            async move {
                let mut inner = self.send(command, &page_params, ctx).await?;
                // Empty lists come back as `{}`
                let Some(items) = inner.get_mut(item_key).map(Value::take) else {
                    return Ok(Page::last(Vec::new()));
                };
                let items: Vec<T> = self.decode(items)?;
                let next = next_page_number(page, PAGE_SIZE, items.len());
                Ok(Page::new(items, next))
            }
        })
        .await
    }

    /// Asynchronous command: start the job and wait for its result.
    pub(crate) async fn async_request(
        &self,
        command: &str,
        params: &Params,
        ctx: ErrorContext,
    ) -> Result<Value> {
        let job: JobRef = self.request(command, params, ctx.clone()).await?;
        log::debug!("[{PROVIDER}] {command} started job {}", job.jobid);
        self.wait_for_job(&job.jobid, ctx).await
    }

    /// Asynchronous command whose job result carries the object under `result_key`.
    pub(crate) async fn async_request_as<T>(
        &self,
        command: &str,
        params: &Params,
        result_key: &str,
        ctx: ErrorContext,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut result = self.async_request(command, params, ctx).await?;
        let Some(object) = result.get_mut(result_key).map(Value::take) else {
            return Err(self.parse_error(format!("{command} job result has no '{result_key}'")));
        };
        self.decode(object)
    }

    /// Poll `queryAsyncJobResult` until the job leaves the pending state.
    async fn wait_for_job(&self, job_id: &str, ctx: ErrorContext) -> Result<Value> {
        let deadline = Instant::now() + self.job_timeout;

        loop {
            let job: AsyncJobResult = self
                .request("queryAsyncJobResult", &params([("jobid", job_id)]), ctx.clone())
                .await?;

            match job.jobstatus {
                JOB_SUCCEEDED => return Ok(job.jobresult.unwrap_or(Value::Null)),
                JOB_FAILED => {
                    let error = job
                        .jobresult
                        .and_then(|r| serde_json::from_value::<CloudStackErrorBody>(r).ok());
                    let detail = match error {
                        Some(CloudStackErrorBody {
                            errortext: Some(text),
                            errorcode,
                            ..
                        }) => format!("{text} (code {})", errorcode.unwrap_or_default()),
                        _ => format!("job result code {}", job.jobresultcode.unwrap_or_default()),
                    };
                    log::error!("[{PROVIDER}] Job {job_id} failed: {detail}");
                    return Err(DriverError::JobFailed {
                        provider: PROVIDER.to_string(),
                        job_id: job_id.to_string(),
                        detail,
                    });
                }
                JOB_PENDING => {}
                other => log::warn!("[{PROVIDER}] Job {job_id} reported status {other}"),
            }

            if Instant::now() + self.job_poll_interval > deadline {
                return Err(DriverError::Timeout {
                    provider: PROVIDER.to_string(),
                    detail: format!(
                        "job {job_id} still pending after {}s",
                        self.job_timeout.as_secs()
                    ),
                });
            }
            tokio::time::sleep(self.job_poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unwrap_by_command_name() {
        let body = json!({ "listzonesresponse": { "count": 1, "zone": [{ "id": "z" }] } });
        let inner = unwrap_response("listZones", body).unwrap();
        assert_eq!(inner["count"], json!(1));
    }

    #[test]
    fn success_flag_forms() {
        let yes: SuccessResponse = serde_json::from_value(json!({ "success": "true" })).unwrap();
        let also: SuccessResponse = serde_json::from_value(json!({ "success": true })).unwrap();
        let no: SuccessResponse = serde_json::from_value(json!({})).unwrap();
        assert!(is_success(&yes));
        assert!(is_success(&also));
        assert!(!is_success(&no));
    }

    #[test]
    fn unwrap_falls_back_to_any_response_key() {
        let body = json!({ "createsshkeypairresponse": { "keypair": {} } });
        assert!(unwrap_response("createSSHKeyPair", body.clone()).is_some());
        assert!(unwrap_response("somethingElse", body).is_some());
        assert!(unwrap_response("listZones", json!({ "other": 1 })).is_none());
    }
}
