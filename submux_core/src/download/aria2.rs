//! Thin JSON-RPC client for the external download daemon. Only the three
//! methods the pipeline needs: enqueue, poll, remove.

use serde::Deserialize;
use serde_json::{json, Value};

use super::DownloadError;

pub struct Aria2Client {
    http: reqwest::Client,
    endpoint: String,
    secret: Option<String>,
}

/// One `tellStatus` snapshot. The daemon encodes numbers as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatus {
    pub status: String,
    #[serde(rename = "completedLength", default)]
    pub completed_length: String,
    #[serde(rename = "totalLength", default)]
    pub total_length: String,
    #[serde(rename = "downloadSpeed", default)]
    pub download_speed: String,
    #[serde(rename = "errorCode", default)]
    pub error_code: Option<String>,
    #[serde(rename = "errorMessage", default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub files: Vec<JobFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub path: String,
}

impl JobStatus {
    pub fn completed(&self) -> u64 {
        self.completed_length.parse().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total_length.parse().unwrap_or(0)
    }

    pub fn speed(&self) -> u64 {
        self.download_speed.parse().unwrap_or(0)
    }
}

impl Aria2Client {
    /// `endpoint` is the full JSON-RPC URL, e.g. `http://localhost:6800/jsonrpc`.
    pub fn new(endpoint: String, secret: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            secret,
        }
    }

    /// Enqueue a single URI; returns the daemon's job id (gid).
    pub async fn add_uri(&self, url: &str, dir: &str, out: &str) -> Result<String, DownloadError> {
        let result = self
            .call(
                "aria2.addUri",
                vec![
                    json!([url]),
                    json!({ "dir": dir, "out": out }),
                ],
            )
            .await?;
        result
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| DownloadError::Rpc("addUri returned no gid".into()))
    }

    pub async fn tell_status(&self, gid: &str) -> Result<JobStatus, DownloadError> {
        let result = self.call("aria2.tellStatus", vec![json!(gid)]).await?;
        serde_json::from_value(result).map_err(|e| DownloadError::Rpc(e.to_string()))
    }

    pub async fn remove(&self, gid: &str) -> Result<(), DownloadError> {
        self.call("aria2.remove", vec![json!(gid)]).await?;
        Ok(())
    }

    async fn call(&self, method: &str, mut params: Vec<Value>) -> Result<Value, DownloadError> {
        // The shared secret, when configured, rides as the first positional
        // parameter in token form.
        if let Some(secret) = &self.secret {
            params.insert(0, json!(format!("token:{secret}")));
        }

        let body = json!({
            "jsonrpc": "2.0",
            "id": "submux",
            "method": method,
            "params": params,
        });

        let response = self.http.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| DownloadError::Rpc(format!("bad rpc response: {e}")))?;

        if let Some(error) = payload.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown rpc error");
            return Err(DownloadError::Rpc(format!("{method}: {message}")));
        }
        if !status.is_success() {
            return Err(DownloadError::Network(format!("{method}: http {status}")));
        }

        payload
            .get("result")
            .cloned()
            .ok_or_else(|| DownloadError::Rpc(format!("{method}: missing result")))
    }
}
