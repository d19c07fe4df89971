use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::time::Duration;

use crate::config::load_config;
use crate::data::{ErddapData, GridDataset, Table};
use crate::error::format_erddap_error;
use crate::metadata::{GridStructure, InfoResponse};
use crate::protocol::Protocol;
use crate::request::FetchRequest;
use crate::util::urljoin;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base ERDDAP URL, typically `https://<host>/erddap`.
    pub url: String,
    /// Whether to verify TLS certificates.
    pub verify: bool,
}

/// A blocking HTTP client for one ERDDAP server.
///
/// The client holds no per-request state; every fetch is described by a
/// [`FetchRequest`] and performed in a single attempt. Retrying lives in
/// [`fetch_with_retries`](crate::fetch_with_retries) so attempt counts stay
/// exact.
#[derive(Debug, Clone)]
pub struct Client {
    server: String,
    verify: bool,

    timeout: Duration,
    progress: bool,

    http: HttpClient,
}

impl Client {
    /// Creates a client using the `ERDDAP_URL` environment variable and/or
    /// `.erddaprc`.
    ///
    /// This is equivalent to `Client::new(None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `url`/`verify` arguments
    /// - the `ERDDAP_URL` environment variable
    /// - a config file from `ERDDAP_RC` or `.erddaprc`
    pub fn new(url: Option<String>, verify: Option<bool>) -> Result<Self> {
        let cfg = load_config(url, verify)?;
        Self::build(cfg)
    }

    /// Creates a client for an explicitly given server, bypassing the
    /// configuration lookup.
    pub fn for_server(server: &str) -> Result<Self> {
        Self::build(ClientConfig {
            url: server.to_string(),
            verify: true,
        })
    }

    fn build(cfg: ClientConfig) -> Result<Self> {
        let timeout = Duration::from_secs(60);
        let http = build_http(cfg.verify, timeout)?;

        Ok(Self {
            server: cfg.url,
            verify: cfg.verify,
            timeout,
            progress: true,
            http,
        })
    }

    /// Replaces the per-request timeout.
    ///
    /// reqwest fixes the timeout at build time, so the inner client is
    /// rebuilt.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.timeout = timeout;
        self.http = build_http(self.verify, self.timeout)?;
        Ok(self)
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Performs one fetch attempt for the request, returning the decoded
    /// result or the first error encountered.
    pub fn fetch(&self, request: &FetchRequest) -> Result<ErddapData> {
        match request.protocol() {
            Protocol::Griddap => Ok(ErddapData::Grid(self.fetch_grid(request)?)),
            Protocol::Tabledap => Ok(ErddapData::Table(self.fetch_table(request)?)),
        }
    }

    fn fetch_grid(&self, request: &FetchRequest) -> Result<GridDataset> {
        let info = self.dataset_info(request.dataset_id())?;
        let grid = GridStructure::from_info(&info)?;

        let url = request.griddap_url(&grid)?;
        let body = self.get_csv(&url)?;

        let table = Table::from_csv(&body)
            .with_context(|| format!("decoding griddap CSV from {url}"))?;
        GridDataset::from_table(&table, &grid.axis_names())
    }

    fn fetch_table(&self, request: &FetchRequest) -> Result<Table> {
        let url = request.tabledap_url();
        let body = self.get_csv(&url)?;

        Table::from_csv(&body).with_context(|| format!("decoding tabledap CSV from {url}"))
    }

    /// Fetches and decodes the dataset's `/info/{id}/index.json` metadata.
    pub(crate) fn dataset_info(&self, dataset_id: &str) -> Result<InfoResponse> {
        let url = urljoin(&self.server, &format!("info/{dataset_id}/index.json"));
        self.get_json(&url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("could not connect to {url}"))?;

        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        if !status.is_success() {
            return Err(format_erddap_error(status, url, &text));
        }

        serde_json::from_str::<T>(&text)
            .with_context(|| format!("failed to parse ERDDAP JSON (url={url}, status={status})"))
    }

    fn get_csv(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("could not connect to {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(format_erddap_error(status, url, &text));
        }

        self.read_body(resp)
    }

    fn read_body(&self, mut resp: Response) -> Result<Vec<u8>> {
        let total = resp.content_length();

        let pb = match (self.progress, total) {
            (true, Some(len)) => {
                let pb = ProgressBar::new(len);
                pb.set_style(
                    ProgressStyle::with_template(
                        "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
                    )
                    .unwrap()
                    .progress_chars("=>-"),
                );
                Some(pb)
            }
            _ => None,
        };

        let mut out = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = match resp.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => return Err(e).context("download interrupted")?,
            };
            out.extend_from_slice(&buf[..n]);
            if let Some(pb) = &pb {
                pb.inc(n as u64);
            }
        }

        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }

        Ok(out)
    }
}

fn build_http(verify: bool, timeout: Duration) -> Result<HttpClient> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("erddapy-rs/{}", env!("CARGO_PKG_VERSION")))
            .unwrap_or(HeaderValue::from_static("erddapy-rs")),
    );

    let mut builder = HttpClient::builder()
        .default_headers(default_headers)
        .timeout(timeout);

    if !verify {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().context("failed to build HTTP client")
}
