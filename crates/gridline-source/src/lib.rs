// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use gridline_app::{Record, RecordId};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Http(Url),
    File(PathBuf),
}

impl SourceLocation {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            bail!("data location is empty -- set [source].path or pass --data");
        }
        let lowered = raw.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            let url = Url::parse(raw).with_context(|| format!("parse data url {raw:?}"))?;
            return Ok(Self::Http(url));
        }
        if let Some(path) = raw.strip_prefix("file://") {
            return Ok(Self::File(PathBuf::from(path)));
        }
        Ok(Self::File(PathBuf::from(raw)))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(url) => f.write_str(url.as_str()),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Paged response shape served by the demo API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope {
    pub data: Vec<Record>,
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub total_pages: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordPayload {
    Records(Vec<Record>),
    Envelope(ApiEnvelope),
}

impl RecordPayload {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let first = bytes.iter().copied().find(|byte| !byte.is_ascii_whitespace());
        match first {
            Some(b'[') => {
                let records = serde_json::from_slice(bytes).context("decode record array")?;
                Ok(Self::Records(records))
            }
            Some(b'{') => {
                let envelope: ApiEnvelope =
                    serde_json::from_slice(bytes).context("decode record envelope")?;
                Ok(Self::Envelope(envelope))
            }
            Some(_) => bail!("record payload must be a JSON array or an object with a data field"),
            None => bail!("record payload is empty"),
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        match self {
            Self::Records(records) => records,
            Self::Envelope(envelope) => {
                if let Some(total) = envelope.total
                    && total != envelope.data.len()
                {
                    debug!(
                        total,
                        received = envelope.data.len(),
                        "envelope holds a partial page"
                    );
                }
                envelope.data
            }
        }
    }
}

pub fn ensure_unique_ids(records: &[Record]) -> Result<()> {
    let mut seen: BTreeSet<RecordId> = BTreeSet::new();
    for record in records {
        if !seen.insert(record.id) {
            bail!("duplicate record id {} -- ids must be unique", record.id);
        }
    }
    Ok(())
}

/// Identity of a cached response. The body is part of the key so two requests
/// to one location with different payloads never alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub method: String,
    pub location: String,
    pub body: Option<String>,
}

impl CacheKey {
    pub fn new(method: &str, location: &SourceLocation, body: Option<&str>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            location: location.to_string(),
            body: body.map(str::to_owned),
        }
    }

    pub fn get(location: &SourceLocation) -> Self {
        Self::new("GET", location, None)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    stored_at: Instant,
    records: Vec<Record>,
}

/// Time-bounded response cache owned by whoever builds the [`Loader`].
#[derive(Debug, Clone)]
pub struct ResponseCache {
    ttl: Duration,
    entries: HashMap<CacheKey, CacheEntry>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&[Record]> {
        self.get_at(key, Instant::now())
    }

    /// Fresh while strictly younger than the TTL.
    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<&[Record]> {
        let entry = self.entries.get(key)?;
        if now.saturating_duration_since(entry.stored_at) < self.ttl {
            Some(&entry.records)
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: CacheKey, records: Vec<Record>) {
        self.insert_at(key, records, Instant::now());
    }

    pub fn insert_at(&mut self, key: CacheKey, records: Vec<Record>, now: Instant) {
        if !self.is_enabled() {
            return;
        }
        self.entries.insert(
            key,
            CacheEntry {
                stored_at: now,
                records,
            },
        );
    }

    /// Drops stale entries and returns how many were removed.
    pub fn evict_expired_at(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.stored_at) < ttl);
        before - self.entries.len()
    }

    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

#[derive(Debug)]
pub struct Loader {
    http: HttpClient,
    timeout: Duration,
    cache: ResponseCache,
}

impl Loader {
    pub fn new(timeout: Duration, cache: ResponseCache) -> Result<Self> {
        if timeout.is_zero() {
            bail!("source timeout must be positive -- set [source].timeout, e.g. \"5s\"");
        }
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            timeout,
            cache,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Serves a fresh cached copy when there is one, otherwise fetches.
    pub fn load(&mut self, location: &SourceLocation) -> Result<Vec<Record>> {
        let key = CacheKey::get(location);
        let now = Instant::now();
        let evicted = self.cache.evict_expired_at(now);
        if evicted > 0 {
            debug!(evicted, "evicted stale responses");
        }
        if let Some(records) = self.cache.get_at(&key, now) {
            debug!(%location, rows = records.len(), "cache hit");
            return Ok(records.to_vec());
        }
        debug!(%location, "cache miss");
        self.fetch_and_store(location, key)
    }

    /// Always goes to the source and replaces any cached copy.
    pub fn refetch(&mut self, location: &SourceLocation) -> Result<Vec<Record>> {
        let key = CacheKey::get(location);
        if self.cache.invalidate(&key) {
            debug!(%location, "invalidated cached response");
        }
        self.fetch_and_store(location, key)
    }

    fn fetch_and_store(&mut self, location: &SourceLocation, key: CacheKey) -> Result<Vec<Record>> {
        let bytes = match location {
            SourceLocation::Http(url) => self.fetch_http(url)?,
            SourceLocation::File(path) => read_file(path)?,
        };
        let records = RecordPayload::decode(&bytes)
            .with_context(|| format!("load records from {location}"))?
            .into_records();
        ensure_unique_ids(&records).with_context(|| format!("load records from {location}"))?;
        info!(%location, rows = records.len(), "loaded records");
        self.cache.insert(key, records.clone());
        Ok(records)
    }

    fn fetch_http(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .map_err(|error| connection_error(url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(%url, status = status.as_u16(), "record fetch failed");
            return Err(clean_error_response(status, &body));
        }

        let bytes = response.bytes().context("read response body")?;
        Ok(bytes.to_vec())
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| {
        format!(
            "read data file {} -- check [source].path or --data",
            path.display()
        )
    })
}

fn connection_error(url: &Url, error: reqwest::Error) -> anyhow::Error {
    anyhow!("cannot reach {url} -- check that the server is running ({error})")
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.error.or(parsed.message)
        && !message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}
