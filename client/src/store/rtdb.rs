//! Firebase Realtime Database over its REST API.
//!
//! Reads use `X-Firebase-ETag` so writes can be conditional on `if-match`;
//! two clients racing from the same turn cannot both succeed even before the
//! turn-number check runs. Change notifications come from the
//! `text/event-stream` endpoint.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::Utc;
use duet_protocol::{
    commit, decode_record, CommitError, ParseError, RecordPatch, RemoteBattleRecord, SseParser,
    StreamEvent,
};
use futures_util::future::BoxFuture;
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::{header, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{BattleStore, ChangeStream};
use crate::error::StoreError;

const ETAG_REQUEST_HEADER: &str = "X-Firebase-ETag";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtdbConfig {
    /// e.g. `https://my-project-default-rtdb.firebaseio.com`
    pub base_url: String,

    /// Sent as the `auth` query parameter
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Collection holding battle records
    #[serde(default = "default_root")]
    pub root: String,
}

fn default_root() -> String {
    "battles".to_string()
}

impl RtdbConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            root: default_root(),
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// REST URL of one battle record
    pub fn record_url(&self, battle_id: &str) -> String {
        format!(
            "{}/{}/{}.json",
            self.base_url.trim_end_matches('/'),
            self.root.trim_matches('/'),
            battle_id
        )
    }
}

#[derive(Debug, Clone)]
pub struct RtdbStore {
    http: reqwest::Client,
    config: RtdbConfig,
}

impl RtdbStore {
    pub fn new(config: RtdbConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(http: reqwest::Client, config: RtdbConfig) -> Self {
        Self { http, config }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.auth_token {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }

    /// Current record and the ETag to write against
    async fn fetch(&self, battle_id: &str) -> Result<(Option<RemoteBattleRecord>, String), StoreError> {
        let url = self.config.record_url(battle_id);
        let response = self
            .authorize(self.http.get(&url).header(ETAG_REQUEST_HEADER, "true"))
            .send()
            .await?;
        let response = check_status(response, &url)?;

        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| StoreError::Parse(ParseError::MissingField("ETag".into())))?;
        let value: serde_json::Value = response.json().await?;
        Ok((decode_record(value)?, etag))
    }
}

fn check_status(response: Response, url: &str) -> Result<Response, StoreError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(StoreError::Status {
            status: response.status().as_u16(),
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl BattleStore for RtdbStore {
    async fn create_or_update(
        &self,
        battle_id: &str,
        patch: RecordPatch,
    ) -> Result<RemoteBattleRecord, StoreError> {
        let (existing, etag) = self.fetch(battle_id).await?;
        let next = commit(existing.as_ref(), battle_id, patch.clone(), Utc::now())?;

        let url = self.config.record_url(battle_id);
        let response = self
            .authorize(self.http.put(&url).header(header::IF_MATCH, etag))
            .json(&next)
            .send()
            .await?;

        if response.status() == StatusCode::PRECONDITION_FAILED {
            // Someone wrote between our read and write; report it the way the
            // commit would have against the fresh record.
            let (current, _) = self.fetch(battle_id).await?;
            tracing::warn!(
                battle_id,
                expected_turn = ?patch.expected_turn,
                found_turn = ?current.as_ref().map(|r| r.turn_number),
                "conditional write lost a race"
            );
            let conflict = commit(current.as_ref(), battle_id, patch.clone(), Utc::now())
                .err()
                .unwrap_or(CommitError::StaleWrite {
                    expected: patch.expected_turn.unwrap_or(0),
                    found: current.map(|r| r.turn_number).unwrap_or(0),
                });
            return Err(conflict.into());
        }

        check_status(response, &url)?;
        Ok(next)
    }

    async fn get(&self, battle_id: &str) -> Result<Option<RemoteBattleRecord>, StoreError> {
        Ok(self.fetch(battle_id).await?.0)
    }

    async fn subscribe(&self, battle_id: &str) -> Result<ChangeStream, StoreError> {
        let url = self.config.record_url(battle_id);
        let response = self
            .authorize(self.http.get(&url).header(header::ACCEPT, "text/event-stream"))
            .send()
            .await?;
        let response = check_status(response, &url)?;
        tracing::debug!(battle_id, "event stream open");

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(StoreError::from))
            .boxed();
        let store = self.clone();
        let battle_id = battle_id.to_string();
        let refetch: Refetch = Box::new(move || {
            let store = store.clone();
            let battle_id = battle_id.clone();
            Box::pin(async move { store.get(&battle_id).await })
        });
        Ok(EventStream::new(bytes, refetch).into_changes())
    }
}

type ByteStream = BoxStream<'static, Result<Vec<u8>, StoreError>>;

/// Reads the whole record back after a partial update
type Refetch =
    Box<dyn FnMut() -> BoxFuture<'static, Result<Option<RemoteBattleRecord>, StoreError>> + Send>;

/// Turns raw event-stream bytes into records
struct EventStream {
    bytes: ByteStream,
    parser: SseParser,
    queue: VecDeque<StreamEvent>,
    refetch: Refetch,
    /// A record has been delivered; from here on a missing one was deleted
    seen: bool,
    finished: bool,
}

impl EventStream {
    fn new(bytes: ByteStream, refetch: Refetch) -> Self {
        Self {
            bytes,
            parser: SseParser::new(),
            queue: VecDeque::new(),
            refetch,
            seen: false,
            finished: false,
        }
    }

    fn into_changes(self) -> ChangeStream {
        stream::unfold(self, Self::next_record).boxed()
    }

    /// `None` before the record exists is "not created yet" and is skipped
    fn found(
        &mut self,
        record: Option<RemoteBattleRecord>,
    ) -> Option<Result<RemoteBattleRecord, StoreError>> {
        match record {
            Some(record) => {
                self.seen = true;
                Some(Ok(record))
            }
            None if self.seen => {
                self.finished = true;
                Some(Err(CommitError::NotFound.into()))
            }
            None => None,
        }
    }

    async fn next_record(
        mut self,
    ) -> Option<(Result<RemoteBattleRecord, StoreError>, Self)> {
        loop {
            if self.finished {
                return None;
            }

            if let Some(event) = self.queue.pop_front() {
                let item = match event {
                    StreamEvent::Put { path, data } if path == "/" => match decode_record(data) {
                        Ok(record) => self.found(record),
                        Err(e) => Some(Err(e.into())),
                    },
                    StreamEvent::Put { .. } | StreamEvent::Patch { .. } => {
                        // partial update; read the whole record back
                        match (self.refetch)().await {
                            Ok(record) => self.found(record),
                            Err(e) => Some(Err(e)),
                        }
                    }
                    StreamEvent::KeepAlive => None,
                    StreamEvent::Raw(name) => {
                        tracing::debug!(event = %name, "ignoring stream event");
                        None
                    }
                    StreamEvent::Cancel => {
                        self.finished = true;
                        Some(Err(StoreError::Revoked("read permission cancelled".into())))
                    }
                    StreamEvent::AuthRevoked => {
                        self.finished = true;
                        Some(Err(StoreError::Revoked("auth token revoked".into())))
                    }
                };
                match item {
                    Some(result) => return Some((result, self)),
                    None => continue,
                }
            }

            match self.bytes.next().await {
                Some(Ok(chunk)) => match self.parser.push(&chunk) {
                    Ok(events) => self.queue.extend(events),
                    Err(e) => {
                        self.finished = true;
                        return Some((Err(e.into()), self));
                    }
                },
                Some(Err(e)) => {
                    self.finished = true;
                    return Some((Err(e), self));
                }
                None => return None,
            }
        }
    }
}
