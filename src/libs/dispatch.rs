use std::borrow::Cow;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use tracing::{Instrument, debug, debug_span, error};
use uuid::Uuid;

use crate::libs::error::{ExplorerError, Result};
use crate::libs::explorer::{Explorer, Payload};
use crate::libs::query_builder::Page;

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Payload::Tables(tables) => map.serialize_entry("tables", tables)?,
            Payload::Records(records) => map.serialize_entry("records", records)?,
            Payload::Record(record) => map.serialize_entry("record", record)?,
            Payload::Created { key, id } => map.serialize_entry(key, id)?,
            Payload::Updated(n) => map.serialize_entry("updated", n)?,
            Payload::Deleted(n) => map.serialize_entry("deleted", n)?,
        }
        map.end()
    }
}

/// `{"response": ...}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    Response(Payload),
    Error(String),
}

/// What the transport writes back: a status code and an envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub envelope: Envelope,
}

impl Reply {
    pub fn ok(payload: Payload) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: Envelope::Response(payload),
        }
    }

    pub fn error(err: &ExplorerError) -> Self {
        Self {
            status: err.status(),
            envelope: Envelope::Error(err.to_string()),
        }
    }
}

/// One of the six things a request can ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation<'a> {
    ListTables,
    ListRecords { table: Cow<'a, str> },
    GetRecord { table: Cow<'a, str>, id: Cow<'a, str> },
    CreateRecord { table: Cow<'a, str> },
    UpdateRecord { table: Cow<'a, str>, id: Cow<'a, str> },
    DeleteRecord { table: Cow<'a, str>, id: Cow<'a, str> },
}

/// Splits a raw request path into percent-decoded segments; `/` and the empty
/// path have none. Splitting happens first, so `%2F` stays inside its segment.
/// A segment that does not decode to UTF-8 is kept as written.
pub fn segments(path: &str) -> Vec<Cow<'_, str>> {
    let path = path.trim_matches('/');
    if path.is_empty() {
        return Vec::new();
    }
    path.split('/')
        .map(|part| urlencoding::decode(part).unwrap_or(Cow::Borrowed(part)))
        .collect()
}

/// Routes on method and segment count only.
pub fn classify<'a>(method: &Method, path: &'a str) -> Result<Operation<'a>> {
    let parts = segments(path);
    let op = match (method, parts.as_slice()) {
        (&Method::GET, []) => Operation::ListTables,
        (&Method::GET, [table]) => Operation::ListRecords { table: table.clone() },
        (&Method::GET, [table, id]) => Operation::GetRecord {
            table: table.clone(),
            id: id.clone(),
        },
        (&Method::PUT, [table]) => Operation::CreateRecord { table: table.clone() },
        (&Method::POST, [table, id]) => Operation::UpdateRecord {
            table: table.clone(),
            id: id.clone(),
        },
        (&Method::DELETE, [table, id]) => Operation::DeleteRecord {
            table: table.clone(),
            id: id.clone(),
        },
        _ => return Err(ExplorerError::UnknownRoute),
    };
    Ok(op)
}

/// An inbound request, already taken apart by the transport.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: &'a [(String, String)],
    pub body: &'a [u8],
}

impl<'a> Request<'a> {
    /// First value given for `name`.
    pub fn query_param(&self, name: &str) -> Option<&'a str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Stateless front door: classify, run, wrap.
#[derive(Clone)]
pub struct Dispatcher {
    explorer: Arc<Explorer>,
}

impl Dispatcher {
    pub fn new(explorer: Arc<Explorer>) -> Self {
        Self { explorer }
    }

    pub fn explorer(&self) -> &Explorer {
        &self.explorer
    }

    pub async fn dispatch(&self, request: Request<'_>) -> Reply {
        let span = debug_span!(
            "dispatch",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            path = request.path,
        );

        async move {
            match self.run(request).await {
                Ok(payload) => Reply::ok(payload),
                Err(err) => {
                    if err.is_client_error() {
                        debug!(%err, "request rejected");
                    } else {
                        error!(error = ?err, "request failed");
                    }
                    Reply::error(&err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: Request<'_>) -> Result<Payload> {
        let explorer = &self.explorer;
        match classify(request.method, request.path)? {
            Operation::ListTables => Ok(explorer.list_tables()),
            Operation::ListRecords { table } => {
                let page = Page::from_query(request.query_param("limit"), request.query_param("offset"));
                explorer.list_records(&table, page).await
            }
            Operation::GetRecord { table, id } => explorer.get_record(&table, &id).await,
            Operation::CreateRecord { table } => explorer.create_record(&table, request.body).await,
            Operation::UpdateRecord { table, id } => {
                explorer.update_record(&table, &id, request.body).await
            }
            Operation::DeleteRecord { table, id } => explorer.delete_record(&table, &id).await,
        }
    }
}
