use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, trace, warn};

use crate::codec;
use crate::lexicon::{self, Language, Lexicon};
use crate::protocol::{self, MAX_TAGS_PER_REQUEST, read_query, response_status, tag_records, write_query};
use crate::tags::{TagIndex, Value};

const LOGIN_PATH: &str = "cgi/login";
const READ_PATH: &str = "cgi/readTags";
const WRITE_PATH: &str = "cgi/writeTags";
const DICTIONARY_PATH: &str = "easycon/js/dictionary.js";
const HP_TYPE_PATH: &str = "easycon/hpType.csv";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not construct the HTTP client")]
    CreateClient(#[source] reqwest::Error),
    #[error("request to `{1}` failed")]
    Request(#[source] reqwest::Error, String),
    #[error("heat pump responded to `{1}` with HTTP status {0}")]
    HttpStatus(reqwest::StatusCode, String),
    #[error("could not read the response body from `{1}`")]
    Body(#[source] reqwest::Error, String),
    #[error("login was rejected with status `{0}`")]
    LoginRejected(String),
    #[error("the heat pump sent a malformed response")]
    Protocol(#[from] protocol::Error),
    #[error("a tag value could not be converted")]
    Codec(#[from] codec::Error),
    #[error("tag {0} is not writeable")]
    ReadOnlyTag(&'static str),
}

#[derive(clap::Parser, Clone)]
#[group(id = "connection::Args")]
pub struct Args {
    /// Host name or IP address of the EcoTouch controller.
    #[arg(long)]
    pub host: String,

    /// Account to log in with. Factory firmware ships with the default accepted here.
    #[arg(long, default_value = "waterkotte")]
    pub username: String,

    #[arg(long, default_value = "waterkotte")]
    pub password: String,

    /// Consider any single request failed if the controller does not respond in this
    /// amount of time.
    #[arg(long, default_value = "3s")]
    pub timeout: humantime::Duration,
}

/// The GET transport the client drives.
///
/// The real implementation is [`HttpTransport`]; tests substitute a scripted one. The
/// session cookie handed out by a successful login lives inside the transport, so the
/// client itself stays free of mutable session state.
pub trait Transport {
    fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> impl std::future::Future<Output = Result<String, Error>>;
}

pub struct HttpTransport {
    host: String,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(host: &str, timeout: std::time::Duration) -> Result<Self, Error> {
        // The controller identifies the session through an IDALToken cookie.
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(Error::CreateClient)?;
        Ok(Self { host: host.to_string(), http })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<String, Error> {
        let url = format!("http://{}/{}", self.host, path);
        trace!(message = "issuing request", url, ?query);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Request(e, url.clone()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus(status, url));
        }
        response.text().await.map_err(|e| Error::Body(e, url))
    }
}

/// Client for one EcoTouch controller.
///
/// [`Client::login`] must succeed before tags can be read or written; the controller
/// rejects anything else until then. The client never re-logins on its own -- when a
/// request starts failing, the caller decides whether to log in again.
pub struct Client<T = HttpTransport> {
    transport: T,
    lexicon: Option<Lexicon>,
    hp_types: Option<String>,
}

impl Client<HttpTransport> {
    pub fn new(args: &Args) -> Result<Self, Error> {
        Ok(Self::with_transport(HttpTransport::new(&args.host, *args.timeout)?))
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport, lexicon: None, hp_types: None }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), Error> {
        let query = [
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
        ];
        let body = self.transport.get(LOGIN_PATH, &query).await?;
        let status = response_status(&body)?;
        if status != "S_OK" {
            return Err(Error::LoginRejected(status.to_string()));
        }
        info!(message = "logged in", username);
        Ok(())
    }

    /// Read the given tags, batching the underlying wire tags as needed.
    ///
    /// Each tag contributes its wire tags independently; batches are bounded by
    /// [`MAX_TAGS_PER_REQUEST`]. Results are merged by wire tag name, so tags sharing
    /// a register come out consistent within one call.
    pub async fn read_values(
        &self,
        tags: &[TagIndex],
    ) -> Result<HashMap<TagIndex, Value>, Error> {
        let wire = tags
            .iter()
            .flat_map(|tag| tag.wire_tags().iter().copied())
            .collect::<Vec<&'static str>>();
        let mut raw = BTreeMap::new();
        for batch in wire.chunks(MAX_TAGS_PER_REQUEST) {
            debug!(message = "reading a batch", tags = batch.len());
            let body = self.transport.get(READ_PATH, &read_query(batch)).await?;
            let records = tag_records(&body);
            for &tag in batch {
                let record = *records.get(tag).ok_or(protocol::Error::TagNotFound(tag))?;
                if record.status != "S_OK" {
                    warn!(message = "tag reported a problem", tag, status = record.status);
                }
                raw.insert(tag, record.raw.to_string());
            }
        }
        let mut values = HashMap::with_capacity(tags.len());
        for tag in tags {
            let parts = tag
                .wire_tags()
                .iter()
                .map(|&wire| {
                    raw.get(wire)
                        .map(|value| value.as_str())
                        .ok_or(protocol::Error::TagNotFound(wire))
                })
                .collect::<Result<Vec<&str>, _>>()?;
            values.insert(*tag, tag.decode(&parts)?);
        }
        Ok(values)
    }

    pub async fn read_value(&self, tag: TagIndex) -> Result<Value, Error> {
        let mut values = self.read_values(std::slice::from_ref(&tag)).await?;
        let missing = protocol::Error::TagNotFound(tag.wire_tags()[0]);
        values.remove(&tag).ok_or(Error::Protocol(missing))
    }

    /// Write the given tag/value pairs in one batched request.
    ///
    /// All pairs are verified and encoded before any network traffic. When two entries
    /// address the same wire tag, the later entry wins.
    pub async fn write_values(&self, entries: &[(TagIndex, Value)]) -> Result<(), Error> {
        let mut pending = BTreeMap::<&'static str, String>::new();
        for (tag, value) in entries {
            if !tag.mode().writeable() {
                return Err(Error::ReadOnlyTag(tag.name()));
            }
            for (wire, raw) in tag.encode(value)? {
                pending.insert(wire, raw);
            }
        }
        let pairs = pending
            .iter()
            .map(|(wire, raw)| (*wire, raw.as_str()))
            .collect::<Vec<(&'static str, &str)>>();
        for batch in pairs.chunks(MAX_TAGS_PER_REQUEST) {
            debug!(message = "writing a batch", tags = batch.len());
            let body = self.transport.get(WRITE_PATH, &write_query(batch)).await?;
            let records = tag_records(&body);
            for &(wire, _) in batch {
                let record = records.get(wire).ok_or(protocol::Error::TagNotFound(wire))?;
                if record.status != "S_OK" {
                    warn!(
                        message = "write acknowledged with a problem",
                        tag = wire,
                        status = record.status,
                    );
                }
            }
        }
        Ok(())
    }

    pub async fn write_value(&self, tag: TagIndex, value: Value) -> Result<(), Error> {
        self.write_values(&[(tag, value)]).await
    }

    /// Human-readable description of a tag from the controller's own dictionary.
    ///
    /// The dictionary is downloaded once per client and cached.
    pub async fn tag_description(
        &mut self,
        tag: TagIndex,
        language: Language,
    ) -> Result<Option<&str>, Error> {
        if self.lexicon.is_none() {
            let body = self.transport.get(DICTIONARY_PATH, &[]).await?;
            self.lexicon = Some(Lexicon::parse(&body));
        }
        Ok(self.lexicon.as_ref().and_then(|lexicon| lexicon.for_tag(tag, language)))
    }

    /// Resolve a heat pump type code (the `HEATPUMP_TYPE` tag) to its model series.
    pub async fn heatpump_series(&mut self, type_code: i64) -> Result<Option<String>, Error> {
        if self.hp_types.is_none() {
            let body = self.transport.get(HP_TYPE_PATH, &[]).await?;
            self.hp_types = Some(body);
        }
        let table = self.hp_types.as_deref().unwrap_or_default();
        Ok(lexicon::heatpump_series(table, type_code))
    }
}
