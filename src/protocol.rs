//! The line-oriented CGI tag protocol.
//!
//! Every request is an HTTP GET against `/cgi/...` with the tag list spread over
//! numbered query parameters. The response body is plain text; each requested tag is
//! acknowledged with a two-line record:
//!
//! ```text
//! #A1<TAB>S_OK
//! 192<TAB>86
//! ```
//!
//! The number opening the second line is controller-internal and ignored. Values are
//! always signed decimal integers; scaling and reassembly happen in the codec layer.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// The controller cannot address more wire tags than this in a single request.
pub const MAX_TAGS_PER_REQUEST: usize = 75;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("response contains no status line")]
    MissingStatus,
    #[error("tag {0} not found in the response")]
    TagNotFound(&'static str),
}

/// One acknowledged tag from a read or write response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRecord<'a> {
    /// Per-tag status token. Anything but `S_OK` is passed through, not acted upon.
    pub status: &'a str,
    /// The signed decimal value, verbatim.
    pub raw: &'a str,
}

static OVERALL_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#([A-Z_-]+)").expect("status pattern"));

static TAG_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^#(?<tag>[AID]\d+)\t(?<status>[A-Z_]+)\r?\n\d+\t(?<raw>-?\d+)")
        .expect("record pattern")
});

/// Extract the overall status token, as reported on the first `#...` line.
///
/// Only the login endpoint makes decisions based on this.
pub fn response_status(body: &str) -> Result<&str, Error> {
    let captures = OVERALL_STATUS.captures(body).ok_or(Error::MissingStatus)?;
    Ok(captures.get(1).expect("group 1 exists").as_str())
}

/// Collect every tag record in the response, keyed by wire tag name.
///
/// Should the controller repeat a tag, the first record wins, mirroring an anchored
/// search for each tag. Unknown garbage between records is skipped.
pub fn tag_records(body: &str) -> BTreeMap<&str, TagRecord<'_>> {
    let mut records = BTreeMap::new();
    for captures in TAG_RECORD.captures_iter(body) {
        let tag = captures.name("tag").expect("tag group").as_str();
        let record = TagRecord {
            status: captures.name("status").expect("status group").as_str(),
            raw: captures.name("raw").expect("raw group").as_str(),
        };
        records.entry(tag).or_insert(record);
    }
    records
}

/// Query parameters for `/cgi/readTags`: a count and `t1..tN`.
pub fn read_query(wire_tags: &[&str]) -> Vec<(String, String)> {
    let mut query = Vec::with_capacity(1 + wire_tags.len());
    query.push(("n".to_string(), wire_tags.len().to_string()));
    for (position, tag) in wire_tags.iter().enumerate() {
        query.push((format!("t{}", position + 1), tag.to_string()));
    }
    query
}

/// Query parameters for `/cgi/writeTags`: a count, the echo flag, and `tN`/`vN` pairs.
pub fn write_query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut query = Vec::with_capacity(2 + 2 * pairs.len());
    query.push(("n".to_string(), pairs.len().to_string()));
    query.push(("returnValue".to_string(), "true".to_string()));
    for (position, (tag, raw)) in pairs.iter().enumerate() {
        query.push((format!("t{}", position + 1), tag.to_string()));
        query.push((format!("v{}", position + 1), raw.to_string()));
    }
    query
}
