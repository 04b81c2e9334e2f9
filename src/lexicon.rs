//! Human-readable descriptions served by the controller itself.
//!
//! The EasyCon web interface ships a `dictionary.js` with localized labels for every
//! wire tag and a `hpType.csv` table naming the model series for each heat pump type
//! code. Neither participates in decoding; they only make output friendlier.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::tags::TagIndex;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
    German,
    English,
    French,
}

impl Language {
    fn index(&self) -> usize {
        match self {
            Language::German => 0,
            Language::English => 1,
            Language::French => 2,
        }
    }
}

/// The parsed `dictionary.js` contents: wire tag key to its localized labels.
pub struct Lexicon {
    entries: HashMap<String, [Option<String>; 3]>,
}

static X_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\x([0-9a-fA-F]{2})").expect("x escape pattern"));
static U_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\u([0-9a-fA-F]{4})").expect("u escape pattern"));
static THREE_LOCALES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"lng(\w+)=\["([^"]*)","([^"]*)","([^"]*)"\]"#).expect("three locale pattern")
});
static TWO_LOCALES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"lng(\w+)=\["([^"]*)","([^"]*)"\]"#).expect("two locale pattern")
});
static ONE_LOCALE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"lng(\w+)="([^"]*)""#).expect("one locale pattern"));
static ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"lng(\w+)=lng(\w+)").expect("alias pattern"));

/// The dictionary escapes everything outside ASCII as `\xNN` or `\uNNNN`.
fn unescape(source: &str) -> String {
    fn replace(captures: &Captures) -> String {
        let code = u32::from_str_radix(&captures[1], 16).expect("matched hex digits");
        char::from_u32(code).map(String::from).unwrap_or_default()
    }
    let text = X_ESCAPE.replace_all(source, replace);
    U_ESCAPE.replace_all(&text, replace).into_owned()
}

impl Lexicon {
    pub fn parse(source: &str) -> Lexicon {
        let text = unescape(source);
        let mut entries = HashMap::new();
        for captures in THREE_LOCALES.captures_iter(&text) {
            entries.insert(
                captures[1].to_string(),
                [Some(captures[2].to_string()), Some(captures[3].to_string()), Some(captures[4].to_string())],
            );
        }
        for captures in TWO_LOCALES.captures_iter(&text) {
            entries.insert(
                captures[1].to_string(),
                [Some(captures[2].to_string()), Some(captures[3].to_string()), None],
            );
        }
        for captures in ONE_LOCALE.captures_iter(&text) {
            // A single label applies to every locale.
            let label = captures[2].to_string();
            entries.insert(
                captures[1].to_string(),
                [Some(label.clone()), Some(label.clone()), Some(label)],
            );
        }
        for captures in ALIAS.captures_iter(&text) {
            if let Some(target) = entries.get(&captures[2]).cloned() {
                entries.insert(captures[1].to_string(), target);
            }
        }
        Lexicon { entries }
    }

    pub fn get(&self, key: &str, language: Language) -> Option<&str> {
        let labels = self.entries.get(key)?;
        labels[language.index()].as_deref().filter(|label| !label.is_empty())
    }

    /// Dictionary key for a tag: its first wire tag, with the bit index appended for
    /// bitfield tags (`I51_3` for the compressor state).
    pub fn for_tag(&self, tag: TagIndex, language: Language) -> Option<&str> {
        let key = match tag.bit() {
            Some(bit) => format!("{}_{}", tag.wire_tags()[0], bit),
            None => tag.wire_tags()[0].to_string(),
        };
        self.get(&key, language)
    }
}

/// Look up the model series for a heat pump type code in the `hpType.csv` table.
///
/// Rows are indexed by the type code itself; the series name is the third column.
pub fn heatpump_series(table: &str, type_code: i64) -> Option<String> {
    let row = table.lines().nth(usize::try_from(type_code).ok()?)?;
    row.split(';').nth(2).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_entry_shape() {
        let lexicon = Lexicon::parse(concat!(
            "var lngA1=[\"Au\\xDFentemperatur\",\"Outside temperature\",\"Temp. ext\\xE9rieure\"];\n",
            "var lngA2=[\"Mittel 1h\",\"Average 1h\"];\n",
            "var lngSOK=\"OK\";\n",
            "var lngA3=lngA1;\n",
        ));
        assert_eq!(lexicon.get("A1", Language::German), Some("Außentemperatur"));
        assert_eq!(lexicon.get("A1", Language::French), Some("Temp. extérieure"));
        assert_eq!(lexicon.get("A2", Language::English), Some("Average 1h"));
        assert_eq!(lexicon.get("A2", Language::French), None);
        assert_eq!(lexicon.get("SOK", Language::French), Some("OK"));
        assert_eq!(lexicon.get("A3", Language::English), Some("Outside temperature"));
        assert_eq!(lexicon.get("A4", Language::German), None);
    }

    #[test]
    fn unicode_escapes_unfold() {
        assert_eq!(unescape(r"gr\xF6\xDFer"), "größer");
        assert_eq!(unescape(r"degré"), "degré");
    }

    #[test]
    fn empty_labels_count_as_missing() {
        let lexicon = Lexicon::parse("lngD1=[\"\",\"present\",\"\"]");
        assert_eq!(lexicon.get("D1", Language::German), None);
        assert_eq!(lexicon.get("D1", Language::English), Some("present"));
    }

    #[test]
    fn bitfield_tags_use_suffixed_keys() {
        let lexicon = Lexicon::parse("lngI51_3=[\"Verdichter\",\"Compressor\",\"Compresseur\"]");
        let compressor = TagIndex::from_name("STATE_COMPRESSOR").unwrap();
        assert_eq!(lexicon.for_tag(compressor, Language::English), Some("Compressor"));
    }

    #[test]
    fn series_table_is_indexed_by_type_code() {
        let table = "0;XXX;unknown\n1;AI1;Ai1 Series\n2;DS5;DS 5023\n";
        assert_eq!(heatpump_series(table, 1).as_deref(), Some("Ai1 Series"));
        assert_eq!(heatpump_series(table, 9), None);
        assert_eq!(heatpump_series(table, -1), None);
    }
}
