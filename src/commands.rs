pub mod tags {
    use crate::output;
    use crate::tags::{Codec, Mode, TagIndex};

    /// Search and output the known tag catalog.
    #[derive(clap::Parser)]
    pub struct Args {
        /// Only list tags whose name or wire tags contain this string.
        filter: Option<String>,
        #[clap(flatten)]
        output: output::Args,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not produce the tag listing")]
        Output(#[from] output::Error),
    }

    #[derive(serde::Serialize)]
    pub struct TagSchema {
        pub name: &'static str,
        pub mode: Mode,
        pub codec: Codec,
        pub wire_tags: &'static [&'static str],
        pub bit: Option<u8>,
        pub unit: Option<&'static str>,
    }

    impl TagSchema {
        pub fn new(tag: TagIndex) -> Self {
            TagSchema {
                name: tag.name(),
                mode: tag.mode(),
                codec: tag.codec(),
                wire_tags: tag.wire_tags(),
                bit: tag.bit(),
                unit: tag.unit(),
            }
        }

        pub fn is_match(&self, pattern: &str) -> bool {
            let pattern = pattern.to_uppercase();
            if self.name.contains(&pattern) {
                return true;
            }
            self.wire_tags.iter().any(|wire| wire.contains(&pattern))
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let mut output = args.output.to_output();
        output.headers(vec!["Name", "Mode", "Codec", "Wire tags", "Bit", "Unit"]);
        for tag in TagIndex::all() {
            let schema = TagSchema::new(tag);
            if let Some(pattern) = &args.filter {
                if !schema.is_match(pattern) {
                    continue;
                }
            }
            output.push(
                vec![
                    schema.name.to_string(),
                    schema.mode.to_string(),
                    <&'static str>::from(schema.codec).to_string(),
                    schema.wire_tags.join(" "),
                    schema.bit.map(|bit| bit.to_string()).unwrap_or_default(),
                    schema.unit.unwrap_or_default().to_string(),
                ],
                &schema,
            )?;
        }
        Ok(output.commit()?)
    }
}

pub mod read {
    use crate::connection::{self, Client};
    use crate::output;
    use crate::tags::{TagIndex, Value};

    /// Log in and read tags from the controller.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        connection: connection::Args,
        #[clap(flatten)]
        output: output::Args,
        /// Tags to read, by catalog name. The entire catalog when empty.
        tags: Vec<String>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("no tag named {0} is known")]
        UnknownTag(String),
        #[error("could not communicate with the controller")]
        Connection(#[from] connection::Error),
        #[error("could not produce the output")]
        Output(#[from] output::Error),
    }

    #[derive(serde::Serialize)]
    struct Reading<'a> {
        name: &'static str,
        value: &'a Value,
        unit: Option<&'static str>,
    }

    pub async fn run(args: Args) -> Result<(), Error> {
        let tags = if args.tags.is_empty() {
            TagIndex::all().collect::<Vec<_>>()
        } else {
            args.tags
                .iter()
                .map(|name| {
                    TagIndex::from_name(name).ok_or_else(|| Error::UnknownTag(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?
        };
        let client = Client::new(&args.connection)?;
        client.login(&args.connection.username, &args.connection.password).await?;
        let values = client.read_values(&tags).await?;
        let mut output = args.output.to_output();
        output.headers(vec!["Name", "Value", "Unit"]);
        for tag in &tags {
            let Some(value) = values.get(tag) else { continue };
            output.push(
                vec![
                    tag.name().to_string(),
                    value.to_string(),
                    tag.unit().unwrap_or_default().to_string(),
                ],
                &Reading { name: tag.name(), value, unit: tag.unit() },
            )?;
        }
        Ok(output.commit()?)
    }
}

pub mod write {
    use crate::connection::{self, Client};
    use crate::tags::{Codec, TagIndex, Value, WireKind};

    /// Log in and write one tag on the controller.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        connection: connection::Args,
        /// Catalog name of the tag to write.
        tag: String,
        /// The new value, in the same shape `read` displays.
        value: String,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("no tag named {0} is known")]
        UnknownTag(String),
        #[error("{1:?} does not parse as a number for tag {2}")]
        ParseNumber(#[source] std::num::ParseFloatError, String, &'static str),
        #[error("{1:?} does not parse as an integer for tag {2}")]
        ParseInteger(#[source] std::num::ParseIntError, String, &'static str),
        #[error("{1:?} does not parse as a timestamp for tag {2}")]
        ParseTimestamp(#[source] jiff::Error, String, &'static str),
        #[error("{0:?} is not a boolean; use 1, 0, true or false")]
        ParseBoolean(String),
        #[error("tag {0} cannot be written")]
        ReadOnly(&'static str),
        #[error("could not communicate with the controller")]
        Connection(#[from] connection::Error),
    }

    fn parse_value(tag: TagIndex, text: &str) -> Result<Value, Error> {
        match tag.codec() {
            Codec::Time => {
                let timestamp = text
                    .parse::<jiff::civil::DateTime>()
                    .map_err(|e| Error::ParseTimestamp(e, text.to_string(), tag.name()))?;
                Ok(Value::Time(timestamp))
            }
            Codec::FirmwareVersion | Codec::BiosVersion | Codec::BiosDate => {
                Err(Error::ReadOnly(tag.name()))
            }
            Codec::Default => match (tag.kind(), tag.bit()) {
                (WireKind::Digital, _) | (_, Some(_)) => match text {
                    "1" | "true" => Ok(Value::Bool(true)),
                    "0" | "false" => Ok(Value::Bool(false)),
                    _ => Err(Error::ParseBoolean(text.to_string())),
                },
                (WireKind::Analog, None) => {
                    let number = text
                        .parse::<f64>()
                        .map_err(|e| Error::ParseNumber(e, text.to_string(), tag.name()))?;
                    Ok(Value::Analog(number))
                }
                (WireKind::Integer, None) => {
                    let number = text
                        .parse::<i64>()
                        .map_err(|e| Error::ParseInteger(e, text.to_string(), tag.name()))?;
                    Ok(Value::Integer(number))
                }
            },
        }
    }

    pub async fn run(args: Args) -> Result<(), Error> {
        let tag =
            TagIndex::from_name(&args.tag).ok_or_else(|| Error::UnknownTag(args.tag.clone()))?;
        let value = parse_value(tag, &args.value)?;
        let client = Client::new(&args.connection)?;
        client.login(&args.connection.username, &args.connection.password).await?;
        client.write_value(tag, value).await?;
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn tag(name: &str) -> TagIndex {
            TagIndex::from_name(name).unwrap()
        }

        #[test]
        fn values_parse_per_tag_shape() {
            let parsed = parse_value(tag("HOT_WATER_TEMPERATURE_SETPOINT"), "48.5").unwrap();
            assert_eq!(parsed, Value::Analog(48.5));
            let parsed = parse_value(tag("ADAPT_HEATING"), "6").unwrap();
            assert_eq!(parsed, Value::Integer(6));
            let parsed = parse_value(tag("HOLIDAY_ENABLED"), "true").unwrap();
            assert_eq!(parsed, Value::Bool(true));
            let parsed = parse_value(tag("HOLIDAY_START_TIME"), "2019-03-01T18:02:00").unwrap();
            assert_eq!(parsed, Value::Time(jiff::civil::datetime(2019, 3, 1, 18, 2, 0, 0)));
        }

        #[test]
        fn version_tags_reject_writes_early() {
            assert!(matches!(
                parse_value(tag("FIRMWARE_VERSION"), "10896"),
                Err(Error::ReadOnly("FIRMWARE_VERSION"))
            ));
        }

        #[test]
        fn booleans_are_strict() {
            assert!(matches!(
                parse_value(tag("HOLIDAY_ENABLED"), "yes"),
                Err(Error::ParseBoolean(_))
            ));
        }
    }
}

pub mod describe {
    use crate::connection::{self, Client};
    use crate::lexicon::Language;
    use crate::output;
    use crate::tags::TagIndex;

    /// Show the controller's own localized tag descriptions.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        connection: connection::Args,
        #[clap(flatten)]
        output: output::Args,
        /// Locale to take the descriptions in.
        #[arg(long, value_enum, default_value = "english")]
        language: Language,
        /// Tags to describe, by catalog name. The entire catalog when empty.
        tags: Vec<String>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("no tag named {0} is known")]
        UnknownTag(String),
        #[error("could not communicate with the controller")]
        Connection(#[from] connection::Error),
        #[error("could not produce the output")]
        Output(#[from] output::Error),
    }

    #[derive(serde::Serialize)]
    struct Description {
        name: &'static str,
        wire_tags: &'static [&'static str],
        description: Option<String>,
    }

    pub async fn run(args: Args) -> Result<(), Error> {
        let tags = if args.tags.is_empty() {
            TagIndex::all().collect::<Vec<_>>()
        } else {
            args.tags
                .iter()
                .map(|name| {
                    TagIndex::from_name(name).ok_or_else(|| Error::UnknownTag(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?
        };
        let mut client = Client::new(&args.connection)?;
        client.login(&args.connection.username, &args.connection.password).await?;
        let mut output = args.output.to_output();
        output.headers(vec!["Name", "Wire tags", "Description"]);
        for tag in tags {
            let description =
                client.tag_description(tag, args.language).await?.map(str::to_string);
            output.push(
                vec![
                    tag.name().to_string(),
                    tag.wire_tags().join(" "),
                    description.clone().unwrap_or_default(),
                ],
                &Description { name: tag.name(), wire_tags: tag.wire_tags(), description },
            )?;
        }
        Ok(output.commit()?)
    }
}

pub mod info {
    use crate::connection::{self, Client};
    use crate::output;
    use crate::tags::{TagIndex, Value};

    /// Show what the controller is: firmware, BIOS, hardware, and model series.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        connection: connection::Args,
        #[clap(flatten)]
        output: output::Args,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not communicate with the controller")]
        Connection(#[from] connection::Error),
        #[error("could not produce the output")]
        Output(#[from] output::Error),
    }

    #[derive(serde::Serialize)]
    struct Item {
        property: &'static str,
        value: String,
    }

    const IDENTITY_TAGS: [(&str, &str); 7] = [
        ("FIRMWARE_VERSION", "Firmware"),
        ("BUILD", "Build"),
        ("BIOS", "BIOS"),
        ("BIOS_DATE", "BIOS date"),
        ("HARDWARE_REVISION", "Hardware revision"),
        ("HEATPUMP_TYPE", "Heat pump type"),
        ("SERIAL_NUMBER", "Serial number"),
    ];

    pub async fn run(args: Args) -> Result<(), Error> {
        let tags = IDENTITY_TAGS
            .map(|(name, _)| TagIndex::from_name(name).expect("identity tags are catalogued"));
        let mut client = Client::new(&args.connection)?;
        client.login(&args.connection.username, &args.connection.password).await?;
        let values = client.read_values(&tags).await?;
        let mut output = args.output.to_output();
        output.headers(vec!["Property", "Value"]);
        for (tag, (_, label)) in tags.iter().zip(IDENTITY_TAGS) {
            let Some(value) = values.get(tag) else { continue };
            let item = Item { property: label, value: value.to_string() };
            output.push(vec![item.property.to_string(), item.value.clone()], &item)?;
            if let (Value::Integer(code), "Heat pump type") = (value, label) {
                if let Some(series) = client.heatpump_series(*code).await? {
                    let item = Item { property: "Series", value: series };
                    output.push(vec![item.property.to_string(), item.value.clone()], &item)?;
                }
            }
        }
        Ok(output.commit()?)
    }
}
