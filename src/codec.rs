use crate::tags::{Codec, TagIndex, Value, WireKind};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("`{1}` is not a valid value for {0}")]
    Boolean(&'static str, String),
    #[error("{0} returned a non-numeric value `{1}`")]
    Integer(&'static str, String, #[source] std::num::ParseIntError),
    #[error("{0} does not form a valid timestamp")]
    Timestamp(&'static str, #[source] jiff::Error),
    #[error("`{1}` from {0} is too short for a version number")]
    Version(&'static str, String),
    #[error("a {1} value cannot be written to {0}")]
    ValueShape(&'static str, &'static str),
    #[error("{0} spans multiple registers and has no write encoding")]
    MultiRegisterWrite(&'static str),
    #[error("bitfield tag {0} cannot be written")]
    BitfieldWrite(&'static str),
    #[error("{0} is decoded with a read-only codec")]
    ReadOnlyCodec(&'static str),
    #[error("wire tag {0} has an unknown type prefix")]
    UnknownPrefix(&'static str),
}

fn parse_int<T: std::str::FromStr<Err = std::num::ParseIntError>>(
    wire_tag: &'static str,
    raw: &str,
) -> Result<T, Error> {
    raw.parse().map_err(|e| Error::Integer(wire_tag, raw.to_string(), e))
}

impl TagIndex {
    /// Convert the raw per-register strings, in `wire_tags()` order, into a typed value.
    pub fn decode(&self, raw: &[&str]) -> Result<Value, Error> {
        let wire = self.wire_tags();
        debug_assert_eq!(wire.len(), raw.len());
        match self.codec() {
            Codec::Default => decode_default(*self, raw),
            Codec::Time => decode_time(*self, raw),
            Codec::FirmwareVersion => decode_firmware(wire[0], raw[0]),
            Codec::BiosVersion => decode_bios(wire[0], raw[0]),
            Codec::BiosDate => decode_bios_date(wire[0], raw[0]),
        }
    }

    /// Produce the per-register raw strings a write of `value` must carry.
    ///
    /// Fails before any I/O when the value shape does not match the tag, or when the
    /// tag has no write encoding at all (multi-register analogs, bitfields, versions).
    pub fn encode(&self, value: &Value) -> Result<Vec<(&'static str, String)>, Error> {
        let wire = self.wire_tags();
        match self.codec() {
            Codec::Time => encode_time(*self, value),
            Codec::FirmwareVersion | Codec::BiosVersion | Codec::BiosDate => {
                Err(Error::ReadOnlyCodec(wire[0]))
            }
            Codec::Default => {
                if wire.len() != 1 {
                    return Err(Error::MultiRegisterWrite(wire[0]));
                }
                if self.bit().is_some() {
                    return Err(Error::BitfieldWrite(wire[0]));
                }
                let raw = match (self.kind(), value) {
                    (WireKind::Analog, Value::Analog(v)) => ((v * 10.0).round() as i64).to_string(),
                    (WireKind::Integer, Value::Integer(v)) => v.to_string(),
                    (WireKind::Digital, Value::Bool(v)) => if *v { "1" } else { "0" }.to_string(),
                    _ => return Err(Error::ValueShape(wire[0], value.shape())),
                };
                Ok(vec![(wire[0], raw)])
            }
        }
    }
}

fn decode_default(tag: TagIndex, raw: &[&str]) -> Result<Value, Error> {
    let wire = tag.wire_tags();
    match WireKind::of(wire[0]).ok_or(Error::UnknownPrefix(wire[0]))? {
        WireKind::Analog if wire.len() == 1 => {
            let int = parse_int::<i64>(wire[0], raw[0])?;
            Ok(Value::Analog(int as f64 / 10.0))
        }
        WireKind::Analog => {
            // Two registers carry the high and low 16-bit halves of an IEEE-754 single,
            // in descriptor order, big-endian within each half.
            let hi = (parse_int::<i64>(wire[0], raw[0])? & 0xFFFF) as u16;
            let lo = (parse_int::<i64>(wire[1], raw[1])? & 0xFFFF) as u16;
            let [h0, h1] = hi.to_be_bytes();
            let [l0, l1] = lo.to_be_bytes();
            Ok(Value::Analog(f32::from_be_bytes([h0, h1, l0, l1]) as f64))
        }
        WireKind::Integer => {
            if let Some(bit) = tag.bit() {
                let int = parse_int::<i64>(wire[0], raw[0])?;
                return Ok(Value::Bool((int >> bit) & 1 != 0));
            }
            if wire.len() == 1 {
                return Ok(Value::Integer(parse_int(wire[0], raw[0])?));
            }
            // Registers such as the serial number hold consecutive decimal runs that
            // concatenate into one number.
            let joined = raw.concat();
            Ok(Value::Integer(parse_int(wire[0], &joined)?))
        }
        WireKind::Digital => match raw[0] {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            other => Err(Error::Boolean(wire[0], other.to_string())),
        },
    }
}

/// Registers in descriptor order: minute, hour, day, month, year since 2000.
///
/// The controller reports hour 24 for midnight at the end of a day; that rolls over
/// into hour 0 of the following day.
fn decode_time(tag: TagIndex, raw: &[&str]) -> Result<Value, Error> {
    let wire = tag.wire_tags();
    let minute = parse_int::<i8>(wire[0], raw[0])?;
    let hour = parse_int::<i8>(wire[1], raw[1])?;
    let day = parse_int::<i8>(wire[2], raw[2])?;
    let month = parse_int::<i8>(wire[3], raw[3])?;
    let year = 2000 + parse_int::<i16>(wire[4], raw[4])?;
    let err = |e| Error::Timestamp(wire[0], e);
    let mut date = jiff::civil::Date::new(year, month, day).map_err(err)?;
    let hour = if hour == 24 {
        date = date.tomorrow().map_err(err)?;
        0
    } else {
        hour
    };
    let time = jiff::civil::Time::new(hour, minute, 0, 0).map_err(err)?;
    Ok(Value::Time(date.to_datetime(time)))
}

fn encode_time(tag: TagIndex, value: &Value) -> Result<Vec<(&'static str, String)>, Error> {
    let wire = tag.wire_tags();
    let Value::Time(dt) = value else {
        return Err(Error::ValueShape(wire[0], value.shape()));
    };
    // Seconds have no register and are dropped.
    let fields = [
        i64::from(dt.minute()),
        i64::from(dt.hour()),
        i64::from(dt.day()),
        i64::from(dt.month()),
        i64::from(dt.year()).rem_euclid(100),
    ];
    Ok(wire.iter().zip(fields).map(|(tag, field)| (*tag, field.to_string())).collect())
}

/// `10896` reads as firmware `01.08.96`: the trailing two digit pairs are the patch and
/// minor fields, whatever remains is the zero-padded major field.
fn decode_firmware(wire_tag: &'static str, raw: &str) -> Result<Value, Error> {
    let too_short = || Error::Version(wire_tag, raw.to_string());
    let (rest, patch) = raw.split_at(raw.len().checked_sub(2).ok_or_else(too_short)?);
    let (major, minor) = rest.split_at(rest.len().checked_sub(2).ok_or_else(too_short)?);
    Ok(Value::Text(format!("{:0>2}.{}.{}", major, minor, patch)))
}

/// `651` reads as BIOS `6.51`: the last two digits are a decimal fraction.
fn decode_bios(wire_tag: &'static str, raw: &str) -> Result<Value, Error> {
    let split = raw.len().checked_sub(2).filter(|n| *n > 0);
    let (whole, frac) = raw.split_at(split.ok_or_else(|| Error::Version(wire_tag, raw.to_string()))?);
    Ok(Value::Text(format!("{}.{}", whole, frac)))
}

/// The BIOS date packs day/month/year into one decimal number, with the month banked
/// in steps of 20 to extend the single year digit by decades.
fn decode_bios_date(wire_tag: &'static str, raw: &str) -> Result<Value, Error> {
    let int = parse_int::<i64>(wire_tag, raw)?;
    let day = int / 1000;
    let mut month = (int % 1000) / 10;
    let mut year = int % 10;
    for (bank, decades) in [(80, 40), (60, 30), (40, 20), (20, 10)] {
        if month > bank {
            month -= bank;
            year += decades;
            break;
        }
    }
    jiff::civil::Date::new(2000 + year as i16, month as i8, day as i8)
        .map(Value::Date)
        .map_err(|e| Error::Timestamp(wire_tag, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagIndex;

    fn tag(name: &str) -> TagIndex {
        TagIndex::from_name(name).unwrap()
    }

    #[test]
    fn analog_scales_by_ten() {
        let t = tag("OUTSIDE_TEMPERATURE");
        assert_eq!(t.decode(&["86"]).unwrap(), Value::Analog(8.6));
        assert_eq!(t.decode(&["-15"]).unwrap(), Value::Analog(-1.5));
    }

    #[test]
    fn analog_pair_reassembles_float32() {
        let t = tag("COMPRESSOR_ELECTRIC_CONSUMPTION_YEAR");
        let Value::Analog(v) = t.decode(&["17708", "7519"]).unwrap() else {
            panic!("expected analog");
        };
        assert!((v - 2753.8).abs() < 0.1, "{v}");
        assert_eq!(t.decode(&["0", "0"]).unwrap(), Value::Analog(0.0));
        // Negative register values only contribute their low 16 bits.
        let Value::Analog(v) = tag("HOT_WATER_ENERGY_PRODUCED_YEAR")
            .decode(&["17877", "-17979"])
            .unwrap()
        else {
            panic!("expected analog");
        };
        assert!((v - 6839.2).abs() < 0.1, "{v}");
    }

    #[test]
    fn bitfield_extracts_single_bits() {
        // 170 == 0b10101010
        assert_eq!(tag("STATE_SOURCEPUMP").decode(&["170"]).unwrap(), Value::Bool(false));
        assert_eq!(tag("STATE_HEATINGPUMP").decode(&["170"]).unwrap(), Value::Bool(true));
        assert_eq!(tag("STATE_COMPRESSOR").decode(&["170"]).unwrap(), Value::Bool(true));
        assert_eq!(tag("STATE_EXTERNAL_HEATER").decode(&["170"]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn integers_concatenate_across_registers() {
        assert_eq!(tag("ADAPT_HEATING").decode(&["7"]).unwrap(), Value::Integer(7));
        assert_eq!(
            tag("SERIAL_NUMBER").decode(&["1234", "56789"]).unwrap(),
            Value::Integer(123456789),
        );
    }

    #[test]
    fn digital_accepts_only_zero_and_one() {
        let t = tag("HOLIDAY_ENABLED");
        assert_eq!(t.decode(&["1"]).unwrap(), Value::Bool(true));
        assert_eq!(t.decode(&["0"]).unwrap(), Value::Bool(false));
        assert!(matches!(t.decode(&["2"]), Err(Error::Boolean("D420", _))));
    }

    #[test]
    fn time_decodes_and_rolls_over_hour_24() {
        let t = tag("HOLIDAY_START_TIME");
        assert_eq!(
            t.decode(&["2", "18", "1", "3", "19"]).unwrap(),
            Value::Time(jiff::civil::datetime(2019, 3, 1, 18, 2, 0, 0)),
        );
        assert_eq!(
            t.decode(&["30", "24", "31", "12", "19"]).unwrap(),
            Value::Time(jiff::civil::datetime(2020, 1, 1, 0, 30, 0, 0)),
        );
    }

    #[test]
    fn time_encodes_minute_first() {
        let t = tag("HOLIDAY_START_TIME");
        let dt = Value::Time(jiff::civil::datetime(2019, 3, 2, 11, 0, 59, 0));
        assert_eq!(
            t.encode(&dt).unwrap(),
            vec![
                ("I1251", "0".to_string()),
                ("I1250", "11".to_string()),
                ("I1252", "2".to_string()),
                ("I1253", "3".to_string()),
                ("I1254", "19".to_string()),
            ],
        );
    }

    #[test]
    fn version_codecs() {
        assert_eq!(
            tag("FIRMWARE_VERSION").decode(&["10896"]).unwrap(),
            Value::Text("01.08.96".to_string()),
        );
        assert_eq!(tag("BIOS").decode(&["651"]).unwrap(), Value::Text("6.51".to_string()));
        assert!(matches!(tag("BIOS").decode(&["51"]), Err(Error::Version(..))));
        assert_eq!(
            tag("BIOS_DATE").decode(&["30309"]).unwrap(),
            Value::Date(jiff::civil::date(2019, 10, 30)),
        );
    }

    #[test]
    fn encode_dispatches_on_prefix() {
        assert_eq!(
            tag("HOT_WATER_TEMPERATURE_SETPOINT").encode(&Value::Analog(48.5)).unwrap(),
            vec![("A37", "485".to_string())],
        );
        assert_eq!(
            tag("ADAPT_HEATING").encode(&Value::Integer(6)).unwrap(),
            vec![("I263", "6".to_string())],
        );
        assert_eq!(
            tag("HOLIDAY_ENABLED").encode(&Value::Bool(true)).unwrap(),
            vec![("D420", "1".to_string())],
        );
        assert!(matches!(
            tag("HOLIDAY_ENABLED").encode(&Value::Integer(1)),
            Err(Error::ValueShape("D420", "integer")),
        ));
    }

    #[test]
    fn multi_register_analog_has_no_write_encoding() {
        assert!(matches!(
            tag("HEATING_ENERGY_PRODUCED_YEAR").encode(&Value::Analog(1.0)),
            Err(Error::MultiRegisterWrite("A452")),
        ));
    }
}
