/// Decoding strategy attached to a tag.
///
/// `Default` dispatches on the wire tag type prefix and the per-tag parameters (tag count,
/// bit index). The remaining variants are special-purpose parsers for the firmware
/// inspection tags and the five-register holiday timestamps.
#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Serialize, strum::IntoStaticStr)]
pub enum Codec {
    Default,
    Time,
    FirmwareVersion,
    BiosVersion,
    BiosDate,
}

/// The register family a wire tag addresses, derived from its one-letter prefix.
///
/// `A` registers hold scaled or packed analog values, `I` registers raw integers and
/// `D` registers booleans. The prefix carries no unit or scale on its own.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WireKind {
    Analog,
    Integer,
    Digital,
}

impl WireKind {
    pub fn of(wire_tag: &str) -> Option<WireKind> {
        match wire_tag.as_bytes().first() {
            Some(b'A') => Some(WireKind::Analog),
            Some(b'I') => Some(WireKind::Integer),
            Some(b'D') => Some(WireKind::Digital),
            _ => None,
        }
    }
}

/// A value decoded from (or encodable to) one tag.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Scaled analog reading or a reassembled 32-bit float.
    Analog(f64),
    Integer(i64),
    Bool(bool),
    /// Civil timestamp assembled from a five-register group.
    Time(jiff::civil::DateTime),
    /// Calendar date, currently only produced by the BIOS date tag.
    Date(jiff::civil::Date),
    /// Dotted version string such as `01.08.96`.
    Text(String),
}

impl Value {
    /// Short name of the variant, for error reporting against a tag's expected shape.
    pub fn shape(&self) -> &'static str {
        match self {
            Value::Analog(_) => "analog",
            Value::Integer(_) => "integer",
            Value::Bool(_) => "boolean",
            Value::Time(_) => "timestamp",
            Value::Date(_) => "date",
            Value::Text(_) => "text",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Analog(v) => f.write_fmt(format_args!("{}", v)),
            Value::Integer(v) => f.write_fmt(format_args!("{}", v)),
            Value::Bool(v) => f.write_fmt(format_args!("{}", v)),
            Value::Time(v) => f.write_fmt(format_args!("{}", v)),
            Value::Date(v) => f.write_fmt(format_args!("{}", v)),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Analog(v) => serializer.serialize_f64(*v),
            Value::Integer(v) => serializer.serialize_i64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Time(v) => serializer.serialize_str(&v.to_string()),
            Value::Date(v) => serializer.serialize_str(&v.to_string()),
            Value::Text(v) => serializer.serialize_str(v),
        }
    }
}

#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct Mode(u8);

impl Mode {
    pub const R: Self = Self(1 << 0);
    pub const W: Self = Self(1 << 1);
    pub const RW: Self = Self(Self::R.0 | Self::W.0);
    const R_: Self = Self::R;

    pub const fn writeable(&self) -> bool {
        self.0 & Self::W.0 != 0
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.0 & Self::R.0 == 0 { "-" } else { "R" })?;
        f.write_str(if self.0 & Self::W.0 == 0 { "-" } else { "W" })?;
        Ok(())
    }
}

impl serde::Serialize for Mode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Handle to one entry of the tag catalog.
///
/// Equality and hashing consider the addressed wire tags and the bit index rather than
/// the position in the catalog, so two handles naming the same registers (and the same
/// bit of them) are interchangeable as map keys.
#[derive(Clone, Copy, Debug)]
pub struct TagIndex(usize);

impl TagIndex {
    pub fn from_name(name: &str) -> Option<TagIndex> {
        NAMES.binary_search(&name).ok().map(Self)
    }

    pub fn all() -> impl Iterator<Item = TagIndex> {
        (0..NAMES.len()).map(Self)
    }

    pub fn name(&self) -> &'static str {
        NAMES[self.0]
    }

    /// The wire tags this entry reads, in decode order.
    pub fn wire_tags(&self) -> &'static [&'static str] {
        WIRE_TAGS[self.0]
    }

    pub fn codec(&self) -> Codec {
        CODECS[self.0]
    }

    pub fn mode(&self) -> Mode {
        MODES[self.0]
    }

    pub fn unit(&self) -> Option<&'static str> {
        UNITS[self.0]
    }

    /// Bit to extract from the (single) integer register, if this is a bitfield tag.
    pub fn bit(&self) -> Option<u8> {
        BITS[self.0]
    }

    pub fn kind(&self) -> WireKind {
        // The catalog is validated at compile time to only contain known prefixes.
        WireKind::of(self.wire_tags()[0]).expect("catalog contains unknown prefix")
    }
}

impl PartialEq for TagIndex {
    fn eq(&self, other: &Self) -> bool {
        self.wire_tags() == other.wire_tags() && self.bit() == other.bit()
    }
}

impl Eq for TagIndex {}

impl std::hash::Hash for TagIndex {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.wire_tags().hash(state);
        self.bit().hash(state);
    }
}

macro_rules! for_each_tag {
    ($m:ident) => {
        $m! {
            "ADAPT_HEATING": Default, RW, ["I263"];
            "BIOS": BiosVersion, R_, ["I3"];
            "BIOS_DATE": BiosDate, R_, ["I4"];
            "BUFFER_TANK_TEMPERATURE": Default, R_, ["A16"], unit = "°C";
            "BUILD": Default, R_, ["I2"];
            "COMPRESSOR_ELECTRIC_CONSUMPTION_YEAR": Default, R_, ["A444", "A445"], unit = "kWh";
            "CONDENSATION_TEMPERATURE": Default, R_, ["A13"], unit = "°C";
            "COOLING_POWER": Default, R_, ["A27"], unit = "kW";
            "ELECTRICAL_HEATER_ELECTRIC_CONSUMPTION_YEAR": Default, R_, ["A448", "A449"], unit = "kWh";
            "ELECTRICAL_POWER": Default, R_, ["A25"], unit = "kW";
            "EVAPORATION_PRESSURE": Default, R_, ["A8"], unit = "bar";
            "EVAPORATION_TEMPERATURE": Default, R_, ["A6"], unit = "°C";
            "FIRMWARE_VERSION": FirmwareVersion, R_, ["I1"];
            "FLOW_TEMPERATURE": Default, R_, ["A12"], unit = "°C";
            "HARDWARE_REVISION": Default, R_, ["I5"];
            "HEATING_ENERGY_PRODUCED_YEAR": Default, R_, ["A452", "A453"], unit = "kWh";
            "HEATING_TEMPERATURE": Default, R_, ["A30"], unit = "°C";
            "HEATING_TEMPERATURE_SETPOINT": Default, R_, ["A31"], unit = "°C";
            "HEATPUMP_TYPE": Default, R_, ["I105"];
            "HOLIDAY_ENABLED": Default, RW, ["D420"];
            "HOLIDAY_END_TIME": Time, RW, ["I1256", "I1255", "I1257", "I1258", "I1259"];
            "HOLIDAY_START_TIME": Time, RW, ["I1251", "I1250", "I1252", "I1253", "I1254"];
            "HOT_WATER_ENERGY_PRODUCED_YEAR": Default, R_, ["A454", "A455"], unit = "kWh";
            "HOT_WATER_TEMPERATURE": Default, R_, ["A19"], unit = "°C";
            "HOT_WATER_TEMPERATURE_SETPOINT": Default, RW, ["A37"], unit = "°C";
            "OUTSIDE_TEMPERATURE": Default, R_, ["A1"], unit = "°C";
            "OUTSIDE_TEMPERATURE_1H": Default, R_, ["A2"], unit = "°C";
            "OUTSIDE_TEMPERATURE_24H": Default, R_, ["A3"], unit = "°C";
            "RETURN_TEMPERATURE": Default, R_, ["A11"], unit = "°C";
            "ROOM_TEMPERATURE": Default, R_, ["A17"], unit = "°C";
            "ROOM_TEMPERATURE_1H": Default, R_, ["A18"], unit = "°C";
            "SERIAL_NUMBER": Default, R_, ["I114", "I115"];
            "SOURCEPUMP_ELECTRIC_CONSUMPTION_YEAR": Default, R_, ["A446", "A447"], unit = "kWh";
            "SOURCE_IN_TEMPERATURE": Default, R_, ["A4"], unit = "°C";
            "SOURCE_OUT_TEMPERATURE": Default, R_, ["A5"], unit = "°C";
            "STATE_COMPRESSOR": Default, R_, ["I51"], bit = 3;
            "STATE_EXTERNAL_HEATER": Default, R_, ["I51"], bit = 5;
            "STATE_HEATINGPUMP": Default, R_, ["I51"], bit = 1;
            "STATE_SOURCEPUMP": Default, R_, ["I51"], bit = 0;
            "SUCTION_LINE_TEMPERATURE": Default, R_, ["A7"], unit = "°C";
            "THERMAL_POWER": Default, R_, ["A26"], unit = "kW";
        }
    };
}

macro_rules! optional {
    () => {
        None
    };
    ($($lit: tt)+) => {
        Some($($lit)*)
    };
}

macro_rules! make_lists {
    ($($name: literal: $codec: ident, $mode: ident, [$($wire: literal),+]
        $(, unit = $unit: literal)? $(, bit = $bit: literal)?;)+) => {
        pub static NAMES: &[&str] = &[$($name),*];
        pub static CODECS: &[Codec] = &[$(Codec::$codec),*];
        pub static MODES: &[Mode] = &[$(Mode::$mode),*];
        pub static WIRE_TAGS: &[&[&str]] = &[$(&[$($wire),+]),*];
        pub static UNITS: &[Option<&str>] = &[$(optional!($($unit)?)),*];
        pub static BITS: &[Option<u8>] = &[$(optional!($($bit)?)),*];
    };
}

for_each_tag!(make_lists);

const fn str_le(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let mut i = 0;
    while i < a.len() && i < b.len() {
        if a[i] != b[i] {
            return a[i] < b[i];
        }
        i += 1;
    }
    a.len() < b.len()
}

const _: () = {
    let mut i = 0;
    while i < NAMES.len() {
        if i > 0 && !str_le(NAMES[i - 1], NAMES[i]) {
            panic!("NAMES is not sorted (or has duplicate entries)!");
        }
        let wire = WIRE_TAGS[i];
        if wire.is_empty() {
            panic!("a tag must address at least one wire tag!");
        }
        // All registers of a multi-register tag must come from the same family.
        let prefix = wire[0].as_bytes()[0];
        if !matches!(prefix, b'A' | b'I' | b'D') {
            panic!("unknown wire tag prefix!");
        }
        let mut j = 1;
        while j < wire.len() {
            if wire[j].as_bytes()[0] != prefix {
                panic!("mixed wire tag prefixes within one tag!");
            }
            j += 1;
        }
        i += 1;
    }
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_roundtrips() {
        for tag in TagIndex::all() {
            assert_eq!(Some(tag), TagIndex::from_name(tag.name()));
        }
        assert_eq!(None, TagIndex::from_name("NO_SUCH_TAG"));
    }

    #[test]
    fn equality_follows_wire_tags() {
        let a = TagIndex::from_name("OUTSIDE_TEMPERATURE").unwrap();
        let b = TagIndex::from_name("OUTSIDE_TEMPERATURE_1H").unwrap();
        assert_eq!(a, a);
        assert_ne!(a, b);
    }

    #[test]
    fn bitfield_states_are_distinct_keys() {
        let states = [
            TagIndex::from_name("STATE_SOURCEPUMP").unwrap(),
            TagIndex::from_name("STATE_HEATINGPUMP").unwrap(),
            TagIndex::from_name("STATE_COMPRESSOR").unwrap(),
            TagIndex::from_name("STATE_EXTERNAL_HEATER").unwrap(),
        ];
        let set = states.iter().copied().collect::<std::collections::HashSet<_>>();
        assert_eq!(set.len(), states.len());
    }

    #[test]
    fn holiday_time_tags_are_minute_first() {
        let start = TagIndex::from_name("HOLIDAY_START_TIME").unwrap();
        assert_eq!(start.wire_tags(), ["I1251", "I1250", "I1252", "I1253", "I1254"]);
        assert_eq!(start.codec(), Codec::Time);
        assert!(start.mode().writeable());
    }
}
