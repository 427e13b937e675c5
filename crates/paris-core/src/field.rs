use crate::error::{FieldError, FieldResult};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// The type of the value held by a [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// 4 bit integer.
    Int4,
    /// 8 bit integer.
    Int8,
    /// 16 bit integer.
    Int16,
    /// 32 bit integer.
    Int32,
    /// 64 bit integer.
    Int64,
    /// 128 bit integer.
    Int128,
    /// The widest native integer (`uintmax_t`).
    IntMax,
    /// Owned string.
    String,
}

impl FieldType {
    /// The raw tag of this type.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Int4 => 0,
            Self::Int8 => 1,
            Self::Int16 => 2,
            Self::Int32 => 3,
            Self::Int64 => 4,
            Self::Int128 => 5,
            Self::IntMax => 6,
            Self::String => 7,
        }
    }

    /// The size in bytes of a value of this type.
    ///
    /// Returns `None` for `String`, the size of which must be queried per
    /// field with [`Field::size`].  An `Int4` occupies a whole byte.
    #[must_use]
    pub const fn size(self) -> Option<usize> {
        match self {
            Self::Int4 | Self::Int8 => Some(1),
            Self::Int16 => Some(2),
            Self::Int32 => Some(4),
            Self::Int64 | Self::IntMax => Some(8),
            Self::Int128 => Some(16),
            Self::String => None,
        }
    }

    /// The largest integer which can be held by this type.
    const fn max_value(self) -> Option<u128> {
        match self {
            Self::Int4 => Some(Nibble::MAX as u128),
            Self::Int8 => Some(u8::MAX as u128),
            Self::Int16 => Some(u16::MAX as u128),
            Self::Int32 => Some(u32::MAX as u128),
            Self::Int64 | Self::IntMax => Some(u64::MAX as u128),
            Self::Int128 => Some(u128::MAX),
            Self::String => None,
        }
    }
}

impl TryFrom<u8> for FieldType {
    type Error = FieldError;

    fn try_from(tag: u8) -> FieldResult<Self> {
        match tag {
            0 => Ok(Self::Int4),
            1 => Ok(Self::Int8),
            2 => Ok(Self::Int16),
            3 => Ok(Self::Int32),
            4 => Ok(Self::Int64),
            5 => Ok(Self::Int128),
            6 => Ok(Self::IntMax),
            7 => Ok(Self::String),
            other => Err(FieldError::InvalidType(other)),
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int4 => write!(f, "int4"),
            Self::Int8 => write!(f, "int8"),
            Self::Int16 => write!(f, "int16"),
            Self::Int32 => write!(f, "int32"),
            Self::Int64 => write!(f, "int64"),
            Self::Int128 => write!(f, "int128"),
            Self::IntMax => write!(f, "intmax"),
            Self::String => write!(f, "string"),
        }
    }
}

/// A 4 bit unsigned integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Nibble(u8);

impl Nibble {
    /// The largest value a `Nibble` can hold.
    pub const MAX: u8 = 0x0f;

    /// Create a `Nibble`, returning `None` if `value` does not fit in 4 bits.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Create a `Nibble` from the low 4 bits of `value`.
    #[must_use]
    pub const fn truncate(value: u8) -> Self {
        Self(value & Self::MAX)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// The value of an `intmax` field.
///
/// An `intmax` is as wide as a `u64` but is a distinct field type, so it is
/// extracted through this wrapper rather than as a plain `u64`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntMax(pub u64);

/// The value held by a [`Field`].
///
/// The variant always agrees with the [`FieldType`] reported for the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int4(Nibble),
    Int8(u8),
    Int16(u16),
    Int32(u32),
    Int64(u64),
    Int128(u128),
    IntMax(u64),
    String(String),
}

impl Value {
    /// The type of this value.
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::Int4(_) => FieldType::Int4,
            Self::Int8(_) => FieldType::Int8,
            Self::Int16(_) => FieldType::Int16,
            Self::Int32(_) => FieldType::Int32,
            Self::Int64(_) => FieldType::Int64,
            Self::Int128(_) => FieldType::Int128,
            Self::IntMax(_) => FieldType::IntMax,
            Self::String(_) => FieldType::String,
        }
    }

    /// The size in bytes of this value.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::String(s) => s.len(),
            other => other.field_type().size().unwrap_or_default(),
        }
    }

    /// The value widened to a `u128`, or `None` for a string.
    #[must_use]
    pub const fn as_integer(&self) -> Option<u128> {
        match self {
            Self::Int4(n) => Some(n.get() as u128),
            Self::Int8(v) => Some(*v as u128),
            Self::Int16(v) => Some(*v as u128),
            Self::Int32(v) => Some(*v as u128),
            Self::Int64(v) | Self::IntMax(v) => Some(*v as u128),
            Self::Int128(v) => Some(*v),
            Self::String(_) => None,
        }
    }

    /// Narrow an integer to the given integer type.
    fn from_integer(field_type: FieldType, value: u128) -> FieldResult<Self> {
        if field_type.max_value().is_some_and(|max| value > max) {
            return Err(FieldError::ValueOutOfRange { field_type, value });
        }
        Ok(match field_type {
            FieldType::Int4 => Self::Int4(Nibble::truncate(value as u8)),
            FieldType::Int8 => Self::Int8(value as u8),
            FieldType::Int16 => Self::Int16(value as u16),
            FieldType::Int32 => Self::Int32(value as u32),
            FieldType::Int64 => Self::Int64(value as u64),
            FieldType::IntMax => Self::IntMax(value as u64),
            FieldType::Int128 => Self::Int128(value),
            FieldType::String => {
                return Err(FieldError::TypeMismatch {
                    expected: field_type,
                    actual: FieldType::Int128,
                })
            }
        })
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            Self::Int128(v) => write!(f, "{v:#034x}"),
            other => write!(f, "{}", other.as_integer().unwrap_or_default()),
        }
    }
}

impl From<Nibble> for Value {
    fn from(value: Nibble) -> Self {
        Self::Int4(value)
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Self::Int8(value)
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Self::Int16(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int32(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Int64(value)
    }
}

impl From<IntMax> for Value {
    fn from(value: IntMax) -> Self {
        Self::IntMax(value.0)
    }
}

impl From<u128> for Value {
    fn from(value: u128) -> Self {
        Self::Int128(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// An IP address is held as an `Int32` (IPv4) or `Int128` (IPv6) value.
impl From<IpAddr> for Value {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(addr) => Self::Int32(u32::from(addr)),
            IpAddr::V6(addr) => Self::Int128(u128::from(addr)),
        }
    }
}

macro_rules! extract_integer {
    ($ty:ty, $variant:ident) => {
        impl TryFrom<&Value> for $ty {
            type Error = FieldError;

            fn try_from(value: &Value) -> FieldResult<Self> {
                match value {
                    Value::$variant(v) => Ok(*v),
                    other => Err(FieldError::TypeMismatch {
                        expected: FieldType::$variant,
                        actual: other.field_type(),
                    }),
                }
            }
        }
    };
}

extract_integer!(Nibble, Int4);
extract_integer!(u8, Int8);
extract_integer!(u16, Int16);
extract_integer!(u32, Int32);
extract_integer!(u64, Int64);
extract_integer!(u128, Int128);

impl TryFrom<&Value> for IntMax {
    type Error = FieldError;

    fn try_from(value: &Value) -> FieldResult<Self> {
        match value {
            Value::IntMax(v) => Ok(Self(*v)),
            other => Err(FieldError::TypeMismatch {
                expected: FieldType::IntMax,
                actual: other.field_type(),
            }),
        }
    }
}

impl TryFrom<&Value> for String {
    type Error = FieldError;

    fn try_from(value: &Value) -> FieldResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(FieldError::TypeMismatch {
                expected: FieldType::String,
                actual: other.field_type(),
            }),
        }
    }
}

impl TryFrom<&Value> for IpAddr {
    type Error = FieldError;

    fn try_from(value: &Value) -> FieldResult<Self> {
        match value {
            Value::Int32(v) => Ok(Self::V4(Ipv4Addr::from(*v))),
            Value::Int128(v) => Ok(Self::V6(Ipv6Addr::from(*v))),
            Value::String(s) => s.parse().map_err(|_| FieldError::InvalidString),
            other => Err(FieldError::TypeMismatch {
                expected: FieldType::Int32,
                actual: other.field_type(),
            }),
        }
    }
}

/// A keyed, typed header field.
///
/// Fields are used both to build outgoing probe headers and to extract values
/// from received packets.
///
/// # Examples
///
/// ```
/// use paris_core::{Field, FieldType, Value};
///
/// let ttl = Field::int8("ttl", 64);
/// assert_eq!(FieldType::Int8, ttl.field_type());
/// assert_eq!(&Value::Int8(64), ttl.value());
/// assert_eq!(1, ttl.size());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    key: String,
    value: Value,
}

impl Field {
    /// Create a field holding `value`, the type of which is taken from the value.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a field of a given type.
    ///
    /// Integer values are converted to the requested width.
    ///
    /// # Errors
    ///
    /// Returns `FieldError::ValueOutOfRange` if an integer does not fit the
    /// requested type and `FieldError::TypeMismatch` when converting between
    /// an integer and a string.
    pub fn create(
        field_type: FieldType,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> FieldResult<Self> {
        let value = value.into();
        let value = match (field_type, value) {
            (FieldType::String, Value::String(s)) => Value::String(s),
            (FieldType::String, other) | (_, other @ Value::String(_)) => {
                return Err(FieldError::TypeMismatch {
                    expected: field_type,
                    actual: other.field_type(),
                })
            }
            (_, other) => {
                let int = other.as_integer().unwrap_or_default();
                Value::from_integer(field_type, int)?
            }
        };
        Ok(Self {
            key: key.into(),
            value,
        })
    }

    /// Create a 4 bit field from the low 4 bits of `value`.
    #[must_use]
    pub fn int4(key: impl Into<String>, value: u8) -> Self {
        Self::new(key, Nibble::truncate(value))
    }

    #[must_use]
    pub fn int8(key: impl Into<String>, value: u8) -> Self {
        Self::new(key, value)
    }

    #[must_use]
    pub fn int16(key: impl Into<String>, value: u16) -> Self {
        Self::new(key, value)
    }

    #[must_use]
    pub fn int32(key: impl Into<String>, value: u32) -> Self {
        Self::new(key, value)
    }

    #[must_use]
    pub fn int64(key: impl Into<String>, value: u64) -> Self {
        Self::new(key, value)
    }

    #[must_use]
    pub fn int128(key: impl Into<String>, value: u128) -> Self {
        Self::new(key, value)
    }

    #[must_use]
    pub fn intmax(key: impl Into<String>, value: u64) -> Self {
        Self::new(key, IntMax(value))
    }

    /// Create a string field holding a copy of `value`.
    #[must_use]
    pub fn string(key: impl Into<String>, value: &str) -> Self {
        Self::new(key, value)
    }

    /// Create a field from a network byte order (big-endian) buffer.
    ///
    /// The buffer must be exactly the size of `field_type`; string fields
    /// accept any valid utf-8 buffer.
    pub fn from_network(
        field_type: FieldType,
        key: impl Into<String>,
        bytes: &[u8],
    ) -> FieldResult<Self> {
        let Some(expected) = field_type.size() else {
            let s = std::str::from_utf8(bytes).map_err(|_| FieldError::InvalidString)?;
            return Ok(Self::string(key, s));
        };
        if bytes.len() != expected {
            return Err(FieldError::InvalidLength {
                field_type,
                expected,
                provided: bytes.len(),
            });
        }
        let int = bytes
            .iter()
            .fold(0_u128, |acc, &b| (acc << 8) | u128::from(b));
        Self::create(field_type, key, int)
    }

    /// The value in network byte order (big-endian).
    #[must_use]
    pub fn to_network(&self) -> Vec<u8> {
        match &self.value {
            Value::String(s) => s.as_bytes().to_vec(),
            Value::Int4(n) => vec![n.get()],
            Value::Int8(v) => vec![*v],
            Value::Int16(v) => v.to_be_bytes().to_vec(),
            Value::Int32(v) => v.to_be_bytes().to_vec(),
            Value::Int64(v) | Value::IntMax(v) => v.to_be_bytes().to_vec(),
            Value::Int128(v) => v.to_be_bytes().to_vec(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        self.value.field_type()
    }

    /// The size in bytes of the field value.
    #[must_use]
    pub fn size(&self) -> usize {
        self.value.size()
    }

    /// Compare the values of two fields of the same type.
    ///
    /// Integers are compared numerically and strings byte-wise.
    ///
    /// # Errors
    ///
    /// Returns `FieldError::TypeMismatch` if the fields differ in type.
    pub fn compare(&self, other: &Self) -> FieldResult<Ordering> {
        if self.field_type() != other.field_type() {
            return Err(FieldError::TypeMismatch {
                expected: self.field_type(),
                actual: other.field_type(),
            });
        }
        Ok(match (&self.value, &other.value) {
            (Value::String(a), Value::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (a, b) => a.as_integer().cmp(&b.as_integer()),
        })
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {} ({})", self.key, self.value, self.field_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(FieldType::Int4, Some(1))]
    #[test_case(FieldType::Int8, Some(1))]
    #[test_case(FieldType::Int16, Some(2))]
    #[test_case(FieldType::Int32, Some(4))]
    #[test_case(FieldType::Int64, Some(8))]
    #[test_case(FieldType::Int128, Some(16))]
    #[test_case(FieldType::IntMax, Some(8))]
    #[test_case(FieldType::String, None)]
    fn test_type_size(field_type: FieldType, expected: Option<usize>) {
        assert_eq!(expected, field_type.size());
    }

    #[test]
    fn test_type_tag() {
        for tag in 0_u8..=7 {
            let field_type = FieldType::try_from(tag).unwrap();
            assert_eq!(tag, field_type.tag());
        }
        assert_eq!(Err(FieldError::InvalidType(8)), FieldType::try_from(8_u8));
        assert_eq!(Err(FieldError::InvalidType(255)), FieldType::try_from(255_u8));
    }

    #[test]
    fn test_string_size_is_content_length() {
        let field = Field::string("payload", "hello");
        assert_eq!(FieldType::String, field.field_type());
        assert_eq!(5, field.size());
        assert_eq!(0, Field::string("empty", "").size());
    }

    #[test]
    fn test_string_is_copied() {
        let mut source = String::from("abc");
        let field = Field::string("s", &source);
        source.push('d');
        assert_eq!(&Value::String(String::from("abc")), field.value());
    }

    #[test]
    fn test_int4_truncates() {
        let field = Field::int4("version", 0x46);
        assert_eq!(&Value::Int4(Nibble::truncate(6)), field.value());
        assert_eq!(None, Nibble::new(16));
        assert_eq!(Some(15), Nibble::new(15).map(Nibble::get));
    }

    #[test_case(FieldType::Int8, 255_u32, Ok(Value::Int8(255)))]
    #[test_case(FieldType::Int8, 256_u32, Err(FieldError::ValueOutOfRange { field_type: FieldType::Int8, value: 256 }))]
    #[test_case(FieldType::Int4, 15_u32, Ok(Value::Int4(Nibble::truncate(15))))]
    #[test_case(FieldType::Int4, 16_u32, Err(FieldError::ValueOutOfRange { field_type: FieldType::Int4, value: 16 }))]
    #[test_case(FieldType::Int64, 7_u32, Ok(Value::Int64(7)))]
    #[test_case(FieldType::IntMax, 7_u32, Ok(Value::IntMax(7)))]
    #[test_case(FieldType::Int128, 7_u32, Ok(Value::Int128(7)))]
    #[test_case(FieldType::String, 7_u32, Err(FieldError::TypeMismatch { expected: FieldType::String, actual: FieldType::Int32 }))]
    fn test_create(field_type: FieldType, value: u32, expected: FieldResult<Value>) {
        let field = Field::create(field_type, "key", value);
        assert_eq!(expected, field.map(|f| f.value().clone()));
    }

    #[test_case(FieldType::Int16, 0x1_0000, Err(FieldError::ValueOutOfRange { field_type: FieldType::Int16, value: 0x1_0000 }))]
    #[test_case(FieldType::Int128, u128::MAX, Ok(Value::Int128(u128::MAX)))]
    #[test_case(FieldType::String, 7, Err(FieldError::TypeMismatch { expected: FieldType::String, actual: FieldType::Int128 }))]
    fn test_from_integer(field_type: FieldType, value: u128, expected: FieldResult<Value>) {
        assert_eq!(expected, Value::from_integer(field_type, value));
    }

    #[test]
    fn test_create_string() {
        let field = Field::create(FieldType::String, "name", "probe").unwrap();
        assert_eq!(&Value::String(String::from("probe")), field.value());
        let err = Field::create(FieldType::Int16, "name", "probe").unwrap_err();
        assert_eq!(
            FieldError::TypeMismatch {
                expected: FieldType::Int16,
                actual: FieldType::String
            },
            err
        );
    }

    #[test]
    fn test_from_network() {
        let field = Field::from_network(FieldType::Int16, "checksum", &[0x12, 0x34]).unwrap();
        assert_eq!(&Value::Int16(0x1234), field.value());
        assert_eq!(vec![0x12, 0x34], field.to_network());
        let field = Field::from_network(FieldType::Int32, "src_ip", &[10, 0, 0, 1]).unwrap();
        assert_eq!(&Value::Int32(0x0a00_0001), field.value());
        let field = Field::from_network(FieldType::String, "body", b"abc").unwrap();
        assert_eq!(&Value::String(String::from("abc")), field.value());
    }

    #[test]
    fn test_from_network_invalid() {
        assert_eq!(
            Err(FieldError::InvalidLength {
                field_type: FieldType::Int32,
                expected: 4,
                provided: 3
            }),
            Field::from_network(FieldType::Int32, "k", &[1, 2, 3])
        );
        assert_eq!(
            Err(FieldError::ValueOutOfRange {
                field_type: FieldType::Int4,
                value: 0x45
            }),
            Field::from_network(FieldType::Int4, "k", &[0x45])
        );
        assert_eq!(
            Err(FieldError::InvalidString),
            Field::from_network(FieldType::String, "k", &[0xff, 0xfe])
        );
    }

    #[test]
    fn test_compare() {
        let a = Field::int16("a", 10);
        let b = Field::int16("b", 20);
        assert_eq!(Ok(Ordering::Less), a.compare(&b));
        assert_eq!(Ok(Ordering::Greater), b.compare(&a));
        assert_eq!(Ok(Ordering::Equal), a.compare(&a));
        let s1 = Field::string("s", "abc");
        let s2 = Field::string("s", "abd");
        assert_eq!(Ok(Ordering::Less), s1.compare(&s2));
        assert_eq!(
            Err(FieldError::TypeMismatch {
                expected: FieldType::Int16,
                actual: FieldType::Int32
            }),
            a.compare(&Field::int32("c", 10))
        );
    }

    #[test]
    fn test_extract_type_checked() {
        let value = Value::Int8(3);
        assert_eq!(Ok(3_u8), u8::try_from(&value));
        assert_eq!(
            Err(FieldError::TypeMismatch {
                expected: FieldType::Int16,
                actual: FieldType::Int8
            }),
            u16::try_from(&value)
        );
    }

    #[test]
    fn test_intmax_extract() -> anyhow::Result<()> {
        let probe = crate::probe::Probe::new()
            .with_field(Field::intmax("x", 5))
            .with_field(Field::int64("y", 5));
        assert_eq!(IntMax(5), probe.extract::<IntMax>("x")?);
        assert_eq!(
            Err(FieldError::TypeMismatch {
                expected: FieldType::Int64,
                actual: FieldType::IntMax
            }),
            probe.extract::<u64>("x")
        );
        assert_eq!(
            Err(FieldError::TypeMismatch {
                expected: FieldType::IntMax,
                actual: FieldType::Int64
            }),
            probe.extract::<IntMax>("y")
        );
        let field = Field::create(FieldType::IntMax, "z", IntMax(u64::MAX))?;
        assert_eq!(&Value::IntMax(u64::MAX), field.value());
        Ok(())
    }

    #[test]
    fn test_ip_addr_value() {
        let v4: IpAddr = "192.0.2.1".parse().unwrap();
        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        assert_eq!(Ok(v4), IpAddr::try_from(&Value::from(v4)));
        assert_eq!(Ok(v6), IpAddr::try_from(&Value::from(v6)));
        assert_eq!(Ok(v4), IpAddr::try_from(&Value::from("192.0.2.1")));
        assert_eq!(
            Err(FieldError::InvalidString),
            IpAddr::try_from(&Value::from("not an address"))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!("ttl = 64 (int8)", Field::int8("ttl", 64).to_string());
        assert_eq!(
            "body = \"abc\" (string)",
            Field::string("body", "abc").to_string()
        );
    }
}
