//! Native type codes and type classification.
//!
//! The engine describes values two ways: a [`DataType`] says how the bytes of
//! a single cell or parameter are encoded, and a [`NativeType`] says what the
//! column was declared as. Column descriptions report the latter, and the
//! DB-API style markers ([`STRING`], [`NUMBER`], ...) group them.

use std::fmt;

/// Encoding of a value buffer exchanged with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DataType {
    /// Sentinel: type not yet known (parameters) or unusable (columns).
    Invalid = 0,
    Binary = 1,
    /// Single-byte text in the connection encoding.
    String = 2,
    Double = 3,
    Val64 = 4,
    UVal64 = 5,
    Val32 = 6,
    UVal32 = 7,
    Val16 = 8,
    UVal16 = 9,
    Val8 = 10,
    UVal8 = 11,
    /// Double-byte (UTF-16) text.
    NChar = 12,
    /// Decimal rendered as ASCII text.
    Decimal = 13,
    /// `MM/DD/YYYY` ASCII text.
    Date = 14,
    /// `HH:MM:SS[.ffffff][ AM|PM]` ASCII text.
    Time = 15,
    /// Date, optionally followed by a space and a time.
    Timestamp = 16,
}

impl DataType {
    /// Map a raw tag from the engine; `None` for tags outside the table.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => DataType::Invalid,
            1 => DataType::Binary,
            2 => DataType::String,
            3 => DataType::Double,
            4 => DataType::Val64,
            5 => DataType::UVal64,
            6 => DataType::Val32,
            7 => DataType::UVal32,
            8 => DataType::Val16,
            9 => DataType::UVal16,
            10 => DataType::Val8,
            11 => DataType::UVal8,
            12 => DataType::NChar,
            13 => DataType::Decimal,
            14 => DataType::Date,
            15 => DataType::Time,
            16 => DataType::Timestamp,
            _ => return None,
        })
    }

    /// Raw tag as passed to the engine.
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    /// Byte width for fixed-width binary formats, `None` for
    /// variable-length ones.
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            DataType::Val64 | DataType::UVal64 | DataType::Double => Some(8),
            DataType::Val32 | DataType::UVal32 => Some(4),
            DataType::Val16 | DataType::UVal16 => Some(2),
            DataType::Val8 | DataType::UVal8 => Some(1),
            _ => None,
        }
    }
}

/// Declared column type as reported in column descriptions.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeType(pub u32);

impl NativeType {
    pub const NOTYPE: NativeType = NativeType(0);
    pub const DATE: NativeType = NativeType(384);
    pub const TIME: NativeType = NativeType(388);
    pub const TIMESTAMP: NativeType = NativeType(392);
    pub const VARCHAR: NativeType = NativeType(448);
    pub const FIXCHAR: NativeType = NativeType(452);
    pub const LONGVARCHAR: NativeType = NativeType(456);
    pub const STRING: NativeType = NativeType(460);
    pub const DOUBLE: NativeType = NativeType(480);
    pub const FLOAT: NativeType = NativeType(482);
    pub const DECIMAL: NativeType = NativeType(484);
    pub const INT: NativeType = NativeType(496);
    pub const SMALLINT: NativeType = NativeType(500);
    pub const BINARY: NativeType = NativeType(524);
    pub const LONGBINARY: NativeType = NativeType(528);
    pub const TINYINT: NativeType = NativeType(604);
    pub const BIGINT: NativeType = NativeType(608);
    pub const UNSINT: NativeType = NativeType(612);
    pub const UNSSMALLINT: NativeType = NativeType(616);
    pub const UNSBIGINT: NativeType = NativeType(620);
    pub const BIT: NativeType = NativeType(624);
    pub const NSTRING: NativeType = NativeType(628);
    pub const NFIXCHAR: NativeType = NativeType(632);
    pub const NVARCHAR: NativeType = NativeType(636);
    pub const LONGNVARCHAR: NativeType = NativeType(640);

    /// Double-byte text columns. Their sizes are reported in bytes by the
    /// engine and converted to characters in column descriptions.
    pub fn is_double_byte_text(self) -> bool {
        matches!(
            self,
            NativeType::NSTRING
                | NativeType::NFIXCHAR
                | NativeType::NVARCHAR
                | NativeType::LONGNVARCHAR
        )
    }

    fn name(self) -> Option<&'static str> {
        Some(match self {
            NativeType::NOTYPE => "NOTYPE",
            NativeType::DATE => "DATE",
            NativeType::TIME => "TIME",
            NativeType::TIMESTAMP => "TIMESTAMP",
            NativeType::VARCHAR => "VARCHAR",
            NativeType::FIXCHAR => "FIXCHAR",
            NativeType::LONGVARCHAR => "LONGVARCHAR",
            NativeType::STRING => "STRING",
            NativeType::DOUBLE => "DOUBLE",
            NativeType::FLOAT => "FLOAT",
            NativeType::DECIMAL => "DECIMAL",
            NativeType::INT => "INT",
            NativeType::SMALLINT => "SMALLINT",
            NativeType::BINARY => "BINARY",
            NativeType::LONGBINARY => "LONGBINARY",
            NativeType::TINYINT => "TINYINT",
            NativeType::BIGINT => "BIGINT",
            NativeType::UNSINT => "UNSINT",
            NativeType::UNSSMALLINT => "UNSSMALLINT",
            NativeType::UNSBIGINT => "UNSBIGINT",
            NativeType::BIT => "BIT",
            NativeType::NSTRING => "NSTRING",
            NativeType::NFIXCHAR => "NFIXCHAR",
            NativeType::NVARCHAR => "NVARCHAR",
            NativeType::LONGNVARCHAR => "LONGNVARCHAR",
            _ => return None,
        })
    }
}

impl fmt::Debug for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "NativeType::{name}"),
            None => write!(f, "NativeType({})", self.0),
        }
    }
}

/// A set of native types that compares equal to each of its members.
///
/// Used as `description.type_code == STRING`.
#[derive(Debug, Clone, Copy)]
pub struct TypeObject {
    name: &'static str,
    members: &'static [NativeType],
}

impl TypeObject {
    pub const fn new(name: &'static str, members: &'static [NativeType]) -> Self {
        Self { name, members }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn contains(&self, native: NativeType) -> bool {
        self.members.contains(&native)
    }
}

impl PartialEq<NativeType> for TypeObject {
    fn eq(&self, other: &NativeType) -> bool {
        self.contains(*other)
    }
}

impl PartialEq<TypeObject> for NativeType {
    fn eq(&self, other: &TypeObject) -> bool {
        other.contains(*self)
    }
}

pub const STRING: TypeObject = TypeObject::new(
    "STRING",
    &[
        NativeType::VARCHAR,
        NativeType::FIXCHAR,
        NativeType::LONGVARCHAR,
        NativeType::STRING,
        NativeType::NSTRING,
        NativeType::NFIXCHAR,
        NativeType::NVARCHAR,
        NativeType::LONGNVARCHAR,
    ],
);

pub const BINARY: TypeObject =
    TypeObject::new("BINARY", &[NativeType::BINARY, NativeType::LONGBINARY]);

pub const NUMBER: TypeObject = TypeObject::new(
    "NUMBER",
    &[
        NativeType::DOUBLE,
        NativeType::FLOAT,
        NativeType::DECIMAL,
        NativeType::INT,
        NativeType::SMALLINT,
        NativeType::TINYINT,
        NativeType::BIGINT,
        NativeType::UNSINT,
        NativeType::UNSSMALLINT,
        NativeType::UNSBIGINT,
        NativeType::BIT,
    ],
);

pub const DATETIME: TypeObject = TypeObject::new(
    "DATETIME",
    &[NativeType::DATE, NativeType::TIME, NativeType::TIMESTAMP],
);

/// The engine has no row-identifier column type; nothing compares equal.
pub const ROWID: TypeObject = TypeObject::new("ROWID", &[]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_tags_round_trip() {
        for raw in 0..=16 {
            let ty = DataType::from_raw(raw).expect("known tag");
            assert_eq!(ty.as_raw(), raw);
        }
        assert_eq!(DataType::from_raw(17), None);
    }

    #[test]
    fn fixed_widths() {
        assert_eq!(DataType::Val64.fixed_width(), Some(8));
        assert_eq!(DataType::Double.fixed_width(), Some(8));
        assert_eq!(DataType::UVal32.fixed_width(), Some(4));
        assert_eq!(DataType::Val16.fixed_width(), Some(2));
        assert_eq!(DataType::UVal8.fixed_width(), Some(1));
        assert_eq!(DataType::NChar.fixed_width(), None);
        assert_eq!(DataType::Timestamp.fixed_width(), None);
    }

    #[test]
    fn markers_compare_against_native_types() {
        assert!(STRING == NativeType::NVARCHAR);
        assert!(NativeType::LONGBINARY == BINARY);
        assert!(NUMBER == NativeType::BIT);
        assert!(DATETIME == NativeType::TIMESTAMP);
        assert!(STRING != NativeType::INT);
        assert!(ROWID != NativeType::INT);
    }

    #[test]
    fn double_byte_text_detection() {
        assert!(NativeType::NFIXCHAR.is_double_byte_text());
        assert!(!NativeType::VARCHAR.is_double_byte_text());
    }

    #[test]
    fn debug_names_known_codes() {
        assert_eq!(format!("{:?}", NativeType::INT), "NativeType::INT");
        assert_eq!(format!("{:?}", NativeType(1)), "NativeType(1)");
    }
}
