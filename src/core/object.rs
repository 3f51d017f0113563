use std::collections::HashMap;
use std::fmt;

/// An indirect object reference: object number plus generation number.
///
/// At most one live offset entry exists per reference across a document's
/// revision chain, and at most one canonical arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef {
    pub number: u32,
    pub generation: u32,
}

impl ObjRef {
    pub fn new(number: u32, generation: u32) -> Self {
        ObjRef { number, generation }
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// Handle to one canonical slot in the object arena.
///
/// Containers store handles, never copies: every holder of the same
/// `SlotId` observes the same value once the slot resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub(crate) usize);

/// Dictionary object: name keys mapped to values.
///
/// Duplicate keys within one dictionary literal follow plain map overwrite
/// semantics (last wins, in encounter order).
pub type Dict = HashMap<String, Value>;

/// A stream object: its owning dictionary plus the raw byte payload.
///
/// `decoded` records whether the payload has been run through the filters
/// declared by the dictionary; the parser always stores it raw and the
/// document-wide decode pre-pass flips the flag.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamObject {
    pub dict: Dict,
    pub data: Vec<u8>,
    pub decoded: bool,
}

/// A parsed PDF value.
///
/// Indirect references appearing inside containers are replaced during
/// parsing by `Indirect` handles into the document's object arena.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,

    Boolean(bool),

    /// Numeric value (integers and reals)
    Number(f64),

    /// Literal string, e.g. `(hello)`
    String(Vec<u8>),

    /// Hexadecimal string, e.g. `<48656c6c6f>`
    HexString(Vec<u8>),

    /// Name, e.g. `/Type`
    Name(String),

    Array(Vec<Value>),

    Dict(Dict),

    Stream(StreamObject),

    /// Handle to an indirect object's canonical slot
    Indirect(SlotId),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Number interpreted as a non-negative integral index (byte offsets,
    /// counts, lengths). `None` for negatives and fractions.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Value::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(dict) => Some(dict),
            Value::Stream(stream) => Some(&stream.dict),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&StreamObject> {
        match self {
            Value::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    /// One-word description used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::HexString(_) => "hex string",
            Value::Name(_) => "name",
            Value::Array(_) => "array",
            Value::Dict(_) => "dictionary",
            Value::Stream(_) => "stream",
            Value::Indirect(_) => "indirect reference",
        }
    }
}
