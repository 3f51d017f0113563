pub mod core;

// Re-export main types for convenience
pub use core::{
    Buffer, DecodeError, Dict, Document, Lexer, ObjRef, Page, ParseError, Parser, Result,
    StreamObject, Token, Value, XrefTable,
};
