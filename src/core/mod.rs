pub mod buffer;
pub mod decode;
pub mod document;
pub mod error;
pub mod lexer;
pub mod object;
pub mod pages;
pub mod parser;
pub mod resolver;
pub mod xref;

#[cfg(test)]
pub(crate) mod test_support;

pub use buffer::Buffer;
pub use document::Document;
pub use error::{DecodeError, ParseError, Result};
pub use lexer::{Lexer, Token};
pub use object::{Dict, ObjRef, StreamObject, Value};
pub use pages::Page;
pub use parser::Parser;
pub use resolver::{Arena, Resolver};
pub use xref::XrefTable;
