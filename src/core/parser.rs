use super::buffer::Buffer;
use super::error::{ParseError, Result};
use super::lexer::{Lexer, Token};
use super::object::{Dict, ObjRef, Value};
use super::resolver::Resolver;

/// Syntax-level parser building values from tokens.
///
/// Keeps a two-token lookahead so that indirect references (`N G R`) and
/// object headers (`N G obj`) can be recognized before any token is
/// committed. Each parser owns its own clone of the byte buffer, so a
/// nested resolution never disturbs the position of an enclosing parse.
pub struct Parser {
    lexer: Lexer,
    buf1: Token,
    pos1: usize,
    buf2: Token,
    pos2: usize,
}

impl Parser {
    /// Creates a parser positioned at an absolute byte offset.
    pub fn at(buffer: Buffer, offset: usize) -> Result<Self> {
        let mut lexer = Lexer::new(buffer);
        lexer.seek(offset)?;
        let buf1 = lexer.next_token()?;
        let pos1 = lexer.token_start();
        let buf2 = lexer.next_token()?;
        let pos2 = lexer.token_start();
        Ok(Parser {
            lexer,
            buf1,
            pos1,
            buf2,
            pos2,
        })
    }

    /// The lookahead token and the offset of its first byte.
    pub fn peek(&self) -> (&Token, usize) {
        (&self.buf1, self.pos1)
    }

    /// Takes the lookahead token, refilling the buffer.
    pub fn next(&mut self) -> Result<(Token, usize)> {
        let token = std::mem::replace(&mut self.buf1, Token::Eof);
        let pos = self.pos1;
        self.buf1 = std::mem::replace(&mut self.buf2, Token::Eof);
        self.pos1 = self.pos2;
        self.buf2 = self.lexer.next_token()?;
        self.pos2 = self.lexer.token_start();
        Ok((token, pos))
    }

    /// Consumes one token and checks it is the given bare keyword.
    pub fn expect_keyword(&mut self, keyword: &'static str) -> Result<usize> {
        let (token, pos) = self.next()?;
        if token.is_keyword(keyword) {
            Ok(pos)
        } else {
            Err(ParseError::UnexpectedToken {
                offset: pos,
                expected: keyword,
                found: token.describe(),
            })
        }
    }

    /// Consumes one token and checks it is a number, returned as an index.
    pub fn expect_index(&mut self, what: &'static str) -> Result<usize> {
        let (token, pos) = self.next()?;
        match token {
            Token::Number(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
            other => Err(ParseError::UnexpectedToken {
                offset: pos,
                expected: what,
                found: other.describe(),
            }),
        }
    }

    /// Reads and validates an indirect object header, `objnum gennum obj`.
    ///
    /// A header that is not three matching tokens means the xref offset
    /// does not point at the expected object.
    pub fn read_header(&mut self, expected: ObjRef, offset: usize) -> Result<()> {
        let mismatch = |found: String| ParseError::CorruptOffset {
            offset,
            expected,
            found,
        };

        let (num_tok, _) = self.next()?;
        let number = match num_tok {
            Token::Number(n) if n >= 0.0 && n.fract() == 0.0 => n as u32,
            other => return Err(mismatch(other.describe())),
        };

        let (gen_tok, _) = self.next()?;
        let generation = match gen_tok {
            Token::Number(n) if n >= 0.0 && n.fract() == 0.0 => n as u32,
            other => return Err(mismatch(other.describe())),
        };

        let (obj_tok, _) = self.next()?;
        if !obj_tok.is_keyword("obj") {
            return Err(mismatch(obj_tok.describe()));
        }

        if number != expected.number || generation != expected.generation {
            return Err(mismatch(format!(
                "header for {} {} obj",
                number, generation
            )));
        }

        Ok(())
    }

    /// Parses one value.
    ///
    /// `<<` begins a dictionary, `[` begins an array, and a number followed
    /// by `N R` in the lookahead is an indirect reference handed to the
    /// resolver before the enclosing container finishes. Everything else is
    /// a scalar. Keywords are never values; hitting one here is a
    /// structural error.
    pub fn parse_value(&mut self, ctx: &mut Resolver) -> Result<Value> {
        let (token, pos) = self.next()?;

        match token {
            Token::DictStart => self.parse_dict(ctx),
            Token::ArrayStart => self.parse_array(ctx),

            Token::Number(n) => {
                // `N G R` in the lookahead marks an indirect reference
                if let Token::Number(generation) = self.buf1 {
                    if self.buf2.is_keyword("R")
                        && n >= 0.0
                        && n.fract() == 0.0
                        && generation >= 0.0
                        && generation.fract() == 0.0
                    {
                        let reference = ObjRef::new(n as u32, generation as u32);
                        self.next()?; // generation
                        self.next()?; // R
                        let slot = ctx.reference(reference)?;
                        return Ok(Value::Indirect(slot));
                    }
                }
                Ok(Value::Number(n))
            }

            Token::Boolean(b) => Ok(Value::Boolean(b)),
            Token::Null => Ok(Value::Null),
            Token::String(s) => Ok(Value::String(s)),
            Token::HexString(s) => Ok(Value::HexString(s)),
            Token::Name(name) => Ok(Value::Name(name)),

            other => Err(ParseError::UnexpectedToken {
                offset: pos,
                expected: "value",
                found: other.describe(),
            }),
        }
    }

    /// `[ value value ... ]`
    fn parse_array(&mut self, ctx: &mut Resolver) -> Result<Value> {
        let mut items = Vec::new();

        loop {
            match &self.buf1 {
                Token::ArrayEnd => {
                    self.next()?;
                    break;
                }
                Token::Eof => {
                    return Err(ParseError::UnexpectedToken {
                        offset: self.pos1,
                        expected: "']'",
                        found: "end of data".to_string(),
                    });
                }
                _ => items.push(self.parse_value(ctx)?),
            }
        }

        Ok(Value::Array(items))
    }

    /// `<< /Key value ... >>`
    ///
    /// Keys must be names. A duplicate key overwrites the earlier entry
    /// (last wins, in encounter order).
    fn parse_dict(&mut self, ctx: &mut Resolver) -> Result<Value> {
        let mut dict = Dict::new();

        loop {
            if matches!(self.buf1, Token::DictEnd) {
                // A '>>' with `stream` in the lookahead must stay
                // unconsumed: refilling the buffer would tokenize raw
                // body bytes.
                if !self.buf2.is_keyword("stream") {
                    self.next()?;
                }
                break;
            }

            let (token, pos) = self.next()?;
            let key = match token {
                Token::Name(name) => name,
                other => {
                    return Err(ParseError::UnexpectedToken {
                        offset: pos,
                        expected: "name key or '>>'",
                        found: other.describe(),
                    });
                }
            };

            let value = self.parse_value(ctx)?;
            dict.insert(key, value);
        }

        Ok(Value::Dict(dict))
    }

    /// After a dictionary parse: the byte offset of a directly following
    /// `stream` keyword, if one is waiting in the lookahead.
    pub fn stream_keyword_ahead(&self) -> Option<usize> {
        if matches!(self.buf1, Token::DictEnd) && self.buf2.is_keyword("stream") {
            Some(self.pos2)
        } else {
            None
        }
    }
}
