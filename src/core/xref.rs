use super::buffer::Buffer;
use super::error::{ParseError, Result};
use super::lexer::Token;
use super::object::{Dict, ObjRef, Value};
use super::parser::Parser;
use super::resolver::Resolver;
use rustc_hash::{FxHashMap, FxHashSet};

/// Cross-reference table: object reference to byte offset of the object's
/// definition.
///
/// Built once by merging the xref sections of every revision, newest
/// first, then read-only. Entries are inserted with insert-if-absent
/// semantics, so an older section can never overwrite an entry already
/// present from a newer one.
#[derive(Debug)]
pub struct XrefTable {
    offsets: FxHashMap<ObjRef, usize>,
}

impl XrefTable {
    pub fn new() -> Self {
        XrefTable {
            offsets: FxHashMap::default(),
        }
    }

    /// Records an entry unless the reference is already present.
    pub fn insert_if_absent(&mut self, reference: ObjRef, offset: usize) {
        self.offsets.entry(reference).or_insert(offset);
    }

    pub fn offset_of(&self, reference: ObjRef) -> Option<usize> {
        self.offsets.get(&reference).copied()
    }

    pub fn contains(&self, reference: ObjRef) -> bool {
        self.offsets.contains_key(&reference)
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

impl Default for XrefTable {
    fn default() -> Self {
        Self::new()
    }
}

fn malformed(context: &str, err: ParseError) -> ParseError {
    ParseError::MalformedXref(format!("{context}: {err}"))
}

/// Locates the byte offset of the newest xref section.
///
/// Finds the last `startxref` keyword, reads the integer after it and
/// confirms the `%%EOF` marker follows. The buffer is expected to have
/// had trailing NUL padding stripped already.
pub(crate) fn find_startxref(buffer: &Buffer) -> Result<usize> {
    let keyword = b"startxref";
    let pos = buffer
        .rfind(keyword)
        .ok_or_else(|| ParseError::MalformedXref("no 'startxref' keyword".to_string()))?;

    let data = buffer.as_slice();
    let mut i = pos + keyword.len();
    while i < data.len() && data[i].is_ascii_whitespace() {
        i += 1;
    }

    let digits_start = i;
    let mut offset: usize = 0;
    while i < data.len() && data[i].is_ascii_digit() {
        offset = offset
            .checked_mul(10)
            .and_then(|v| v.checked_add((data[i] - b'0') as usize))
            .ok_or_else(|| {
                ParseError::MalformedXref("startxref offset out of range".to_string())
            })?;
        i += 1;
    }
    if digits_start == i {
        return Err(ParseError::MalformedXref(
            "no offset after 'startxref'".to_string(),
        ));
    }

    while i < data.len() && data[i].is_ascii_whitespace() {
        i += 1;
    }
    if !data[i..].starts_with(b"%%EOF") {
        return Err(ParseError::MalformedXref(
            "missing '%%EOF' marker after startxref".to_string(),
        ));
    }

    Ok(offset)
}

/// Loads the whole xref chain and returns the merged trailer dictionary.
///
/// Walks from the newest section backwards through `Prev` pointers. Both
/// table entries and trailer keys merge with never-overwrite semantics, so
/// the newest definition always wins. References inside trailer
/// dictionaries reserve arena slots; resolution happens later, once the
/// table is complete.
pub(crate) fn load_chain(ctx: &mut Resolver) -> Result<Dict> {
    let buffer = ctx.share_buffer();
    let start = find_startxref(&buffer)?;

    let mut merged = Dict::new();
    let mut next = Some(start);
    let mut visited: FxHashSet<usize> = FxHashSet::default();

    while let Some(offset) = next {
        if !visited.insert(offset) {
            return Err(ParseError::MalformedXref(format!(
                "xref chain loops back to offset {offset}"
            )));
        }

        let section = read_section(ctx, offset)?;

        // The chain follows each section's own Prev pointer, taken before
        // the merge so an older pointer cannot resurrect a visited section.
        next = match section.get("Prev") {
            None => None,
            Some(value) => Some(value.as_index().ok_or_else(|| {
                ParseError::MalformedXref("non-numeric Prev in trailer".to_string())
            })?),
        };

        for (key, value) in section {
            merged.entry(key).or_insert(value);
        }
    }

    // the chain is exhausted; a live Prev pointer must not survive it
    merged.remove("Prev");
    Ok(merged)
}

/// Reads one `xref` section and its trailer dictionary at `offset`,
/// inserting in-use entries into the table.
fn read_section(ctx: &mut Resolver, offset: usize) -> Result<Dict> {
    let mut parser = Parser::at(ctx.share_buffer(), offset)
        .map_err(|e| malformed("xref section offset", e))?;
    parser
        .expect_keyword("xref")
        .map_err(|e| malformed("xref section", e))?;

    loop {
        let (token, _) = parser.next()?;
        if token.is_keyword("trailer") {
            break;
        }

        let first = match token {
            Token::Number(n) if n >= 0.0 && n.fract() == 0.0 => n as usize,
            other => {
                return Err(ParseError::MalformedXref(format!(
                    "expected subsection start or 'trailer', found {}",
                    other.describe()
                )));
            }
        };
        let count = parser
            .expect_index("subsection count")
            .map_err(|e| malformed("xref subsection", e))?;

        for i in 0..count {
            let entry_offset = parser
                .expect_index("entry offset")
                .map_err(|e| malformed("xref entry", e))?;
            let generation = parser
                .expect_index("entry generation")
                .map_err(|e| malformed("xref entry", e))?;
            let (flag, _) = parser.next()?;

            if flag.is_keyword("n") {
                // in-use entry; free entries are skipped
                let reference = ObjRef::new((first + i) as u32, generation as u32);
                ctx.xref_mut().insert_if_absent(reference, entry_offset);
            } else if !flag.is_keyword("f") {
                return Err(ParseError::MalformedXref(format!(
                    "expected 'n' or 'f' entry flag, found {}",
                    flag.describe()
                )));
            }
        }
    }

    match parser.parse_value(ctx)? {
        Value::Dict(dict) => Ok(dict),
        other => Err(ParseError::MalformedXref(format!(
            "expected trailer dictionary, found {}",
            other.type_name()
        ))),
    }
}
