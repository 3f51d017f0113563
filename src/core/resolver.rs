use super::buffer::Buffer;
use super::error::{ParseError, Result};
use super::object::{Dict, ObjRef, SlotId, StreamObject, Value};
use super::parser::Parser;
use super::xref::XrefTable;
use rustc_hash::FxHashMap;
use tracing::warn;

static NULL: Value = Value::Null;

/// Resolution state of one canonical object slot.
///
/// A slot moves `Pending -> InProgress -> Resolved` exactly once. While a
/// slot is in progress, a reference back to it (a cycle) simply receives
/// the existing handle; the value shows up for every holder the moment the
/// slot resolves.
#[derive(Debug)]
enum Slot {
    Pending(ObjRef),
    InProgress(ObjRef),
    Resolved(Value),
}

/// Arena owning the canonical instance of every indirect object.
///
/// Each object reference maps to exactly one slot. Containers store
/// `Value::Indirect(SlotId)` handles into this arena, never copies, so a
/// forward or circular reference needs no backpatching beyond the slot's
/// own state transition.
#[derive(Debug)]
pub struct Arena {
    slots: Vec<Slot>,
    index: FxHashMap<ObjRef, SlotId>,
    /// Slots interned before resolution started (trailer references).
    pending: Vec<SlotId>,
}

impl Arena {
    pub fn new() -> Self {
        Arena {
            slots: Vec::new(),
            index: FxHashMap::default(),
            pending: Vec::new(),
        }
    }

    /// Returns the canonical slot for a reference, creating it on first
    /// sight.
    pub(crate) fn intern(&mut self, reference: ObjRef) -> SlotId {
        if let Some(slot) = self.index.get(&reference) {
            return *slot;
        }
        let slot = SlotId(self.slots.len());
        self.slots.push(Slot::Pending(reference));
        self.index.insert(reference, slot);
        self.pending.push(slot);
        slot
    }

    pub fn lookup(&self, reference: ObjRef) -> Option<SlotId> {
        self.index.get(&reference).copied()
    }

    /// The resolved value of a slot; `None` while unresolved.
    pub fn value(&self, slot: SlotId) -> Option<&Value> {
        match self.slots.get(slot.0) {
            Some(Slot::Resolved(value)) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn value_mut(&mut self, slot: SlotId) -> Option<&mut Value> {
        match self.slots.get_mut(slot.0) {
            Some(Slot::Resolved(value)) => Some(value),
            _ => None,
        }
    }

    /// Follows indirection handles to the underlying value. Unresolved
    /// slots and over-long reference chains read as null.
    pub fn resolve<'a>(&'a self, mut value: &'a Value) -> &'a Value {
        let mut hops = 0;
        while let Value::Indirect(slot) = value {
            if hops >= 64 {
                // a chain this long is a reference loop
                return &NULL;
            }
            match self.value(*slot) {
                Some(inner) => value = inner,
                None => return &NULL,
            }
            hops += 1;
        }
        value
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn is_pending(&self, slot: SlotId) -> bool {
        matches!(self.slots[slot.0], Slot::Pending(_))
    }

    fn mark_in_progress(&mut self, slot: SlotId) {
        if let Slot::Pending(reference) = self.slots[slot.0] {
            self.slots[slot.0] = Slot::InProgress(reference);
        }
    }

    fn fill(&mut self, slot: SlotId, value: Value) {
        debug_assert!(
            !matches!(self.slots[slot.0], Slot::Resolved(_)),
            "slot resolved twice"
        );
        self.slots[slot.0] = Slot::Resolved(value);
    }

    fn next_pending(&mut self) -> Option<(SlotId, ObjRef)> {
        while let Some(slot) = self.pending.pop() {
            if let Slot::Pending(reference) = self.slots[slot.0] {
                return Some((slot, reference));
            }
        }
        None
    }

    /// Number of slots that have not reached the resolved state.
    pub fn unresolved_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| !matches!(slot, Slot::Resolved(_)))
            .count()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

/// The indirect object resolver.
///
/// Owns the per-document parsing context: the shared byte buffer, the
/// cross-reference table and the object arena. Resolution is a depth-first
/// walk over recursive `reference` calls; every object is read from disk
/// at most once and re-requests return the memoized slot.
#[derive(Debug)]
pub struct Resolver {
    buffer: Buffer,
    xref: XrefTable,
    arena: Arena,
    /// False while the xref chain is still loading; references then only
    /// reserve slots and resolution is deferred to `resolve_all`.
    resolving: bool,
}

impl Resolver {
    pub fn new(buffer: Buffer) -> Self {
        Resolver {
            buffer,
            xref: XrefTable::new(),
            arena: Arena::new(),
            resolving: false,
        }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    pub fn xref(&self) -> &XrefTable {
        &self.xref
    }

    pub(crate) fn xref_mut(&mut self) -> &mut XrefTable {
        &mut self.xref
    }

    pub(crate) fn share_buffer(&self) -> Buffer {
        self.buffer.clone()
    }

    pub(crate) fn into_parts(self) -> (Arena, XrefTable) {
        (self.arena, self.xref)
    }

    /// Returns the canonical slot for a reference, resolving it on the
    /// spot when possible.
    ///
    /// A slot already resolved or currently resolving (a cycle) is
    /// returned as-is. A reference with no xref entry resolves to null and
    /// parsing continues; a dangling reference does not abort the parse.
    pub fn reference(&mut self, reference: ObjRef) -> Result<SlotId> {
        let slot = self.arena.intern(reference);
        if self.resolving && self.arena.is_pending(slot) {
            self.resolve_slot(slot, reference)?;
        }
        Ok(slot)
    }

    /// Drains every slot reserved so far, then keeps going until nothing
    /// is left unresolved. Called once by document assembly after the xref
    /// chain is loaded.
    pub(crate) fn resolve_all(&mut self) -> Result<()> {
        self.resolving = true;
        while let Some((slot, reference)) = self.arena.next_pending() {
            self.resolve_slot(slot, reference)?;
        }
        debug_assert_eq!(self.arena.unresolved_count(), 0);
        Ok(())
    }

    /// Reads one indirect object from its xref offset and fills its slot.
    fn resolve_slot(&mut self, slot: SlotId, reference: ObjRef) -> Result<()> {
        let Some(offset) = self.xref.offset_of(reference) else {
            warn!(reference = %reference, "no xref entry, substituting null");
            self.arena.fill(slot, Value::Null);
            return Ok(());
        };

        self.arena.mark_in_progress(slot);

        let mut parser = Parser::at(self.buffer.clone(), offset).map_err(|_| {
            ParseError::CorruptOffset {
                offset,
                expected: reference,
                found: "offset beyond end of file".to_string(),
            }
        })?;
        parser.read_header(reference, offset)?;

        let value = parser.parse_value(self)?;
        let value = match value {
            Value::Dict(dict) => self.attach_stream(dict, &parser)?,
            other => other,
        };

        self.arena.fill(slot, value);
        Ok(())
    }

    /// Checks whether raw stream bytes follow a just-parsed dictionary and
    /// attaches them.
    ///
    /// `endobj` in the lookahead means a plain dictionary. `stream` means a
    /// body follows; anything else is a structural error.
    fn attach_stream(&mut self, dict: Dict, parser: &Parser) -> Result<Value> {
        if let Some(keyword_start) = parser.stream_keyword_ahead() {
            let data = self.extract_stream_body(&dict, keyword_start)?;
            return Ok(Value::Stream(StreamObject {
                dict,
                data,
                decoded: false,
            }));
        }

        let (token, pos) = parser.peek();
        if token.is_keyword("endobj") {
            return Ok(Value::Dict(dict));
        }

        Err(ParseError::UnexpectedToken {
            offset: pos,
            expected: "'stream' or 'endobj'",
            found: token.describe(),
        })
    }

    /// Determines the exact byte range of a stream body and validates the
    /// trailing `endstream endobj` keywords.
    ///
    /// The body begins one line terminator after the `stream` keyword; LF
    /// and CRLF are accepted, a bare CR is not. The byte length comes from
    /// the dictionary's `Length` entry, which was already resolved if
    /// indirect; when no usable length exists (a reference cycle, or a
    /// value that is not a number) the body is delimited by scanning
    /// forward for `endstream` instead.
    fn extract_stream_body(&mut self, dict: &Dict, keyword_start: usize) -> Result<Vec<u8>> {
        let after_keyword = keyword_start + "stream".len();
        let body_start = match self.buffer.byte_at(after_keyword) {
            Some(b'\n') => after_keyword + 1,
            Some(b'\r') => {
                if self.buffer.byte_at(after_keyword + 1) == Some(b'\n') {
                    after_keyword + 2
                } else {
                    return Err(ParseError::MalformedStream {
                        offset: after_keyword,
                        reason: "bare CR after 'stream' keyword".to_string(),
                    });
                }
            }
            _ => {
                return Err(ParseError::MalformedStream {
                    offset: after_keyword,
                    reason: "missing line terminator after 'stream' keyword".to_string(),
                });
            }
        };

        let (data, body_end) = match self.stream_length(dict) {
            Some(length) => {
                let data = self
                    .buffer
                    .byte_range(body_start, body_start + length)
                    .ok_or_else(|| ParseError::MalformedStream {
                        offset: body_start,
                        reason: format!("body of {length} bytes extends past end of file"),
                    })?
                    .to_vec();
                (data, body_start + length)
            }
            None => {
                warn!(
                    offset = body_start,
                    "stream has no usable Length, scanning for 'endstream'"
                );
                let end = self
                    .buffer
                    .find_from(b"endstream", body_start)
                    .ok_or_else(|| ParseError::MalformedStream {
                        offset: body_start,
                        reason: "no 'endstream' keyword after body".to_string(),
                    })?;
                let mut data = self
                    .buffer
                    .byte_range(body_start, end)
                    .unwrap_or_default()
                    .to_vec();
                while matches!(data.last(), Some(b'\n' | b'\r' | b' ')) {
                    data.pop();
                }
                (data, end)
            }
        };

        let mut tail = Parser::at(self.buffer.clone(), body_end).map_err(|_| {
            ParseError::MalformedStream {
                offset: body_start,
                reason: "body runs to end of file".to_string(),
            }
        })?;
        let (first, _) = tail.next()?;
        let (second, _) = tail.next()?;
        if !first.is_keyword("endstream") || !second.is_keyword("endobj") {
            return Err(ParseError::MalformedStream {
                offset: body_start,
                reason: format!(
                    "expected 'endstream endobj' after body, found {} {}",
                    first.describe(),
                    second.describe()
                ),
            });
        }

        Ok(data)
    }

    /// The declared stream length, following an indirect `Length` through
    /// the arena. `None` when absent or not resolvable to a non-negative
    /// integer.
    fn stream_length(&self, dict: &Dict) -> Option<usize> {
        let length = dict.get("Length")?;
        self.arena.resolve(length).as_index()
    }
}
