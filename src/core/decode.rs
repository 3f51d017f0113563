//! Stream filter pipeline.
//!
//! Stream payloads are stored raw during parsing; after the whole object
//! graph is built, document assembly runs [`decompress_all`] once over
//! every resolved stream. Only FlateDecode is implemented here; an
//! unsupported filter leaves the payload raw, while corrupt data aborts
//! the parse.

use super::error::{DecodeError, Result};
use super::object::{Dict, SlotId, Value};
use super::resolver::Arena;
use flate2::read::ZlibDecoder;
use smallvec::SmallVec;
use std::io::Read;
use tracing::warn;

/// Filter names declared by one stream dictionary; almost always zero or
/// one entry.
pub(crate) type FilterChain = SmallVec<[String; 2]>;

/// Decodes a FlateDecode (zlib/deflate) compressed payload.
pub fn decode_flate(data: &[u8]) -> std::result::Result<Vec<u8>, DecodeError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| DecodeError::Corrupt(format!("FlateDecode: {e}")))?;
    Ok(decompressed)
}

/// Runs a payload through its declared filters in order.
pub fn decode_stream(
    data: &[u8],
    filters: &[String],
) -> std::result::Result<Vec<u8>, DecodeError> {
    let mut current = data.to_vec();
    for filter in filters {
        current = match filter.as_str() {
            "FlateDecode" => decode_flate(&current)?,
            other => return Err(DecodeError::Unsupported(other.to_string())),
        };
    }
    Ok(current)
}

/// The `Filter` entry of a stream dictionary as a list of names, with
/// indirection followed. A single name and an array of names are both
/// accepted; anything else reads as no filters.
pub(crate) fn filter_chain(arena: &Arena, dict: &Dict) -> FilterChain {
    match arena.resolve(dict.get("Filter").unwrap_or(&Value::Null)) {
        Value::Name(name) => std::iter::once(name.clone()).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| arena.resolve(item).as_name().map(str::to_string))
            .collect(),
        _ => FilterChain::new(),
    }
}

/// Decompression pre-pass over every resolved stream in the arena.
///
/// Streams with no declared filters are final as stored. An unsupported
/// filter is logged and the payload stays raw with `decoded` unset;
/// corrupt data is fatal.
pub(crate) fn decompress_all(arena: &mut Arena) -> Result<()> {
    let mut work: Vec<(SlotId, FilterChain)> = Vec::new();
    for i in 0..arena.slot_count() {
        let slot = SlotId(i);
        if let Some(Value::Stream(stream)) = arena.value(slot) {
            if !stream.decoded {
                work.push((slot, filter_chain(arena, &stream.dict)));
            }
        }
    }

    for (slot, filters) in work {
        if filters.is_empty() {
            if let Some(Value::Stream(stream)) = arena.value_mut(slot) {
                stream.decoded = true;
            }
            continue;
        }

        let Some(Value::Stream(stream)) = arena.value(slot) else {
            continue;
        };
        match decode_stream(&stream.data, &filters) {
            Ok(data) => {
                if let Some(Value::Stream(stream)) = arena.value_mut(slot) {
                    stream.data = data;
                    stream.decoded = true;
                }
            }
            Err(DecodeError::Unsupported(name)) => {
                warn!(filter = %name, "unsupported stream filter, leaving payload raw");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
