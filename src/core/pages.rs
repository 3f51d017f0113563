use super::error::{ParseError, Result};
use super::object::{Dict, Value};
use super::resolver::Arena;
use smallvec::SmallVec;

/// Flattens a page tree into its leaves, depth-first and left-to-right
/// over each node's `Kids` array.
///
/// The walk is iterative with an explicit stack, so tree depth is bounded
/// by memory rather than by the call stack. Returned values are the node
/// handles in document order.
pub(crate) fn flatten(arena: &Arena, root: &Value) -> Result<Vec<Value>> {
    enum Kind {
        Leaf,
        Internal(Vec<Value>),
    }

    let mut pages = Vec::new();
    let mut stack: SmallVec<[Value; 16]> = SmallVec::new();
    stack.push(root.clone());

    while let Some(node) = stack.pop() {
        let kind = {
            let resolved = arena.resolve(&node);
            let dict = resolved.as_dict().ok_or_else(|| {
                ParseError::MalformedPageTree(format!(
                    "node is {}, expected dictionary",
                    resolved.type_name()
                ))
            })?;

            let tag = arena
                .resolve(dict.get("Type").unwrap_or(&Value::Null))
                .as_name()
                .unwrap_or("");

            match tag {
                "Page" => Kind::Leaf,
                "Pages" => {
                    let kids = dict.get("Kids").ok_or_else(|| {
                        ParseError::MalformedPageTree("Pages node has no Kids array".to_string())
                    })?;
                    let kids = arena.resolve(kids).as_array().ok_or_else(|| {
                        ParseError::MalformedPageTree("Kids is not an array".to_string())
                    })?;
                    Kind::Internal(kids.to_vec())
                }
                other => {
                    return Err(ParseError::MalformedPageTree(format!(
                        "node tagged /{other}, expected /Page or /Pages"
                    )));
                }
            }
        };

        match kind {
            Kind::Leaf => pages.push(node),
            // push right-to-left so popping yields document order
            Kind::Internal(kids) => stack.extend(kids.into_iter().rev()),
        }
    }

    Ok(pages)
}

/// One leaf page, exposing its dictionary entries with indirection
/// already followed.
#[derive(Clone, Copy)]
pub struct Page<'a> {
    pub(crate) arena: &'a Arena,
    pub(crate) dict: &'a Dict,
    pub(crate) index: usize,
}

impl<'a> Page<'a> {
    /// Zero-based position in document order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The page dictionary itself.
    pub fn dict(&self) -> &'a Dict {
        self.dict
    }

    /// An entry of the page dictionary, resolved through the arena.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.dict.get(key).map(|value| self.arena.resolve(value))
    }

    /// `[llx lly urx ury]` page boundary, when declared on the page.
    pub fn media_box(&self) -> Option<&'a Value> {
        self.get("MediaBox")
    }

    pub fn resources(&self) -> Option<&'a Value> {
        self.get("Resources")
    }

    /// The content stream or array of content streams.
    pub fn contents(&self) -> Option<&'a Value> {
        self.get("Contents")
    }
}
