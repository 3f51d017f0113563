use super::buffer::Buffer;
use super::decode;
use super::error::{ParseError, Result};
use super::object::{Dict, ObjRef, Value};
use super::pages::{self, Page};
use super::resolver::{Arena, Resolver};
use super::xref::{self, XrefTable};
use std::path::Path;

/// A fully parsed PDF document.
///
/// Holds the merged trailer dictionary, the frozen object arena behind it
/// and the flattened page list. Everything is read-only once assembly
/// completes, so a finished document can be shared across threads freely.
///
/// Parsing the same bytes twice produces equal but independently owned
/// graphs; no state is shared between documents.
#[derive(Debug)]
pub struct Document {
    arena: Arena,
    xref: XrefTable,
    trailer: Dict,
    pages: Vec<Value>,
    version: Option<String>,
}

impl Document {
    /// Parses a complete PDF file held in memory.
    ///
    /// Assembly order: strip trailing NUL padding, load the xref chain,
    /// resolve everything reachable from the trailer, flatten the page
    /// tree, then run the decompression pre-pass over every stream.
    ///
    /// # Example
    /// ```no_run
    /// use pdf_graph::Document;
    ///
    /// let data = std::fs::read("document.pdf").unwrap();
    /// let doc = Document::parse(data).unwrap();
    /// println!("{} pages", doc.page_count());
    /// ```
    pub fn parse(mut data: Vec<u8>) -> Result<Self> {
        // trailing NUL padding would defeat the startxref search
        while data.last() == Some(&0) {
            data.pop();
        }
        let version = sniff_version(&data);

        let mut resolver = Resolver::new(Buffer::new(data));
        let trailer = xref::load_chain(&mut resolver)?;
        resolver.resolve_all()?;

        let pages = {
            let arena = resolver.arena();
            let root_value = trailer
                .get("Root")
                .ok_or_else(|| ParseError::Structure("trailer has no Root entry".to_string()))?;
            let root = arena.resolve(root_value);
            let root_dict = root.as_dict().ok_or_else(|| {
                ParseError::Structure(format!("Root is {}, expected dictionary", root.type_name()))
            })?;
            let pages_root = root_dict.get("Pages").ok_or_else(|| {
                ParseError::Structure("document catalog has no Pages entry".to_string())
            })?;
            pages::flatten(arena, pages_root)?
        };

        decode::decompress_all(resolver.arena_mut())?;

        let (arena, xref) = resolver.into_parts();
        Ok(Document {
            arena,
            xref,
            trailer,
            pages,
            version,
        })
    }

    /// Thin adapter: reads a file and parses it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::parse(std::fs::read(path)?)
    }

    /// The `%PDF-x.y` header version, when the file carries one.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The merged trailer dictionary.
    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    /// A trailer entry by name, with indirection followed.
    pub fn trailer_get(&self, key: &str) -> Option<&Value> {
        self.trailer.get(key).map(|value| self.resolve(value))
    }

    /// Follows indirection handles to the underlying value.
    pub fn resolve<'a>(&'a self, value: &'a Value) -> &'a Value {
        self.arena.resolve(value)
    }

    /// A dictionary entry by name, with indirection followed.
    pub fn get<'a>(&'a self, dict: &'a Dict, key: &str) -> Option<&'a Value> {
        dict.get(key).map(|value| self.resolve(value))
    }

    /// An indirect object by reference, if the document defines it.
    pub fn object(&self, number: u32, generation: u32) -> Option<&Value> {
        let slot = self.arena.lookup(ObjRef::new(number, generation))?;
        self.arena.value(slot)
    }

    /// The document catalog (the resolved `Root` dictionary).
    pub fn catalog(&self) -> Option<&Dict> {
        self.trailer_get("Root")?.as_dict()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// One page by zero-based index.
    pub fn page(&self, index: usize) -> Option<Page<'_>> {
        let node = self.pages.get(index)?;
        let dict = self.arena.resolve(node).as_dict()?;
        Some(Page {
            arena: &self.arena,
            dict,
            index,
        })
    }

    /// All pages, in document order.
    pub fn pages(&self) -> impl Iterator<Item = Page<'_>> {
        (0..self.pages.len()).filter_map(|index| self.page(index))
    }
}

fn sniff_version(data: &[u8]) -> Option<String> {
    let rest = data.strip_prefix(b"%PDF-")?;
    let end = rest
        .iter()
        .position(|byte| byte.is_ascii_whitespace())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    Some(String::from_utf8_lossy(&rest[..end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{PdfBuilder, two_page_pdf};
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    #[test]
    fn test_two_page_round_trip() {
        let doc = Document::parse(two_page_pdf()).unwrap();

        assert_eq!(doc.version(), Some("1.4"));
        assert_eq!(doc.page_count(), 2);
        for page in doc.pages() {
            let media_box = page.media_box().expect("MediaBox").as_array().unwrap();
            assert_eq!(media_box.len(), 4);
            assert_eq!(media_box[2], Value::Number(612.0));
        }
        // declared page count matches the flattened list
        let catalog = doc.catalog().unwrap();
        let pages_dict = doc.get(catalog, "Pages").unwrap().as_dict().unwrap();
        assert_eq!(
            doc.get(pages_dict, "Count").unwrap().as_index(),
            Some(doc.page_count())
        );
    }

    #[test]
    fn test_trailing_nul_padding_is_stripped() {
        let mut data = two_page_pdf();
        data.extend_from_slice(&[0u8; 64]);
        let doc = Document::parse(data).unwrap();
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_missing_root_is_a_structure_error() {
        let data = PdfBuilder::new()
            .object(1, "42")
            .end_revision("/Size 2")
            .build();
        let err = Document::parse(data).unwrap_err();
        assert!(matches!(err, ParseError::Structure(_)));
    }

    #[test]
    fn test_reparse_yields_equal_independent_graphs() {
        let data = two_page_pdf();
        let first = Document::parse(data.clone()).unwrap();
        let second = Document::parse(data).unwrap();

        assert_eq!(first.trailer(), second.trailer());
        assert_eq!(first.page_count(), second.page_count());
        for (a, b) in first.pages().zip(second.pages()) {
            assert_eq!(a.dict(), b.dict());
        }
    }

    #[test]
    fn test_decode_pre_pass_inflates_streams() {
        let plaintext = b"BT /F1 12 Tf (Hello) Tj ET";
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(plaintext).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut builder = PdfBuilder::new();
        builder
            .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
            .object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>");
        builder.stream_object(4, "/Filter /FlateDecode", &compressed);
        builder.end_revision("/Size 5 /Root 1 0 R");

        let doc = Document::parse(builder.build()).unwrap();
        let contents = doc.page(0).unwrap().contents().unwrap();
        let stream = contents.as_stream().unwrap();
        assert!(stream.decoded);
        assert_eq!(stream.data, plaintext);
    }

    #[test]
    fn test_unsupported_filter_leaves_payload_raw() {
        let mut builder = PdfBuilder::new();
        builder
            .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
            .object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>");
        builder.stream_object(4, "/Filter /JPXDecode", b"opaque bytes");
        builder.end_revision("/Size 5 /Root 1 0 R");

        let doc = Document::parse(builder.build()).unwrap();
        let stream = doc.page(0).unwrap().contents().unwrap().as_stream().unwrap();
        assert!(!stream.decoded);
        assert_eq!(stream.data, b"opaque bytes");
    }

    #[test]
    fn test_object_lookup_by_reference() {
        let doc = Document::parse(two_page_pdf()).unwrap();
        let catalog = doc.object(1, 0).unwrap().as_dict().unwrap();
        assert_eq!(catalog.get("Type"), Some(&Value::Name("Catalog".into())));
        assert!(doc.object(99, 0).is_none());
    }
}
