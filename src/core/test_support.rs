//! In-memory PDF fixtures for unit tests.
//!
//! Offsets in the cross-reference sections are computed while the file is
//! assembled, never hand-counted, so fixtures stay valid as they are
//! edited.

#![allow(dead_code)]

/// Builds single- or multi-revision PDF files object by object.
pub struct PdfBuilder {
    data: Vec<u8>,
    /// (number, generation, offset) entries for the revision being built
    entries: Vec<(u32, u32, usize)>,
    last_xref: Option<usize>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        PdfBuilder {
            data: b"%PDF-1.4\n".to_vec(),
            entries: Vec::new(),
            last_xref: None,
        }
    }

    /// Appends `number 0 obj <body> endobj`.
    pub fn object(&mut self, number: u32, body: &str) -> &mut Self {
        self.object_gen(number, 0, body)
    }

    /// Appends an object with an explicit generation number.
    pub fn object_gen(&mut self, number: u32, generation: u32, body: &str) -> &mut Self {
        let offset = self.data.len();
        self.data
            .extend_from_slice(format!("{number} {generation} obj\n{body}\nendobj\n").as_bytes());
        self.entries.push((number, generation, offset));
        self
    }

    /// Appends verbatim text registered under (number, generation) in the
    /// xref section; used to fabricate corrupt objects.
    pub fn raw_object(&mut self, number: u32, generation: u32, text: &str) -> &mut Self {
        let offset = self.data.len();
        self.data.extend_from_slice(text.as_bytes());
        if !text.ends_with('\n') {
            self.data.push(b'\n');
        }
        self.entries.push((number, generation, offset));
        self
    }

    /// Appends a stream object; `/Length` is computed from the payload.
    /// Extra dictionary entries go in `dict_entries` (may be empty).
    pub fn stream_object(&mut self, number: u32, dict_entries: &str, payload: &[u8]) -> &mut Self {
        let offset = self.data.len();
        self.data.extend_from_slice(
            format!(
                "{number} 0 obj\n<< {dict_entries} /Length {} >>\nstream\n",
                payload.len()
            )
            .as_bytes(),
        );
        self.data.extend_from_slice(payload);
        self.data.extend_from_slice(b"\nendstream\nendobj\n");
        self.entries.push((number, 0, offset));
        self
    }

    /// Like `stream_object` but with the dictionary text given verbatim
    /// (for indirect or missing `/Length` entries).
    pub fn stream_object_raw(&mut self, number: u32, dict: &str, payload: &[u8]) -> &mut Self {
        let offset = self.data.len();
        self.data
            .extend_from_slice(format!("{number} 0 obj\n{dict}\nstream\n").as_bytes());
        self.data.extend_from_slice(payload);
        self.data.extend_from_slice(b"\nendstream\nendobj\n");
        self.entries.push((number, 0, offset));
        self
    }

    /// Writes the xref section and trailer for all objects added since the
    /// previous revision. `trailer_entries` is the inside of the trailer
    /// dictionary; `/Prev` is appended automatically on later revisions.
    pub fn end_revision(&mut self, trailer_entries: &str) -> &mut Self {
        let xref_offset = self.data.len();
        self.data.extend_from_slice(b"xref\n");
        if self.last_xref.is_none() {
            self.data.extend_from_slice(b"0 1\n0000000000 65535 f \n");
        }
        for (number, generation, offset) in self.entries.drain(..) {
            self.data.extend_from_slice(
                format!("{number} 1\n{offset:010} {generation:05} n \n").as_bytes(),
            );
        }
        let prev = match self.last_xref {
            Some(offset) => format!(" /Prev {offset}"),
            None => String::new(),
        };
        self.data.extend_from_slice(
            format!("trailer\n<< {trailer_entries}{prev} >>\nstartxref\n{xref_offset}\n%%EOF\n")
                .as_bytes(),
        );
        self.last_xref = Some(xref_offset);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.data.clone()
    }
}

/// A one-revision document with a catalog, a `Pages` root and two empty
/// pages; the smallest structure most tests need.
pub fn two_page_pdf() -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    builder
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>",
        )
        .object(
            4,
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>",
        )
        .end_revision("/Size 5 /Root 1 0 R");
    builder.build()
}
