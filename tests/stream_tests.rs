//! Stream extraction scenarios.


use pdf_graph::{Document, ParseError, Value};
use test_utils::*;

fn one_page_with_contents(builder: &mut PdfBuilder) {
    builder
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>");
}

fn contents_stream(doc: &Document) -> pdf_graph::StreamObject {
    doc.page(0)
        .unwrap()
        .contents()
        .unwrap()
        .as_stream()
        .unwrap()
        .clone()
}

#[test]
fn test_direct_length() {
    let mut builder = PdfBuilder::new();
    one_page_with_contents(&mut builder);
    builder.stream_object(4, "", b"0 0 m 10 10 l S");
    builder.end_revision("/Size 5 /Root 1 0 R");

    let doc = Document::parse(builder.build()).unwrap();
    let stream = contents_stream(&doc);
    assert_eq!(stream.data, b"0 0 m 10 10 l S");
    assert_eq!(
        stream.dict.get("Length"),
        Some(&Value::Number(15.0))
    );
}

#[test]
fn test_indirect_length_defined_later_in_file() {
    let payload = b"BT (forward length) Tj ET";
    let mut builder = PdfBuilder::new();
    one_page_with_contents(&mut builder);
    builder.stream_object_raw(4, "<< /Length 5 0 R >>", payload);
    builder.object(5, &payload.len().to_string());
    builder.end_revision("/Size 6 /Root 1 0 R");

    let doc = Document::parse(builder.build()).unwrap();
    assert_eq!(contents_stream(&doc).data, payload);
}

#[test]
fn test_indirect_and_direct_length_extract_the_same_range() {
    let payload = b"identical body bytes";

    let mut direct = PdfBuilder::new();
    one_page_with_contents(&mut direct);
    direct.stream_object(4, "", payload);
    direct.end_revision("/Size 5 /Root 1 0 R");

    let mut indirect = PdfBuilder::new();
    one_page_with_contents(&mut indirect);
    indirect.stream_object_raw(4, "<< /Length 5 0 R >>", payload);
    indirect.object(5, &payload.len().to_string());
    indirect.end_revision("/Size 6 /Root 1 0 R");

    let direct_doc = Document::parse(direct.build()).unwrap();
    let indirect_doc = Document::parse(indirect.build()).unwrap();
    assert_eq!(
        contents_stream(&direct_doc).data,
        contents_stream(&indirect_doc).data
    );
}

#[test]
fn test_dictionary_without_stream_keyword_has_no_body() {
    let mut builder = PdfBuilder::new();
    builder
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>")
        // looks like a stream dictionary but is followed by plain endobj
        .object(4, "<< /Length 100 >>")
        .end_revision("/Size 5 /Root 1 0 R");

    let doc = Document::parse(builder.build()).unwrap();
    let contents = doc.page(0).unwrap().contents().unwrap();
    assert!(contents.as_stream().is_none());
    assert!(matches!(contents, Value::Dict(_)));
}

#[test]
fn test_missing_endobj_after_endstream_is_malformed() {
    let payload = b"BODY";
    let mut builder = PdfBuilder::new();
    one_page_with_contents(&mut builder);
    builder.raw_object(
        4,
        0,
        &format!(
            "4 0 obj\n<< /Length {} >>\nstream\n{}\nendstream",
            payload.len(),
            std::str::from_utf8(payload).unwrap()
        ),
    );
    builder.end_revision("/Size 5 /Root 1 0 R");
    let data = builder.build();

    let body_start = data.windows(4).position(|w| w == b"BODY").unwrap();
    match Document::parse(data).unwrap_err() {
        ParseError::MalformedStream { offset, .. } => assert_eq!(offset, body_start),
        other => panic!("expected MalformedStream, got {other:?}"),
    }
}

#[test]
fn test_length_overrunning_the_file_is_malformed() {
    let mut builder = PdfBuilder::new();
    one_page_with_contents(&mut builder);
    builder.stream_object_raw(4, "<< /Length 100000 >>", b"short");
    builder.end_revision("/Size 5 /Root 1 0 R");

    let err = Document::parse(builder.build()).unwrap_err();
    assert!(matches!(err, ParseError::MalformedStream { .. }));
}

#[test]
fn test_binary_payload_survives_extraction() {
    let payload: Vec<u8> = (0u8..=255).collect();
    let mut builder = PdfBuilder::new();
    one_page_with_contents(&mut builder);
    builder.stream_object(4, "", &payload);
    builder.end_revision("/Size 5 /Root 1 0 R");

    let doc = Document::parse(builder.build()).unwrap();
    assert_eq!(contents_stream(&doc).data, payload);
}

#[test]
fn test_stream_dict_entries_are_reachable() {
    let mut builder = PdfBuilder::new();
    one_page_with_contents(&mut builder);
    builder.stream_object(4, "/Subtype /Text", b"abc");
    builder.end_revision("/Size 5 /Root 1 0 R");

    let doc = Document::parse(builder.build()).unwrap();
    let stream = contents_stream(&doc);
    assert_eq!(stream.dict.get("Subtype"), Some(&Value::Name("Text".into())));
    assert!(stream.decoded); // no filters declared, payload is final
}
