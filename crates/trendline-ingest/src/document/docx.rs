//! DOCX text extraction
//!
//! A `.docx` file is a zip container; the body lives in `word/document.xml`.
//! Only run text (`w:t`), tabs, breaks and paragraph boundaries are kept.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

const DOCUMENT_PART: &str = "word/document.xml";

/// Upper bound on the decompressed body part.
const MAX_PART_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum DocxError {
    #[error("not a DOCX container: {0}")]
    Container(#[from] zip::result::ZipError),
    #[error("failed to read {DOCUMENT_PART}: {0}")]
    Io(#[from] std::io::Error),
    #[error("{DOCUMENT_PART} exceeds {MAX_PART_BYTES} bytes")]
    PartTooLarge,
    #[error("malformed XML in {DOCUMENT_PART}: {0}")]
    Xml(#[from] quick_xml::Error),
}

pub fn extract_docx_text(data: &[u8]) -> Result<String, DocxError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    let part = archive.by_name(DOCUMENT_PART)?;

    let mut xml = Vec::new();
    part.take(MAX_PART_BYTES + 1).read_to_end(&mut xml)?;
    if xml.len() as u64 > MAX_PART_BYTES {
        return Err(DocxError::PartTooLarge);
    }

    document_xml_to_text(&xml)
}

fn document_xml_to_text(xml: &[u8]) -> Result<String, DocxError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);

    let mut out = String::new();
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                out.push_str(&t.unescape()?);
            }
            Event::CData(t) if in_text => {
                out.push_str(&String::from_utf8_lossy(&t));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}
