//! Plain-text extraction from .docx documents.
//!
//! A .docx is a ZIP archive; the body lives in `word/document.xml`. The
//! archive's central directory is read to locate that entry, the entry is
//! inflated with `flate2` when deflated, and the WordprocessingML is walked
//! with `quick-xml`, keeping run text (`w:t`), tabs, breaks and paragraph
//! boundaries. Formatting, comments and deleted text are dropped.

use std::io::Read;

use flate2::read::DeflateDecoder;
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;

use super::ImportError;

const DOCUMENT_PART: &str = "word/document.xml";

const EOCD_SIGNATURE: u32 = 0x0605_4b50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const EOCD_MIN_LEN: usize = 22;

/// Upper bound on the inflated size of a single archive entry.
const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;

/// Extract the body text of a .docx held in memory.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ImportError> {
    let xml = read_zip_entry(bytes, DOCUMENT_PART)?;
    let xml = String::from_utf8(xml)
        .map_err(|_| corrupt("word/document.xml is not UTF-8"))?;
    document_xml_to_text(&xml)
}

fn corrupt(detail: &str) -> ImportError {
    ImportError::CorruptDocument(detail.to_string())
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at + 2)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Locate the end-of-central-directory record, scanning back over a
/// possible trailing archive comment.
fn find_eocd(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < EOCD_MIN_LEN {
        return None;
    }
    let last = bytes.len() - EOCD_MIN_LEN;
    let first = last.saturating_sub(u16::MAX as usize);
    (first..=last)
        .rev()
        .find(|&at| read_u32(bytes, at) == Some(EOCD_SIGNATURE))
}

/// Return the uncompressed contents of the named archive entry.
fn read_zip_entry(bytes: &[u8], name: &str) -> Result<Vec<u8>, ImportError> {
    let eocd = find_eocd(bytes).ok_or_else(|| corrupt("not a ZIP archive"))?;
    let entry_count = read_u16(bytes, eocd + 10).ok_or_else(|| corrupt("truncated directory"))?;
    let mut at = read_u32(bytes, eocd + 16).ok_or_else(|| corrupt("truncated directory"))? as usize;

    for _ in 0..entry_count {
        if read_u32(bytes, at) != Some(CENTRAL_HEADER_SIGNATURE) {
            return Err(corrupt("bad central directory entry"));
        }
        let field = |offset: usize| read_u16(bytes, at + offset).map(usize::from);
        let method = read_u16(bytes, at + 10).ok_or_else(|| corrupt("truncated entry"))?;
        let compressed_size =
            read_u32(bytes, at + 20).ok_or_else(|| corrupt("truncated entry"))? as usize;
        let name_len = field(28).ok_or_else(|| corrupt("truncated entry"))?;
        let extra_len = field(30).ok_or_else(|| corrupt("truncated entry"))?;
        let comment_len = field(32).ok_or_else(|| corrupt("truncated entry"))?;
        let local_offset =
            read_u32(bytes, at + 42).ok_or_else(|| corrupt("truncated entry"))? as usize;
        let entry_name = bytes
            .get(at + 46..at + 46 + name_len)
            .ok_or_else(|| corrupt("truncated entry name"))?;

        if entry_name == name.as_bytes() {
            return read_local_entry(bytes, local_offset, method, compressed_size);
        }

        at += 46 + name_len + extra_len + comment_len;
    }

    Err(ImportError::UnsupportedFormat(format!(
        "ZIP archive has no {name}; only Word .docx documents are supported"
    )))
}

fn read_local_entry(
    bytes: &[u8],
    offset: usize,
    method: u16,
    compressed_size: usize,
) -> Result<Vec<u8>, ImportError> {
    if read_u32(bytes, offset) != Some(LOCAL_HEADER_SIGNATURE) {
        return Err(corrupt("bad local file header"));
    }
    let header_field = |at: usize| {
        read_u16(bytes, offset + at)
            .map(usize::from)
            .ok_or_else(|| corrupt("truncated header"))
    };
    let name_len = header_field(26)?;
    let extra_len = header_field(28)?;
    let data_start = offset + 30 + name_len + extra_len;
    let data = bytes
        .get(data_start..data_start + compressed_size)
        .ok_or_else(|| corrupt("entry data out of bounds"))?;

    match method {
        METHOD_STORED => Ok(data.to_vec()),
        METHOD_DEFLATE => inflate_limited(data, MAX_ENTRY_BYTES),
        other => Err(corrupt(&format!("unsupported compression method {other}"))),
    }
}

/// Inflate a deflate stream, failing once the output exceeds `limit` bytes.
fn inflate_limited(data: &[u8], limit: u64) -> Result<Vec<u8>, ImportError> {
    let mut out = Vec::new();
    DeflateDecoder::new(data)
        .take(limit + 1)
        .read_to_end(&mut out)
        .map_err(|e| corrupt(&format!("inflate failed: {e}")))?;
    if out.len() as u64 > limit {
        return Err(corrupt(&format!(
            "entry inflates beyond {} MB",
            limit / (1024 * 1024)
        )));
    }
    Ok(out)
}

/// Flatten WordprocessingML to text: one line per paragraph.
fn document_xml_to_text(xml: &str) -> Result<String, ImportError> {
    let mut reader = XmlReader::from_str(xml);
    let mut out = String::new();
    let mut in_text_run = false;
    // Depth of open w:r elements; tab and break markers only count inside a run.
    // Elsewhere (e.g. w:pPr/w:tabs) they are layout definitions.
    let mut run_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = true,
                b"r" => run_depth += 1,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" if run_depth > 0 => out.push('\t'),
                b"br" | b"cr" if run_depth > 0 => out.push('\n'),
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let text = t
                    .unescape()
                    .map_err(|e| corrupt(&format!("bad text in document.xml: {e}")))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(corrupt(&format!(
                    "invalid XML at position {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    Ok(out.trim_end().to_string())
}
