//! I/O helpers shared by the commands.
//!
//! - **Input**: whole-file reads decoded through `encoding_rs` (UTF-8 by
//!   default, Shift_JIS and friends on request) with the byte-order mark
//!   stripped. The `-` path reads standard input.
//! - **Delimiters**: `.tsv` inputs default to tab, everything else to comma.
//! - **Output**: the `-` path (or no path) writes to standard output.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn is_json_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("json")
    )
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Flexible reader: rows may be shorter or longer than the header, cells are trimmed.
pub fn open_csv_reader<R>(reader: R, delimiter: u8, has_headers: bool) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(has_headers)
        .delimiter(delimiter)
        .double_quote(true)
        .trim(csv::Trim::All)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn read_input_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if is_dash(path) {
        io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("Reading standard input")?;
    } else {
        File::open(path)
            .with_context(|| format!("Opening input file {path:?}"))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("Reading input file {path:?}"))?;
    }
    Ok(bytes)
}

pub fn read_input_text(path: &Path, encoding: &'static Encoding) -> Result<String> {
    let bytes = read_input_bytes(path)?;
    decode_bytes(&bytes, encoding).with_context(|| format!("Decoding {path:?}"))
}

/// Decodes `bytes`, honouring a byte-order mark over the requested encoding.
pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!("Failed to decode text with encoding {}", used.name()))
    } else {
        Ok(text.into_owned())
    }
}

pub fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    match path {
        Some(p) if !is_dash(p) => {
            fs::write(p, contents).with_context(|| format!("Writing output file {p:?}"))
        }
        _ => {
            let mut out = BufWriter::new(io::stdout().lock());
            out.write_all(contents.as_bytes())?;
            if !contents.ends_with('\n') {
                out.write_all(b"\n")?;
            }
            out.flush().context("Flushing standard output")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::SHIFT_JIS;

    #[test]
    fn tsv_extension_selects_tab() {
        assert_eq!(resolve_input_delimiter(Path::new("a.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("a.csv"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("a.tsv"), Some(b';')), b';');
    }

    #[test]
    fn decode_strips_utf8_bom() {
        let bytes = b"\xEF\xBB\xBFid,amount";
        assert_eq!(decode_bytes(bytes, UTF_8).unwrap(), "id,amount");
    }

    #[test]
    fn decode_handles_shift_jis() {
        let (encoded, _, _) = SHIFT_JIS.encode("商品,金額");
        assert_eq!(decode_bytes(&encoded, SHIFT_JIS).unwrap(), "商品,金額");
    }

    #[test]
    fn unknown_encoding_label_is_rejected() {
        assert!(resolve_encoding(Some("klingon")).is_err());
        assert_eq!(resolve_encoding(Some("sjis")).unwrap(), SHIFT_JIS);
    }

    #[test]
    fn json_extension_is_case_insensitive() {
        assert!(is_json_path(Path::new("req.JSON")));
        assert!(!is_json_path(Path::new("rows.csv")));
    }
}
