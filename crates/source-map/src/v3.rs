//! Rendering to the version-3 source map format.
//!
//! The internal span-based [`SourceMap`] is rendered to the JSON object
//! consumed by bundlers and debuggers: a token per mapped line position,
//! base64-VLQ encoded. Exact (byte-identical) segments re-anchor at every line
//! boundary they cross; rewritten segments point each of their lines at the
//! start of the original span.

use crate::{LineIndex, SourceMap};
use serde::{Deserialize, Serialize};

/// A version-3 source map as returned to the host build pipeline.
///
/// `sources`/`sourcesContent` entries are nullable to allow the well-formed
/// empty map returned on fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapV3 {
    /// Always 3.
    pub version: u32,
    /// The generated file name, if known.
    pub file: Option<String>,
    /// Original source names.
    pub sources: Vec<Option<String>>,
    /// Original source contents, parallel to `sources`.
    pub sources_content: Vec<Option<String>>,
    /// Symbol names (unused by this transform).
    pub names: Vec<String>,
    /// Base64-VLQ encoded mapping lines.
    pub mappings: String,
}

impl SourceMapV3 {
    /// The neutral map returned when a file's transform falls back: valid, but
    /// contributing no line/column correlation.
    pub fn empty() -> Self {
        Self {
            version: 3,
            file: None,
            sources: vec![None],
            sources_content: vec![None],
            names: Vec::new(),
            mappings: String::new(),
        }
    }

    /// Returns true if this map carries no mappings.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Renders an internal span map into the version-3 format.
    ///
    /// `original` and `generated` are the full texts the map's spans refer to;
    /// they are needed to convert byte offsets into line/column pairs.
    pub fn render(map: &SourceMap, file: &str, original: &str, generated: &str) -> Self {
        let orig_index = LineIndex::new(original);
        let gen_index = LineIndex::new(generated);

        // (generated line, generated col, original line, original col)
        let mut tokens: Vec<(u32, u32, u32, u32)> = Vec::new();

        for mapping in map.mappings() {
            let Some(gen_start) = gen_index.line_col(mapping.generated.start) else {
                continue;
            };
            let Some(orig_start) = orig_index.line_col(mapping.original.start) else {
                continue;
            };
            tokens.push((
                gen_start.line,
                gen_start.col,
                orig_start.line,
                orig_start.col,
            ));

            // Re-anchor at each generated line start the segment crosses.
            let Some(gen_end) = gen_index.line_col(mapping.generated.end) else {
                continue;
            };
            for line in gen_start.line + 1..=gen_end.line {
                let Some(line_start) = gen_index.line_start(line) else {
                    break;
                };
                if line_start >= mapping.generated.end {
                    break;
                }
                if mapping.exact {
                    let delta =
                        u32::from(line_start) - u32::from(mapping.generated.start);
                    let orig_offset = mapping.original.start + text_size::TextSize::from(delta);
                    if let Some(orig) = orig_index.line_col(orig_offset) {
                        tokens.push((line, 0, orig.line, orig.col));
                    }
                } else {
                    tokens.push((line, 0, orig_start.line, orig_start.col));
                }
            }
        }

        tokens.sort_unstable();
        tokens.dedup_by_key(|t| (t.0, t.1));

        Self {
            version: 3,
            file: Some(file.to_string()),
            sources: vec![Some(file.to_string())],
            sources_content: vec![Some(original.to_string())],
            names: Vec::new(),
            mappings: encode_mappings(&tokens),
        }
    }

    /// Serializes this map to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Encodes sorted tokens into the `mappings` string.
///
/// Columns are delta-encoded and reset per generated line; source index,
/// original line, and original column deltas carry across lines.
fn encode_mappings(tokens: &[(u32, u32, u32, u32)]) -> String {
    let mut out = String::new();
    let mut current_line = 0u32;
    let mut prev_gen_col = 0i64;
    let mut prev_src_line = 0i64;
    let mut prev_src_col = 0i64;
    let mut first_on_line = true;

    for &(gen_line, gen_col, src_line, src_col) in tokens {
        while current_line < gen_line {
            out.push(';');
            current_line += 1;
            prev_gen_col = 0;
            first_on_line = true;
        }
        if !first_on_line {
            out.push(',');
        }
        first_on_line = false;

        encode_vlq(gen_col as i64 - prev_gen_col, &mut out);
        encode_vlq(0, &mut out); // single source
        encode_vlq(src_line as i64 - prev_src_line, &mut out);
        encode_vlq(src_col as i64 - prev_src_col, &mut out);

        prev_gen_col = gen_col as i64;
        prev_src_line = src_line as i64;
        prev_src_col = src_col as i64;
    }

    out
}

const BASE64_CHARS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Encodes one value as base64 VLQ: sign bit in the lowest bit, then 5-bit
/// groups with a continuation bit.
fn encode_vlq(value: i64, out: &mut String) {
    let mut v: u64 = if value < 0 {
        (((-value) as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };

    loop {
        let mut digit = (v & 0b11111) as u8;
        v >>= 5;
        if v != 0 {
            digit |= 0b100000;
        }
        out.push(BASE64_CHARS[digit as usize] as char);
        if v == 0 {
            break;
        }
    }
}
