//! Line-delimited JSON corpus streaming shared by the miner and the tagger.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// A pre-tokenized document. `doc_id` is optional for mining input and
/// required by the tagger; `tokens` defaults to empty when absent so the
/// miner can skip token-less records instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub tokens: Vec<String>,
}

/// Streaming reader over a JSONL corpus. Blank lines are skipped; a line
/// that fails to parse aborts the stream with its 1-based line number.
pub struct DocumentReader<R: BufRead> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> DocumentReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for DocumentReader<R> {
    type Item = Result<(usize, Document)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            let parsed = serde_json::from_str::<Document>(&line)
                .with_context(|| format!("line {}: malformed document record", self.line_no));

            return Some(parsed.map(|doc| (self.line_no, doc)));
        }
    }
}

/// Open a corpus file for streaming.
pub fn open_corpus(path: &Path) -> Result<DocumentReader<BufReader<File>>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open corpus: {}", path.display()))?;
    Ok(DocumentReader::new(BufReader::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_stream_documents() {
        let input = r#"{"doc_id": "d1", "tokens": ["a", "b"]}

{"tokens": ["c"]}
"#;
        let docs: Vec<_> = DocumentReader::new(Cursor::new(input))
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].0, 1);
        assert_eq!(docs[0].1.doc_id.as_deref(), Some("d1"));
        assert_eq!(docs[1].0, 3);
        assert!(docs[1].1.doc_id.is_none());
    }

    #[test]
    fn test_missing_tokens_is_empty() {
        let input = r#"{"doc_id": "d1"}"#;
        let docs: Vec<_> = DocumentReader::new(Cursor::new(input))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert!(docs[0].1.tokens.is_empty());
    }

    #[test]
    fn test_malformed_line_fails_with_line_number() {
        let input = "{\"tokens\": [\"a\"]}\nnot json\n";
        let err = DocumentReader::new(Cursor::new(input))
            .collect::<Result<Vec<_>>>()
            .unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }
}
