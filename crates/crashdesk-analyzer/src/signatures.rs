//! Byte-signature classification
//!
//! Hex-encodes the first 8 KiB of the dump and runs an Aho-Corasick pass
//! over it for the known bug-check codes, so one read of the header covers
//! every signature in a single scan.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use std::fs::File;
use std::io::Read;

use crate::scanner::DumpFile;
use crate::{Category, Classification, Classifier, Confidence, Result, Verdict};

/// How much of the file the signature pass looks at
const HEADER_BYTES: usize = 8192;

/// Bug-check codes with a known signature
const SIGNATURES: &[(&str, &str, Category)] = &[
    ("0000001E", "KMODE_EXCEPTION_NOT_HANDLED", Category::Driver),
    ("0000007E", "SYSTEM_THREAD_EXCEPTION_NOT_HANDLED", Category::Software),
    ("00000050", "PAGE_FAULT_IN_NONPAGED_AREA", Category::Hardware),
    ("0000000A", "IRQL_NOT_LESS_OR_EQUAL", Category::Driver),
    ("000000EF", "CRITICAL_PROCESS_DIED", Category::System),
];

/// Pre-built signature automaton
pub struct SignatureClassifier {
    automaton: AhoCorasick,
}

impl SignatureClassifier {
    pub fn new() -> Self {
        let patterns: Vec<&str> = SIGNATURES.iter().map(|(code, _, _)| *code).collect();
        let automaton = AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostFirst)
            .build(&patterns)
            .expect("signature table is a fixed set of valid literals");
        Self { automaton }
    }

    /// Classify a header that has already been read from disk.
    pub fn classify_header(&self, header: &[u8]) -> Verdict {
        let hex_text = hex::encode_upper(header);
        match self.automaton.find(&hex_text) {
            Some(m) => {
                let (code, name, category) = SIGNATURES[m.pattern().as_usize()];
                Verdict::Classified(Classification {
                    error_code: format!("0X{code}"),
                    error_name: name.to_string(),
                    category,
                    confidence: Confidence::Medium,
                    method: "signature".to_string(),
                    faulting_module: None,
                    process_name: None,
                })
            }
            None => Verdict::Unknown,
        }
    }
}

impl Default for SignatureClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for SignatureClassifier {
    fn classify(&self, dump: &DumpFile) -> Result<Verdict> {
        let mut header = vec![0u8; HEADER_BYTES.min(dump.size as usize)];
        let mut file = File::open(&dump.path)?;
        let read = file.read(&mut header)?;
        header.truncate(read);
        let verdict = self.classify_header(&header);
        if verdict.classification().is_none() {
            tracing::debug!(path = %dump.path.display(), "no known signature in dump header");
        }
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_with(code_bytes: &[u8]) -> Vec<u8> {
        let mut data = vec![0x4D, 0x44, 0x4D, 0x50, 0x93, 0xA7]; // MDMP-ish preamble
        data.extend_from_slice(&[0xFF; 64]);
        data.extend_from_slice(code_bytes);
        data.extend_from_slice(&[0xEE; 32]);
        data
    }

    #[test]
    fn kmode_signature_is_found() {
        let classifier = SignatureClassifier::new();
        let verdict = classifier.classify_header(&header_with(&[0x00, 0x00, 0x00, 0x1E]));
        let c = verdict.classification().expect("should classify");
        assert_eq!(c.error_code, "0X0000001E");
        assert_eq!(c.error_name, "KMODE_EXCEPTION_NOT_HANDLED");
        assert_eq!(c.category, Category::Driver);
        assert_eq!(c.confidence, Confidence::Medium);
    }

    #[test]
    fn critical_process_died_maps_to_system() {
        let classifier = SignatureClassifier::new();
        let verdict = classifier.classify_header(&header_with(&[0x00, 0x00, 0x00, 0xEF]));
        assert_eq!(verdict.classification().unwrap().category, Category::System);
    }

    #[test]
    fn unrecognized_header_is_unknown() {
        let classifier = SignatureClassifier::new();
        let verdict = classifier.classify_header(&[0x11u8; 256]);
        assert!(verdict.classification().is_none());
    }
}
