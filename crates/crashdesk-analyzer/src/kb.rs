//! Error knowledge base
//!
//! A JSON file mapping bug-check codes to remediation steps. Seeded with
//! the stock entries on first open, extended at runtime from resolved
//! support tickets, and scored by user feedback.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{normalize_error_code, AnalyzerError, Category, Confidence, Result};

/// One remediation step
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolutionStep {
    pub step: u32,
    pub description: String,
    pub details: String,
}

/// A knowledge-base entry for one error code
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KbEntry {
    pub error_code: String,
    pub error_name: String,
    pub description: String,
    pub category: Category,
    pub confidence: Confidence,
    pub solutions: Vec<SolutionStep>,
    #[serde(default)]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub success_count: u32,
    #[serde(default)]
    pub failure_count: u32,
}

impl KbEntry {
    /// Success percentage from user feedback, 0 when unrated.
    pub fn success_rate(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            return 0.0;
        }
        f64::from(self.success_count) / f64::from(total) * 100.0
    }
}

/// User verdict on a suggested solution
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Solved,
    Partial,
    Failed,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct KbFile {
    errors: Vec<KbEntry>,
}

/// File-backed knowledge base. Reads happen against the in-memory copy;
/// every mutation rewrites the file.
pub struct KnowledgeBase {
    path: PathBuf,
    data: RwLock<KbFile>,
}

impl KnowledgeBase {
    /// Open the knowledge base at `path`, seeding the stock entries if the
    /// file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            let seeded = KbFile { errors: seed_entries() };
            write_file(&path, &seeded)?;
            tracing::info!(path = %path.display(), "seeded default knowledge base");
            seeded
        };
        Ok(Self { path, data: RwLock::new(data) })
    }

    /// Look up remediation steps for an error code (any accepted spelling).
    pub fn search(&self, error_code: &str) -> Option<KbEntry> {
        let code = normalize_error_code(error_code);
        self.data
            .read()
            .errors
            .iter()
            .find(|e| normalize_error_code(&e.error_code) == code)
            .cloned()
    }

    pub fn entries(&self) -> Vec<KbEntry> {
        self.data.read().errors.clone()
    }

    /// Fold a resolved ticket's fix back in: appended as the next step of
    /// an existing entry, or recorded as a fresh low-confidence entry for a
    /// code we had nothing on.
    pub fn record_resolution(&self, error_code: &str, solution: &str, source: &str) -> Result<()> {
        let solution = solution.trim();
        if solution.is_empty() {
            return Err(AnalyzerError::KnowledgeBase("empty solution".into()));
        }
        let code = normalize_error_code(error_code);
        // The lock is held across the file write so concurrent mutations
        // cannot persist out of order. Mutations are rare; reads never
        // touch the file.
        {
            let mut data = self.data.write();
            match data.errors.iter_mut().find(|e| normalize_error_code(&e.error_code) == code) {
                Some(entry) => {
                    let already_known =
                        entry.solutions.iter().any(|s| s.description.eq_ignore_ascii_case(solution));
                    if !already_known {
                        let step = entry.solutions.len() as u32 + 1;
                        entry.solutions.push(SolutionStep {
                            step,
                            description: solution.to_string(),
                            details: format!("Contributed by {source}"),
                        });
                    }
                }
                None => data.errors.push(KbEntry {
                    error_code: code.clone(),
                    error_name: "FIELD_REPORTED_ERROR".into(),
                    description: format!("Learned from {source}"),
                    category: Category::Unknown,
                    confidence: Confidence::Low,
                    solutions: vec![SolutionStep {
                        step: 1,
                        description: solution.to_string(),
                        details: format!("Contributed by {source}"),
                    }],
                    additional_info: None,
                    success_count: 0,
                    failure_count: 0,
                }),
            }
            write_file(&self.path, &data)?;
        }
        tracing::info!(error_code = %code, %source, "knowledge base updated");
        Ok(())
    }

    /// Bump the feedback counters for a code. Returns `false` when the code
    /// is unknown.
    pub fn record_feedback(&self, error_code: &str, kind: FeedbackKind) -> Result<bool> {
        let code = normalize_error_code(error_code);
        let mut data = self.data.write();
        let Some(entry) =
            data.errors.iter_mut().find(|e| normalize_error_code(&e.error_code) == code)
        else {
            return Ok(false);
        };
        match kind {
            FeedbackKind::Solved => entry.success_count += 1,
            FeedbackKind::Failed => entry.failure_count += 1,
            FeedbackKind::Partial => {}
        }
        write_file(&self.path, &data)?;
        Ok(true)
    }
}

fn write_file(path: &Path, data: &KbFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(data)?)?;
    Ok(())
}

fn seed_entries() -> Vec<KbEntry> {
    fn entry(
        code: &str,
        name: &str,
        description: &str,
        category: Category,
        steps: &[(&str, &str)],
        info: &str,
    ) -> KbEntry {
        KbEntry {
            error_code: code.to_string(),
            error_name: name.to_string(),
            description: description.to_string(),
            category,
            confidence: Confidence::High,
            solutions: steps
                .iter()
                .enumerate()
                .map(|(i, (desc, details))| SolutionStep {
                    step: i as u32 + 1,
                    description: desc.to_string(),
                    details: details.to_string(),
                })
                .collect(),
            additional_info: Some(info.to_string()),
            success_count: 0,
            failure_count: 0,
        }
    }

    vec![
        entry(
            "0X0000001E",
            "KMODE_EXCEPTION_NOT_HANDLED",
            "A kernel-mode program generated an exception which the error handler didn't catch",
            Category::Driver,
            &[
                ("Update all device drivers through Device Manager",
                 "Right-click devices with warnings and select 'Update driver'"),
                ("Run the Windows Memory Diagnostic tool",
                 "Launch mdsched.exe and restart when prompted"),
                ("Check for hardware issues",
                 "Reseat RAM modules and check cable connections"),
            ],
            "Often caused by faulty drivers or hardware",
        ),
        entry(
            "0X0000007E",
            "SYSTEM_THREAD_EXCEPTION_NOT_HANDLED",
            "A system thread generated an exception which the error handler didn't catch",
            Category::Software,
            &[
                ("Boot in Safe Mode",
                 "Troubleshoot > Advanced Options > Startup Settings > F4"),
                ("Uninstall recently installed software",
                 "Sort installed apps by date and remove recent additions"),
                ("Update BIOS/UEFI firmware",
                 "Download the latest firmware for your motherboard model"),
            ],
            "Usually caused by incompatible software or outdated firmware",
        ),
        entry(
            "0X00000050",
            "PAGE_FAULT_IN_NONPAGED_AREA",
            "Invalid system memory references, usually indicating hardware problems",
            Category::Hardware,
            &[
                ("Test RAM with MemTest86",
                 "Create a bootable USB and run a full overnight pass"),
                ("Update system and device drivers",
                 "Use Windows Update and vendor driver downloads"),
                ("Run a full malware scan",
                 "Use a reputable antivirus full-system scan"),
            ],
            "Often indicates failing RAM or storage devices",
        ),
        entry(
            "0X0000000A",
            "IRQL_NOT_LESS_OR_EQUAL",
            "A kernel-mode process or driver accessed memory at too high an IRQL",
            Category::Driver,
            &[
                ("Remove recently installed hardware",
                 "Disconnect new devices and restore the previous configuration"),
                ("Update network and graphics drivers",
                 "Fetch the latest drivers from the GPU/NIC vendor"),
                ("Temporarily disable antivirus software",
                 "Rule out filter-driver conflicts"),
            ],
            "Usually caused by faulty network or graphics drivers",
        ),
        entry(
            "0X000000EF",
            "CRITICAL_PROCESS_DIED",
            "A critical system process terminated unexpectedly",
            Category::System,
            &[
                ("Run System File Checker",
                 "Run 'sfc /scannow' from an elevated prompt"),
                ("Reset Windows Update components",
                 "Stop wuauserv, cryptSvc and bits, then restart them"),
                ("Perform System Restore",
                 "Pick a restore point from before the issue started"),
            ],
            "Indicates corruption in critical Windows processes or files",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, KnowledgeBase) {
        let dir = tempfile::tempdir().unwrap();
        let kb = KnowledgeBase::open(dir.path().join("errors.json")).unwrap();
        (dir, kb)
    }

    #[test]
    fn seeds_and_finds_stock_entries() {
        let (_dir, kb) = open_temp();
        assert_eq!(kb.entries().len(), 5);
        let entry = kb.search("0x0000001e").unwrap();
        assert_eq!(entry.error_name, "KMODE_EXCEPTION_NOT_HANDLED");
        assert_eq!(entry.solutions.len(), 3);
    }

    #[test]
    fn resolution_appends_step_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.json");
        {
            let kb = KnowledgeBase::open(&path).unwrap();
            kb.record_resolution("0x0000001E", "Updated drivers", "support_dashboard").unwrap();
        }
        let kb = KnowledgeBase::open(&path).unwrap();
        let entry = kb.search("0X0000001E").unwrap();
        assert_eq!(entry.solutions.len(), 4);
        assert_eq!(entry.solutions[3].description, "Updated drivers");
    }

    #[test]
    fn resolution_for_unknown_code_creates_entry() {
        let (_dir, kb) = open_temp();
        kb.record_resolution("0x000000D1", "Rolled back NIC driver", "support_dashboard").unwrap();
        let entry = kb.search("0X000000D1").unwrap();
        assert_eq!(entry.confidence, Confidence::Low);
        assert_eq!(entry.solutions[0].description, "Rolled back NIC driver");
    }

    #[test]
    fn duplicate_resolution_is_not_appended_twice() {
        let (_dir, kb) = open_temp();
        kb.record_resolution("0x0000001E", "Updated drivers", "support_dashboard").unwrap();
        kb.record_resolution("0x0000001E", "updated drivers", "support_dashboard").unwrap();
        assert_eq!(kb.search("0X0000001E").unwrap().solutions.len(), 4);
    }

    #[test]
    fn concurrent_resolutions_both_reach_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.json");
        let kb = std::sync::Arc::new(KnowledgeBase::open(&path).unwrap());

        let handles: Vec<_> = [("0x000000D1", "Rolled back NIC driver"), ("0x00000133", "Disabled overclock")]
            .into_iter()
            .map(|(code, solution)| {
                let kb = kb.clone();
                std::thread::spawn(move || {
                    kb.record_resolution(code, solution, "support_dashboard").unwrap()
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // Whatever order the writes landed in, the file holds both.
        let reopened = KnowledgeBase::open(&path).unwrap();
        assert!(reopened.search("0X000000D1").is_some());
        assert!(reopened.search("0X00000133").is_some());
    }

    #[test]
    fn feedback_moves_success_rate() {
        let (_dir, kb) = open_temp();
        assert!(kb.record_feedback("0x00000050", FeedbackKind::Solved).unwrap());
        assert!(kb.record_feedback("0x00000050", FeedbackKind::Failed).unwrap());
        assert!(kb.record_feedback("0x00000050", FeedbackKind::Solved).unwrap());
        let entry = kb.search("0x00000050").unwrap();
        assert_eq!(entry.success_count, 2);
        assert_eq!(entry.failure_count, 1);
        assert!((entry.success_rate() - 66.666).abs() < 1.0);
        assert!(!kb.record_feedback("0XDEADBEEF", FeedbackKind::Solved).unwrap());
    }
}
