//! Debugger-report parsing
//!
//! Some dumps arrive with a textual analysis report alongside them (the
//! output of a kernel debugger's crash triage). When present it is more
//! precise than signature matching, so the parsed result carries high
//! confidence plus the faulting module and process when the report names
//! them.

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::{Category, Classification, Confidence, Result, Verdict};

fn field(name: &str) -> Regex {
    Regex::new(&format!(r"(?m)^{name}:\s+(.+)$")).expect("static field pattern")
}

fn bugcheck_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^BUGCHECK_CODE:\s+([0-9a-fA-F]+)").expect("static pattern"))
}

fn bugcheck_str_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| field("BUGCHECK_STR"))
}

fn module_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| field("MODULE_NAME"))
}

fn process_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| field("PROCESS_NAME"))
}

/// Parse a debugger triage report. Returns `Unknown` when no bug-check
/// code is present, since everything else hangs off it.
pub fn parse_report(text: &str) -> Verdict {
    let Some(code) = bugcheck_code_re()
        .captures(text)
        .map(|c| format!("0X{:0>8}", c[1].to_uppercase()))
    else {
        return Verdict::Unknown;
    };

    let capture = |re: &Regex| {
        re.captures(text)
            .map(|c| c[1].trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let error_name = capture(bugcheck_str_re()).unwrap_or_else(|| "UNKNOWN_BUGCHECK".to_string());
    let faulting_module = capture(module_re());

    Verdict::Classified(Classification {
        error_code: code,
        category: categorize(&error_name, faulting_module.as_deref()),
        error_name,
        confidence: Confidence::High,
        method: "debugger_report".to_string(),
        faulting_module,
        process_name: capture(process_re()),
    })
}

/// Look for a triage report next to a dump (`crash.dmp` -> `crash.txt`)
/// and parse it when present. `None` means no report, or one without a
/// bug-check code; callers fall back to signature matching.
pub fn sibling_report(dump_path: &Path) -> Result<Option<Verdict>> {
    let report_path = dump_path.with_extension("txt");
    if !report_path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&report_path)?;
    match parse_report(&text) {
        Verdict::Unknown => Ok(None),
        verdict => {
            tracing::debug!(path = %report_path.display(), "classified from triage report");
            Ok(Some(verdict))
        }
    }
}

fn categorize(error_name: &str, module: Option<&str>) -> Category {
    if module.map(|m| m.ends_with(".sys")).unwrap_or(false) || error_name.contains("IRQL") {
        Category::Driver
    } else if error_name.contains("PAGE_FAULT") || error_name.contains("MEMORY") {
        Category::Hardware
    } else if error_name.contains("PROCESS") || error_name.contains("CRITICAL") {
        Category::System
    } else {
        Category::Software
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
Loading Dump File...
BUGCHECK_CODE:  1e
BUGCHECK_STR:  KMODE_EXCEPTION_NOT_HANDLED
MODULE_NAME:  nvlddmkm.sys
PROCESS_NAME:  System
";

    #[test]
    fn full_report_parses_with_high_confidence() {
        let verdict = parse_report(REPORT);
        let c = verdict.classification().unwrap();
        assert_eq!(c.error_code, "0X0000001E");
        assert_eq!(c.error_name, "KMODE_EXCEPTION_NOT_HANDLED");
        assert_eq!(c.faulting_module.as_deref(), Some("nvlddmkm.sys"));
        assert_eq!(c.process_name.as_deref(), Some("System"));
        assert_eq!(c.category, Category::Driver);
        assert_eq!(c.confidence, Confidence::High);
    }

    #[test]
    fn report_without_code_is_unknown() {
        let verdict = parse_report("MODULE_NAME:  ntoskrnl.exe\n");
        assert!(verdict.classification().is_none());
    }

    #[test]
    fn sibling_report_is_found_next_to_the_dump() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("crash.dmp");
        std::fs::write(&dump, b"MDMP").unwrap();

        assert!(sibling_report(&dump).unwrap().is_none());

        std::fs::write(dir.path().join("crash.txt"), REPORT).unwrap();
        let verdict = sibling_report(&dump).unwrap().expect("report should classify");
        assert_eq!(verdict.classification().unwrap().error_code, "0X0000001E");

        // A report without a bug-check code is treated as absent.
        std::fs::write(dir.path().join("crash.txt"), "no useful fields\n").unwrap();
        assert!(sibling_report(&dump).unwrap().is_none());
    }

    #[test]
    fn page_fault_maps_to_hardware() {
        let verdict = parse_report("BUGCHECK_CODE:  50\nBUGCHECK_STR:  PAGE_FAULT_IN_NONPAGED_AREA\n");
        assert_eq!(verdict.classification().unwrap().category, Category::Hardware);
        assert_eq!(verdict.classification().unwrap().error_code, "0X00000050");
    }
}
