//! Terminal rendering for pull and status results.
//!
//! Formats output as a flat annotated list:
//! - [+] created, [~] replaced, [=] unchanged, [-] deleted, [!] failed
//! - Summary line with counts, bytes downloaded and the tree version

use crate::store::diff::ChangeKind;
use crate::sync::{PullResult, StatusResult};
use crate::util::format_bytes;

pub fn render_pull(result: &PullResult) -> String {
    if result.applied.is_empty() && result.failed.is_empty() {
        return format!("Up to date with version {}.\n", result.latest_version);
    }

    let mut output = String::new();

    for item in &result.applied {
        let line = match item.action {
            "created" => format!(
                "  [+] {} created ({})\n",
                item.url,
                format_bytes(item.bytes)
            ),
            "replaced" => format!(
                "  [~] {} replaced ({})\n",
                item.url,
                format_bytes(item.bytes)
            ),
            "unchanged" => format!("  [=] {} unchanged\n", item.url),
            "deleted" => format!("  [-] {} deleted\n", item.url),
            _ => format!("  [+] {} {}\n", item.url, item.action),
        };
        output.push_str(&line);
    }

    for failure in &result.failed {
        output.push_str(&format!("  [!] {}: {}\n", failure.url, failure.reason));
    }

    output.push_str(&format!(
        "\napplied {} change(s), {} failed, {} downloaded (version {})\n",
        result.applied.len(),
        result.failed.len(),
        format_bytes(result.bytes_downloaded),
        result.latest_version
    ));

    output
}

pub fn render_status(result: &StatusResult) -> String {
    if result.changes.is_empty() {
        return format!(
            "No pending changes against version {}.\n",
            result.latest_version
        );
    }

    let mut output = format!("Pending changes against version {}:\n", result.latest_version);

    for change in &result.changes {
        let marker = match change.kind {
            ChangeKind::Added => "[+]",
            ChangeKind::Modified => "[~]",
            ChangeKind::Removed => "[-]",
        };
        output.push_str(&format!("  {marker} {}\n", change.entry.url));
    }

    output.push_str(&format!("\n{} change(s) pending\n", result.changes.len()));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{ItemFailure, ItemReport};

    #[test]
    fn clean_pull_reports_up_to_date() {
        let result = PullResult {
            latest_version: "42".to_string(),
            applied: vec![],
            failed: vec![],
            bytes_downloaded: 0,
            duration_ms: None,
            peak_memory_bytes: None,
        };

        assert_eq!(render_pull(&result), "Up to date with version 42.\n");
    }

    #[test]
    fn pull_lines_carry_markers_and_counts() {
        let result = PullResult {
            latest_version: "42".to_string(),
            applied: vec![
                ItemReport {
                    url: "/a.txt".to_string(),
                    kind: ChangeKind::Added,
                    action: "created",
                    bytes: 2048,
                },
                ItemReport {
                    url: "/b.txt".to_string(),
                    kind: ChangeKind::Removed,
                    action: "deleted",
                    bytes: 0,
                },
            ],
            failed: vec![ItemFailure {
                url: "/c.txt".to_string(),
                kind: ChangeKind::Modified,
                reason: "transfer failed".to_string(),
            }],
            bytes_downloaded: 2048,
            duration_ms: None,
            peak_memory_bytes: None,
        };

        let rendered = render_pull(&result);
        assert!(rendered.contains("[+] /a.txt created (2.0 KB)"));
        assert!(rendered.contains("[-] /b.txt deleted"));
        assert!(rendered.contains("[!] /c.txt: transfer failed"));
        assert!(rendered.contains("applied 2 change(s), 1 failed"));
    }
}
