//! # Text plan parser
//!
//! Scrapes the engine's verbose explain-analyze output into an ordered
//! list of [`Fragment`]s. The format is not formally specified and
//! drifts across engine versions, so this is a small set of independent
//! line matchers applied in sequence, not a grammar: a line that
//! matches nothing is silently dropped.

use super::units;
use crate::fragment::Fragment;
use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    header: Regex,
    cpu: Regex,
    scheduled: Regex,
    blocked: Regex,
    input: Regex,
    output: Regex,
    peak_memory: Regex,
    tasks: Regex,
    output_layout: Regex,
    output_partitioning: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        header: Regex::new(r"^Fragment (\d+) \[([^\]]+)\]").expect("valid regex"),
        cpu: Regex::new(r"CPU: ([0-9.]+)(ms|s|m)").expect("valid regex"),
        scheduled: Regex::new(r"Scheduled: ([0-9.]+)(ms|s|m)").expect("valid regex"),
        // The unit is not always adjacent to the value here.
        blocked: Regex::new(r"Blocked:? ([0-9.]+)\s*(ms|s|m)").expect("valid regex"),
        input: Regex::new(r"Input: (\d+) rows \(([^)]+)\)").expect("valid regex"),
        output: Regex::new(r"Output: (\d+) rows \(([^)]+)\)").expect("valid regex"),
        peak_memory: Regex::new(r"Peak Memory: ([^,]+)").expect("valid regex"),
        tasks: Regex::new(r"Tasks count: (\d+)").expect("valid regex"),
        output_layout: Regex::new(r"Output layout: \[([^\]]+)\]").expect("valid regex"),
        output_partitioning: Regex::new(r"Output partitioning: (.+)").expect("valid regex"),
    })
}

/// Lines whose trimmed form starts with one of these belong to the
/// fragment's operator tree and are kept verbatim for display.
const OPERATOR_LINE_PREFIXES: &[&str] = &[
    "└─",
    "├─",
    "│",
    "Output[",
    "TableScan",
    "InnerJoin",
    "Aggregate",
    "Project",
    "RemoteSource",
    "RemoteMerge",
    "PartialSort",
    "LocalMerge",
    "ScanFilter",
];

/// Parse a text plan into fragments, sorted descending by fragment id
/// (ties keep their source order). Blank input yields an empty list.
pub fn parse(plan_text: &str) -> Vec<Fragment> {
    if plan_text.trim().is_empty() {
        tracing::warn!("plan text is empty");
        return Vec::new();
    }

    let pats = patterns();
    let lines: Vec<&str> = plan_text.lines().collect();

    let mut fragments: Vec<Fragment> = Vec::new();
    let mut current: Option<Fragment> = None;
    let mut operators: Vec<String> = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if let Some(caps) = pats.header.captures(line.trim()) {
            flush(&mut fragments, current.take(), &mut operators, &mut block);

            let fragment_id = caps[1].parse().unwrap_or(0);
            let mut fragment = Fragment::new(fragment_id, caps[2].to_string());
            block.push(line);

            // The line after the header carries the resource metrics.
            // Consume it here so it is never reconsidered below.
            if i + 1 < lines.len() {
                parse_metrics(&mut fragment, lines[i + 1], pats);
                block.push(lines[i + 1]);
                i += 2;
            } else {
                i += 1;
            }
            current = Some(fragment);
            continue;
        }

        if let Some(fragment) = current.as_mut() {
            block.push(line);
            let trimmed = line.trim();

            if line.contains("Output layout:") {
                if let Some(caps) = pats.output_layout.captures(line) {
                    fragment.output_layout = Some(caps[1].to_string());
                }
            } else if line.contains("Output partitioning:") {
                if let Some(caps) = pats.output_partitioning.captures(line) {
                    fragment.output_partitioning = Some(caps[1].trim().to_string());
                }
            } else if trimmed.is_empty()
                || trimmed.starts_with("Input avg.:")
                || trimmed.starts_with("Output avg.:")
            {
                // informational only
            } else if OPERATOR_LINE_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
                operators.push(line.to_string());
            }
        }
        i += 1;
    }
    flush(&mut fragments, current.take(), &mut operators, &mut block);

    fragments.sort_by(|a, b| b.fragment_id.cmp(&a.fragment_id));
    fragments
}

fn flush(
    fragments: &mut Vec<Fragment>,
    current: Option<Fragment>,
    operators: &mut Vec<String>,
    block: &mut Vec<&str>,
) {
    if let Some(mut fragment) = current {
        fragment.operators = std::mem::take(operators);
        fragment.raw_text = Some(block.join("\n"));
        fragments.push(fragment);
    } else {
        operators.clear();
    }
    block.clear();
}

fn parse_metrics(fragment: &mut Fragment, line: &str, pats: &Patterns) {
    if let Some(caps) = pats.cpu.captures(line) {
        fragment.cpu_time = Some(format!("{}{}", &caps[1], &caps[2]));
        fragment.cpu_time_ms = Some(units::time_to_ms(&caps[1], &caps[2]));
    }
    if let Some(caps) = pats.scheduled.captures(line) {
        fragment.scheduled_time = Some(format!("{}{}", &caps[1], &caps[2]));
        fragment.scheduled_time_ms = Some(units::time_to_ms(&caps[1], &caps[2]));
    }
    if let Some(caps) = pats.blocked.captures(line) {
        fragment.blocked_time = Some(format!("{}{}", &caps[1], &caps[2]));
        fragment.blocked_time_ms = Some(units::time_to_ms(&caps[1], &caps[2]));
    }
    if let Some(caps) = pats.input.captures(line) {
        fragment.input_rows = caps[1].parse().ok();
        fragment.input_bytes = Some(caps[2].to_string());
        fragment.input_bytes_value = Some(units::bytes_to_i64(&caps[2]));
    }
    if let Some(caps) = pats.output.captures(line) {
        fragment.output_rows = caps[1].parse().ok();
        fragment.output_bytes = Some(caps[2].to_string());
        fragment.output_bytes_value = Some(units::bytes_to_i64(&caps[2]));
    }
    if let Some(caps) = pats.peak_memory.captures(line) {
        let raw = caps[1].trim().to_string();
        fragment.peak_memory_bytes = Some(units::bytes_to_i64(&raw));
        fragment.peak_memory = Some(raw);
    }
    if let Some(caps) = pats.tasks.captures(line) {
        fragment.task_count = caps[1].parse().ok();
    }
}
