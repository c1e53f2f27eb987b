//! Result rendering
//!
//! Everything here reads `CollectionResult` through its public fields and
//! methods only.

use anyhow::{Context, Result};
use colored::*;
use dredge_core::{CollectionResult, ResultStatus};
use serde_json::Value;
use std::path::Path;

/// Print a human-readable result
pub fn print_result(result: &CollectionResult) {
    let mark = if result.success {
        "✓".green()
    } else {
        "✗".red()
    };

    println!("{} {}", mark, colorize_status(result.status));
    if let Some(url) = &result.url {
        println!("  URL:         {}", url.cyan());
    }
    if let Some(platform) = &result.platform {
        println!("  Platform:    {}", platform);
    }
    if let Some(snapshot_id) = &result.snapshot_id {
        println!("  Snapshot:    {}", snapshot_id.dimmed());
    }
    if let Some(rows) = result.row_count {
        println!("  Records:     {}", rows);
    }
    match result.cost {
        Some(cost) => println!("  Cost:        ${:.4}", cost),
        None => println!("  Cost:        {}", "N/A".dimmed()),
    }

    let timing = result.timing_breakdown();
    if let Some(total) = timing.total_elapsed_ms {
        println!(
            "  Elapsed:     {:.0}ms (trigger {:.0}ms, polling {:.0}ms, {} poll(s))",
            total,
            timing.trigger_time_ms.unwrap_or_default(),
            timing.polling_time_ms.unwrap_or_default(),
            timing.poll_count
        );
    }

    if let Some(error) = &result.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }

    if let Some(data) = &result.data {
        println!("\n{}", "Data:".bold());
        print_value(data);
    }
}

/// Print a batch, one block per item
pub fn print_results(results: &[CollectionResult]) {
    let succeeded = results.iter().filter(|r| r.success).count();
    println!(
        "{}",
        format!("{}/{} succeeded", succeeded, results.len()).bold()
    );
    println!();

    for result in results {
        print_result(result);
        println!("{}", "─".repeat(60).dimmed());
    }
}

/// Print a JSON value, raw strings unquoted
pub fn print_value(value: &Value) {
    match value {
        Value::String(text) => println!("{}", text),
        other => match serde_json::to_string_pretty(other) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{:?}", other),
        },
    }
}

/// Print results as JSON: an object for one result, an array for a batch
pub fn print_json(results: &[CollectionResult]) -> Result<()> {
    println!("{}", to_json(results)?);
    Ok(())
}

/// Write results as pretty JSON to `path`
pub fn save(results: &[CollectionResult], path: &Path) -> Result<()> {
    if let [single] = results {
        single
            .save_to_file(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    } else {
        std::fs::write(path, to_json(results)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    eprintln!("{} {}", "Saved to".green(), path.display());
    Ok(())
}

fn to_json(results: &[CollectionResult]) -> Result<String> {
    let json = match results {
        [single] => single.to_json(true)?,
        many => serde_json::to_string_pretty(many)?,
    };
    Ok(json)
}

/// Colorize result status for display
pub fn colorize_status(status: ResultStatus) -> ColoredString {
    let text = status.as_str();
    match status {
        ResultStatus::Ready => text.green(),
        ResultStatus::InProgress => text.cyan(),
        ResultStatus::Timeout => text.yellow(),
        ResultStatus::Error => text.red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_json_shapes() {
        let one = vec![CollectionResult::ready(json!([{ "a": 1 }]), 0.001)];
        let text = to_json(&one).unwrap();
        assert!(text.trim_start().starts_with('{'));

        let two = vec![
            CollectionResult::ready(json!([]), 0.001),
            CollectionResult::failed("boom"),
        ];
        let parsed: Value = serde_json::from_str(&to_json(&two).unwrap()).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
        assert_eq!(parsed[1]["error"], json!("boom"));
    }

    #[test]
    fn test_save_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let results = vec![
            CollectionResult::failed("a"),
            CollectionResult::failed("b"),
        ];

        save(&results, &path).unwrap();

        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed[0]["status"], json!("error"));
    }
}
