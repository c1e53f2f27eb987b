//! Platform listing

use anyhow::Result;
use colored::*;
use dredge_runner::DatasetRegistry;

/// Print every built-in platform
pub fn list_datasets() -> Result<()> {
    let registry = DatasetRegistry::builtin();

    println!(
        "{}",
        format!("{} platform(s):", registry.len()).bold()
    );
    println!();
    for (key, spec) in registry.iter() {
        println!("{} {}", "●".blue(), key.bold());
        println!("  Dataset:      {}", spec.dataset_id.dimmed());
        println!("  Cost/record:  ${:.3}", spec.cost_per_record);
        println!("  Poll timeout: {}s", spec.poll_timeout.as_secs());
        println!("  Hosts:        {}", spec.host_labels.join(", "));
        println!();
    }

    Ok(())
}
