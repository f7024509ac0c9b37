use super::types::RunReport;
use anyhow::Result;
use std::path::Path;

/// Render a JSON report to a file or stdout
pub fn generate(report: &RunReport, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    if let Some(path) = output {
        std::fs::write(path, json)?;
        println!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

/// Write `report.json` into the output directory
pub fn write_report(report: &RunReport, output_dir: &Path) -> Result<()> {
    let path = output_dir.join("report.json");
    std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
    println!("    Generated JSON report: {}", path.display());
    Ok(())
}
