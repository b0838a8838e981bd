//! Text and JSON rendering of analysis results

use crate::analyzer::TemplateAnalysis;
use crate::error::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use console::style;

/// Print an analysis as a cost-by-service table plus a per-resource breakdown.
pub fn print_analysis(analysis: &TemplateAnalysis, output_format: &str) -> Result<()> {
    if output_format == "json" {
        println!("{}", serde_json::to_string_pretty(analysis)?);
        return Ok(());
    }

    println!(
        "{}",
        style(format!(
            "Estimated monthly cost ({} profile, {})",
            analysis.usage_profile, analysis.region
        ))
        .bold()
        .cyan()
    );

    let mut services: Vec<(&String, &f64)> = analysis.by_service.iter().collect();
    services.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Service", "Monthly cost"]);
    for (service, cost) in services {
        table.add_row(vec![
            Cell::new(service),
            Cell::new(format!("${:.2}", cost)),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL"),
        Cell::new(format!("${:.2}", analysis.estimated_cost)),
    ]);
    println!("{table}");

    let mut resources: Vec<(&String, &f64)> = analysis.by_resource.iter().collect();
    resources.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Resource", "Type", "Monthly cost"]);
    for (logical_id, cost) in resources {
        let resource_type = analysis
            .resources
            .iter()
            .find(|r| &r.logical_id == logical_id)
            .map(|r| r.resource_type.as_str())
            .unwrap_or("-");
        table.add_row(vec![
            Cell::new(logical_id),
            Cell::new(resource_type),
            Cell::new(format!("${:.2}", cost)),
        ]);
    }
    println!("{table}");

    if !analysis.errors.is_empty() {
        println!("{}", style("Not priced:").bold().yellow());
        for error in &analysis.errors {
            println!("  {}", style(error).yellow());
        }
    }

    Ok(())
}
