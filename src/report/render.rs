use crate::models::PartitionBasis;

use super::Report;

/// Render the report as Markdown, one heading per section in report order.
pub fn to_markdown(report: &Report) -> String {
    let mut out = String::from("# Heart Failure Guideline Report\n");

    render_summary(report, &mut out);

    out.push_str("\n## Medication Analysis\n\n");
    if report.medication_analysis.is_empty() {
        out.push_str("No current medications found.\n");
    }
    for med in &report.medication_analysis {
        let mut line = format!("- **{}**", med.name);
        if !med.mentioned_as.eq_ignore_ascii_case(&med.name) {
            line.push_str(&format!(" (as \"{}\")", med.mentioned_as));
        }
        for part in [&med.dose, &med.frequency].into_iter().flatten() {
            line.push(' ');
            line.push_str(part);
        }
        line.push_str(&format!(" [{}] {}\n", med.status.as_str(), med.note));
        out.push_str(&line);
    }

    out.push_str("\n## Recommendations\n\n");
    if report.recommendations.is_empty() {
        out.push_str("No medication recommendation could be made safely.\n");
    }
    for (i, item) in report.recommendations.iter().enumerate() {
        out.push_str(&format!(
            "{}. **{}** ({}): {}\n",
            i + 1,
            item.medication_class,
            item.action,
            item.instruction
        ));
        if item.agents.len() > 1 {
            let names: Vec<&str> = item.agents[1..].iter().map(|a| a.name.as_str()).collect();
            out.push_str(&format!("   - Alternatives: {}\n", names.join(", ")));
        }
        out.push_str(&format!("   - Rationale: {}\n", item.rationale));
    }

    render_list("Monitoring", &report.monitoring, &mut out);
    render_list("Lifestyle", &report.lifestyle, &mut out);

    out.push_str("\n## Warnings\n\n");
    if report.warnings.is_empty() {
        out.push_str("None.\n");
    }
    for warning in &report.warnings {
        out.push_str(&format!("- {}\n", warning.message));
    }

    out.push_str(&format!(
        "\n---\nGuideline: {} (version {})\n",
        report.guideline.source, report.guideline.version
    ));
    out
}

fn render_summary(report: &Report, out: &mut String) {
    let s = &report.summary;
    out.push_str("\n## Summary\n\n");

    let unknown = || "unknown".to_string();
    out.push_str(&format!(
        "- Age: {}\n",
        s.age.map(|a| a.to_string()).unwrap_or_else(unknown)
    ));
    out.push_str(&format!("- Sex: {}\n", s.sex));

    let basis = match &s.partition_basis {
        PartitionBasis::Stated => "stated".to_string(),
        PartitionBasis::InferredFromLvef { lvef_percent } => {
            format!("inferred from LVEF {lvef_percent}%")
        }
        PartitionBasis::Unclassified => "unclassified".to_string(),
    };
    out.push_str(&format!(
        "- Heart failure type: {} (guideline partition {}, {basis})\n",
        s.hf_type, s.partition
    ));
    out.push_str(&format!(
        "- LVEF: {}\n",
        s.lvef_percent
            .map(|v| format!("{v}%"))
            .unwrap_or_else(unknown)
    ));
    out.push_str(&format!(
        "- NYHA class: {}\n",
        s.nyha_class.clone().unwrap_or_else(unknown)
    ));
    if !s.comorbidities.is_empty() {
        out.push_str(&format!("- Comorbidities: {}\n", s.comorbidities.join(", ")));
    }
    for lab in &s.labs {
        out.push_str(&format!("- {}: {} {}\n", lab.name, lab.value, lab.unit));
    }
    if let Some(bp) = &s.blood_pressure {
        out.push_str(&format!("- Blood pressure: {bp}\n"));
    }
    if let Some(hr) = s.heart_rate {
        out.push_str(&format!("- Heart rate: {hr} bpm\n"));
    }
}

fn render_list(title: &str, items: &[String], out: &mut String) {
    out.push_str(&format!("\n## {title}\n\n"));
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
}
