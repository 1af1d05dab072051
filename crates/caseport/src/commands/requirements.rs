//! Implementation of the `caseport requirements` command

use caseport_core::{collect_requirements, Requirement};

use crate::cli::CollectArgs;
use crate::colors::{paint, COLORS};
use crate::commands::{load, print_json, report_fatal};
use crate::output::{JsonIssue, JsonResponse, RequirementsData};

/// Run the requirements command
pub fn run_requirements(args: CollectArgs, json_output: bool, quiet: bool) -> anyhow::Result<i32> {
    let (registry, collection) = match load(&args) {
        Ok(loaded) => loaded,
        Err(err) => return report_fatal::<RequirementsData>("requirements", &err, json_output),
    };

    let requirements = collect_requirements(&collection, &registry);

    if json_output {
        let issues: Vec<JsonIssue> = collection.errors.iter().map(JsonIssue::from).collect();
        let data = RequirementsData { requirements };
        let response = if issues.is_empty() {
            JsonResponse::ok_with_issues("requirements", data, issues)
        } else {
            JsonResponse::error("requirements", data, issues)
        };
        print_json(&response)?;
    } else if !quiet {
        output_text(&requirements);
    }

    Ok(if collection.errors.is_empty() { 0 } else { 1 })
}

fn output_text(requirements: &[Requirement]) {
    if requirements.is_empty() {
        println!("No requirements found");
        return;
    }

    for requirement in requirements {
        println!(
            "{} {}",
            paint(&requirement.title, COLORS.active),
            paint(
                &format!("(verified by {} tests)", requirement.verified_by.len()),
                COLORS.dim
            )
        );
        for (name, value) in &requirement.fields {
            println!("    {}: {}", name, value);
        }
    }
}
