//! Implementation of the `caseport validate` command

use caseport_core::{validate_collection, Severity, ValidationResult};

use crate::cli::CollectArgs;
use crate::colors::{paint, COLORS};
use crate::commands::{load, print_json, report_fatal};
use crate::output::{JsonIssue, JsonResponse, ValidateData};

/// Run the validate command
///
/// Exits 1 when errors were found, or warnings in strict mode.
pub fn run_validate(
    args: CollectArgs,
    strict: bool,
    json_output: bool,
    quiet: bool,
) -> anyhow::Result<i32> {
    let (registry, collection) = match load(&args) {
        Ok(loaded) => loaded,
        Err(err) => return report_fatal::<ValidateData>("validate", &err, json_output),
    };

    let result = validate_collection(&collection, &registry);
    let failed = !result.valid || (strict && result.warning_count() > 0);

    if json_output {
        let data = ValidateData {
            valid: !failed,
            test_count: collection.test_count(),
            error_count: result.error_count(),
            warning_count: result.warning_count(),
        };
        let issues: Vec<JsonIssue> = result.issues.iter().map(JsonIssue::from).collect();
        let response = if failed {
            JsonResponse::error("validate", data, issues)
        } else {
            JsonResponse::ok_with_issues("validate", data, issues)
        };
        print_json(&response)?;
    } else {
        output_text(&result, collection.test_count(), quiet);
    }

    Ok(if failed { 1 } else { 0 })
}

fn output_text(result: &ValidationResult, test_count: usize, quiet: bool) {
    for issue in &result.issues {
        match issue.severity {
            Severity::Error => eprintln!(
                "{}: {}",
                paint(&format!("error[{}]", issue.code), COLORS.fail),
                issue.message
            ),
            Severity::Warning if !quiet => eprintln!(
                "{}: {}",
                paint(&format!("warning[{}]", issue.code), COLORS.warning),
                issue.message
            ),
            Severity::Warning => {}
        }
    }

    if quiet {
        return;
    }

    let summary = format!(
        "{} tests checked: {} errors, {} warnings",
        test_count,
        result.error_count(),
        result.warning_count()
    );
    let style = if result.issues.is_empty() {
        COLORS.success
    } else if result.valid {
        COLORS.warning
    } else {
        COLORS.fail
    };
    println!("{}", paint(&summary, style));
}
