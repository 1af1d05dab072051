//! Implementation of the `caseport collect` command

use caseport_core::{Collection, TestRecord};

use crate::cli::CollectArgs;
use crate::colors::{paint, COLORS};
use crate::commands::{load, print_json, report_fatal};
use crate::output::{CollectData, CollectedModule, CollectedTest, JsonIssue, JsonResponse};

/// Run the collect command
///
/// Exits 1 when any test module could not be collected.
pub fn run_collect(
    args: CollectArgs,
    show_fields: bool,
    json_output: bool,
    quiet: bool,
) -> anyhow::Result<i32> {
    let (_, collection) = match load(&args) {
        Ok(loaded) => loaded,
        Err(err) => return report_fatal::<CollectData>("collect", &err, json_output),
    };

    if json_output {
        let issues: Vec<JsonIssue> = collection.errors.iter().map(JsonIssue::from).collect();
        let response = if issues.is_empty() {
            JsonResponse::ok_with_issues("collect", collect_data(&collection), issues)
        } else {
            JsonResponse::error("collect", collect_data(&collection), issues)
        };
        print_json(&response)?;
    } else if !quiet {
        output_text(&collection, show_fields);
    }

    Ok(if collection.errors.is_empty() { 0 } else { 1 })
}

fn collect_data(collection: &Collection) -> CollectData {
    CollectData {
        modules: collection
            .modules
            .iter()
            .map(|(path, records)| CollectedModule {
                path: path.to_string_lossy().replace('\\', "/"),
                tests: records.iter().map(CollectedTest::from).collect(),
            })
            .collect(),
        test_count: collection.test_count(),
    }
}

fn output_text(collection: &Collection, show_fields: bool) {
    for (path, records) in &collection.modules {
        println!(
            "{} {}",
            paint(&path.display().to_string(), COLORS.active),
            paint(&format!("({} tests)", records.len()), COLORS.dim)
        );
        for record in records {
            print_record(record, show_fields);
        }
    }

    let summary = format!(
        "{} tests in {} modules",
        collection.test_count(),
        collection.modules.len()
    );
    let style = if collection.errors.is_empty() {
        COLORS.success
    } else {
        COLORS.warning
    };
    println!("{}", paint(&summary, style));
}

fn print_record(record: &TestRecord, show_fields: bool) {
    let id = record.field("id").unwrap_or("-");
    println!(
        "  {} {} {}",
        record.qualified_id,
        paint(&format!("line {}", record.source_location.line), COLORS.dim),
        paint(&format!("[{}]", id), COLORS.dim)
    );
    if !show_fields {
        return;
    }
    for (name, value) in &record.fields {
        let mut lines = value.lines();
        println!("      {}: {}", name, lines.next().unwrap_or_default());
        for line in lines {
            println!("        {}", line);
        }
    }
}
