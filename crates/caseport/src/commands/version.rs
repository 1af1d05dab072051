//! Implementation of the `caseport version` command

use crate::commands::print_json;
use crate::output::{JsonResponse, VersionData};

/// Run the version command
pub fn run_version(verbose: bool, json_output: bool, quiet: bool) -> anyhow::Result<i32> {
    let version = env!("CARGO_PKG_VERSION");

    if json_output {
        let data = VersionData {
            version: version.to_string(),
        };
        print_json(&JsonResponse::ok_with_issues("version", data, vec![]))?;
        return Ok(0);
    }

    if quiet {
        return Ok(0);
    }

    println!("caseport {}", version);
    if verbose {
        println!("  parser:     tree-sitter-python");
        println!("  config:     TOML (--config or CASEPORT_CONFIG)");
    }
    Ok(0)
}
