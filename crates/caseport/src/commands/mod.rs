//! CLI command implementations

pub mod collect;
pub mod requirements;
pub mod validate;
pub mod version;

pub use collect::run_collect;
pub use requirements::run_requirements;
pub use validate::run_validate;
pub use version::run_version;

use anyhow::Context;
use caseport_core::{collect_tests, CaseportError, CollectOptions, Collection, FieldRegistry};
use serde::Serialize;

use crate::cli::CollectArgs;
use crate::output::{JsonIssue, JsonResponse};

/// Load the field registry and collect the tests named by `args`
pub(crate) fn load(args: &CollectArgs) -> Result<(FieldRegistry, Collection), CaseportError> {
    let registry = match &args.config {
        Some(path) => {
            tracing::debug!("loading configuration from {}", path.display());
            FieldRegistry::load(path)?
        }
        None => FieldRegistry::builtin(),
    };

    let options = CollectOptions {
        ignore_paths: args.ignore_paths.clone(),
        base_dir: args.base_dir.clone(),
    };
    let collection = collect_tests(&args.path, &options, &registry)?;
    Ok((registry, collection))
}

/// Report an error that stopped a command before it produced output
pub(crate) fn report_fatal<T: Serialize + Default>(
    command: &str,
    err: &CaseportError,
    json_output: bool,
) -> anyhow::Result<i32> {
    if json_output {
        let response = JsonResponse::error(command, T::default(), vec![JsonIssue::from(err)]);
        print_json(&response)?;
    } else {
        eprintln!("error: {}", err);
    }
    Ok(err.exit_code())
}

pub(crate) fn print_json<T: Serialize>(response: &JsonResponse<T>) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(response).context("failed to serialize output")?;
    println!("{}", text);
    Ok(())
}
