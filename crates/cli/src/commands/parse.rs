use std::path::Path;
use std::process;

use crate::{read_source, OutputFormat};

pub(crate) fn cmd_parse(file: &Path, all: bool, output: OutputFormat, quiet: bool) {
    let source = read_source(file, output, quiet);
    let (tree, errors) = octave_core::parse(&source);
    tracing::debug!(
        file = %file.display(),
        nodes = tree.node_count(),
        errors = errors.len(),
        "parsed"
    );

    match output {
        OutputFormat::Text => {
            if all {
                println!("{}", tree.to_sexp_all());
            } else {
                println!("{}", tree.to_sexp());
            }
            if !quiet {
                for e in &errors {
                    eprintln!("{}:{}: {}", file.display(), e.start_point(&source), e);
                }
            }
        }
        OutputFormat::Json => {
            let errors_json: Vec<serde_json::Value> =
                errors.iter().map(|e| e.to_json_value(&source)).collect();
            let report = serde_json::json!({
                "file": file.display().to_string(),
                "tree": tree.to_json_value(),
                "errors": errors_json,
            });
            let pretty = serde_json::to_string_pretty(&report)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
    }

    if !errors.is_empty() {
        process::exit(1);
    }
}
