use std::path::Path;
use std::process;

use serde::Serialize;

use crate::{read_source, OutputFormat};

#[derive(Serialize)]
struct TokenRow<'s> {
    kind: &'static str,
    start: usize,
    end: usize,
    text: &'s str,
}

pub(crate) fn cmd_tokens(file: &Path, output: OutputFormat, quiet: bool) {
    let source = read_source(file, output, quiet);
    let (tokens, errors) = octave_core::tokenize(&source);
    let rows: Vec<TokenRow<'_>> = tokens
        .iter()
        .map(|t| TokenRow {
            kind: t.kind.name(),
            start: t.span.start,
            end: t.span.end,
            text: t.text(&source),
        })
        .collect();

    match output {
        OutputFormat::Text => {
            for row in &rows {
                println!("{} {}..{} {:?}", row.kind, row.start, row.end, row.text);
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
                "tokens": rows,
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
