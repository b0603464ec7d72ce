use crate::OutputFormat;

pub(crate) fn cmd_symbols(output: OutputFormat) {
    let table = octave_core::symbol_table();
    match output {
        OutputFormat::Text => {
            for info in &table {
                let mut flags = Vec::new();
                if info.terminal {
                    flags.push("terminal");
                }
                if info.named {
                    flags.push("named");
                }
                if info.visible {
                    flags.push("visible");
                }
                println!("{:>2}  {:<22}{}", info.id, info.name, flags.join(","));
            }
        }
        OutputFormat::Json => {
            let pretty = serde_json::to_string_pretty(&table)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
    }
}
