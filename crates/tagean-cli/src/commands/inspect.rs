//! Inspect command - show what the parser sees in a result log.

use std::path::PathBuf;

use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;

use tagean_core::{ExtractedFields, ResultLog};

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Result log to parse
    #[arg(required = true)]
    log: PathBuf,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct InspectedBlock {
    image: String,
    fields: ExtractedFields,
    price: Option<Decimal>,
}

pub async fn run(args: InspectArgs) -> anyhow::Result<()> {
    let blocks: Vec<InspectedBlock> = ResultLog::new(&args.log)
        .read()?
        .into_iter()
        .map(|block| {
            let fields = block.fields();
            InspectedBlock {
                price: fields.price(),
                image: block.item_id,
                fields,
            }
        })
        .collect();

    let json = if args.pretty {
        serde_json::to_string_pretty(&blocks)?
    } else {
        serde_json::to_string(&blocks)?
    };
    println!("{}", json);

    Ok(())
}
