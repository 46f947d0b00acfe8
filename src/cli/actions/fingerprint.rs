use crate::fingerprint::{self, HostSignals};
use anyhow::Result;
use serde_json::json;

#[derive(Debug)]
pub struct Args {
    pub signals: HostSignals,
}

/// Execute the fingerprint action.
/// # Errors
/// Returns an error if the output cannot be serialized.
pub async fn execute(args: Args) -> Result<()> {
    let record = fingerprint::collect(&args.signals);
    let hash = fingerprint::hash(&record).await;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "fingerprint": record,
            "hash": hash,
        }))?
    );
    Ok(())
}
