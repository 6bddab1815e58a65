//! Logbook commands: print and verify the audit trail.

use crate::storage::Storage;

use super::format::format_entry;

pub(super) fn cmd_print(storage: &Storage, json: bool) -> Result<(), String> {
    let entries = storage
        .load_logbook()
        .map_err(|e| format!("failed to load logbook: {e}"))?;

    if entries.is_empty() {
        println!("Logbook is empty");
        return Ok(());
    }

    for entry in &entries {
        if json {
            let line =
                serde_json::to_string(entry).map_err(|e| format!("failed to encode entry: {e}"))?;
            println!("{line}");
        } else {
            println!("{}", format_entry(entry));
        }
    }
    Ok(())
}

pub(super) fn cmd_verify(storage: &Storage) -> Result<(), String> {
    let check = storage
        .verify_logbook()
        .map_err(|e| format!("failed to load logbook: {e}"))?;

    match check.broken_at {
        None => {
            println!("Logbook intact: {} entries", check.entries);
            Ok(())
        }
        Some(seq) => Err(format!(
            "logbook chain broken at entry {seq} of {}",
            check.entries
        )),
    }
}
