//! TypeScript definitions for the payloads the button layer receives.

use crate::controller::{EndReason, Notice, VisualState};
use crate::document::NodeId;
use crate::speech::UtteranceId;
use std::fs;
use std::path::Path;
use ts_rs::TS;

const INDEX_TS: &str = r#"export type { NodeId } from "./NodeId";
export type { UtteranceId } from "./UtteranceId";
export type { Notice } from "./Notice";
export type { EndReason } from "./EndReason";
export type { VisualState } from "./VisualState";
"#;

fn export_single_type<T: TS + 'static>(out_dir: &Path) -> Result<(), String> {
    T::export_all_to(out_dir).map_err(|err| err.to_string())
}

/// Write fresh `.ts` files into `out_dir`, removing stale ones first.
pub fn export_ts_bindings(out_dir: &Path) -> Result<(), String> {
    fs::create_dir_all(out_dir)
        .map_err(|err| format!("Failed to create {}: {err}", out_dir.display()))?;

    for entry in fs::read_dir(out_dir)
        .map_err(|err| format!("Failed to list {}: {err}", out_dir.display()))?
    {
        let entry = entry.map_err(|err| format!("Failed to read entry: {err}"))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("ts") {
            fs::remove_file(&path)
                .map_err(|err| format!("Failed to remove {}: {err}", path.display()))?;
        }
    }

    export_single_type::<NodeId>(out_dir)?;
    export_single_type::<UtteranceId>(out_dir)?;
    export_single_type::<Notice>(out_dir)?;
    export_single_type::<EndReason>(out_dir)?;
    export_single_type::<VisualState>(out_dir)?;

    let index = out_dir.join("index.ts");
    fs::write(&index, INDEX_TS)
        .map_err(|err| format!("Failed to write {}: {err}", index.display()))?;

    Ok(())
}
