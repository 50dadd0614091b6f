use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use asa24_core::export::ExportFormat;
use asa24_core::report::Page;
use asa24_core::service::Session;

use super::helpers::{Selection, print_notices};

/// Where to write: `output` itself, or the suggested file name inside it
/// when it is a directory. Defaults to the current directory.
fn target_path(output: Option<PathBuf>, file_name: &str) -> PathBuf {
    match output {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path,
        None => PathBuf::from(file_name),
    }
}

pub(crate) fn cmd_export(
    session: &mut Session,
    page: Page,
    selection: Selection,
    format: ExportFormat,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let request = selection.request(page)?;
    let notices = session.report(&request)?.notices.clone();
    let file = session.export(&request, format)?;
    let path = target_path(output, &file.file_name);
    write_file(&path, &file.bytes)?;

    if json {
        let out = json!({
            "path": path.display().to_string(),
            "format": format,
            "bytes": file.bytes.len(),
            "notices": notices,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Exported {page} to {}", path.display());
    print_notices(&notices);
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}
