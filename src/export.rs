use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use ngxscope_logs::{LogChannel, LogView};

/// Timestamped export file name in the working directory
pub fn export_file_name() -> PathBuf {
    PathBuf::from(format!(
        "nginx_logs_{}.log",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

/// Write the filtered lines of every channel to `path`, returning the line count
pub fn export_logs_to_file(path: &Path, view: &LogView) -> Result<usize> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let query = view.query();
    let mut written = 0;

    for channel in LogChannel::ALL {
        let lines = view.visible(channel);
        if query.is_empty() {
            writeln!(out, "# {} ({} lines)", channel.title(), lines.len())?;
        } else {
            writeln!(
                out,
                "# {} ({} lines matching '{}')",
                channel.title(),
                lines.len(),
                query.as_str()
            )?;
        }
        for line in &lines {
            writeln!(out, "{line}")?;
        }
        written += lines.len();
    }

    out.flush()?;
    Ok(written)
}
