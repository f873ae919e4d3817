use crate::cycles::CycleWindow;
use crate::error::{Result, StrainError};
use std::path::Path;

/// Parse hand-annotated cycle bounds, one `id,start,end` per line.
///
/// Fields may also be separated by whitespace; blank lines and `#` comments are skipped.
pub fn parse_cycle_windows(text: &str) -> Result<Vec<CycleWindow>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        let [id, start, end] = fields.as_slice() else {
            return Err(StrainError::MalformedInput(format!(
                "line {}: expected id,start,end but got: {}",
                idx + 1,
                trimmed
            )));
        };
        let bad = |what: &str| {
            StrainError::MalformedInput(format!("line {}: {what} is invalid: {trimmed}", idx + 1))
        };
        out.push(CycleWindow {
            id: id.parse().map_err(|_| bad("cycle id"))?,
            start: start.parse().map_err(|_| bad("start time"))?,
            end: end.parse().map_err(|_| bad("end time"))?,
        });
    }
    if out.is_empty() {
        return Err(StrainError::MalformedInput("no cycle windows found".into()));
    }
    Ok(out)
}

/// Read cycle bounds from disk.
pub fn read_cycle_windows(path: &Path) -> Result<Vec<CycleWindow>> {
    let text = std::fs::read_to_string(path)?;
    parse_cycle_windows(&text)
}
