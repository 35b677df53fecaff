use std::path::Path;

use salesflow_core::{CandidateFile, FileFormat};
use tracing::debug;

/// List files in `directory` whose extension is a recognized format.
///
/// Non-recursive. Files with other extensions are skipped silently. The
/// result is sorted by file name so repeated runs see the same order.
pub fn list_candidates(directory: &Path) -> std::io::Result<Vec<CandidateFile>> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match FileFormat::from_path(&path) {
            Some(format) => candidates.push(CandidateFile::new(path, format)),
            None => debug!(path = %path.display(), "skipping file with unrecognized extension"),
        }
    }

    candidates.sort_by_key(|c| c.file_name());
    Ok(candidates)
}
