pub mod chart;
pub mod report;

use crate::engine::Evaluation;
use crate::errors::{StrategyError, StrategyResult};
use std::path::{Path, PathBuf};

/// Presentation adapters implement this trait.
/// render() must be a pure function of its inputs: no IO, never panics.
/// Send + Sync required for use across blocking worker tasks.
pub trait ArtifactRenderer: Send + Sync {
    fn name(&self) -> &'static str;

    /// File extension of the produced artifact, without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, strategy: &str, evaluation: &Evaluation) -> String;
}

/// A fully rendered artifact waiting to be written.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub contents: String,
}

impl Artifact {
    pub fn render(renderer: &dyn ArtifactRenderer, strategy: &str, evaluation: &Evaluation) -> Self {
        Self {
            file_name: format!("{strategy}.{}", renderer.extension()),
            contents: renderer.render(strategy, evaluation),
        }
    }
}

/// Write through a temp file in the same directory, then rename.
/// Readers never observe a half-written artifact.
pub fn write_atomic(dir: &Path, artifact: &Artifact) -> StrategyResult<PathBuf> {
    std::fs::create_dir_all(dir)
        .map_err(|e| StrategyError::Io(format!("create {}: {e}", dir.display())))?;

    let target = dir.join(&artifact.file_name);
    let tmp = dir.join(format!(".{}.{}.tmp", artifact.file_name, uuid::Uuid::new_v4()));

    std::fs::write(&tmp, artifact.contents.as_bytes())
        .map_err(|e| StrategyError::Io(format!("write {}: {e}", tmp.display())))?;

    if let Err(e) = std::fs::rename(&tmp, &target) {
        let _ = std::fs::remove_file(&tmp);
        return Err(StrategyError::Io(format!("rename to {}: {e}", target.display())));
    }

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces_and_leaves_no_temp() {
        let dir = std::env::temp_dir().join(format!("payoff_out_{}", uuid::Uuid::new_v4()));
        let first = Artifact { file_name: "s.txt".into(), contents: "one".into() };
        let second = Artifact { file_name: "s.txt".into(), contents: "two".into() };

        let path = write_atomic(&dir, &first).unwrap();
        write_atomic(&dir, &second).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
        let leftovers = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0, "temp files must be renamed away");

        std::fs::remove_dir_all(&dir).ok();
    }
}
