//! Task manifest for the `run` command.
//!
//! A manifest is a TOML file holding `[[task]]` tables tagged by `kind`:
//!
//! ```toml
//! [[task]]
//! kind = "align"
//! centerlines = "data/korr"
//! banklines = "data/lines"
//! output = "out/aligned"
//!
//! [[task]]
//! kind = "rasterize"
//! input = "data/xyz"
//! output = "out/dem"
//! resolution = 0.5
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use crate::error::{Result, RiverGeoError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A parsed manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "task", default)]
    pub tasks: Vec<TaskSpec>,
}

/// One declared task with its paths and optional parameter overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskSpec {
    Align {
        centerlines: PathBuf,
        banklines: PathBuf,
        output: PathBuf,
    },
    Intersect {
        banklines: PathBuf,
        centerlines: PathBuf,
        output: PathBuf,
    },
    Reproject {
        input: PathBuf,
        #[serde(default)]
        epsg: Option<u32>,
        #[serde(default)]
        output: Option<PathBuf>,
    },
    Mosaic {
        input: PathBuf,
        #[serde(default)]
        output: Option<PathBuf>,
    },
    Merge {
        input: PathBuf,
        output: PathBuf,
        #[serde(default)]
        fields: Option<Vec<String>>,
    },
    Proximity {
        input: PathBuf,
        output: PathBuf,
        #[serde(default)]
        threshold: Option<f64>,
        #[serde(default)]
        samples: Option<usize>,
    },
    Rasterize {
        input: PathBuf,
        output: PathBuf,
        #[serde(default)]
        epsg: Option<u32>,
        #[serde(default)]
        resolution: Option<f64>,
        #[serde(default)]
        overwrite: bool,
    },
    Split {
        input: PathBuf,
        output: PathBuf,
    },
}

impl TaskSpec {
    /// The `kind` tag of this task
    pub fn kind(&self) -> &'static str {
        match self {
            TaskSpec::Align { .. } => "align",
            TaskSpec::Intersect { .. } => "intersect",
            TaskSpec::Reproject { .. } => "reproject",
            TaskSpec::Mosaic { .. } => "mosaic",
            TaskSpec::Merge { .. } => "merge",
            TaskSpec::Proximity { .. } => "proximity",
            TaskSpec::Rasterize { .. } => "rasterize",
            TaskSpec::Split { .. } => "split",
        }
    }

    fn paths_mut(&mut self) -> Vec<&mut PathBuf> {
        match self {
            TaskSpec::Align { centerlines, banklines, output }
            | TaskSpec::Intersect { banklines, centerlines, output } => {
                vec![centerlines, banklines, output]
            }
            TaskSpec::Reproject { input, output, .. } | TaskSpec::Mosaic { input, output } => {
                let mut paths = vec![input];
                paths.extend(output.as_mut());
                paths
            }
            TaskSpec::Merge { input, output, .. }
            | TaskSpec::Proximity { input, output, .. }
            | TaskSpec::Rasterize { input, output, .. }
            | TaskSpec::Split { input, output } => vec![input, output],
        }
    }
}

impl Manifest {
    /// Parse manifest text; paths are left as written
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RiverGeoError::ConfigInvalid {
            key: "manifest".to_string(),
            reason: format!("Failed to parse TOML: {}", e),
        })
    }

    /// Load a manifest and resolve relative paths against its directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RiverGeoError::FileNotFound { path: path.to_path_buf() });
        }

        let content = fs::read_to_string(path)?;
        let mut manifest = Self::parse(&content)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.resolve_paths(base);

        tracing::debug!("Loaded manifest {} with {} task(s)", path.display(), manifest.tasks.len());
        Ok(manifest)
    }

    /// Make every relative path absolute-from-`base`
    pub fn resolve_paths(&mut self, base: &Path) {
        for task in &mut self.tasks {
            for path in task.paths_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[[task]]
kind = "align"
centerlines = "korr"
banklines = "lines"
output = "aligned"

[[task]]
kind = "reproject"
input = "/data/shp"
epsg = 25833

[[task]]
kind = "rasterize"
input = "xyz"
output = "dem"
resolution = 0.5
"#;

    #[test]
    fn test_parse_tasks_in_order() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        let kinds: Vec<_> = manifest.tasks.iter().map(TaskSpec::kind).collect();
        assert_eq!(kinds, vec!["align", "reproject", "rasterize"]);

        match &manifest.tasks[2] {
            TaskSpec::Rasterize { resolution, overwrite, epsg, .. } => {
                assert_eq!(*resolution, Some(0.5));
                assert!(!overwrite);
                assert_eq!(*epsg, None);
            }
            other => panic!("unexpected task {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result = Manifest::parse("[[task]]\nkind = \"buffer\"\ninput = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.toml");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let manifest = Manifest::load(&path).unwrap();

        match &manifest.tasks[0] {
            TaskSpec::Align { centerlines, .. } => {
                assert_eq!(centerlines, &dir.path().join("korr"));
            }
            other => panic!("unexpected task {:?}", other),
        }
        match &manifest.tasks[1] {
            TaskSpec::Reproject { input, output, .. } => {
                assert_eq!(input, &PathBuf::from("/data/shp"));
                assert!(output.is_none());
            }
            other => panic!("unexpected task {:?}", other),
        }
    }

    #[test]
    fn test_missing_manifest() {
        let result = Manifest::load("/nonexistent/tasks.toml");
        assert!(matches!(result, Err(RiverGeoError::FileNotFound { .. })));
    }
}
