use crate::batch::FileProcessingResult;
use rivergeo_core::config::ConfigSource;
use serde::Serialize;
use tabled::Tabled;

/// One written file in a batch summary table
#[derive(Debug, Serialize, Tabled)]
pub struct FileRow {
    #[tabled(rename = "Input")]
    pub input: String,
    #[tabled(rename = "Output")]
    pub output: String,
    #[tabled(rename = "Note")]
    pub note: String,
}

impl FileRow {
    /// One row per output of a successful result
    pub fn from_result(result: &FileProcessingResult) -> Vec<FileRow> {
        let note = result.message.clone().unwrap_or_default();
        if result.outputs.is_empty() {
            return vec![FileRow {
                input: result.path.display().to_string(),
                output: String::new(),
                note,
            }];
        }

        result
            .outputs
            .iter()
            .map(|output| FileRow {
                input: result.path.display().to_string(),
                output: output.display().to_string(),
                note: note.clone(),
            })
            .collect()
    }
}

/// Output for the config command
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

impl ConfigRow {
    pub fn new(key: String, value: String, source: ConfigSource) -> Self {
        Self {
            key,
            value,
            source: format!("{:?}", source),
        }
    }
}

/// Outcome of one manifest task
#[derive(Debug, Serialize)]
pub struct TaskReport<T: Serialize> {
    pub index: usize,
    pub kind: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
