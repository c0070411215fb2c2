//! Loads pipeline definitions from YAML.
//!
//! ```yaml
//! name: ReleaseNotes
//! steps:
//!   - name: Summarizer
//!     instruction: Summarize the changes.
//!     output_key: summary
//!   - name: Writer
//!     instruction: Turn {{summary}} into release notes.
//!     input_key: summary
//!     output_key: notes
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::api::{LlmStep, PipelineError, SequentialPipeline};

use super::config::ConfigError;

#[derive(Deserialize, Debug)]
struct PipelineFile {
    name: String,
    #[serde(default)]
    description: String,
    steps: Vec<StepDefinition>,
}

#[derive(Deserialize, Debug)]
struct StepDefinition {
    name: String,
    #[serde(default)]
    description: String,
    instruction: String,
    #[serde(default)]
    input_key: Option<String>,
    output_key: String,
}

/// Errors raised while loading a pipeline file.
#[derive(thiserror::Error, Debug)]
pub enum PipelineFileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Parses a YAML pipeline definition and validates it.
pub fn parse(yaml: &str, origin: &str) -> Result<SequentialPipeline, PipelineFileError> {
    let def: PipelineFile = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
        path: origin.to_string(),
        message: e.to_string(),
    })?;

    let mut builder = SequentialPipeline::builder(def.name).description(def.description);
    for step in def.steps {
        let mut step_builder = LlmStep::builder(step.name)
            .description(step.description)
            .instruction(step.instruction)
            .output_key(step.output_key);
        if let Some(key) = step.input_key {
            step_builder = step_builder.input_key(key);
        }
        builder = builder.agent(step_builder.build()?);
    }
    Ok(builder.build()?)
}

/// Reads and parses a YAML pipeline definition from disk.
pub fn load(path: &Path) -> Result<SequentialPipeline, PipelineFileError> {
    let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&yaml, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RELEASE_NOTES: &str = "
name: ReleaseNotes
steps:
  - name: Summarizer
    instruction: Summarize the changes.
    output_key: summary
  - name: Writer
    instruction: Turn {{summary}} into release notes.
    input_key: summary
    output_key: notes
";

    #[test]
    fn parses_steps_in_order() {
        let pipeline = parse(RELEASE_NOTES, "inline").unwrap();
        assert_eq!(pipeline.name(), "ReleaseNotes");
        let keys: Vec<&str> = pipeline
            .steps()
            .into_iter()
            .map(LlmStep::output_key)
            .collect();
        assert_eq!(keys, vec!["summary", "notes"]);
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(RELEASE_NOTES.as_bytes()).unwrap();
        let pipeline = load(file.path()).unwrap();
        assert_eq!(pipeline.steps().len(), 2);
    }

    #[test]
    fn empty_step_list_is_a_configuration_error() {
        let err = parse("name: Nothing\nsteps: []\n", "inline").unwrap_err();
        assert!(matches!(
            err,
            PipelineFileError::Pipeline(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn malformed_yaml_names_its_origin() {
        let err = parse("name: [unclosed", "broken.yaml").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse broken.yaml"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, PipelineFileError::Config(ConfigError::Io { .. })));
    }
}
