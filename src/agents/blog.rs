//! The blog-writing pipeline: Outline -> Writer -> Editor.
//!
//! Each step hands its result to the next one through session state, so the
//! outline, the draft and the polished post all stay readable after the run.

use crate::api::{LlmStep, PipelineError, SequentialPipeline};

/// Session state key for the blog outline.
pub const OUTPUT_KEY_BLOG_OUTLINE: &str = "blog_outline";
/// Session state key for the blog draft.
pub const OUTPUT_KEY_BLOG_DRAFT: &str = "blog_draft";
/// Session state key for the final blog.
pub const OUTPUT_KEY_FINAL_BLOG: &str = "final_blog";

pub const PIPELINE_NAME: &str = "BlogPipeline";

const OUTLINE_INSTRUCTION: &str = "Create a blog outline for the given topic with:
1. A catchy headline
2. An introduction hook
3. 2-3 main sections with key points
4. A concluding thought";

const WRITER_INSTRUCTION: &str = "Following the outline from the session state under 'blog_outline', write a short blog post (200-300 words) with an engaging and informative tone.";

const EDITOR_INSTRUCTION: &str = "Edit the draft from the session state under 'blog_draft'. Polish the text by fixing grammatical errors, improving flow and sentence structure, and enhancing overall clarity.";

/// Builds the three-step blog pipeline.
pub fn build() -> Result<SequentialPipeline, PipelineError> {
    let outline = LlmStep::builder("OutlineAgent")
        .description("Creates blog post outlines")
        .instruction(OUTLINE_INSTRUCTION)
        .output_key(OUTPUT_KEY_BLOG_OUTLINE)
        .build()?;

    let writer = LlmStep::builder("WriterAgent")
        .description("Writes blog posts from outlines")
        .instruction(WRITER_INSTRUCTION)
        .input_key(OUTPUT_KEY_BLOG_OUTLINE)
        .output_key(OUTPUT_KEY_BLOG_DRAFT)
        .build()?;

    let editor = LlmStep::builder("EditorAgent")
        .description("Edits and polishes blog post drafts")
        .instruction(EDITOR_INSTRUCTION)
        .input_key(OUTPUT_KEY_BLOG_DRAFT)
        .output_key(OUTPUT_KEY_FINAL_BLOG)
        .build()?;

    SequentialPipeline::builder(PIPELINE_NAME)
        .description("Outline -> Writer -> Editor")
        .agent(outline)
        .agent(writer)
        .agent(editor)
        .build()
}

/// Sample prompt used when none is given on the command line.
pub fn default_prompt() -> &'static str {
    "Write a blog post about the benefits of multi-agent systems for software developers"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blog_pipeline_is_outline_writer_editor() {
        let pipeline = build().unwrap();
        let names: Vec<&str> = pipeline.steps().into_iter().map(LlmStep::name).collect();
        assert_eq!(names, vec!["OutlineAgent", "WriterAgent", "EditorAgent"]);

        let steps = pipeline.steps();
        assert_eq!(steps[0].input_key(), None);
        assert_eq!(steps[1].input_key(), Some(OUTPUT_KEY_BLOG_OUTLINE));
        assert_eq!(steps[2].input_key(), Some(OUTPUT_KEY_BLOG_DRAFT));
        assert_eq!(steps[2].output_key(), OUTPUT_KEY_FINAL_BLOG);
    }
}
