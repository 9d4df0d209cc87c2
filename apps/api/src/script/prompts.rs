// Prompts for frame extraction. The system persona lives in llm_client::prompts.

/// Prompt for a script short enough to storyboard in one pass.
/// Ends in `1.` so the reply continues a numbered list.
pub fn whole_script_prompt(frame_count: usize, script: &str) -> String {
    format!(
        "Read the script below and divide it into {frame_count} key visual scenes. \
         Provide a brief description for each of the frames, focusing on distinct \
         important moments, with any key characters and actions.\n\n\
         Script:\n{script}\n\nFrames:\n1."
    )
}

/// Prompt for one segment of a longer script.
pub fn segment_prompt(
    frame_count: usize,
    segment_number: usize,
    total: usize,
    segment: &str,
) -> String {
    format!(
        "Read the script segment below and divide it into {frame_count} key visual scenes. \
         This is segment {segment_number} of {total} from a longer script. \
         Provide a brief description for each frame, focusing on distinct important moments, \
         with any key characters and actions.\n\n\
         Script Segment {segment_number}:\n{segment}\n\nFrames:\n1."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_end_with_list_start() {
        assert!(whole_script_prompt(6, "FADE IN.").ends_with("Frames:\n1."));
        let prompt = segment_prompt(6, 2, 5, "INT. BAR");
        assert!(prompt.contains("segment 2 of 5"));
        assert!(prompt.contains("Script Segment 2:\nINT. BAR"));
    }
}
