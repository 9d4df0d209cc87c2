//! Feedback loop: a user note is folded into a frame's prompt and the frame
//! is regenerated.

use uuid::Uuid;

pub mod handlers;

/// Appends a feedback note to a frame prompt.
pub fn revise_description(original: &str, feedback: &str) -> String {
    format!("{original}. Note: {feedback}")
}

/// Feedback updates an actor's hint when it names the actor and asks for
/// "more" or "less" of something.
pub fn feedback_targets_actor(actor_name: &str, feedback: &str) -> bool {
    let feedback = feedback.to_lowercase();
    let name = actor_name.trim().to_lowercase();
    !name.is_empty()
        && feedback.contains(&name)
        && (feedback.contains("more") || feedback.contains("less"))
}

pub fn revised_frame_id(frame_id: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("revised_{frame_id}_{}", &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revise_description_appends_note() {
        assert_eq!(
            revise_description("A duel at noon", "make it dusk"),
            "A duel at noon. Note: make it dusk"
        );
    }

    #[test]
    fn test_feedback_targets_actor_needs_name_and_comparative() {
        assert!(feedback_targets_actor("Elara", "Make elara look MORE tired"));
        assert!(feedback_targets_actor("Elara", "Elara should be less cheerful"));
        assert!(!feedback_targets_actor("Elara", "Make Elara wear red"));
        assert!(!feedback_targets_actor("Elara", "Make the sky more orange"));
    }

    #[test]
    fn test_revised_frame_id_shape() {
        let id = revised_frame_id("scene_1");
        assert!(id.starts_with("revised_scene_1_"));
        let suffix = id.trim_start_matches("revised_scene_1_");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
