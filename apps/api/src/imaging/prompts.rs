// Image prompt builders. These produce the text sent to the image backends,
// not LLM chat prompts.

/// Aspects cycled through when generating character variants.
pub const VARIANT_ASPECTS: [&str; 5] = [
    "emotional state and facial expression",
    "body language and posture",
    "interaction with environment",
    "lighting and mood",
    "cinematography and framing",
];

const STORYBOARD_FRAME_PREFIX: &str = "Create a detailed storyboard frame image showing: ";
const REFERENCE_ACTORS_SUFFIX: &str = ". Include the characters as shown in the reference images.";

/// Descriptions longer than this that carry a `title: body` shape are reduced to the body.
const LONG_DESCRIPTION_CHARS: usize = 200;
/// Bodies longer than this are reduced to their first sentence.
const LONG_VISUAL_CHARS: usize = 1000;

/// Appends the actor list to a frame description.
pub fn frame_prompt_with_actors(description: &str, actors: &[String]) -> String {
    if actors.is_empty() {
        return description.to_string();
    }
    let actor_list = actors.join(", ");
    if description.contains(" with ") {
        format!("{description}: {actor_list}")
    } else {
        format!("{description} with {actor_list}")
    }
}

/// Builds the prompt used for project frames.
pub fn storyboard_frame_prompt(
    description: &str,
    style: Option<&str>,
    has_reference_actors: bool,
) -> String {
    let visual = visual_core(description);
    let mut prompt = format!("{STORYBOARD_FRAME_PREFIX}{visual}");

    if let Some(style) = style.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str(". Style: ");
        prompt.push_str(style);
    }
    if has_reference_actors {
        prompt.push_str(REFERENCE_ACTORS_SUFFIX);
    }
    prompt
}

/// Long `title: body` descriptions keep only the body; very long bodies keep
/// only their first sentence.
fn visual_core(description: &str) -> &str {
    if description.chars().count() <= LONG_DESCRIPTION_CHARS {
        return description;
    }
    let Some((_, body)) = description.split_once(':') else {
        return description;
    };
    let body = body.trim();
    if body.chars().count() > LONG_VISUAL_CHARS {
        body.split(['.', '!', '?']).next().unwrap_or(body)
    } else {
        body
    }
}

/// Builds the prompt for an ad-hoc scene, optionally with actors and a background.
pub fn scene_prompt(description: &str, actors: &[String], background: Option<&str>) -> String {
    let background = background.map(str::trim).filter(|b| !b.is_empty());

    if actors.is_empty() {
        return match background {
            Some(bg) => format!("{bg}, {description}"),
            None => description.to_string(),
        };
    }

    let mut prompt = format!("A scene showing {description} with {}", actors.join(", "));
    if let Some(bg) = background {
        prompt.push_str(" in ");
        prompt.push_str(bg);
    }
    prompt
}

/// Builds the `index`-th (0-based) variant prompt for an actor, returning the
/// prompt and the aspect it emphasises.
pub fn character_variant_prompt(
    actor_name: &str,
    prompt_hint: &str,
    scene_description: &str,
    index: usize,
) -> (String, &'static str) {
    let aspect = VARIANT_ASPECTS[index % VARIANT_ASPECTS.len()];
    let prompt = format!(
        "{actor_name}, {prompt_hint}, in a scene where {scene_description}, with emphasis on {aspect}"
    );
    (prompt, aspect)
}

pub fn actor_portrait_prompt(name: &str, description: &str) -> String {
    let description = description.trim();
    if description.is_empty() {
        format!("A professional character portrait of {name}")
    } else {
        format!("A professional character portrait of {name}: {description}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_frame_prompt_appends_actors_with_with() {
        assert_eq!(
            frame_prompt_with_actors("A duel at noon", &names(&["Ana", "Bo"])),
            "A duel at noon with Ana, Bo"
        );
    }

    #[test]
    fn test_frame_prompt_uses_colon_when_description_has_with() {
        assert_eq!(
            frame_prompt_with_actors("A street with neon signs", &names(&["Ana"])),
            "A street with neon signs: Ana"
        );
    }

    #[test]
    fn test_frame_prompt_without_actors_is_unchanged() {
        assert_eq!(frame_prompt_with_actors("Empty room", &[]), "Empty room");
    }

    #[test]
    fn test_storyboard_prompt_short_description() {
        assert_eq!(
            storyboard_frame_prompt("Rain on a window", Some("noir"), true),
            "Create a detailed storyboard frame image showing: Rain on a window. Style: noir. \
             Include the characters as shown in the reference images."
        );
    }

    #[test]
    fn test_storyboard_prompt_long_description_uses_body() {
        let body = "a lone rider crosses the salt flats at dawn".repeat(5);
        let description = format!("Opening: {body}");
        assert!(description.chars().count() > LONG_DESCRIPTION_CHARS);

        let prompt = storyboard_frame_prompt(&description, None, false);
        assert_eq!(prompt, format!("{STORYBOARD_FRAME_PREFIX}{body}"));
    }

    #[test]
    fn test_storyboard_prompt_very_long_body_uses_first_sentence() {
        let description = format!("Title: The ship sinks. {}", "Water everywhere. ".repeat(80));
        let prompt = storyboard_frame_prompt(&description, None, false);
        assert_eq!(prompt, format!("{STORYBOARD_FRAME_PREFIX}The ship sinks"));
    }

    #[test]
    fn test_storyboard_prompt_ignores_blank_style() {
        let prompt = storyboard_frame_prompt("Door opens", Some("  "), false);
        assert_eq!(prompt, format!("{STORYBOARD_FRAME_PREFIX}Door opens"));
    }

    #[test]
    fn test_scene_prompt_variants() {
        assert_eq!(scene_prompt("a chase", &[], None), "a chase");
        assert_eq!(
            scene_prompt("a chase", &[], Some("a night market")),
            "a night market, a chase"
        );
        assert_eq!(
            scene_prompt("a chase", &names(&["Ana", "Bo"]), Some("a night market")),
            "A scene showing a chase with Ana, Bo in a night market"
        );
    }

    #[test]
    fn test_character_variant_aspects_cycle() {
        let (first, aspect) = character_variant_prompt("Elara", "silver hair", "she waits", 0);
        assert_eq!(
            first,
            "Elara, silver hair, in a scene where she waits, with emphasis on emotional state and facial expression"
        );
        assert_eq!(aspect, VARIANT_ASPECTS[0]);

        let (_, sixth) = character_variant_prompt("Elara", "", "x", 5);
        assert_eq!(sixth, VARIANT_ASPECTS[0]);
    }

    #[test]
    fn test_actor_portrait_prompt() {
        assert_eq!(
            actor_portrait_prompt("Elara", ""),
            "A professional character portrait of Elara"
        );
        assert_eq!(
            actor_portrait_prompt("Elara", "a retired pilot"),
            "A professional character portrait of Elara: a retired pilot"
        );
    }
}
