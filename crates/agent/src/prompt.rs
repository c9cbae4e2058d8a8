//! System-prompt assembly. The composer phrases guidance for whichever parameter the
//! dialogue machine selected; it never chooses the parameter itself.

use enquiry_core::{Character, DialogueSession, ParameterDefinition};
use enquiry_core::domain::character::ParameterGuidance;

const RECENT_TURNS: usize = 4;
const MODULATION_HINTS: usize = 5;
const EMOTION_CUES: usize = 3;
const FOLLOW_UPS: usize = 2;

const SIMPLICITY_RULES: &str = "[SIMPLICITY RULES]
1. Use short sentences (15 words or fewer).
2. Avoid jargon; prefer everyday words.
3. Ask ONE question at a time. Never combine questions.
4. If the user seems unsure, offer a simple example or range.
5. Acknowledge good answers briefly.
6. Keep choices to three or four when offering them.
7. Use the user's units for measurements; ask which they prefer if unknown.";

const QUESTION_STYLE: &str = "[QUESTION STYLE]
- Opening: \"To start, what is the [parameter] in simple terms?\"
- Re-ask when unclear: \"Just to be sure, about [parameter], is it closer to [A] or [B]?\"
- Affirmation: \"Thanks, that helps.\" / \"Great, noted.\" / \"Perfect, moving on.\"";

const DEFAULT_COLLECTION_FLOW: &str =
    "Ask questions one at a time, validate responses, and collect all required parameters.";

/// Deterministic, bracket-labelled system prompt for the enquiry stage.
pub fn compose_enquiry_prompt(character: &Character, guardrail_preamble: &str) -> String {
    let enquiry = &character.prompts.enquiry;
    let region = match character.region.city.as_deref().filter(|city| !city.is_empty()) {
        Some(city) => format!("{}, {city}", character.region.state),
        None => character.region.state.clone(),
    };
    let role = if region.trim().is_empty() {
        format!("[ROLE] You are {}, a {} consultant.", character.name, character.service)
    } else {
        format!("[ROLE] You are {}, a {} consultant in {region}.", character.name, character.service)
    };

    let secondary = if character.language.secondary.is_empty() {
        "None".to_owned()
    } else {
        character.language.secondary.join("/")
    };
    let openings = if character.language.opening_phrases.is_empty() {
        "Hello!".to_owned()
    } else {
        character.language.opening_phrases.join(" | ")
    };

    let guidance = if enquiry.parameters.is_empty() {
        format!("[LEGACY FIELDS] {}", enquiry.fields.join(", "))
    } else {
        parameter_guidance(&enquiry.parameters)
    };

    let sections = [
        role,
        format!("[PERSONA] {}", character.persona),
        format!(
            "[QUALIFICATION] {}",
            character.qualification.as_deref().unwrap_or("Expert consultant")
        ),
        format!("[TONE] {}", character.tone),
        format!(
            "[LANGUAGE] Primary: {}, Secondary: {secondary}. Locale: {}",
            character.language.primary, character.language.locale
        ),
        format!("[OPENING PHRASES] When greeting users, prefer these openings: {openings}"),
        format!(
            "[EMOTIONAL INTELLIGENCE] Detect these signals and respond with empathy: {}",
            character.eq.detection.join(", ")
        ),
        format!("[EQ MODULATION] {}", modulation_hints(character)),
        guardrail_preamble.trim().to_owned(),
        SIMPLICITY_RULES.to_owned(),
        QUESTION_STYLE.to_owned(),
        format!(
            "[CONVERSATIONAL COLLECTION FLOW] {}",
            enquiry.collection_flow.as_deref().unwrap_or(DEFAULT_COLLECTION_FLOW)
        ),
        guidance,
        format!("[STYLE] {}", enquiry.style),
        format!(
            "[OUTPUT]\n- Respond conversationally as {}.\n\
             - Do NOT prefix responses with role labels like \"assistant:\" or \"user:\".\n\
             - Introduce yourself only once at the start.\n\
             - Ask ONE short, clear question at a time based on missing parameters.\n\
             - If the user's reply is ambiguous, re-ask using the re-ask template.",
            character.name
        ),
    ];

    sections.join("\n\n")
}

fn modulation_hints(character: &Character) -> String {
    if character.eq.modulation.is_empty() {
        return "Respond with empathy based on the user's emotional state.".to_owned();
    }
    let hints: Vec<String> = character
        .eq
        .modulation
        .iter()
        .take(MODULATION_HINTS)
        .map(|(signal, tone)| format!("{signal}→{tone}"))
        .collect();
    format!("When the user shows: {}, adapt tone accordingly.", hints.join(", "))
}

fn parameter_guidance(parameters: &[ParameterGuidance]) -> String {
    let mut block = String::from("[PARAMETER GUIDANCE]\n");
    block.push_str("Collect these parameters through natural conversation:\n");

    for (index, parameter) in parameters.iter().enumerate() {
        block.push_str(&format!("\n{}. {} (ID: {})\n", index + 1, parameter.label, parameter.id));
        block.push_str(&format!("   Purpose: {}\n", parameter.purpose));
        block.push_str(&format!("   Question Intent: {}\n", parameter.question_intent));
        block.push_str(&format!("   AI Guidance: {}\n", parameter.ai_guidance));
        block.push_str(&format!("   Response Type: {}\n", parameter.response_type));

        if !parameter.example_questions.is_empty() {
            block.push_str("   Example Questions:\n");
            for question in &parameter.example_questions {
                block.push_str(&format!("      - \"{question}\"\n"));
            }
        }

        if let Some(validation) = &parameter.validation {
            let rules = if validation.rules.is_empty() {
                "Standard validation".to_owned()
            } else {
                validation.rules.join(" | ")
            };
            block.push_str(&format!("   Validation: {rules}\n"));
            if !validation.follow_ups.is_empty() {
                block.push_str("   Follow-ups:\n");
                for follow_up in validation.follow_ups.iter().take(FOLLOW_UPS) {
                    block.push_str(&format!("      - {follow_up}\n"));
                }
            }
        }

        if !parameter.emotion_cues.is_empty() {
            let cues: Vec<String> = parameter
                .emotion_cues
                .iter()
                .take(EMOTION_CUES)
                .map(|(emotion, tone)| format!("{emotion}→{tone}"))
                .collect();
            block.push_str(&format!("   Emotion Handling: {}\n", cues.join(", ")));
        }

        if !parameter.usage_in_process.is_empty() {
            block.push_str(&format!("   Usage: {}\n", parameter.usage_in_process));
        }
    }

    block.trim_end().to_owned()
}

/// Per-turn instructions: recent context plus the affirmation and single question to ask
/// about `parameter`.
pub fn compose_turn_prompt(
    character: &Character,
    session: &DialogueSession,
    parameter: &ParameterDefinition,
) -> String {
    let context: Vec<String> = session
        .recent_turns(RECENT_TURNS)
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.text))
        .collect();
    let options = if parameter.options.is_empty() {
        "(no options)".to_owned()
    } else {
        parameter.options.join(" | ")
    };
    let option_hint = if parameter.options.is_empty() {
        "(no options)".to_owned()
    } else {
        format!("(Options: {options})")
    };

    format!(
        "You are {name}, a {service} consultant. Persona: {persona}. Tone: {tone}.\n\n\
         CONTEXT (recent turns):\n{context}\n\n\
         TASK:\n\
         1) Start with ONE warm, emotionally aware affirmation (3 to 8 words) tailored to the \
         user's last input. Reference their selection if it matches an option: {options}. \
         Avoid bare generic phrases such as \"Noted\" or \"Got it\" and vary the wording each turn.\n\
         2) Then ask ONE concise question about \"{label}\" (14 words or fewer).\n\
         \x20  Expected format: {format}.\n\
         \x20  If there are options, include exactly: {option_hint}.\n\
         3) No greetings. No extra sentences.",
        name = character.name,
        service = character.service,
        persona = character.persona,
        tone = character.tone,
        context = context.join("\n"),
        label = parameter.label,
        format = parameter.expected_format.as_deref().unwrap_or("(no specific format)"),
    )
}
