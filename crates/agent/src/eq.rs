//! Emotional-signal detection and tone adjustment driven by a character's [`EqConfig`].

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use enquiry_core::EqConfig;

use crate::text::contains_word;

static CAPS_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{2,}\b").expect("caps word pattern is valid"));

const MODULATION_PREFIXES: [(&str, &str); 12] = [
    ("reassuring", "Let me reassure you:"),
    ("focused", "Let's focus on the essentials:"),
    ("patient", "Let me explain this step by step:"),
    ("practical", "Here's a practical approach:"),
    ("transparent", "To be completely transparent:"),
    ("value-focused", "To maximize value:"),
    ("simplifying", "Let me simplify this:"),
    ("enthusiastic", "I'm excited to share:"),
    ("clarifying", "To clarify:"),
    ("solution-oriented", "Here's what we can do:"),
    ("technical", "From a technical perspective:"),
    ("basic", "In simple terms:"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Approach {
    Neutral,
    Empathetic,
    HighlyEmpathetic,
    CrisisResponse,
}

impl Approach {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Empathetic => "empathetic",
            Self::HighlyEmpathetic => "highly-empathetic",
            Self::CrisisResponse => "crisis-response",
        }
    }

    pub fn guidelines(&self) -> &'static [&'static str] {
        match self {
            Self::Neutral => &[
                "Maintain professional tone",
                "Provide clear information",
                "Be concise and factual",
            ],
            Self::Empathetic => &[
                "Acknowledge their feelings",
                "Be supportive and warm",
                "Provide reassurance",
            ],
            Self::HighlyEmpathetic => &[
                "Lead with strong empathy",
                "Validate their concerns",
                "Be patient and understanding",
                "Offer solutions gradually",
            ],
            Self::CrisisResponse => &[
                "Prioritize emotional support",
                "Acknowledge urgency/frustration",
                "Break down complex issues",
                "Offer immediate next steps",
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionalReading {
    pub signals: Vec<String>,
    pub intensity: f32,
    pub approach: Approach,
    pub modulation: Option<String>,
}

/// First declared keyword found as a whole word, case-insensitively.
pub fn detect_signal<'a>(config: &'a EqConfig, text: &str) -> Option<&'a str> {
    config
        .detection
        .iter()
        .find(|keyword| contains_word(text, keyword))
        .map(String::as_str)
}

pub fn detect_all_signals<'a>(config: &'a EqConfig, text: &str) -> Vec<&'a str> {
    config
        .detection
        .iter()
        .filter(|keyword| contains_word(text, keyword))
        .map(String::as_str)
        .collect()
}

/// Uniform pick from the empathy pool; `None` without a signal or an empty pool.
pub fn pick_empathy_line<'a, R>(
    config: &'a EqConfig,
    signal: Option<&str>,
    rng: &mut R,
) -> Option<&'a str>
where
    R: Rng + ?Sized,
{
    signal?;
    config.empathy_phrases.choose(rng).map(String::as_str)
}

pub fn suggest_modulation<'a>(config: &'a EqConfig, signal: Option<&str>) -> Option<&'a str> {
    signal.and_then(|signal| config.modulation.get(signal)).map(String::as_str)
}

pub fn modulation_prefix(tone: &str) -> Option<&'static str> {
    MODULATION_PREFIXES.iter().find(|(key, _)| *key == tone).map(|(_, prefix)| *prefix)
}

/// Score in `[0, 1]` from matched signals, exclamation marks, question marks and
/// all-caps words, each capped.
pub fn analyze_emotional_intensity(config: &EqConfig, text: &str) -> f32 {
    let signals = detect_all_signals(config, text).len() as f32;
    let exclamations = text.matches('!').count() as f32;
    let questions = text.matches('?').count() as f32;
    let caps_words = CAPS_WORD.find_iter(text).count() as f32;

    let intensity = (signals * 0.1).min(0.4)
        + (exclamations * 0.1).min(0.3)
        + (questions * 0.05).min(0.2)
        + (caps_words * 0.05).min(0.1);
    intensity.clamp(0.0, 1.0)
}

pub fn response_approach(intensity: f32) -> Approach {
    if intensity < 0.2 {
        Approach::Neutral
    } else if intensity < 0.5 {
        Approach::Empathetic
    } else if intensity < 0.8 {
        Approach::HighlyEmpathetic
    } else {
        Approach::CrisisResponse
    }
}

pub fn read_emotions(config: &EqConfig, text: &str) -> EmotionalReading {
    let intensity = analyze_emotional_intensity(config, text);
    EmotionalReading {
        signals: detect_all_signals(config, text).into_iter().map(str::to_owned).collect(),
        intensity,
        approach: response_approach(intensity),
        modulation: suggest_modulation(config, detect_signal(config, text)).map(str::to_owned),
    }
}

/// Empathy line, then the tone prefix joined to `base_response`, separated by a blank line.
pub fn craft_assistant_reply<R>(
    config: &EqConfig,
    user_text: &str,
    base_response: &str,
    rng: &mut R,
) -> String
where
    R: Rng + ?Sized,
{
    compose_reply(config, user_text, base_response, rng, true)
}

/// Like [`craft_assistant_reply`] without the tone prefix. Generated questions already carry
/// the character's tone through the system prompt.
pub fn empathize<R>(config: &EqConfig, user_text: &str, base_response: &str, rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    compose_reply(config, user_text, base_response, rng, false)
}

fn compose_reply<R>(
    config: &EqConfig,
    user_text: &str,
    base_response: &str,
    rng: &mut R,
    with_prefix: bool,
) -> String
where
    R: Rng + ?Sized,
{
    let signal = detect_signal(config, user_text);
    let empathy = pick_empathy_line(config, signal, rng);
    let prefix = if with_prefix {
        suggest_modulation(config, signal).and_then(modulation_prefix)
    } else {
        None
    };

    let body = match prefix {
        Some(prefix) => format!("{prefix} {base_response}"),
        None => base_response.to_owned(),
    };
    match empathy {
        Some(line) => format!("{line}\n\n{body}"),
        None => body,
    }
}

/// System-prompt section describing what to watch for and how to respond.
pub fn eq_system_prompt(config: &EqConfig) -> String {
    let signals: Vec<String> =
        config.detection.iter().map(|signal| format!("- \"{signal}\"")).collect();
    let phrases: Vec<String> = config
        .empathy_phrases
        .iter()
        .enumerate()
        .map(|(index, phrase)| format!("{}. {phrase}", index + 1))
        .collect();
    let modulation: Vec<String> = config
        .modulation
        .iter()
        .map(|(signal, tone)| format!("- When user is \"{signal}\" use a \"{tone}\" tone"))
        .collect();

    format!(
        "[EMOTIONAL INTELLIGENCE]\nDetect and respond to emotional cues in user messages.\n\n\
         Signals to watch for:\n{}\n\nEmpathy phrases (use when appropriate):\n{}\n\n\
         Tone modulation map:\n{}",
        signals.join("\n"),
        phrases.join("\n"),
        modulation.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use enquiry_core::EqConfig;

    use super::{
        analyze_emotional_intensity, craft_assistant_reply, detect_all_signals, detect_signal,
        empathize, pick_empathy_line, read_emotions, response_approach, suggest_modulation, Approach,
    };

    fn config() -> EqConfig {
        EqConfig {
            detection: vec![
                "worried".to_owned(),
                "confused".to_owned(),
                "expensive".to_owned(),
                "urgent".to_owned(),
                "excited".to_owned(),
            ],
            empathy_phrases: vec![
                "I completely understand.".to_owned(),
                "That's a fair concern.".to_owned(),
            ],
            modulation: BTreeMap::from([
                ("worried".to_owned(), "reassuring".to_owned()),
                ("confused".to_owned(), "simplifying".to_owned()),
                ("excited".to_owned(), "celebratory".to_owned()),
            ]),
        }
    }

    #[test]
    fn first_declared_signal_wins() {
        let config = config();
        assert_eq!(detect_signal(&config, "I'm CONFUSED and worried"), Some("worried"));
        assert_eq!(detect_all_signals(&config, "I'm CONFUSED and worried"), vec!["worried", "confused"]);
    }

    #[test]
    fn signals_match_whole_words_only() {
        let config = config();
        assert_eq!(detect_signal(&config, "the unworried homeowner"), None);
        assert_eq!(detect_signal(&config, "Looks expensive."), Some("expensive"));
    }

    #[test]
    fn empathy_requires_signal_and_pool() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(pick_empathy_line(&config, None, &mut rng), None);
        let line = pick_empathy_line(&config, Some("worried"), &mut rng).expect("empathy line");
        assert!(config.empathy_phrases.iter().any(|phrase| phrase == line));

        let empty = EqConfig { empathy_phrases: Vec::new(), ..config };
        assert_eq!(pick_empathy_line(&empty, Some("worried"), &mut rng), None);
    }

    #[test]
    fn modulation_follows_configured_map() {
        let config = config();
        assert_eq!(suggest_modulation(&config, Some("worried")), Some("reassuring"));
        assert_eq!(suggest_modulation(&config, Some("urgent")), None);
        assert_eq!(suggest_modulation(&config, None), None);
    }

    #[test]
    fn intensity_is_bounded_and_grows_with_signals() {
        let config = config();
        let mut previous = 0.0;
        for text in [
            "hello there",
            "I am worried",
            "I am worried and confused",
            "I am worried and confused, it is expensive",
            "I am worried and confused, it is expensive and urgent",
            "I am worried and confused, it is expensive and urgent and excited",
        ] {
            let score = analyze_emotional_intensity(&config, text);
            assert!((0.0..=1.0).contains(&score), "{text}: {score}");
            assert!(score >= previous, "{text}: {score} < {previous}");
            previous = score;
        }

        let maxed = "WORRIED CONFUSED EXPENSIVE URGENT excited!!!!!????????";
        assert!(analyze_emotional_intensity(&config, maxed) <= 1.0);
    }

    #[test]
    fn approach_bands_use_fixed_thresholds() {
        assert_eq!(response_approach(0.0), Approach::Neutral);
        assert_eq!(response_approach(0.2), Approach::Empathetic);
        assert_eq!(response_approach(0.5), Approach::HighlyEmpathetic);
        assert_eq!(response_approach(0.8), Approach::CrisisResponse);
        assert_eq!(response_approach(1.0), Approach::CrisisResponse);
        assert_eq!(Approach::Neutral.guidelines().len(), 3);
        assert_eq!(Approach::CrisisResponse.as_str(), "crisis-response");
    }

    #[test]
    fn crafted_reply_layers_empathy_and_tone_prefix() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(1);

        let reply = craft_assistant_reply(&config, "I'm worried", "What is your roof type?", &mut rng);
        let (empathy, body) = reply.split_once("\n\n").expect("blank-line separated");
        assert!(config.empathy_phrases.iter().any(|phrase| phrase == empathy));
        assert_eq!(body, "Let me reassure you: What is your roof type?");

        let unknown_tone = craft_assistant_reply(&config, "so excited", "Next?", &mut rng);
        assert!(unknown_tone.ends_with("\n\nNext?"));

        let plain = craft_assistant_reply(&config, "ok", "Next?", &mut rng);
        assert_eq!(plain, "Next?");
    }

    #[test]
    fn empathize_skips_tone_prefix() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(1);

        let reply = empathize(&config, "I'm worried", "What is your roof type?", &mut rng);
        let (empathy, body) = reply.split_once("\n\n").expect("blank-line separated");
        assert!(config.empathy_phrases.iter().any(|phrase| phrase == empathy));
        assert_eq!(body, "What is your roof type?");
        assert_eq!(empathize(&config, "ok", "Next?", &mut rng), "Next?");
    }

    #[test]
    fn reading_summarises_signals() {
        let reading = read_emotions(&config(), "I'm worried!! Is it expensive?");
        assert_eq!(reading.signals, vec!["worried".to_owned(), "expensive".to_owned()]);
        assert_eq!(reading.modulation.as_deref(), Some("reassuring"));
        assert_eq!(reading.approach, Approach::Empathetic);
    }
}
