use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Emotional-signal configuration carried by each character.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqConfig {
    #[serde(default)]
    pub detection: Vec<String>,
    #[serde(default)]
    pub empathy_phrases: Vec<String>,
    /// Signal keyword to tone keyword.
    #[serde(default)]
    pub modulation: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageProfile {
    pub primary: String,
    #[serde(default)]
    pub secondary: Vec<String>,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub opening_phrases: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceValidation {
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub follow_ups: Vec<String>,
}

/// Phrasing guidance for one parameter, rendered into the enquiry prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterGuidance {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub question_intent: String,
    #[serde(default)]
    pub ai_guidance: String,
    #[serde(default)]
    pub response_type: String,
    #[serde(default)]
    pub example_questions: Vec<String>,
    #[serde(default)]
    pub validation: Option<GuidanceValidation>,
    #[serde(default)]
    pub emotion_cues: BTreeMap<String, String>,
    #[serde(default)]
    pub usage_in_process: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryPrompt {
    #[serde(default)]
    pub parameters: Vec<ParameterGuidance>,
    #[serde(default)]
    pub collection_flow: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub style: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterPrompts {
    #[serde(default)]
    pub enquiry: EnquiryPrompt,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRouting {
    #[serde(default)]
    pub model: Option<String>,
}

/// A consultant persona bound to exactly one service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub name: String,
    pub service: String,
    pub persona: String,
    #[serde(default)]
    pub qualification: Option<String>,
    pub tone: String,
    #[serde(default)]
    pub region: Region,
    pub language: LanguageProfile,
    pub eq: EqConfig,
    #[serde(default)]
    pub guardrails: Vec<String>,
    #[serde(default)]
    pub prompts: CharacterPrompts,
    #[serde(default)]
    pub routing: ModelRouting,
}

impl Character {
    /// Splits names such as `"Asha Rao - Solar Advisor"` into `("Asha", "Solar Advisor")`.
    /// Without a role suffix the role falls back to `"<service> consultant"`.
    pub fn introduction_parts(&self) -> (String, String) {
        let (name_part, role_part) = match self.name.split_once(" - ") {
            Some((name, role)) => (name.trim(), role.trim()),
            None => (self.name.trim(), ""),
        };

        let first_name: String = name_part
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .chars()
            .filter(char::is_ascii_alphabetic)
            .collect();
        let first_name = if first_name.is_empty() { "Consultant".to_owned() } else { first_name };

        let role = if role_part.is_empty() {
            format!("{} consultant", self.service.replace('_', " "))
        } else {
            role_part.to_owned()
        };

        (first_name, role)
    }

    pub fn introduction(&self) -> String {
        let (first_name, role) = self.introduction_parts();
        format!("Hello! I'm {first_name}, your {role}.")
    }

    pub fn opening_phrase(&self) -> &str {
        self.language.opening_phrases.first().map(String::as_str).unwrap_or("Hello!")
    }
}

#[cfg(test)]
mod tests {
    use super::{Character, EqConfig, LanguageProfile};

    fn character(name: &str, service: &str) -> Character {
        Character {
            id: "c-1".to_owned(),
            name: name.to_owned(),
            service: service.to_owned(),
            persona: "Practical advisor".to_owned(),
            qualification: None,
            tone: "warm".to_owned(),
            region: Default::default(),
            language: LanguageProfile {
                primary: "English".to_owned(),
                secondary: Vec::new(),
                locale: "en-IN".to_owned(),
                opening_phrases: Vec::new(),
            },
            eq: EqConfig::default(),
            guardrails: Vec::new(),
            prompts: Default::default(),
            routing: Default::default(),
        }
    }

    #[test]
    fn introduction_uses_role_suffix_when_present() {
        let asha = character("Asha Rao - Solar Advisor", "solar_services");
        assert_eq!(asha.introduction(), "Hello! I'm Asha, your Solar Advisor.");
    }

    #[test]
    fn introduction_falls_back_to_service_title() {
        let ravi = character("Ravi", "electrical_services");
        assert_eq!(ravi.introduction(), "Hello! I'm Ravi, your electrical services consultant.");
    }

    #[test]
    fn opening_phrase_defaults_to_hello() {
        assert_eq!(character("Ravi", "painting").opening_phrase(), "Hello!");
    }
}
