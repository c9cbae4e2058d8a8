use std::io::Write;
use std::sync::Arc;

use enquiry_agent::{AgentRuntime, LlmClient};
use enquiry_core::{CharacterRegistry, DialogueMachine, DialoguePolicy, ParameterSchemaRegistry};

pub const CHARACTERS: &str = r#"{
  "defaults": {
    "tone": "warm",
    "persona": "Friendly consultant",
    "language": { "primary": "English", "locale": "en-IN" }
  },
  "characters": [
    {
      "id": "solar-asha",
      "name": "Asha Rao - Solar Advisor",
      "service": "solar_services",
      "language": { "openingPhrases": ["Namaste! Ready to go solar?"] },
      "eq": { "detection": ["worried"], "empathyPhrases": ["I understand your concern."] }
    },
    {
      "id": "paint-meera",
      "name": "Meera - Colour Consultant",
      "service": "painting",
      "eq": { "detection": ["excited"] }
    }
  ]
}"#;

pub fn characters() -> Arc<CharacterRegistry> {
    Arc::new(CharacterRegistry::from_json(CHARACTERS).expect("fixture registry"))
}

pub fn characters_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(CHARACTERS.as_bytes()).expect("write fixture");
    file
}

pub fn runtime(llm: Arc<dyn LlmClient>) -> AgentRuntime {
    let machine = DialogueMachine::new(
        Arc::new(ParameterSchemaRegistry::builtin()),
        DialoguePolicy::default(),
    );
    AgentRuntime::new(machine, characters(), llm).with_rng_seed(7)
}
