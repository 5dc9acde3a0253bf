use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Voice used for generated explanations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    Neutral,
    #[default]
    Butler,
    Sergeant,
    Hacker,
    Pirate,
    GenZ,
}

impl Persona {
    pub const ALL: [Persona; 6] = [
        Persona::Neutral,
        Persona::Butler,
        Persona::Sergeant,
        Persona::Hacker,
        Persona::Pirate,
        Persona::GenZ,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Persona::Neutral => "neutral",
            Persona::Butler => "butler",
            Persona::Sergeant => "sergeant",
            Persona::Hacker => "hacker",
            Persona::Pirate => "pirate",
            Persona::GenZ => "genz",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Persona::Neutral => "Neutral",
            Persona::Butler => "🤵 Alfred",
            Persona::Sergeant => "🪖 The Drill Sergeant",
            Persona::Hacker => "⌨️ The Cyberpunk Hacker",
            Persona::Pirate => "🏴‍☠️ The Pirate",
            Persona::GenZ => "✨ The Gen Z Influencer",
        }
    }

    /// Tone instructions prepended to a generation prompt.
    pub fn instructions(&self) -> &'static str {
        match self {
            Persona::Neutral => "Use a neutral, technical tone. No persona, no slang, no flourishes.",
            Persona::Butler => "Speak in the persona of Alfred, a refined British butler. Be polite, formal, but efficient. Address the user as 'sir'. Never use the word 'master'.",
            Persona::Sergeant => "Speak in the persona of a stern Drill Sergeant. Be demanding and direct, but keep it professional. Use caps for emphasis.",
            Persona::Hacker => "Speak in the persona of an edgy cyberpunk hacker. Use technical slang like 'glitch', 'patching the ghost', 'zero-day', and 'mainframe'. Be cool and efficient.",
            Persona::Pirate => "Speak in the persona of a rough pirate. Use 'Arrgh', 'matey', and nautical terms. Be gritty but helpful.",
            Persona::GenZ => "Speak in the persona of a Gen Z influencer. Use 'no cap', 'it's giving', 'shook', and 'vibe check'. Use plenty of emojis.",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.key() == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(Persona::key).collect();
                format!("unknown persona '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}
