//! Prebuilt voice catalogue.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::SpeechError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

/// Voices offered to the user. The name is sent verbatim as the
/// service's `voiceName`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Voice {
    #[default]
    Kore,
    Luna,
    Puck,
    Aura,
    Stella,
    Charon,
    Fenrir,
    Zephyr,
    Orion,
    Sol,
}

impl Voice {
    pub const ALL: [Voice; 10] = [
        Voice::Kore,
        Voice::Luna,
        Voice::Puck,
        Voice::Aura,
        Voice::Stella,
        Voice::Charon,
        Voice::Fenrir,
        Voice::Zephyr,
        Voice::Orion,
        Voice::Sol,
    ];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Kore => "Kore",
            Voice::Luna => "Luna",
            Voice::Puck => "Puck",
            Voice::Aura => "Aura",
            Voice::Stella => "Stella",
            Voice::Charon => "Charon",
            Voice::Fenrir => "Fenrir",
            Voice::Zephyr => "Zephyr",
            Voice::Orion => "Orion",
            Voice::Sol => "Sol",
        }
    }

    pub fn gender(&self) -> Gender {
        match self {
            Voice::Kore | Voice::Luna | Voice::Puck | Voice::Aura | Voice::Stella => Gender::Female,
            Voice::Charon | Voice::Fenrir | Voice::Zephyr | Voice::Orion | Voice::Sol => {
                Gender::Male
            }
        }
    }

    /// Voices of one gender, in catalogue order.
    pub fn by_gender(gender: Gender) -> impl Iterator<Item = Voice> {
        Voice::ALL.into_iter().filter(move |v| v.gender() == gender)
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = SpeechError;

    /// Case-insensitive match on the voice name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Voice::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| SpeechError::UnknownVoice(name.to_string()))
    }
}
