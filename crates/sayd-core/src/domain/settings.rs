//! Per-client voice settings.
//!
//! A `VoiceSettings` value lives on each `ClientSession` and is copied into
//! every `Message` at enqueue time. Later `SET` commands mutate only the
//! session copy, never the snapshots already queued.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::notification::NotificationMask;
use super::priority::Priority;

/// Default number of index marks to rewind when resuming a paused message.
pub const DEFAULT_PAUSE_CONTEXT: u32 = 0;

/// How much punctuation the synthesizer should read aloud.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PunctuationMode {
    None,
    #[default]
    Some,
    Most,
    All,
}

/// How capital letters are signalled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapLetRecogn {
    #[default]
    None,
    Spell,
    Icon,
}

/// Generic voice selector understood by every output module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceType {
    #[default]
    Male1,
    Male2,
    Male3,
    Female1,
    Female2,
    Female3,
    ChildMale,
    ChildFemale,
}

macro_rules! keyword_enum {
    ($name:ident { $($variant:ident => $word:literal),+ $(,)? }) => {
        impl $name {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $word,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($word => Ok(Self::$variant),)+
                    other => Err(format!(
                        "invalid {} value '{}'",
                        stringify!($name),
                        other
                    )),
                }
            }
        }
    };
}

keyword_enum!(PunctuationMode {
    None => "none",
    Some => "some",
    Most => "most",
    All => "all",
});

keyword_enum!(CapLetRecogn {
    None => "none",
    Spell => "spell",
    Icon => "icon",
});

keyword_enum!(VoiceType {
    Male1 => "male1",
    Male2 => "male2",
    Male3 => "male3",
    Female1 => "female1",
    Female2 => "female2",
    Female3 => "female3",
    ChildMale => "child_male",
    ChildFemale => "child_female",
});

/// Settings snapshot carried by sessions and messages.
///
/// Rate, pitch and volume are in the protocol's `-100..=100` range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub rate: i32,
    pub pitch: i32,
    pub volume: i32,
    pub punctuation: PunctuationMode,
    pub spelling: bool,
    pub cap_let_recogn: CapLetRecogn,
    pub voice_type: VoiceType,
    /// Module-specific voice name, overriding `voice_type` when set.
    pub synthesis_voice: Option<String>,
    pub language: String,
    /// Explicitly requested output module.
    pub output_module: Option<String>,
    pub priority: Priority,
    pub notification: NotificationMask,
    /// Index marks to rewind on resume.
    pub pause_context: u32,
    /// Whether text payloads are already SSML.
    pub ssml_mode: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            rate: 0,
            pitch: 0,
            volume: 100,
            punctuation: PunctuationMode::default(),
            spelling: false,
            cap_let_recogn: CapLetRecogn::default(),
            voice_type: VoiceType::default(),
            synthesis_voice: None,
            language: "en".to_string(),
            output_module: None,
            priority: Priority::default(),
            notification: NotificationMask::empty(),
            pause_context: DEFAULT_PAUSE_CONTEXT,
            ssml_mode: false,
        }
    }
}

impl VoiceSettings {
    /// Clamp a rate/pitch/volume value to the protocol range.
    pub fn clamp_level(value: i32) -> i32 {
        value.clamp(-100, 100)
    }

    /// Key/value pairs pushed to an output module with a `SET` block.
    ///
    /// Client-side concerns (priority, notification mask, pause context)
    /// stay in the dispatcher and are not forwarded.
    pub fn module_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("rate", self.rate.to_string()),
            ("pitch", self.pitch.to_string()),
            ("volume", self.volume.to_string()),
            ("punctuation_mode", self.punctuation.as_str().to_string()),
            (
                "spelling_mode",
                if self.spelling { "on" } else { "off" }.to_string(),
            ),
            ("cap_let_recogn", self.cap_let_recogn.as_str().to_string()),
            ("voice", self.voice_type.as_str().to_uppercase()),
            (
                "synthesis_voice",
                self.synthesis_voice.clone().unwrap_or_else(|| "NULL".to_string()),
            ),
            ("language", self.language.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_neutral() {
        let settings = VoiceSettings::default();
        assert_eq!(settings.rate, 0);
        assert_eq!(settings.volume, 100);
        assert_eq!(settings.priority, Priority::Text);
        assert!(settings.notification.is_empty());
    }

    #[test]
    fn keyword_enums_round_trip_through_strings() {
        assert_eq!("MOST".parse::<PunctuationMode>(), Ok(PunctuationMode::Most));
        assert_eq!("child_female".parse::<VoiceType>(), Ok(VoiceType::ChildFemale));
        assert_eq!(CapLetRecogn::Icon.as_str(), "icon");
        assert!("loud".parse::<PunctuationMode>().is_err());
    }

    #[test]
    fn module_params_skip_dispatcher_only_fields() {
        let settings = VoiceSettings {
            synthesis_voice: Some("en-us+f3".to_string()),
            spelling: true,
            ..VoiceSettings::default()
        };
        let params = settings.module_params();
        assert!(params.contains(&("spelling_mode", "on".to_string())));
        assert!(params.contains(&("synthesis_voice", "en-us+f3".to_string())));
        assert!(params.contains(&("voice", "MALE1".to_string())));
        assert!(params.iter().all(|(key, _)| *key != "priority"));
    }

    #[test]
    fn clamps_levels() {
        assert_eq!(VoiceSettings::clamp_level(250), 100);
        assert_eq!(VoiceSettings::clamp_level(-250), -100);
        assert_eq!(VoiceSettings::clamp_level(12), 12);
    }
}
