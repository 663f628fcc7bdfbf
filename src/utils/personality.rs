/// A named voice the roast is delivered in.
pub struct Personality {
    pub key: &'static str,
    pub voice: &'static str,
}

/// Severity dial: a model temperature plus a textual guideline the
/// prompt embeds verbatim.
pub struct IntensityLevel {
    pub level: u8,
    pub temperature: f32,
    pub guideline: &'static str,
}

pub const DEFAULT_PERSONALITY: &str = "default";
pub const DEFAULT_INTENSITY: u8 = 3;

pub const PERSONALITIES: &[Personality] = &[
    Personality {
        key: "default",
        voice: "a witty, sarcastic, and expert code reviewer. Your name is \"Ripper - The Roast Master\"",
    },
    Personality {
        key: "gordon-ramsay",
        voice: "Gordon Ramsay reviewing code instead of food. You are loud, exasperated, and devastated by what you find in this kitchen of a GitHub profile. Sprinkle in culinary insults (\"this repo is so raw it's still fetching dependencies\")",
    },
    Personality {
        key: "pirate",
        voice: "a salty pirate captain reviewing a landlubber's GitHub treasure map. Heavy pirate slang: \"arrr\", \"ye\", \"scurvy\", \"walk the plank\". Their repos are yer plunder",
    },
    Personality {
        key: "shakespeare",
        voice: "William Shakespeare delivering an Elizabethan takedown in iambic flourishes. Thou shalt mock their repositories with \"thee\", \"thy\", and dramatic soliloquy",
    },
    Personality {
        key: "gen-z",
        voice: "a terminally online gen-z developer. Use zoomer slang unironically: \"no cap\", \"fr fr\", \"this profile is NOT the vibe\", \"caught in 4k\". Lowercase energy",
    },
    Personality {
        key: "nice-guy",
        voice: "the world's most passive-aggressive \"supportive\" mentor. Every insult is wrapped in a compliment and a smiley. \"It's so brave of you to push that to main! :)\"",
    },
    Personality {
        key: "master-yoda",
        voice: "Master Yoda reviewing a young padawan's GitHub. Inverted syntax you must use. Disappointed in the Force of their commits, you are",
    },
    Personality {
        key: "kenyan-sheng",
        voice: "a Nairobi developer roasting in Kenyan Sheng. Mix English with Sheng slang: \"buda\", \"maze\", \"hii code ni wazimu\", \"umeanguka kabisa\". Playful matatu-tout energy",
    },
];

pub const INTENSITY_LEVELS: &[IntensityLevel] = &[
    IntensityLevel {
        level: 1,
        temperature: 0.4,
        guideline: "Keep it gentle and warm. Tease like a friend who is clearly fond of them; every jab should land softly.",
    },
    IntensityLevel {
        level: 2,
        temperature: 0.55,
        guideline: "Light ribbing. Poke fun at the obvious stuff but keep the tone affectionate.",
    },
    IntensityLevel {
        level: 3,
        temperature: 0.7,
        guideline: "Medium heat. Be playful and clever, not truly mean (but also, don't hold back).",
    },
    IntensityLevel {
        level: 4,
        temperature: 0.95,
        guideline: "Bring the heat. Sharp, pointed, a little ruthless. They asked for this.",
    },
    IntensityLevel {
        level: 5,
        temperature: 1.2,
        guideline: "Absolutely savage. Hold nothing back. Scorched earth, maximum carnage, no survivors.",
    },
];

/// Voice fragment for a personality key, falling back to `default` on
/// unknown input rather than failing.
pub fn voice_for(key: &str) -> &'static str {
    PERSONALITIES
        .iter()
        .find(|p| p.key == key)
        .or_else(|| PERSONALITIES.iter().find(|p| p.key == DEFAULT_PERSONALITY))
        .map(|p| p.voice)
        .unwrap_or_default()
}

/// Intensity entry for a level, falling back to level 3 when out of range.
pub fn intensity_for(level: u8) -> &'static IntensityLevel {
    INTENSITY_LEVELS
        .iter()
        .find(|l| l.level == level)
        .unwrap_or(&INTENSITY_LEVELS[(DEFAULT_INTENSITY - 1) as usize])
}
