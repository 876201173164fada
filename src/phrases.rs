use crate::difficulty::Difficulty;
use rand::seq::SliceRandom;
use rand::Rng;

/// Challenge phrases shared by the racer and the keyer.
pub const CHALLENGE_PHRASES: &[&str] = &[
    // short
    "SOS",
    "HI",
    "OK",
    "CQ",
    "TEST",
    "HELLO",
    "MORSE",
    "HI THERE",
    "HELLO WORLD",
    "CQ CQ CQ",
    "GOOD MORNING",
    "THANK YOU",
    "WELL DONE",
    "COPY THAT",
    "ROGER THAT",
    "OVER AND OUT",
    // medium
    "SOS TITANIC",
    "THE QUICK BROWN FOX",
    "MORSE CODE IS FUN",
    "RADIO SILENCE",
    "CALL FOR HELP",
    "SEND BACKUP NOW",
    "MESSAGE RECEIVED",
    "STAND BY PLEASE",
    "REPEAT LAST MESSAGE",
    // historic
    "WHAT HATH GOD WROUGHT",
    "COME HERE WATSON",
    "PARIS PARIS PARIS",
    // ham radio
    "QTH IS HOME",
    "RST FIVE NINE",
    "SEVENTY THREE",
];

/// One word per calendar day is drawn from this pool.
pub const DAILY_WORDS: &[&str] = &[
    "ALPHA", "BRAVO", "CHARLIE", "DELTA", "ECHO", "FOXTROT", "GOLF", "HOTEL", "INDIA", "JULIET",
    "KILO", "LIMA", "MIKE", "NOVEMBER", "OSCAR", "PAPA", "QUEBEC", "ROMEO", "SIERRA", "TANGO",
    "UNIFORM", "VICTOR", "WHISKEY", "XRAY", "YANKEE", "ZULU", "HELLO", "WORLD", "MORSE", "CODE",
    "SIGNAL", "BEACON", "ROGER", "COPY", "OVER", "MAYDAY", "RESCUE", "TOWER", "PILOT", "RADIO",
    "STATION", "WAVE", "PULSE", "SPARK", "DECODE", "CIPHER", "RELAY", "PATROL", "HARBOR", "VOYAGE",
    "ANCHOR", "STORM", "HORIZON", "COMPASS", "NIGHT", "DAWN", "ALERT", "DANGER", "CAPTAIN",
    "MISSION", "TARGET", "FLEET", "GUARD", "BRIDGE", "COAST", "EAGLE", "FALCON", "HUNTER",
    "SHADOW", "THUNDER", "BLAZE", "FROST", "SUMMIT", "VALLEY", "RIVER", "OCEAN", "ISLAND",
    "DESERT", "FOREST", "PLAINS", "NORTH", "SOUTH", "EAST", "WEST", "CENTER", "RAPID", "STEADY",
    "SILENT", "STRIKE", "SHIELD", "ORBIT", "LAUNCH", "ROCKET", "FLIGHT", "CLOUD", "NEXUS", "PRISM",
    "QUARTZ", "VERTEX", "MATRIX", "CIPHER", "ENIGMA", "VORTEX", "ZENITH", "APEX", "OMEGA", "TITAN",
    "ATLAS", "HYDRA", "PHOENIX", "COMET", "LUNAR", "SOLAR", "GAMMA", "DELTA", "SIGMA", "THETA",
    "KAPPA", "LAMBDA", "RETURN", "MARCH", "BRAVE", "SWIFT", "SHARP", "STEEL", "AMBER", "CORAL",
    "IVORY", "SLATE", "ONYX", "JADE", "OPAL", "RUBY", "TOPAZ", "PEARL", "FLARE", "DRIFT", "SURGE",
    "CREST", "DEPTH", "FIELD", "SCOUT", "WATCH", "TRACE", "FORCE", "SCALE", "RANGE", "FRONT",
    "RECON", "SQUAD", "RALLY", "CLASH", "FORGE", "VAULT", "HAVEN", "RIDGE", "STONE", "FLAME",
    "LIGHT", "SPARK", "ARC", "BOLT", "CORE", "DOME", "EDGE", "GLOW", "HAZE", "IRON", "JET", "KNOT",
    "LORE", "MIST", "NODE", "ORE", "PIKE", "RIFT", "SILO", "TIDE", "URN", "VINE", "WREN", "AXIS",
    "YOKE", "ZONE",
];

/// Whether a phrase suits the keyer timing preset.
pub fn suits(difficulty: Difficulty, phrase: &str) -> bool {
    match difficulty {
        Difficulty::Relaxed => phrase.len() <= 10,
        Difficulty::Normal => (5..=20).contains(&phrase.len()),
        Difficulty::Fast => phrase.contains(' '),
    }
}

/// Any phrase other than `exclude`.
pub fn random_phrase<R: Rng + ?Sized>(rng: &mut R, exclude: Option<&str>) -> &'static str {
    let pool: Vec<&'static str> = CHALLENGE_PHRASES
        .iter()
        .copied()
        .filter(|p| Some(*p) != exclude)
        .collect();
    pool.choose(rng).copied().unwrap_or(CHALLENGE_PHRASES[0])
}

/// A phrase for the given preset, falling back to the whole pool when no
/// phrase suits it.
pub fn phrase_for<R: Rng + ?Sized>(
    rng: &mut R,
    difficulty: Difficulty,
    exclude: Option<&str>,
) -> &'static str {
    let suitable: Vec<&'static str> = CHALLENGE_PHRASES
        .iter()
        .copied()
        .filter(|p| suits(difficulty, p) && Some(*p) != exclude)
        .collect();
    match suitable.choose(rng) {
        Some(phrase) => phrase,
        None => random_phrase(rng, exclude),
    }
}
