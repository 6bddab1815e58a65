//! Fixed reference procedures.

/// Standard person-overboard checklist for a vessel with crew still aboard.
pub const MOB_CHECKLIST: [&str; 7] = [
    "SHOUT 'MAN OVERBOARD!' immediately",
    "THROW life ring or buoy to the person",
    "ASSIGN crew to keep eyes on the person at all times",
    "PRESS the MOB button on the GPS or chartplotter",
    "ENGINE: start and engage immediately",
    "TURN the vessel towards the person (Williamson turn)",
    "RADIO: Mayday on VHF channel 16 if assistance is needed",
];

/// Recovery notes that follow the immediate actions.
pub const RECOVERY_NOTES: [&str; 4] = [
    "Approach the person from downwind",
    "Engine to neutral on the final approach",
    "Check for hypothermia and warm slowly",
    "Call for medical advice",
];

/// Mitigations accepted with a captain override of a cancellation.
pub const OVERRIDE_MITIGATIONS: [&str; 5] = [
    "Set a double anchor at every overnight stop",
    "Monitor VHF channel 16 continuously",
    "Check the weather every 30 minutes",
    "Keep the nearest safe harbour ready as a bolt-hole",
    "Brief the crew on the forecast and the decision",
];

/// Numbered checklist lines.
pub fn numbered(items: &[&str]) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {item}", i + 1))
        .collect()
}
