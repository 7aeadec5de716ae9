//! Identifiers the codecs test against directly.

use std::sync::OnceLock;

use super::ShortGuid;

/// Lazily hashed identifiers of strings with special meaning.
pub struct WellKnown {
    /// Parameter carrying an entity's display name.
    pub name: ShortGuid,
    /// Function type of animation-timeline entities.
    pub cage_animation: ShortGuid,
    /// Function type of trigger-sequence entities.
    pub trigger_sequence: ShortGuid,
    /// Function type whose "name" parameter is kept as a parameter.
    pub zone: ShortGuid,
    /// Function type that receives stray physics-system resources.
    pub physics_system: ShortGuid,
    pub global: ShortGuid,
    pub pause_menu: ShortGuid,
}

/// Get the shared well-known identifier set.
pub fn well_known() -> &'static WellKnown {
    static IDS: OnceLock<WellKnown> = OnceLock::new();
    IDS.get_or_init(|| WellKnown {
        name: ShortGuid::from_text("name"),
        cage_animation: ShortGuid::from_text("CAGEAnimation"),
        trigger_sequence: ShortGuid::from_text("TriggerSequence"),
        zone: ShortGuid::from_text("Zone"),
        physics_system: ShortGuid::from_text("PhysicsSystem"),
        global: ShortGuid::from_text("GLOBAL"),
        pause_menu: ShortGuid::from_text("PAUSEMENU"),
    })
}
