//! Centralized constants for the Foresight engine.
//!
//! Identity, dice and prompt-layout values live here so that a change to any
//! of them is a reviewed code change rather than a runtime knob.

// Identity -----------------------------------------------------------------
pub const NEWS_ID_PREFIX: &str = "news";
pub const HIDDEN_NEWS_ID_PREFIX: &str = "hidden-news";
/// Maximum number of characters kept from a title when deriving an id slug.
pub const SLUG_MAX_LEN: usize = 48;

// Dice ---------------------------------------------------------------------
pub const DICE_MIN: u8 = 1;
pub const DICE_MAX: u8 = 100;
pub(crate) const DICE_DOMAIN_TAG: &[u8] = b"foresight.dice";

// Prompt sections ----------------------------------------------------------
pub const SECTION_TIMELINE: &str = "# TIMELINE (JSONL)";
pub const SECTION_PLAYER_ATTENTION: &str = "# PLAYER ATTENTION";
pub const SECTION_CURRENT_STATE: &str = "# CURRENT STATE";
