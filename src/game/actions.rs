//! Semantic action IDs for Tower Idle click targets.
//!
//! Each constant represents a distinct clickable action in the UI.
//! These IDs are registered during render and dispatched via `InputEvent::Click`.

// ── Popup ───────────────────────────────────────────────────────
pub const DISMISS_POPUP: u16 = 1;

// ── Tab navigation ──────────────────────────────────────────────
pub const TAB_TOWER: u16 = 10;
pub const TAB_DEMONS: u16 = 11;
pub const TAB_UPGRADES: u16 = 12;
pub const TAB_SETTINGS: u16 = 13;

// ── Demon screen (base + roster index) ──────────────────────────
pub const LEVEL_UP_BASE: u16 = 100;
pub const TOGGLE_PARTY_BASE: u16 = 200;

// ── Upgrade purchase (base + display index) ─────────────────────
pub const BUY_UPGRADE_BASE: u16 = 300;

// ── Settings ────────────────────────────────────────────────────
pub const RESET_ARM: u16 = 400;
pub const RESET_CONFIRM: u16 = 401;
pub const RESET_CANCEL: u16 = 402;
