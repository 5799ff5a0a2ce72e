//! Tower Idle game state definitions.

/// Battle role of a demon. Affects the power formula, nothing else.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Attacker,
    Tank,
    Support,
    Farmer,
}

impl Role {
    /// Display name (shown on the roster screen).
    pub fn name(&self) -> &str {
        match self {
            Role::Attacker => "アタッカー",
            Role::Tank => "タンク",
            Role::Support => "サポート",
            Role::Farmer => "ファーマー",
        }
    }

    /// Power multiplier contributed by the role.
    pub fn power_bonus(&self) -> f64 {
        match self {
            Role::Attacker => 1.2,
            Role::Tank => 1.1,
            Role::Support => 1.05,
            Role::Farmer => 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn name(&self) -> &str {
        match self {
            Rarity::Common => "コモン",
            Rarity::Rare => "レア",
            Rarity::Epic => "エピック",
            Rarity::Legendary => "レジェンダリー",
        }
    }

    /// Power multiplier contributed by the rarity.
    pub fn power_bonus(&self) -> f64 {
        match self {
            Rarity::Common => 1.0,
            Rarity::Rare => 1.25,
            Rarity::Epic => 1.6,
            Rarity::Legendary => 2.0,
        }
    }
}

/// A collectible demon. Base stats are fixed at creation; only `level`
/// and `in_party` ever change.
#[derive(Clone, Debug)]
pub struct Demon {
    pub id: String,
    pub name: String,
    pub level: u32,
    pub base_attack: f64,
    pub base_defense: f64,
    pub base_speed: f64,
    pub role: Role,
    pub rarity: Rarity,
    pub in_party: bool,
}

/// The four global upgrade multipliers, shared by all demons.
/// Each starts at 1.0 and only ever advances in +0.05 purchases.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Upgrades {
    pub attack: f64,
    pub defense: f64,
    pub soul_gain: f64,
    pub gem_gain: f64,
}

impl Upgrades {
    pub fn new() -> Self {
        Self {
            attack: 1.0,
            defense: 1.0,
            soul_gain: 1.0,
            gem_gain: 1.0,
        }
    }

    pub fn get(&self, kind: UpgradeKind) -> f64 {
        match kind {
            UpgradeKind::Attack => self.attack,
            UpgradeKind::Defense => self.defense,
            UpgradeKind::SoulGain => self.soul_gain,
            UpgradeKind::GemGain => self.gem_gain,
        }
    }

    /// Advance the selected multiplier by one +0.05 step.
    /// Rounded to 2 decimal places so repeated purchases cannot drift.
    pub fn bump(&mut self, kind: UpgradeKind) {
        let slot = match kind {
            UpgradeKind::Attack => &mut self.attack,
            UpgradeKind::Defense => &mut self.defense,
            UpgradeKind::SoulGain => &mut self.soul_gain,
            UpgradeKind::GemGain => &mut self.gem_gain,
        };
        *slot = ((*slot + 0.05) * 100.0).round() / 100.0;
    }
}

/// Kinds of purchasable upgrades.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpgradeKind {
    Attack,
    Defense,
    SoulGain,
    GemGain,
}

impl UpgradeKind {
    /// All upgrade kinds in display order.
    pub fn all() -> &'static [UpgradeKind] {
        &[
            UpgradeKind::Attack,
            UpgradeKind::Defense,
            UpgradeKind::SoulGain,
            UpgradeKind::GemGain,
        ]
    }

    pub fn name(&self) -> &str {
        match self {
            UpgradeKind::Attack => "攻撃倍率",
            UpgradeKind::Defense => "防御倍率",
            UpgradeKind::SoulGain => "魂獲得倍率",
            UpgradeKind::GemGain => "ジェム獲得倍率",
        }
    }

    /// Key to buy ('1'-'4' mapped to display order).
    pub fn key(&self) -> char {
        match self {
            UpgradeKind::Attack => '1',
            UpgradeKind::Defense => '2',
            UpgradeKind::SoulGain => '3',
            UpgradeKind::GemGain => '4',
        }
    }
}

/// The two spendable currencies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Resources {
    pub souls: u64,
    pub gems: u64,
}

/// Which screen is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Tower,
    Demons,
    Upgrades,
    Settings,
}

/// Summary of progress earned while the player was away.
/// Drives the "welcome back" popup after an offline catch-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OfflineGains {
    pub elapsed_ms: u64,
    pub souls: u64,
    pub gems: u64,
    pub floors: u32,
}

/// Message log entry.
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub text: String,
    pub is_important: bool,
}

/// Full game state. Mutated only through `logic` functions and
/// `TowerGame` input dispatch.
pub struct TowerState {
    pub demons: Vec<Demon>,
    /// Floor currently being attempted (>= 1).
    pub current_floor: u32,
    /// High-water mark, always >= current_floor.
    pub max_reached_floor: u32,
    pub resources: Resources,
    pub upgrades: Upgrades,
    /// Leftover battle time carried between simulator calls.
    /// After any simulator call: 0 <= pending_battle_ms < clear time.
    pub pending_battle_ms: u64,
    /// Epoch millis of the last clock sync, None before the first one.
    pub last_active_at: Option<f64>,

    // UI state — never persisted.
    pub screen: Screen,
    pub log: Vec<LogEntry>,
    pub reset_armed: bool,
    pub offline_report: Option<OfflineGains>,
}

impl TowerState {
    pub fn new(now_epoch_ms: f64) -> Self {
        let mut state = Self {
            demons: demon_catalog(),
            current_floor: 1,
            max_reached_floor: 1,
            resources: Resources::default(),
            upgrades: Upgrades::new(),
            pending_battle_ms: 0,
            last_active_at: Some(now_epoch_ms),
            screen: Screen::Tower,
            log: Vec::new(),
            reset_armed: false,
            offline_report: None,
        };
        state.add_log("魔王の塔へようこそ。悪魔たちが勝手に戦ってくれる。", true);
        state
    }

    pub fn add_log(&mut self, text: &str, is_important: bool) {
        self.log.push(LogEntry {
            text: text.to_string(),
            is_important,
        });
        if self.log.len() > 50 {
            self.log.remove(0);
        }
    }

    pub fn demon(&self, id: &str) -> Option<&Demon> {
        self.demons.iter().find(|d| d.id == id)
    }

    pub fn demon_mut(&mut self, id: &str) -> Option<&mut Demon> {
        self.demons.iter_mut().find(|d| d.id == id)
    }

    /// Number of demons currently in the party.
    pub fn party_count(&self) -> usize {
        self.demons.iter().filter(|d| d.in_party).count()
    }
}

/// The fixed demon catalog. New saves start with exactly these; old saves
/// get any catalog entry they are missing appended on load.
pub fn demon_catalog() -> Vec<Demon> {
    vec![
        Demon {
            id: "imp-attacker".into(),
            name: "Crimson Imp".into(),
            level: 1,
            base_attack: 12.0,
            base_defense: 5.0,
            base_speed: 8.0,
            role: Role::Attacker,
            rarity: Rarity::Common,
            in_party: true,
        },
        Demon {
            id: "orc-tank".into(),
            name: "Gate Orc".into(),
            level: 1,
            base_attack: 8.0,
            base_defense: 14.0,
            base_speed: 5.0,
            role: Role::Tank,
            rarity: Rarity::Common,
            in_party: true,
        },
        Demon {
            id: "witch-support".into(),
            name: "Void Witch".into(),
            level: 1,
            base_attack: 10.0,
            base_defense: 7.0,
            base_speed: 9.0,
            role: Role::Support,
            rarity: Rarity::Rare,
            in_party: true,
        },
        Demon {
            id: "goblin-farmer".into(),
            name: "Greedy Goblin".into(),
            level: 1,
            base_attack: 6.0,
            base_defense: 4.0,
            base_speed: 12.0,
            role: Role::Farmer,
            rarity: Rarity::Common,
            in_party: false,
        },
    ]
}
