//! セーブ/ロード機能。
//!
//! ## バージョニング方針
//!
//! - `SAVE_VERSION`: 現在のセーブ形式バージョン。フィールド追加時にインクリメントする。
//! - `MIN_COMPATIBLE_VERSION`: 互換性を維持できる最小バージョン。
//!   フィールド追加のみなら変えない。破壊的変更時のみインクリメントする。
//!
//! 不足フィールドはデフォルト値で補完して読み込む（古いセーブに
//! `pending_battle_ms` が無い場合は 0 扱い）。ロード後、カタログに追加された
//! 新しい悪魔はセーブ済みリストの末尾にマージされる。既存の悪魔を上書き・
//! 削除することはない。

#[cfg(any(target_arch = "wasm32", test))]
use serde::{Deserialize, Serialize};

#[cfg(any(target_arch = "wasm32", test))]
use super::state::{demon_catalog, Demon, Rarity, Role, TowerState};

/// セーブデータのフォーマットバージョン。
#[cfg(any(target_arch = "wasm32", test))]
const SAVE_VERSION: u32 = 1;

/// 互換性を維持できる最小バージョン。
#[cfg(any(target_arch = "wasm32", test))]
const MIN_COMPATIBLE_VERSION: u32 = 1;

/// localStorage のキー。
#[cfg(target_arch = "wasm32")]
const STORAGE_KEY: &str = "tower_idle_save";

/// 前回の保存からこれだけフォアグラウンド時間が経ったら自動保存する。
pub const AUTOSAVE_INTERVAL_MS: u64 = 30_000;

/// シリアライズ用のセーブデータ構造体。
/// TowerState の一時的なUI状態（画面、ログ、ポップアップ等）は含まない。
#[cfg(any(target_arch = "wasm32", test))]
#[derive(Serialize, Deserialize)]
struct SaveData {
    version: u32,
    game: GameSave,
}

#[cfg(any(target_arch = "wasm32", test))]
#[derive(Serialize, Deserialize)]
#[serde(default)]
struct GameSave {
    demons: Vec<DemonSave>,
    current_floor: u32,
    max_reached_floor: u32,
    souls: u64,
    gems: u64,
    attack_multiplier: f64,
    defense_multiplier: f64,
    soul_gain_multiplier: f64,
    gem_gain_multiplier: f64,
    /// 旧セーブには存在しないことがある。無ければ 0。
    pending_battle_ms: u64,
    last_active_at: Option<f64>,
}

#[cfg(any(target_arch = "wasm32", test))]
impl Default for GameSave {
    fn default() -> Self {
        Self {
            demons: Vec::new(),
            current_floor: 1,
            max_reached_floor: 1,
            souls: 0,
            gems: 0,
            attack_multiplier: 1.0,
            defense_multiplier: 1.0,
            soul_gain_multiplier: 1.0,
            gem_gain_multiplier: 1.0,
            pending_battle_ms: 0,
            last_active_at: None,
        }
    }
}

#[cfg(any(target_arch = "wasm32", test))]
#[derive(Serialize, Deserialize, Clone)]
struct DemonSave {
    id: String,
    name: String,
    level: u32,
    base_attack: f64,
    base_defense: f64,
    base_speed: f64,
    role: u8,
    rarity: u8,
    in_party: bool,
}

#[cfg(any(target_arch = "wasm32", test))]
fn role_code(role: Role) -> u8 {
    match role {
        Role::Attacker => 0,
        Role::Tank => 1,
        Role::Support => 2,
        Role::Farmer => 3,
    }
}

#[cfg(any(target_arch = "wasm32", test))]
fn role_from_code(code: u8) -> Role {
    match code {
        0 => Role::Attacker,
        1 => Role::Tank,
        2 => Role::Support,
        _ => Role::Farmer,
    }
}

#[cfg(any(target_arch = "wasm32", test))]
fn rarity_code(rarity: Rarity) -> u8 {
    match rarity {
        Rarity::Common => 0,
        Rarity::Rare => 1,
        Rarity::Epic => 2,
        Rarity::Legendary => 3,
    }
}

#[cfg(any(target_arch = "wasm32", test))]
fn rarity_from_code(code: u8) -> Rarity {
    match code {
        1 => Rarity::Rare,
        2 => Rarity::Epic,
        3 => Rarity::Legendary,
        _ => Rarity::Common,
    }
}

/// TowerState からセーブ用データを抽出する。
#[cfg(any(target_arch = "wasm32", test))]
fn extract_save(state: &TowerState) -> SaveData {
    SaveData {
        version: SAVE_VERSION,
        game: GameSave {
            demons: state
                .demons
                .iter()
                .map(|d| DemonSave {
                    id: d.id.clone(),
                    name: d.name.clone(),
                    level: d.level,
                    base_attack: d.base_attack,
                    base_defense: d.base_defense,
                    base_speed: d.base_speed,
                    role: role_code(d.role),
                    rarity: rarity_code(d.rarity),
                    in_party: d.in_party,
                })
                .collect(),
            current_floor: state.current_floor,
            max_reached_floor: state.max_reached_floor,
            souls: state.resources.souls,
            gems: state.resources.gems,
            attack_multiplier: state.upgrades.attack,
            defense_multiplier: state.upgrades.defense,
            soul_gain_multiplier: state.upgrades.soul_gain,
            gem_gain_multiplier: state.upgrades.gem_gain,
            pending_battle_ms: state.pending_battle_ms,
            last_active_at: state.last_active_at,
        },
    }
}

/// セーブデータを TowerState に復元し、カタログの新規悪魔をマージする。
#[cfg(any(target_arch = "wasm32", test))]
fn apply_save(state: &mut TowerState, save: &GameSave) {
    if !save.demons.is_empty() {
        state.demons = save
            .demons
            .iter()
            .map(|d| Demon {
                id: d.id.clone(),
                name: d.name.clone(),
                level: d.level.max(1),
                base_attack: d.base_attack,
                base_defense: d.base_defense,
                base_speed: d.base_speed,
                role: role_from_code(d.role),
                rarity: rarity_from_code(d.rarity),
                in_party: d.in_party,
            })
            .collect();
    }

    // カタログ更新で増えた悪魔を末尾に追加する。セーブ済みの悪魔は
    // そのまま維持する（削除・上書きしない）。
    for fresh in demon_catalog() {
        if !state.demons.iter().any(|d| d.id == fresh.id) {
            state.demons.push(fresh);
        }
    }

    state.current_floor = save.current_floor.max(1);
    state.max_reached_floor = save.max_reached_floor.max(state.current_floor);
    state.resources.souls = save.souls;
    state.resources.gems = save.gems;
    state.upgrades.attack = save.attack_multiplier.max(1.0);
    state.upgrades.defense = save.defense_multiplier.max(1.0);
    state.upgrades.soul_gain = save.soul_gain_multiplier.max(1.0);
    state.upgrades.gem_gain = save.gem_gain_multiplier.max(1.0);
    state.pending_battle_ms = save.pending_battle_ms;
    state.last_active_at = save.last_active_at;
}

/// localStorage にアクセスする。WASM 環境でのみ動作。
#[cfg(target_arch = "wasm32")]
fn get_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok()?
}

/// ゲーム状態を localStorage に保存する。
/// 失敗時はサイレントに無視（コンソールにログ出力）。
#[cfg(target_arch = "wasm32")]
pub fn save_game(state: &TowerState) {
    let save_data = extract_save(state);
    let json = match serde_json::to_string(&save_data) {
        Ok(j) => j,
        Err(e) => {
            web_sys::console::warn_1(&format!("tower-idle: セーブのシリアライズに失敗: {e}").into());
            return;
        }
    };

    if let Some(storage) = get_storage() {
        if let Err(e) = storage.set_item(STORAGE_KEY, &json) {
            web_sys::console::warn_1(
                &format!("tower-idle: localStorage への保存に失敗: {e:?}").into(),
            );
        }
    }
}

/// localStorage からゲーム状態を復元する。
/// バージョン不一致やパースエラーの場合は false を返す（新規ゲームになる）。
#[cfg(target_arch = "wasm32")]
pub fn load_game(state: &mut TowerState) -> bool {
    let storage = match get_storage() {
        Some(s) => s,
        None => return false,
    };

    let json = match storage.get_item(STORAGE_KEY) {
        Ok(Some(j)) => j,
        _ => return false,
    };

    let save_data: SaveData = match serde_json::from_str(&json) {
        Ok(d) => d,
        Err(e) => {
            web_sys::console::warn_1(
                &format!("tower-idle: セーブデータのパースに失敗（破棄します）: {e}").into(),
            );
            let _ = storage.remove_item(STORAGE_KEY);
            return false;
        }
    };

    if save_data.version < MIN_COMPATIBLE_VERSION {
        web_sys::console::log_1(
            &format!(
                "tower-idle: セーブバージョンが古すぎます (saved={}, min_compatible={})。新規ゲームを開始します。",
                save_data.version, MIN_COMPATIBLE_VERSION
            )
            .into(),
        );
        let _ = storage.remove_item(STORAGE_KEY);
        return false;
    }

    apply_save(state, &save_data.game);
    true
}

/// セーブデータを削除する。
#[cfg(target_arch = "wasm32")]
pub fn delete_save() {
    if let Some(storage) = get_storage() {
        let _ = storage.remove_item(STORAGE_KEY);
    }
}
