//! 魔王の塔 — demon tower idle game.
//!
//! State lives in [`state`], pure tuning curves in [`balance`], mutation in
//! [`logic`], and this module owns input dispatch plus the save/autosave
//! plumbing around them.

pub mod actions;
pub mod balance;
pub mod logic;
pub mod render;
pub mod save;
pub mod state;

#[cfg(test)]
mod simulator;

use std::cell::RefCell;
use std::rc::Rc;

use ratzilla::ratatui::layout::Rect;
use ratzilla::ratatui::Frame;

use crate::input::{ClickState, InputEvent};

use balance::WELCOME_BACK_MIN_MS;
use logic::BattleMode;
use state::{Screen, TowerState, UpgradeKind};

pub struct TowerGame {
    pub state: TowerState,
    /// Foreground time since the last autosave.
    autosave_elapsed_ms: u64,
}

impl TowerGame {
    /// Fresh game, or the saved one with offline progress folded in.
    pub fn new(now_epoch_ms: f64) -> Self {
        #[cfg(target_arch = "wasm32")]
        let state = {
            let mut state = TowerState::new(now_epoch_ms);
            if save::load_game(&mut state) {
                Self::reconcile(&mut state, now_epoch_ms);
            }
            state
        };
        #[cfg(not(target_arch = "wasm32"))]
        let state = TowerState::new(now_epoch_ms);

        Self {
            state,
            autosave_elapsed_ms: 0,
        }
    }

    /// Catch up on the wall-clock gap since the last sync and queue the
    /// welcome-back popup when the away time was long enough to matter.
    fn reconcile(state: &mut TowerState, now_epoch_ms: f64) {
        if let Some(gains) = logic::catch_up(state, now_epoch_ms) {
            let earned = gains.souls > 0 || gains.gems > 0 || gains.floors > 0;
            if earned {
                let text = format!("離席中の戦果: 魂 +{} / ジェム +{}", gains.souls, gains.gems);
                state.add_log(&text, true);
            }
            if gains.elapsed_ms >= WELCOME_BACK_MIN_MS && earned {
                state.offline_report = Some(gains);
            }
        }
    }

    /// Dispatch one input event. Returns whether it was consumed; consumed
    /// input triggers an immediate save.
    pub fn handle_input(&mut self, event: &InputEvent, now_epoch_ms: f64) -> bool {
        // The popup eats the first input of any kind.
        if self.state.offline_report.is_some() {
            self.state.offline_report = None;
            return true;
        }

        let consumed = match event {
            InputEvent::Key(c) => self.handle_key(*c, now_epoch_ms),
            InputEvent::Click(id) => self.handle_click(*id, now_epoch_ms),
        };

        #[cfg(target_arch = "wasm32")]
        if consumed {
            save::save_game(&self.state);
        }

        consumed
    }

    /// Advance the battle simulation by one frame of foreground time.
    pub fn frame(&mut self, elapsed_ms: u64, now_epoch_ms: f64) {
        logic::advance(
            &mut self.state,
            elapsed_ms,
            BattleMode::Foreground,
            now_epoch_ms,
        );

        self.autosave_elapsed_ms += elapsed_ms;
        if self.autosave_elapsed_ms >= save::AUTOSAVE_INTERVAL_MS {
            self.autosave_elapsed_ms = 0;
            #[cfg(target_arch = "wasm32")]
            save::save_game(&self.state);
        }
    }

    /// Called when the render loop detects the tab was suspended (backgrounded
    /// tab, laptop lid, ...). The gap is replayed as background progress.
    pub fn resume(&mut self, now_epoch_ms: f64) {
        Self::reconcile(&mut self.state, now_epoch_ms);
        #[cfg(target_arch = "wasm32")]
        save::save_game(&self.state);
    }

    pub fn render(&self, f: &mut Frame, area: Rect, click_state: &Rc<RefCell<ClickState>>) {
        render::render(&self.state, f, area, click_state);
    }

    // Screen-local keys first, tab switching as fallback. On the roster
    // screen 'd' toggles the fourth demon, so it must win over the tab key.
    fn handle_key(&mut self, key: char, now_epoch_ms: f64) -> bool {
        let local = match self.state.screen {
            Screen::Tower => false,
            Screen::Demons => match key {
                '1'..='9' => self.level_up_by_index((key as u8 - b'1') as usize),
                'a'..='i' => self.toggle_party_by_index((key as u8 - b'a') as usize),
                _ => false,
            },
            Screen::Upgrades => match UpgradeKind::all().iter().find(|k| k.key() == key) {
                Some(kind) => logic::buy_upgrade(&mut self.state, *kind),
                None => false,
            },
            Screen::Settings => match key {
                'r' if !self.state.reset_armed => {
                    self.state.reset_armed = true;
                    true
                }
                'y' if self.state.reset_armed => {
                    self.reset(now_epoch_ms);
                    true
                }
                'n' if self.state.reset_armed => {
                    self.state.reset_armed = false;
                    true
                }
                _ => false,
            },
        };
        if local {
            return true;
        }

        match key {
            't' => self.switch_screen(Screen::Tower),
            'd' => self.switch_screen(Screen::Demons),
            'u' => self.switch_screen(Screen::Upgrades),
            's' => self.switch_screen(Screen::Settings),
            _ => false,
        }
    }

    fn handle_click(&mut self, id: u16, now_epoch_ms: f64) -> bool {
        match id {
            actions::TAB_TOWER => self.switch_screen(Screen::Tower),
            actions::TAB_DEMONS => self.switch_screen(Screen::Demons),
            actions::TAB_UPGRADES => self.switch_screen(Screen::Upgrades),
            actions::TAB_SETTINGS => self.switch_screen(Screen::Settings),
            actions::RESET_ARM => {
                self.state.reset_armed = true;
                true
            }
            actions::RESET_CONFIRM if self.state.reset_armed => {
                self.reset(now_epoch_ms);
                true
            }
            actions::RESET_CANCEL => {
                let was_armed = self.state.reset_armed;
                self.state.reset_armed = false;
                was_armed
            }
            _ if id >= actions::RESET_ARM => false,
            _ if id >= actions::BUY_UPGRADE_BASE => {
                let idx = (id - actions::BUY_UPGRADE_BASE) as usize;
                match UpgradeKind::all().get(idx) {
                    Some(kind) => logic::buy_upgrade(&mut self.state, *kind),
                    None => false,
                }
            }
            _ if id >= actions::TOGGLE_PARTY_BASE => {
                self.toggle_party_by_index((id - actions::TOGGLE_PARTY_BASE) as usize)
            }
            _ if id >= actions::LEVEL_UP_BASE => {
                self.level_up_by_index((id - actions::LEVEL_UP_BASE) as usize)
            }
            _ => false,
        }
    }

    fn switch_screen(&mut self, screen: Screen) -> bool {
        // Leaving the settings screen always disarms the reset confirmation.
        self.state.reset_armed = false;
        self.state.screen = screen;
        true
    }

    fn level_up_by_index(&mut self, idx: usize) -> bool {
        let Some(id) = self.state.demons.get(idx).map(|d| d.id.clone()) else {
            return false;
        };
        logic::level_up_demon(&mut self.state, &id)
    }

    fn toggle_party_by_index(&mut self, idx: usize) -> bool {
        let Some(id) = self.state.demons.get(idx).map(|d| d.id.clone()) else {
            return false;
        };
        logic::toggle_party(&mut self.state, &id)
    }

    fn reset(&mut self, now_epoch_ms: f64) {
        #[cfg(target_arch = "wasm32")]
        save::delete_save();
        self.state = TowerState::new(now_epoch_ms);
        self.state.screen = Screen::Settings;
        self.state.add_log("セーブデータを消去した。最初からやり直し。", true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::OfflineGains;

    fn game() -> TowerGame {
        TowerGame::new(0.0)
    }

    #[test]
    fn tab_keys_switch_screens() {
        let mut g = game();
        assert_eq!(g.state.screen, Screen::Tower);
        assert!(g.handle_input(&InputEvent::Key('d'), 0.0));
        assert_eq!(g.state.screen, Screen::Demons);
        assert!(g.handle_input(&InputEvent::Key('u'), 0.0));
        assert_eq!(g.state.screen, Screen::Upgrades);
        assert!(g.handle_input(&InputEvent::Key('s'), 0.0));
        assert_eq!(g.state.screen, Screen::Settings);
        assert!(g.handle_input(&InputEvent::Key('t'), 0.0));
        assert_eq!(g.state.screen, Screen::Tower);
    }

    #[test]
    fn unmapped_key_not_consumed() {
        let mut g = game();
        assert!(!g.handle_input(&InputEvent::Key('z'), 0.0));
        assert!(!g.handle_input(&InputEvent::Key('1'), 0.0)); // tower screen: no digits
    }

    #[test]
    fn level_up_via_key_on_roster_screen() {
        let mut g = game();
        g.state.resources.souls = 100;
        g.state.screen = Screen::Demons;
        assert!(g.handle_input(&InputEvent::Key('1'), 0.0));
        assert_eq!(g.state.demons[0].level, 2);
        assert_eq!(g.state.resources.souls, 90);
    }

    #[test]
    fn level_up_key_out_of_range_not_consumed() {
        let mut g = game();
        g.state.resources.souls = 100;
        g.state.screen = Screen::Demons;
        assert!(!g.handle_input(&InputEvent::Key('9'), 0.0));
    }

    #[test]
    fn d_key_toggles_fourth_demon_on_roster_screen() {
        // 'd' is also the roster tab key; on the roster screen the demon
        // binding must win.
        let mut g = game();
        g.state.screen = Screen::Demons;
        assert!(!g.state.demons[3].in_party);
        assert!(g.handle_input(&InputEvent::Key('d'), 0.0));
        assert_eq!(g.state.screen, Screen::Demons);
        assert!(g.state.demons[3].in_party);
    }

    #[test]
    fn toggle_key_removes_member() {
        let mut g = game();
        g.state.screen = Screen::Demons;
        assert!(g.handle_input(&InputEvent::Key('a'), 0.0));
        assert!(!g.state.demons[0].in_party);
    }

    #[test]
    fn upgrade_keys_only_work_on_upgrade_screen() {
        let mut g = game();
        g.state.resources.gems = 100;
        assert!(!g.handle_input(&InputEvent::Key('2'), 0.0));
        g.state.screen = Screen::Upgrades;
        assert!(g.handle_input(&InputEvent::Key('2'), 0.0));
        assert!((g.state.upgrades.defense - 1.05).abs() < 1e-9);
        assert_eq!(g.state.resources.gems, 80);
    }

    #[test]
    fn reset_flow_via_keys() {
        let mut g = game();
        g.state.resources.souls = 500;
        g.state.current_floor = 9;
        g.state.screen = Screen::Settings;

        assert!(g.handle_input(&InputEvent::Key('r'), 0.0));
        assert!(g.state.reset_armed);

        // 'n' backs out without touching progress
        assert!(g.handle_input(&InputEvent::Key('n'), 0.0));
        assert!(!g.state.reset_armed);
        assert_eq!(g.state.resources.souls, 500);

        // arm again and confirm
        assert!(g.handle_input(&InputEvent::Key('r'), 0.0));
        assert!(g.handle_input(&InputEvent::Key('y'), 123.0));
        assert_eq!(g.state.resources.souls, 0);
        assert_eq!(g.state.current_floor, 1);
        assert_eq!(g.state.last_active_at, Some(123.0));
        assert_eq!(g.state.screen, Screen::Settings);
    }

    #[test]
    fn leaving_settings_disarms_reset() {
        let mut g = game();
        g.state.screen = Screen::Settings;
        g.handle_input(&InputEvent::Key('r'), 0.0);
        assert!(g.state.reset_armed);
        g.handle_input(&InputEvent::Key('t'), 0.0);
        assert!(!g.state.reset_armed);
    }

    #[test]
    fn y_without_arm_not_consumed() {
        let mut g = game();
        g.state.screen = Screen::Settings;
        assert!(!g.handle_input(&InputEvent::Key('y'), 0.0));
        assert_eq!(g.state.current_floor, 1);
    }

    #[test]
    fn click_tab_switches_screen() {
        let mut g = game();
        assert!(g.handle_input(&InputEvent::Click(actions::TAB_UPGRADES), 0.0));
        assert_eq!(g.state.screen, Screen::Upgrades);
    }

    #[test]
    fn click_level_up_and_toggle() {
        let mut g = game();
        g.state.resources.souls = 100;
        assert!(g.handle_input(&InputEvent::Click(actions::LEVEL_UP_BASE + 1), 0.0));
        assert_eq!(g.state.demons[1].level, 2);

        assert!(g.handle_input(&InputEvent::Click(actions::TOGGLE_PARTY_BASE + 3), 0.0));
        assert!(g.state.demons[3].in_party);
    }

    #[test]
    fn click_buy_upgrade() {
        let mut g = game();
        g.state.resources.gems = 50;
        assert!(g.handle_input(&InputEvent::Click(actions::BUY_UPGRADE_BASE), 0.0));
        assert!((g.state.upgrades.attack - 1.05).abs() < 1e-9);
    }

    #[test]
    fn click_out_of_range_indices_not_consumed() {
        let mut g = game();
        g.state.resources.souls = 10_000;
        g.state.resources.gems = 10_000;
        assert!(!g.handle_input(&InputEvent::Click(actions::LEVEL_UP_BASE + 50), 0.0));
        assert!(!g.handle_input(&InputEvent::Click(actions::BUY_UPGRADE_BASE + 9), 0.0));
        assert!(!g.handle_input(&InputEvent::Click(999), 0.0));
    }

    #[test]
    fn click_reset_requires_arming() {
        let mut g = game();
        g.state.resources.souls = 77;
        g.state.screen = Screen::Settings;
        assert!(!g.handle_input(&InputEvent::Click(actions::RESET_CONFIRM), 0.0));
        assert_eq!(g.state.resources.souls, 77);

        assert!(g.handle_input(&InputEvent::Click(actions::RESET_ARM), 0.0));
        assert!(g.handle_input(&InputEvent::Click(actions::RESET_CONFIRM), 0.0));
        assert_eq!(g.state.resources.souls, 0);
    }

    #[test]
    fn popup_eats_first_input() {
        let mut g = game();
        g.state.offline_report = Some(OfflineGains {
            elapsed_ms: 600_000,
            souls: 40,
            gems: 4,
            floors: 2,
        });
        // The key would normally switch screens; here it only dismisses.
        assert!(g.handle_input(&InputEvent::Key('d'), 0.0));
        assert_eq!(g.state.screen, Screen::Tower);
        assert!(g.state.offline_report.is_none());

        // Next input acts normally.
        assert!(g.handle_input(&InputEvent::Key('d'), 0.0));
        assert_eq!(g.state.screen, Screen::Demons);
    }

    #[test]
    fn frame_advances_battles() {
        let mut g = game();
        g.frame(20_000, 20_000.0);
        assert_eq!(g.state.current_floor, 2);
        assert_eq!(g.state.resources.souls, 10);
        assert_eq!(g.state.last_active_at, Some(20_000.0));
    }

    #[test]
    fn resume_replays_gap_and_queues_popup() {
        let mut g = game();
        // 10 minutes away at background speed: 15 attempts
        g.resume(600_000.0);
        assert!(g.state.current_floor > 1);
        let report = g.state.offline_report.expect("popup queued");
        assert_eq!(report.elapsed_ms, 600_000);
        assert!(report.souls > 0);
    }

    #[test]
    fn short_gap_skips_popup() {
        let mut g = game();
        // 2 minutes: progress happens but no popup
        g.resume(120_000.0);
        assert!(g.state.current_floor > 1);
        assert!(g.state.offline_report.is_none());
    }

    #[test]
    fn powerless_gap_skips_popup() {
        let mut g = game();
        for d in &mut g.state.demons {
            d.in_party = false;
        }
        g.resume(600_000.0);
        assert_eq!(g.state.current_floor, 1);
        assert!(g.state.offline_report.is_none());
    }
}
