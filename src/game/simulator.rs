//! Balance simulator for the tower game.
//! Run with: cargo test simulate_greedy -- --nocapture

#[cfg(test)]
mod tests {
    use crate::game::balance;
    use crate::game::logic::{self, BattleMode};
    use crate::game::state::{TowerState, UpgradeKind};

    /// Buy the cheapest available level-up among party members, repeatedly.
    fn spend_souls(state: &mut TowerState) -> u32 {
        let mut bought = 0;
        loop {
            let cheapest = state
                .demons
                .iter()
                .filter(|d| d.in_party)
                .min_by_key(|d| balance::level_up_cost(d.level))
                .map(|d| d.id.clone());
            let Some(id) = cheapest else { break };
            if !logic::level_up_demon(state, &id) {
                break;
            }
            bought += 1;
        }
        bought
    }

    /// Gems: push power upgrades while the next floor is out of reach,
    /// otherwise grow income.
    fn spend_gems(state: &mut TowerState) -> u32 {
        let mut bought = 0;
        loop {
            let info = balance::floor_info(state.current_floor);
            let power = balance::party_power(&state.demons, &state.upgrades);
            let stuck = power < info.difficulty as f64;

            let candidates: &[UpgradeKind] = if stuck {
                &[UpgradeKind::Attack, UpgradeKind::Defense]
            } else {
                &[UpgradeKind::SoulGain, UpgradeKind::GemGain]
            };
            let pick = candidates
                .iter()
                .min_by_key(|k| balance::upgrade_cost(state.upgrades.get(**k)))
                .copied();
            let Some(kind) = pick else { break };
            if !logic::buy_upgrade(state, kind) {
                break;
            }
            bought += 1;
        }
        bought
    }

    fn report_stats(state: &TowerState, minutes: u64, purchases: u32) {
        let info = balance::floor_info(state.current_floor);
        let power = balance::party_power(&state.demons, &state.upgrades);

        eprintln!("┌─── {}分 ─────────────────────────", minutes);
        eprintln!(
            "│ フロア: {} (最高 {})  戦力: {:.0} / 難易度 {}",
            state.current_floor, state.max_reached_floor, power, info.difficulty
        );
        eprintln!(
            "│ 魂: {}  ジェム: {}  購入: {}回",
            state.resources.souls, state.resources.gems, purchases
        );

        let levels: Vec<String> = state
            .demons
            .iter()
            .map(|d| {
                let marker = if d.in_party { "★" } else { "・" };
                format!("{}{}:Lv{}", marker, d.name, d.level)
            })
            .collect();
        eprintln!("│ 悪魔: {}", levels.join("  "));
        eprintln!(
            "│ 倍率: 攻x{:.2} 防x{:.2} 魂x{:.2} 宝x{:.2}",
            state.upgrades.attack,
            state.upgrades.defense,
            state.upgrades.soul_gain,
            state.upgrades.gem_gain
        );
        eprintln!("└────────────────────────────────────");
    }

    /// Simulate greedy idle play for `total_minutes` of foreground time.
    fn simulate(total_minutes: u64) {
        let mut state = TowerState::new(0.0);
        // The fourth demon joins as soon as a slot matters
        logic::toggle_party(&mut state, "goblin-farmer");

        let step_ms = balance::FLOOR_CLEAR_TIME_MS;
        let steps = total_minutes * 60_000 / step_ms;

        let report_minutes: Vec<u64> = vec![1, 5, 15, 30, 60, 120, 240, 480];
        let mut next_report_idx = 0;

        let mut purchases: u32 = 0;
        let mut stuck_floor = 0u32;
        let mut stuck_steps = 0u64;
        let mut max_stuck_minutes = 0u64;

        eprintln!("\n========================================");
        eprintln!("  魔王の塔 バランスシミュレーター");
        eprintln!("  プレイ時間: {}分 (前面進行のみ)", total_minutes);
        eprintln!("========================================\n");

        for step in 1..=steps {
            let now = (step * step_ms) as f64;
            logic::advance(&mut state, step_ms, BattleMode::Foreground, now);

            purchases += spend_souls(&mut state);
            purchases += spend_gems(&mut state);

            // Track how long we sit on one floor
            if state.current_floor == stuck_floor {
                stuck_steps += 1;
                let stuck_minutes = stuck_steps * step_ms / 60_000;
                if stuck_minutes > max_stuck_minutes {
                    max_stuck_minutes = stuck_minutes;
                }
            } else {
                stuck_floor = state.current_floor;
                stuck_steps = 0;
            }

            let minutes = step * step_ms / 60_000;
            if next_report_idx < report_minutes.len() && minutes >= report_minutes[next_report_idx]
            {
                report_stats(&state, minutes, purchases);
                next_report_idx += 1;
            }
        }

        eprintln!("\n======== 最終サマリー ========");
        report_stats(&state, total_minutes, purchases);
        eprintln!("最長足止め: {}分 (フロア{})", max_stuck_minutes, stuck_floor);
        eprintln!("==============================\n");
    }

    #[test]
    fn simulate_greedy_1hour() {
        simulate(60);
    }

    #[test]
    fn simulate_greedy_8hours() {
        simulate(480);
    }
}
