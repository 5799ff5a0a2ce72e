//! 魔王の塔 rendering (read-only from state).

use std::cell::RefCell;
use std::rc::Rc;

use ratzilla::ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratzilla::ratatui::style::{Color, Modifier, Style};
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratzilla::ratatui::Frame;

use crate::input::{is_narrow_layout, ClickState};
use crate::widgets::{ClickableList, TabBar};

use super::actions::*;
use super::balance::{self, FLOOR_CLEAR_TIME_MS, PARTY_CAP};
use super::state::{Screen, TowerState, UpgradeKind};

pub fn render(
    state: &TowerState,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    // Side log panel only when there is room for it
    let (main_area, log_area) = if area.width >= 80 {
        let h_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);
        (h_chunks[0], Some(h_chunks[1]))
    } else {
        (area, None)
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // header
            Constraint::Length(1), // tab bar
            Constraint::Min(5),    // content
        ])
        .split(main_area);

    render_header(state, f, chunks[0]);
    render_tab_bar(state, f, chunks[1], click_state);

    match state.screen {
        Screen::Tower => render_tower(state, f, chunks[2], log_area.is_none()),
        Screen::Demons => render_demons(state, f, chunks[2], click_state),
        Screen::Upgrades => render_upgrades(state, f, chunks[2], click_state),
        Screen::Settings => render_settings(state, f, chunks[2], click_state),
    }

    if let Some(log_area) = log_area {
        render_log(state, f, log_area);
    }

    if let Some(report) = &state.offline_report {
        render_offline_popup(report, f, area, click_state);
    }
}

// ── Header ─────────────────────────────────────────────────────

fn render_header(state: &TowerState, f: &mut Frame, area: Rect) {
    let is_narrow = is_narrow_layout(area.width);
    let borders = if is_narrow {
        Borders::TOP | Borders::BOTTOM
    } else {
        Borders::ALL
    };
    let title = if is_narrow {
        " 魔王の塔 "
    } else {
        " 魔王の塔 - Tower of Demonlord "
    };

    let power = balance::party_power(&state.demons, &state.upgrades);

    let lines = vec![
        Line::from(vec![
            Span::styled(" 魂: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", state.resources.souls),
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("  ジェム: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", state.resources.gems),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled(" フロア: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", state.current_floor),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" (最高 {})", state.max_reached_floor),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled("  戦力: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:.0}", power),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
        ]),
    ];

    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(Color::Magenta))
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

// ── Tab bar ────────────────────────────────────────────────────

fn render_tab_bar(
    state: &TowerState,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let active = match state.screen {
        Screen::Tower => 0,
        Screen::Demons => 1,
        Screen::Upgrades => 2,
        Screen::Settings => 3,
    };
    let tab_style = |idx: usize, color: Color| -> Style {
        if idx == active {
            Style::default()
                .fg(Color::Black)
                .bg(color)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(color)
        }
    };

    let mut cs = click_state.borrow_mut();
    TabBar::new("│")
        .tab("[t]塔", tab_style(0, Color::Yellow), TAB_TOWER)
        .tab("[d]悪魔", tab_style(1, Color::Red), TAB_DEMONS)
        .tab("[u]強化", tab_style(2, Color::Cyan), TAB_UPGRADES)
        .tab("[s]設定", tab_style(3, Color::Gray), TAB_SETTINGS)
        .render(f, area, &mut cs);
}

// ── Tower screen ───────────────────────────────────────────────

fn render_tower(state: &TowerState, f: &mut Frame, area: Rect, inline_log: bool) {
    let (battle_area, log_area) = if inline_log && area.height > 10 {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(8), Constraint::Min(3)])
            .split(area);
        (chunks[0], Some(chunks[1]))
    } else {
        (area, None)
    };

    let info = balance::floor_info(state.current_floor);
    let rewards = balance::floor_rewards(&info, &state.upgrades);
    let power = balance::party_power(&state.demons, &state.upgrades);

    let (verdict, verdict_style) = if power >= info.difficulty as f64 {
        (
            "勝てる！".to_string(),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    } else if power > 0.0 {
        (
            format!("力不足 (報酬{:.0}%)", balance::PARTIAL_REWARD_RATE * 100.0),
            Style::default().fg(Color::Yellow),
        )
    } else {
        (
            "パーティが空だ…".to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    };

    // Progress toward the next battle resolution
    let bar_width = (battle_area.width.saturating_sub(14) as usize).clamp(8, 30);
    let frac = (state.pending_battle_ms as f64 / FLOOR_CLEAR_TIME_MS as f64).clamp(0.0, 1.0);
    let filled = (frac * bar_width as f64).round() as usize;
    let bar: String = "█".repeat(filled) + &"░".repeat(bar_width - filled);

    let lines = vec![
        Line::from(vec![
            Span::styled(
                format!(" フロア {} ", info.number),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("難易度 {}", info.difficulty),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled(" 戦力 ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:.0}", power),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::styled("  → ", Style::default().fg(Color::DarkGray)),
            Span::styled(verdict, verdict_style),
        ]),
        Line::from(vec![
            Span::styled(" 戦闘 ", Style::default().fg(Color::Gray)),
            Span::styled(bar, Style::default().fg(Color::Red)),
            Span::styled(
                format!(
                    " {:>2}s",
                    (FLOOR_CLEAR_TIME_MS.saturating_sub(state.pending_battle_ms)) / 1000
                ),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(vec![
            Span::styled(" 報酬 ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("魂 {} ", rewards.souls),
                Style::default().fg(Color::Magenta),
            ),
            Span::styled(
                format!("ジェム {}", rewards.gems),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        Line::from(Span::styled(
            format!(" 編成 {}/{} 体で自動戦闘中", state.party_count(), PARTY_CAP),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" 塔 ");
    f.render_widget(Paragraph::new(lines).block(block), battle_area);

    if let Some(log_area) = log_area {
        render_log(state, f, log_area);
    }
}

// ── Demons screen ──────────────────────────────────────────────

fn render_demons(
    state: &TowerState,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let mut cl = ClickableList::new();

    cl.push(Line::from(Span::styled(
        format!(" 編成 {}/{}", state.party_count(), PARTY_CAP),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )));

    for (i, demon) in state.demons.iter().enumerate().take(9) {
        let power = balance::demon_power(demon, &state.upgrades);
        let cost = balance::level_up_cost(demon.level);
        let level_key = (b'1' + i as u8) as char;
        let toggle_key = (b'a' + i as u8) as char;

        let party_marker = if demon.in_party {
            Span::styled("★", Style::default().fg(Color::Yellow))
        } else {
            Span::styled("・", Style::default().fg(Color::DarkGray))
        };
        cl.push(Line::from(vec![
            Span::styled(" ", Style::default()),
            party_marker,
            Span::styled(
                format!("{} ", demon.name),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("Lv.{} ", demon.level),
                Style::default().fg(Color::Green),
            ),
            Span::styled(
                format!("{}/{} ", demon.role.name(), demon.rarity.name()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                format!("戦力{:.0}", power),
                Style::default().fg(Color::Red),
            ),
        ]));

        let affordable = state.resources.souls >= cost;
        let level_style = if affordable {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        cl.push_clickable(
            Line::from(Span::styled(
                format!("   [{}] レベルアップ ({} 魂)", level_key, cost),
                level_style,
            )),
            LEVEL_UP_BASE + i as u16,
        );

        let toggle_label = if demon.in_party {
            format!("   [{}] パーティから外す", toggle_key)
        } else if state.party_count() >= PARTY_CAP {
            format!("   [{}] 編成に入れる (満員)", toggle_key)
        } else {
            format!("   [{}] 編成に入れる", toggle_key)
        };
        let toggle_style = if !demon.in_party && state.party_count() >= PARTY_CAP {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Cyan)
        };
        cl.push_clickable(
            Line::from(Span::styled(toggle_label, toggle_style)),
            TOGGLE_PARTY_BASE + i as u16,
        );
    }

    let mut cs = click_state.borrow_mut();
    cl.register_targets(area, &mut cs, 1, 1);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" 悪魔 ");
    f.render_widget(Paragraph::new(cl.into_lines()).block(block), area);
}

// ── Upgrades screen ────────────────────────────────────────────

fn render_upgrades(
    state: &TowerState,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let mut cl = ClickableList::new();

    cl.push(Line::from(vec![
        Span::styled(" 所持ジェム: ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{}", state.resources.gems),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    ]));

    for (i, kind) in UpgradeKind::all().iter().enumerate() {
        let current = state.upgrades.get(*kind);
        let cost = balance::upgrade_cost(current);
        let affordable = state.resources.gems >= cost;

        let style = if affordable {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let key_style = if affordable {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        cl.push_clickable(
            Line::from(vec![
                Span::styled(format!(" [{}] ", kind.key()), key_style),
                Span::styled(
                    format!("{} x{:.2} → x{:.2} ", kind.name(), current, current + 0.05),
                    style,
                ),
                Span::styled(
                    format!("({} ジェム)", cost),
                    if affordable {
                        Style::default().fg(Color::Cyan)
                    } else {
                        Style::default().fg(Color::DarkGray)
                    },
                ),
            ]),
            BUY_UPGRADE_BASE + i as u16,
        );
    }

    cl.push(Line::from(""));
    cl.push(Line::from(Span::styled(
        " 攻撃/防御は戦力、獲得系はフロア報酬に効く。",
        Style::default().fg(Color::DarkGray),
    )));

    let mut cs = click_state.borrow_mut();
    cl.register_targets(area, &mut cs, 1, 1);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" 強化 ");
    f.render_widget(Paragraph::new(cl.into_lines()).block(block), area);
}

// ── Settings screen ────────────────────────────────────────────

fn render_settings(
    state: &TowerState,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let mut cl = ClickableList::new();

    cl.push(Line::from(Span::styled(
        format!(" 最高到達フロア: {}", state.max_reached_floor),
        Style::default().fg(Color::White),
    )));
    cl.push(Line::from(Span::styled(
        " 進行は30秒ごと、および操作のたびに自動保存される。",
        Style::default().fg(Color::DarkGray),
    )));
    cl.push(Line::from(""));

    if state.reset_armed {
        cl.push(Line::from(Span::styled(
            " 本当に最初からやり直す？進行は全て失われる。",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        cl.push_clickable(
            Line::from(Span::styled(
                " [y] リセットする",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            RESET_CONFIRM,
        );
        cl.push_clickable(
            Line::from(Span::styled(
                " [n] やめておく",
                Style::default().fg(Color::Green),
            )),
            RESET_CANCEL,
        );
    } else {
        cl.push_clickable(
            Line::from(Span::styled(
                " [r] セーブデータをリセット",
                Style::default().fg(Color::Red),
            )),
            RESET_ARM,
        );
    }

    let mut cs = click_state.borrow_mut();
    cl.register_targets(area, &mut cs, 1, 1);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray))
        .title(" 設定 ");
    f.render_widget(Paragraph::new(cl.into_lines()).block(block), area);
}

// ── Log panel ──────────────────────────────────────────────────

fn render_log(state: &TowerState, f: &mut Frame, area: Rect) {
    let visible_height = area.height.saturating_sub(2) as usize;

    // Newest entries first
    let log_lines: Vec<Line> = state
        .log
        .iter()
        .rev()
        .take(visible_height)
        .enumerate()
        .map(|(i, entry)| {
            let is_recent = i < 3;
            let style = if entry.is_important {
                if is_recent {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Yellow)
                }
            } else if is_recent {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Line::from(Span::styled(&entry.text, style))
        })
        .collect();

    let widget = Paragraph::new(log_lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue))
                .title(" 記録 "),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

// ── Offline popup ──────────────────────────────────────────────

fn format_away_time(ms: u64) -> String {
    let minutes = ms / 60_000;
    if minutes >= 60 {
        format!("{}時間{}分", minutes / 60, minutes % 60)
    } else {
        format!("{}分", minutes)
    }
}

fn render_offline_popup(
    report: &super::state::OfflineGains,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let width = area.width.clamp(20, 44).min(area.width);
    let height = 8u16.min(area.height);
    let popup = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    );

    let lines = vec![
        Line::from(Span::styled(
            format!(" {} の留守中も悪魔たちは戦っていた。", format_away_time(report.elapsed_ms)),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(" 魂 ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("+{}", report.souls),
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("  ジェム ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("+{}", report.gems),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("  フロア ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("+{}", report.floors),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            " クリックかキーで閉じる",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    f.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            " おかえりなさい ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), popup);

    // The popup swallows every click while it is up.
    let mut cs = click_state.borrow_mut();
    cs.add_click_target(area, DISMISS_POPUP);
}
