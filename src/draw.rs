use chrono::{Local, Utc};
use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Paragraph, Tabs};
use tui::{Frame, Terminal};
use tui_logger::TuiLoggerWidget;

use crate::app::{App, MenuItem};
use crate::components::celebration::CelebrationOverlay;
use crate::components::celebration_frames::tier_style;
use crate::state::app_state::{EntryStep, FeedStatus, TradeStep};
use crate::state::messages::Directory;
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use cup_api::clock::{self, ClockRules};
use cup_api::phase::Phase;
use cup_api::timeline::card_counts;
use cup_api::{Fixture, Half, MatchEvent, TradeProposal, TradeStatus, compute_standings};

static TABS: &[&str; 5] = &["Fixtures", "Match", "Teams", "Standings", "Trade Wizard"];

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);

    terminal
        .draw(|f| {
            layout.update(f.area(), app.settings.full_screen);

            if !app.settings.full_screen {
                draw_tabs(f, layout.tab_bar, app);
                draw_status_line(f, layout.status, app);
            }

            let mut main = layout.main;
            if app.state.show_logs && main.height > 12 {
                let [rest, logs] =
                    Layout::vertical([Constraint::Fill(1), Constraint::Length(8)]).areas(main);
                main = rest;
                draw_log_pane(f, logs);
            }

            match app.state.active_tab {
                MenuItem::Fixtures => draw_fixtures(f, main, app),
                MenuItem::Match => draw_match(f, main, app),
                MenuItem::Teams => draw_teams(f, main, app),
                MenuItem::Standings => draw_standings(f, main, app),
                MenuItem::TradeWizard => draw_trade_wizard(f, main, app),
                MenuItem::Help => draw_help(f, main),
            }

            draw_celebration(f, f.area(), app);
            draw_loading_spinner(f, f.area(), app, loading);
        })
        .unwrap();
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_tabs(f: &mut Frame, tab_bar: [Rect; 2], app: &App) {
    let style = Style::default().fg(Color::White);
    let border_type = BorderType::Rounded;

    let tab_index = match app.state.active_tab {
        MenuItem::Fixtures => 0,
        MenuItem::Match => 1,
        MenuItem::Teams => 2,
        MenuItem::Standings => 3,
        MenuItem::TradeWizard => 4,
        MenuItem::Help => 0,
    };

    let titles: Vec<Line> = TABS.iter().map(|t| Line::from(*t)).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .highlight_style(Style::default().add_modifier(Modifier::UNDERLINED))
        .select(tab_index)
        .style(style);
    f.render_widget(tabs, tab_bar[0]);

    let help = Paragraph::new("Help: ? ")
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .style(style);
    f.render_widget(help, tab_bar[1]);
}

/// One-line strip under the main pane: feed health on the left, the signed-in
/// operator on the right, with the last error wedged between.
fn draw_status_line(f: &mut Frame, area: Rect, app: &App) {
    if area.height == 0 {
        return;
    }

    let who = if app.state.actor.email.is_empty() {
        "viewer".to_string()
    } else {
        format!("{} ({})", app.state.actor.email, app.state.actor.role.label())
    };
    let who_width = who.chars().count().min(48) as u16;
    let [left, right] =
        Layout::horizontal([Constraint::Fill(1), Constraint::Length(who_width)]).areas(area);

    let feed_color = match app.state.feed {
        FeedStatus::Connected => Color::Green,
        FeedStatus::Connecting | FeedStatus::Reconnecting => Color::Yellow,
        FeedStatus::Unavailable => Color::Red,
    };
    let mut spans = vec![
        Span::raw(" "),
        Span::styled(app.state.feed.label(), Style::default().fg(feed_color)),
    ];
    if let Some(err) = app.state.last_error.as_deref() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(err.to_string(), Style::default().fg(Color::Red)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), left);

    f.render_widget(
        Paragraph::new(who)
            .alignment(Alignment::Right)
            .style(Style::default().fg(Color::DarkGray)),
        right,
    );
}

fn draw_log_pane(f: &mut Frame, area: Rect) {
    let widget = TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Logs "))
        .style_error(Style::default().fg(Color::Red))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_info(Style::default().fg(Color::Gray))
        .style_debug(Style::default().fg(Color::DarkGray))
        .output_separator(' ')
        .output_timestamp(Some("%H:%M:%S".to_string()))
        .output_target(false)
        .output_file(false)
        .output_line(false);
    f.render_widget(widget, area);
}

fn draw_fixtures(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Fixtures ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.state.board.fixtures.is_empty() {
        let msg = if let Some(err) = app.state.last_error.as_deref() {
            format!("Board load failed:\n{err}")
        } else {
            "Loading fixtures...".to_string()
        };
        f.render_widget(
            Paragraph::new(msg)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            inner,
        );
        return;
    }

    let [header, key_legend, list] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(2),
        Constraint::Fill(1),
    ])
    .areas(inner);

    let board = &app.state.board;
    let rows = board.fixtures_in_view();

    let header_text = if board.view_stage == board.current_stage {
        format!("{}  |  {} fixtures", board.view_stage.label(), rows.len())
    } else {
        format!(
            "{}  |  {} fixtures  |  live play: {}",
            board.view_stage.label(),
            rows.len(),
            board.current_stage.label()
        )
    };
    f.render_widget(Paragraph::new(header_text), header);
    f.render_widget(
        Paragraph::new("Keys: h/l=stage  j/k=move  Enter=open match  ?=help  q=quit")
            .style(Style::default().fg(Color::DarkGray)),
        key_legend,
    );

    if rows.is_empty() {
        f.render_widget(
            Paragraph::new("No fixtures in this stage yet")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            list,
        );
        return;
    }

    let directory = &app.state.directory;
    let visible = list.height as usize;
    let offset = board.selected_fixture.saturating_sub(visible.saturating_sub(1));

    let mut lines = Vec::with_capacity(visible);
    for (idx, fixture) in rows.iter().enumerate().skip(offset).take(visible.max(1)) {
        let marker = if idx == board.selected_fixture { '>' } else { ' ' };
        let (a, b) = fixture.score;
        let middle = match fixture.phase() {
            Phase::Scheduled => "   vs  ".to_string(),
            _ => format!("{a:>2} - {b:<2}"),
        };
        let text = format!(
            "{marker} {} {middle} {}  ",
            truncate_name(&directory.team_name(&fixture.team_a), 18),
            truncate_name(&directory.team_name(&fixture.team_b), 18),
        );
        let badge = format!("[{}]", status_badge(fixture));
        let badge_style = match fixture.phase() {
            Phase::Live(_) => Style::default().fg(Color::Green),
            Phase::Paused(_) | Phase::HalfTime => Style::default().fg(Color::Yellow),
            Phase::Completed => Style::default().fg(Color::DarkGray),
            Phase::Scheduled => Style::default().fg(Color::Gray),
        };
        lines.push(Line::from(vec![
            Span::raw(text),
            Span::styled(badge, badge_style),
        ]));
    }
    f.render_widget(Paragraph::new(lines), list);
}

fn draw_match(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Match ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(fixture) = app.state.match_view.fixture.as_ref() else {
        let msg = if let Some(err) = app.state.last_error.as_deref() {
            format!("Match load failed:\n{err}")
        } else {
            "Select a fixture on the Fixtures tab and press Enter".to_string()
        };
        f.render_widget(
            Paragraph::new(msg)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            inner,
        );
        return;
    };

    let [header, body] =
        Layout::vertical([Constraint::Length(5), Constraint::Fill(1)]).areas(inner);

    let directory = &app.state.directory;
    let events = &app.state.match_view.events;
    let (a, b) = fixture.score;

    let mut status = format!("[{}]", status_badge(fixture));
    if let Some(venue) = fixture.venue.as_deref() {
        status.push_str("  ");
        status.push_str(venue);
    }

    let cards_a = card_counts(events, &fixture.team_a);
    let cards_b = card_counts(events, &fixture.team_b);
    let cards = format!(
        "cards  {} {}Y {}R   {} {}Y {}R",
        team_short(directory, &fixture.team_a),
        cards_a.yellow,
        cards_a.red,
        team_short(directory, &fixture.team_b),
        cards_b.yellow,
        cards_b.red,
    );

    let hint = if app.state.event_entry.is_active() {
        "j/k=move  Enter=choose  Esc=cancel"
    } else if app.state.actor.is_admin() {
        "s=start  p=pause  r=resume  t=half-time  e=end  g/o/y/x=events  j/k=scroll  Esc=back"
    } else {
        "j/k=scroll timeline  Esc=back"
    };

    let header_lines = vec![
        Line::from(vec![
            Span::styled(
                directory.team_name(&fixture.team_a),
                Style::default().fg(Color::White),
            ),
            Span::raw("  "),
            Span::styled(
                format!("{a} - {b}"),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                directory.team_name(&fixture.team_b),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(Span::styled(status, Style::default().fg(Color::Gray))),
        Line::from(Span::styled(cards, Style::default().fg(Color::DarkGray))),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))),
    ];
    f.render_widget(Paragraph::new(header_lines), header);

    if app.state.event_entry.is_active() {
        draw_event_entry(f, body, app);
    } else {
        draw_timeline(f, body, app);
    }
}

fn draw_timeline(f: &mut Frame, area: Rect, app: &App) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let view = &app.state.match_view;
    if view.events.is_empty() {
        f.render_widget(
            Paragraph::new("No events yet").style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    }

    let directory = &app.state.directory;
    let mut lines = Vec::new();
    lines.push(Line::from(Span::styled(
        "timeline, newest first",
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));

    let max_events = area.height.saturating_sub(2) as usize;
    let offset = view.scroll_offset as usize;
    for event in view.events.iter().rev().skip(offset).take(max_events.max(1)) {
        let style = if view.is_fresh(&event.id) {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };
        let text = event_line(event, directory);
        let clipped: String = text.chars().take(area.width.saturating_sub(1) as usize).collect();
        lines.push(Line::from(Span::styled(clipped, style)));
    }

    f.render_widget(Paragraph::new(lines), area);
}

fn event_line(event: &MatchEvent, directory: &Directory) -> String {
    let mut text = format!(
        "{:>3}' {}  {} ({})",
        event.minute,
        event.kind.label(),
        directory.player_name(&event.player_id),
        team_short(directory, &event.team_id),
    );
    if let Some(assist) = event.assist_player_id.as_deref() {
        text.push_str("  assist ");
        text.push_str(&directory.player_name(assist));
    }
    text
}

fn draw_event_entry(f: &mut Frame, area: Rect, app: &App) {
    let entry = &app.state.event_entry;
    let (Some(kind), Some(step)) = (entry.kind, entry.step()) else {
        return;
    };

    let block = default_border(Color::Yellow).title(format!(" {} ", kind.label()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let prompt = match step {
        EntryStep::Team => "Pick the team",
        EntryStep::Player => "Pick the player",
        EntryStep::Assist => "Pick the assist, or n for none",
    };

    let mut lines = Vec::new();
    lines.push(Line::from(prompt));
    lines.push(Line::from(""));

    let options = app.event_entry_options();
    let visible = inner.height.saturating_sub(2) as usize;
    let offset = entry.selected.saturating_sub(visible.saturating_sub(1));
    for (idx, (_, label)) in options.iter().enumerate().skip(offset).take(visible.max(1)) {
        let marker = if idx == entry.selected { '>' } else { ' ' };
        let style = if idx == entry.selected {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(Span::styled(format!("{marker} {label}"), style)));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_teams(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Teams ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.state.directory.teams.is_empty() {
        f.render_widget(
            Paragraph::new("Loading teams...")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            inner,
        );
        return;
    }

    let mut body = inner;
    if app.state.teams.prompting_crest && inner.height > 5 {
        let [rest, input_area] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(3)]).areas(inner);
        body = rest;
        draw_crest_prompt(f, input_area, app);
    }

    if body.width < 40 {
        draw_roster(f, body, app);
        return;
    }

    let [roster_area, trades_area] =
        Layout::horizontal([Constraint::Percentage(58), Constraint::Percentage(42)]).areas(body);
    draw_roster(f, roster_area, app);
    draw_trades(f, trades_area, app);
}

fn draw_roster(f: &mut Frame, area: Rect, app: &App) {
    let teams = &app.state.teams;
    let directory = &app.state.directory;
    let Some(team) = directory.teams.get(teams.selected_team) else {
        return;
    };

    let block = default_border(Color::DarkGray).title(format!(" {} ", team.name));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = Vec::new();
    lines.push(Line::from(format!(
        "{} of {}  |  group {}  |  {}",
        teams.selected_team + 1,
        directory.teams.len(),
        team.group.as_deref().unwrap_or("-"),
        team.short_name,
    )));
    lines.push(Line::from(Span::styled(
        team.crest_url.as_deref().unwrap_or("no crest uploaded").to_string(),
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(Span::styled(
        "h/l=team  j/k=roster  u=crest  T=trade wizard",
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));

    let roster = directory.roster(&team.id);
    let visible = inner.height.saturating_sub(lines.len() as u16) as usize;
    for player in roster.iter().skip(teams.roster_scroll as usize).take(visible.max(1)) {
        let shirt = player.shirt_number.map_or("--".to_string(), |n| format!("{n:>2}"));
        lines.push(Line::from(vec![
            Span::styled(format!("{:<7}", player.rank.label()), tier_style(player.rank)),
            Span::raw(format!(
                " {shirt}  {} {}",
                player.name,
                player.position.as_deref().unwrap_or(""),
            )),
        ]));
    }
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_trades(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::DarkGray).title(" Trades ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let teams = &app.state.teams;
    let directory = &app.state.directory;

    if teams.trades.is_empty() {
        f.render_widget(
            Paragraph::new("No trades for this team")
                .style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    let mut lines = Vec::new();
    lines.push(Line::from(Span::styled(
        "J/K=select  a=accept  x=reject",
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));

    // Pending first with the cursor, resolved history dimmed below.
    for (idx, trade) in teams.pending_trades().iter().enumerate() {
        let marker = if idx == teams.selected_trade { '>' } else { ' ' };
        lines.push(Line::from(Span::styled(
            clip(&trade_line(marker, trade, directory), inner.width),
            Style::default().fg(Color::White),
        )));
    }
    for trade in teams.trades.iter().filter(|t| t.status != TradeStatus::Pending) {
        let color = match trade.status {
            TradeStatus::Accepted => Color::Green,
            _ => Color::DarkGray,
        };
        lines.push(Line::from(Span::styled(
            clip(&trade_line(' ', trade, directory), inner.width),
            Style::default().fg(color),
        )));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

fn trade_line(marker: char, trade: &TradeProposal, directory: &Directory) -> String {
    format!(
        "{marker} {} ({}) for {} ({})  [{}]",
        directory.player_name(&trade.offered_player),
        team_short(directory, &trade.from_team),
        directory.player_name(&trade.requested_player),
        team_short(directory, &trade.to_team),
        trade.status.label(),
    )
}

fn draw_crest_prompt(f: &mut Frame, area: Rect, app: &App) {
    let input_block = default_border(Color::DarkGray).title(" crest path ");
    let input_inner = input_block.inner(area);
    f.render_widget(input_block, area);
    f.render_widget(
        Paragraph::new(format!("> {}_", app.state.teams.crest_input))
            .style(Style::default().fg(Color::Yellow)),
        input_inner,
    );
}

fn draw_standings(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Standings ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let directory = &app.state.directory;
    if directory.teams.is_empty() {
        f.render_widget(
            Paragraph::new("No teams loaded. Return to Fixtures tab.")
                .style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    let table = compute_standings(&app.state.board.fixtures, &directory.teams);

    let mut lines = Vec::with_capacity(table.len() + 3);
    lines.push("Group stage  |  win 3  draw 1  loss 0".to_string());
    lines.push(format!(
        "    {:<22} {:>2} {:>2} {:>2} {:>2} {:>3} {:>3} {:>4} {:>4}",
        "team", "P", "W", "D", "L", "GF", "GA", "GD", "PTS"
    ));
    lines.push(String::new());

    let offset = app.state.standings.scroll_offset as usize;
    for (idx, row) in table.iter().enumerate().skip(offset) {
        lines.push(format!(
            "{:>2}. {} {:>2} {:>2} {:>2} {:>2} {:>3} {:>3} {:>+4} {:>4}",
            idx + 1,
            truncate_name(&row.team_name, 22),
            row.played,
            row.won,
            row.drawn,
            row.lost,
            row.goals_for,
            row.goals_against,
            row.goal_diff(),
            row.points,
        ));
    }

    f.render_widget(Paragraph::new(lines.join("\n")), inner);
}

fn draw_trade_wizard(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Trade Wizard ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let wizard = &app.state.trade_wizard;
    let directory = &app.state.directory;

    let Some(from_team) = wizard.draft.from_team.as_deref() else {
        f.render_widget(
            Paragraph::new("Pick a team on the Teams tab, then press T to open the wizard.")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            inner,
        );
        return;
    };

    let (step_number, prompt) = match wizard.step {
        TradeStep::OfferedPlayer => (1, "Which player are you offering?"),
        TradeStep::CounterpartyTeam => (2, "Which team are you trading with?"),
        TradeStep::RequestedPlayer => (3, "Which of their players do you want back?"),
        TradeStep::Confirm => (4, "Review the proposal"),
    };

    let mut lines = Vec::new();
    lines.push(Line::from(format!(
        "Proposing for {}  |  step {step_number}/4",
        directory.team_name(from_team)
    )));
    lines.push(Line::from(Span::styled(
        "j/k=move  Enter=choose  Esc=back",
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(prompt));
    lines.push(Line::from(""));

    if wizard.step == TradeStep::Confirm {
        let offered = wizard
            .draft
            .offered_player
            .as_deref()
            .map_or_else(String::new, |id| directory.player_name(id));
        let requested = wizard
            .draft
            .requested_player
            .as_deref()
            .map_or_else(String::new, |id| directory.player_name(id));
        let to_team = wizard
            .draft
            .to_team
            .as_deref()
            .map_or_else(String::new, |id| directory.team_name(id));
        lines.push(Line::from(format!("  Offer    {offered}")));
        lines.push(Line::from(format!("  Receive  {requested} from {to_team}")));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "y = submit   n = start over",
            Style::default().fg(Color::Green),
        )));
    } else {
        let options = app.wizard_options();
        if options.is_empty() {
            lines.push(Line::from(Span::styled(
                "No options available",
                Style::default().fg(Color::DarkGray),
            )));
        }
        let visible = inner.height.saturating_sub(5) as usize;
        let offset = wizard.selected.saturating_sub(visible.saturating_sub(1));
        for (idx, (_, label)) in options.iter().enumerate().skip(offset).take(visible.max(1)) {
            let marker = if idx == wizard.selected { '>' } else { ' ' };
            let style = if idx == wizard.selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            lines.push(Line::from(Span::styled(format!("{marker} {label}"), style)));
        }
    }

    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let block = default_border(Color::DarkGray).title(" Help ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let text = "\
Tabs        1=Fixtures  2=Match  3=Teams  4=Standings  5=Trade Wizard  ?=help
Global      q/Ctrl-C=quit  R=refresh everything  f=full-screen  \"=log pane
Fixtures    h/l=stage  j/k=move  Enter=open match
Match       j/k=scroll timeline  Esc=back to fixtures
Match ops   s=kickoff or second half  p=pause  r=resume  t=half-time  e=end (admin)
Events      g=goal  o=own goal  y=yellow card  x=red card (admin)
Teams       h/l=team  j/k=roster  J/K=trade  a=accept  x=reject  u=crest  T=wizard
Standings   j/k=scroll
Wizard      j/k=move  Enter=choose  Esc=back  y=submit  n=start over";

    f.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::Gray)),
        inner,
    );
}

fn draw_celebration(f: &mut Frame, area: Rect, app: &App) {
    let Some(celebration) = app.state.celebration.current.as_ref() else {
        return;
    };
    let width = area.width.min(64);
    let height = area.height.min(11);
    let overlay = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    );
    f.render_widget(
        CelebrationOverlay {
            celebration,
            frame: app.state.animation.frame,
            tick: app.state.animation.tick,
        },
        overlay,
    );
}

fn draw_loading_spinner(f: &mut Frame, area: Rect, app: &App, loading: LoadingState) {
    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner = Paragraph::new(loading.spinner_char.to_string())
        .alignment(Alignment::Right)
        .style(style);
    let area = if app.settings.full_screen {
        Rect::new(area.width.saturating_sub(3), area.height.saturating_sub(2), 1, 1)
    } else {
        Rect::new(area.width.saturating_sub(11), 1, 1, 1)
    };
    f.render_widget(spinner, area);
}

/// The badge shown beside a fixture, derived from its timing fields.
fn status_badge(fixture: &Fixture) -> String {
    match fixture.phase() {
        Phase::Scheduled => fixture
            .kickoff_at
            .map(|t| t.with_timezone(&Local).format("%m/%d %H:%M").to_string())
            .unwrap_or_else(|| "TBD".to_string()),
        Phase::Live(half) => format!(
            "LIVE {} {}'",
            ordinal(half),
            clock::minute_number(fixture, Utc::now(), ClockRules::default()).unwrap_or(0),
        ),
        Phase::Paused(half) => format!("PAUSED {}", ordinal(half)),
        Phase::HalfTime => "HT".to_string(),
        Phase::Completed => "FT".to_string(),
    }
}

fn ordinal(half: Half) -> &'static str {
    match half {
        Half::First => "1st",
        Half::Second => "2nd",
    }
}

fn team_short(directory: &Directory, team_id: &str) -> String {
    directory
        .team(team_id)
        .map(|t| t.short_name.clone())
        .unwrap_or_else(|| team_id.to_string())
}

fn truncate_name(name: &str, max: usize) -> String {
    let mut s: String = name.chars().take(max).collect();
    while s.chars().count() < max {
        s.push(' ');
    }
    s
}

fn clip(text: &str, width: u16) -> String {
    text.chars().take(width.saturating_sub(1) as usize).collect()
}
