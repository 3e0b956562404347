use crate::components::celebration_frames::{
    ball_frame, bounce_row, dim, goal_rows, tier_style,
};
use crate::state::dispatcher::CelebrationTrigger;
use cup_api::EventKind;
use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Clear, Widget};

pub use crate::components::celebration_frames::FRAME_COUNT;

/// Goal overlay, drawn above whatever tab is active while a celebration
/// is showing. Auto-dismisses from the animation tick; Esc closes it early.
pub struct CelebrationOverlay<'a> {
    pub celebration: &'a CelebrationTrigger,
    pub frame: usize,
    pub tick: u64,
}

impl Widget for CelebrationOverlay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);
        let accent = tier_style(self.celebration.player_rank);

        if area.width < 40 || area.height < 9 {
            let text = format!(
                " GOAL! {} {}' ",
                self.celebration.player_name, self.celebration.minute
            );
            render_centered(
                Line::from(Span::styled(text, accent)),
                area,
                area.y + area.height / 2,
                buf,
            );
            return;
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(accent)
            .title(format!(" {} ", self.celebration.player_rank.label()));
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        render_art(&self, accent, inner, buf);

        let scorer = format!(
            "{} {}'  ({})",
            self.celebration.player_name, self.celebration.minute, self.celebration.team_name
        );
        if inner.height > 5 {
            render_centered(
                Line::from(Span::styled(
                    scorer,
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                )),
                inner,
                inner.y + 5,
                buf,
            );
        }
        if inner.height > 6 {
            let detail = match (self.celebration.kind, &self.celebration.assist_name) {
                (EventKind::OwnGoal, _) => "(own goal)".to_string(),
                (_, Some(assist)) => format!("assist {assist}"),
                (_, None) => String::new(),
            };
            if !detail.is_empty() {
                render_centered(Line::from(Span::styled(detail, dim())), inner, inner.y + 6, buf);
            }
        }
    }
}

fn render_art(overlay: &CelebrationOverlay, accent: Style, inner: Rect, buf: &mut Buffer) {
    let art = goal_rows();
    let left_ball = ball_frame(overlay.frame);
    let right_ball = ball_frame((overlay.frame + 2) % FRAME_COUNT);
    let ball_y = bounce_row(overlay.tick, 4);
    let show_balls = inner.width >= 50;

    for row in 0..4u16 {
        if row >= inner.height {
            break;
        }
        let y = inner.y + row;
        let ball_style = if row == ball_y { accent } else { dim() };

        let mut spans = Vec::new();
        if show_balls {
            spans.push(Span::styled(left_ball[row as usize].to_string(), ball_style));
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(art[row as usize].to_string(), accent));
        if show_balls {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(right_ball[row as usize].to_string(), ball_style));
        }
        render_centered(Line::from(spans), inner, y, buf);
    }
}

fn render_centered(line: Line, area: Rect, y: u16, buf: &mut Buffer) {
    if y >= area.y + area.height {
        return;
    }
    let width = line.width() as u16;
    let x = area.x + area.width.saturating_sub(width) / 2;
    buf.set_line(x, y, &line, area.right().saturating_sub(x));
}
