use cup_api::RankTier;
use tui::style::{Color, Modifier, Style};

pub const FRAME_COUNT: usize = 4;

/// Accent style for the scorer's rank tier; borders and headline of the
/// goal overlay pick it up so a Legend goal reads louder than a Bronze one.
pub fn tier_style(tier: RankTier) -> Style {
    match tier {
        RankTier::Legend => Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        RankTier::Gold => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        RankTier::Silver => Style::default().fg(Color::Rgb(192, 192, 192)),
        RankTier::Bronze => Style::default().fg(Color::Rgb(205, 127, 50)),
    }
}

pub fn dim() -> Style {
    Style::default().fg(Color::Indexed(240))
}

/// Vertical bounce position: a triangle wave over `height` rows.
pub fn bounce_row(tick: u64, height: u16) -> u16 {
    if height == 0 {
        return 0;
    }
    let h = u64::from(height.saturating_sub(1));
    if h == 0 {
        return 0;
    }
    let period = 2 * h;
    let t = tick % period;
    (h.abs_diff(t)) as u16
}

pub fn ball_frame(frame: usize) -> [&'static str; 4] {
    const FRAMES: [[&str; 4]; FRAME_COUNT] = [
        ["  ,-.  ", " ( o ) ", " (   ) ", "  `-'  "],
        ["  ,-.  ", " (  o) ", " (   ) ", "  `-'  "],
        ["  ,-.  ", " (   ) ", " (  o) ", "  `-'  "],
        ["  ,-.  ", " (   ) ", " ( o ) ", "  `-'  "],
    ];
    FRAMES[frame % FRAME_COUNT]
}

pub fn goal_rows() -> [&'static str; 4] {
    [
        " ___    ___     _    _     _ ",
        "/ __|  / _ \\   /_\\  | |   | |",
        "| (_ || (_) | / _ \\ | |__ |_|",
        " \\___| \\___/ /_/ \\_\\|____|(_)",
    ]
}
