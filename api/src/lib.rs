pub mod client;
pub mod clock;
pub mod phase;
pub mod realtime;
pub mod rest;
pub mod timeline;

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Domain types, independent of the backend wire format
// ---------------------------------------------------------------------------

/// Everything the client needs to boot a tournament view. Also the shape of
/// the offline snapshot file.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub fixtures: Vec<Fixture>,
    pub teams: Vec<Team>,
    pub players: Vec<Player>,
}

impl Snapshot {
    pub fn find_fixture_mut(&mut self, fixture_id: &str) -> Option<&mut Fixture> {
        self.fixtures.iter_mut().find(|f| f.id == fixture_id)
    }

    /// Merge refreshed fixture rows (from a poll or the live feed) in place.
    pub fn merge_updates(&mut self, updates: Vec<Fixture>) {
        for update in updates {
            if let Some(fixture) = self.find_fixture_mut(&update.id) {
                *fixture = update;
            }
        }
    }
}

/// Navigation axis for the fixtures board. Ordered from earliest to latest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    #[default]
    Group,
    Quarter,
    Semi,
    Final,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Group => "Group Stage",
            Stage::Quarter => "Quarter-finals",
            Stage::Semi => "Semi-finals",
            Stage::Final => "Final",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Group => "group",
            Stage::Quarter => "quarter",
            Stage::Semi => "semi",
            Stage::Final => "final",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "group" => Some(Stage::Group),
            "quarter" => Some(Stage::Quarter),
            "semi" => Some(Stage::Semi),
            "final" => Some(Stage::Final),
            _ => None,
        }
    }

    pub fn is_knockout(&self) -> bool {
        !matches!(self, Stage::Group)
    }

    pub fn prev(self) -> Option<Self> {
        match self {
            Stage::Group => None,
            Stage::Quarter => Some(Stage::Group),
            Stage::Semi => Some(Stage::Quarter),
            Stage::Final => Some(Stage::Semi),
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Stage::Group => Some(Stage::Quarter),
            Stage::Quarter => Some(Stage::Semi),
            Stage::Semi => Some(Stage::Final),
            Stage::Final => None,
        }
    }
}

/// Which half of the match a live fixture is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Half {
    First,
    Second,
}

impl Half {
    pub fn number(&self) -> u8 {
        match self {
            Half::First => 1,
            Half::Second => 2,
        }
    }

    pub fn parse(n: u8) -> Option<Self> {
        match n {
            1 => Some(Half::First),
            2 => Some(Half::Second),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Fixture {
    pub id: String,
    pub stage: Stage,
    pub team_a: String,
    pub team_b: String,
    pub status: FixtureStatus,
    /// (team_a, team_b). A projection of the event log, never incremented.
    pub score: (u16, u16),
    pub kickoff_at: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub total_paused_secs: i64,
    pub current_half: Option<Half>,
    pub half_time_at: Option<DateTime<Utc>>,
    pub second_half_started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Fixture {
    pub fn is_live(&self) -> bool {
        self.status == FixtureStatus::Live
    }

    pub fn involves(&self, team_id: &str) -> bool {
        self.team_a == team_id || self.team_b == team_id
    }

    /// The opposing side, for own-goal credit.
    pub fn other_team(&self, team_id: &str) -> Option<&str> {
        if self.team_a == team_id {
            Some(&self.team_b)
        } else if self.team_b == team_id {
            Some(&self.team_a)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FixtureStatus {
    #[default]
    Upcoming,
    Live,
    Completed,
}

impl FixtureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixtureStatus::Upcoming => "upcoming",
            FixtureStatus::Live => "live",
            FixtureStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upcoming" => Some(FixtureStatus::Upcoming),
            "live" => Some(FixtureStatus::Live),
            "completed" => Some(FixtureStatus::Completed),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Match events
// ---------------------------------------------------------------------------

/// One entry of the append-only match timeline. Ordering is
/// `(created_at, id)` everywhere the timeline is read.
#[derive(Debug, Clone)]
pub struct MatchEvent {
    pub id: String,
    pub fixture_id: String,
    pub kind: EventKind,
    /// The team the event is recorded against. For an own goal this is the
    /// side that scored on themselves; the other side gets the credit.
    pub team_id: String,
    pub player_id: String,
    pub assist_player_id: Option<String>,
    pub minute: u16,
    pub half: Half,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Goal,
    OwnGoal,
    YellowCard,
    RedCard,
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Goal => "Goal",
            EventKind::OwnGoal => "Own goal",
            EventKind::YellowCard => "Yellow card",
            EventKind::RedCard => "Red card",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Goal => "goal",
            EventKind::OwnGoal => "own_goal",
            EventKind::YellowCard => "yellow_card",
            EventKind::RedCard => "red_card",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "goal" => Some(EventKind::Goal),
            "own_goal" => Some(EventKind::OwnGoal),
            "yellow_card" => Some(EventKind::YellowCard),
            "red_card" => Some(EventKind::RedCard),
            _ => None,
        }
    }

    /// Goals and own goals change the scoreline and get the loud treatment.
    pub fn is_goal(&self) -> bool {
        matches!(self, EventKind::Goal | EventKind::OwnGoal)
    }
}

// ---------------------------------------------------------------------------
// Teams, players, trades
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Team {
    pub id: String,
    pub name: String,       // "Rovers FC"
    pub short_name: String, // "ROV"
    pub group: Option<String>,
    pub crest_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Player {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub shirt_number: Option<u8>,
    pub position: Option<String>,
    pub rank: RankTier,
}

/// Player rank tier, shown on rosters and goal celebrations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum RankTier {
    Legend,
    Gold,
    Silver,
    #[default]
    Bronze,
}

impl RankTier {
    pub fn label(&self) -> &'static str {
        match self {
            RankTier::Legend => "Legend",
            RankTier::Gold => "Gold",
            RankTier::Silver => "Silver",
            RankTier::Bronze => "Bronze",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RankTier::Legend => "legend",
            RankTier::Gold => "gold",
            RankTier::Silver => "silver",
            RankTier::Bronze => "bronze",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "legend" => Some(RankTier::Legend),
            "gold" => Some(RankTier::Gold),
            "silver" => Some(RankTier::Silver),
            "bronze" => Some(RankTier::Bronze),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TradeProposal {
    pub id: String,
    pub from_team: String,
    pub to_team: String,
    pub offered_player: String,
    pub requested_player: String,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TradeStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl TradeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Accepted => "accepted",
            TradeStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TradeStatus::Pending),
            "accepted" => Some(TradeStatus::Accepted),
            "rejected" => Some(TradeStatus::Rejected),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Actors
// ---------------------------------------------------------------------------

/// The verified identity behind a mutation. Passed explicitly into every
/// state-machine call; there is no ambient "logged in" flag. The default
/// is an anonymous viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub email: String,
    pub role: Role,
}

impl Actor {
    pub fn viewer() -> Self {
        Actor { email: String::new(), role: Role::Viewer }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Managers run a team: they may propose trades but not operate matches.
    pub fn can_trade(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Manager)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Viewer,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Viewer => "viewer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

/// One row of the group-stage table. Computed, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Standing {
    pub team_id: String,
    pub team_name: String,
    pub played: u16,
    pub won: u16,
    pub drawn: u16,
    pub lost: u16,
    pub goals_for: u16,
    pub goals_against: u16,
    pub points: u16,
}

impl Standing {
    pub fn goal_diff(&self) -> i32 {
        i32::from(self.goals_for) - i32::from(self.goals_against)
    }
}

/// Table over completed group-stage fixtures. Win 3, draw 1, loss 0.
/// Ordered by points, then goal difference, then goals for, then name.
pub fn compute_standings(fixtures: &[Fixture], teams: &[Team]) -> Vec<Standing> {
    let mut rows: Vec<Standing> = teams
        .iter()
        .map(|team| Standing {
            team_id: team.id.clone(),
            team_name: team.name.clone(),
            ..Standing::default()
        })
        .collect();

    for fixture in fixtures {
        if fixture.stage != Stage::Group || fixture.status != FixtureStatus::Completed {
            continue;
        }
        let (score_a, score_b) = fixture.score;
        tally(&mut rows, &fixture.team_a, score_a, score_b);
        tally(&mut rows, &fixture.team_b, score_b, score_a);
    }

    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.goal_diff().cmp(&a.goal_diff()))
            .then(b.goals_for.cmp(&a.goals_for))
            .then(a.team_name.cmp(&b.team_name))
    });
    rows
}

fn tally(rows: &mut [Standing], team_id: &str, scored: u16, conceded: u16) {
    let Some(row) = rows.iter_mut().find(|r| r.team_id == team_id) else {
        return;
    };
    row.played += 1;
    row.goals_for += scored;
    row.goals_against += conceded;
    match scored.cmp(&conceded) {
        std::cmp::Ordering::Greater => {
            row.won += 1;
            row.points += 3;
        }
        std::cmp::Ordering::Equal => {
            row.drawn += 1;
            row.points += 1;
        }
        std::cmp::Ordering::Less => row.lost += 1,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: &str, name: &str) -> Team {
        Team { id: id.into(), name: name.into(), short_name: id.to_uppercase(), ..Team::default() }
    }

    fn completed(a: &str, b: &str, score: (u16, u16)) -> Fixture {
        Fixture {
            id: format!("{a}-{b}"),
            stage: Stage::Group,
            team_a: a.into(),
            team_b: b.into(),
            status: FixtureStatus::Completed,
            score,
            ..Fixture::default()
        }
    }

    #[test]
    fn test_stage_order_round_trips() {
        assert_eq!(Stage::Group.next(), Some(Stage::Quarter));
        assert_eq!(Stage::Final.next(), None);
        assert_eq!(Stage::Group.prev(), None);
        assert_eq!(Stage::Final.prev(), Some(Stage::Semi));
        for stage in [Stage::Group, Stage::Quarter, Stage::Semi, Stage::Final] {
            assert_eq!(Stage::parse(stage.as_str()), Some(stage));
        }
    }

    #[test]
    fn test_event_kind_parse_rejects_unknown() {
        assert_eq!(EventKind::parse("goal"), Some(EventKind::Goal));
        assert_eq!(EventKind::parse("penalty"), None);
        assert!(EventKind::OwnGoal.is_goal());
        assert!(!EventKind::YellowCard.is_goal());
    }

    #[test]
    fn test_other_team() {
        let fixture = completed("ax", "bx", (0, 0));
        assert_eq!(fixture.other_team("ax"), Some("bx"));
        assert_eq!(fixture.other_team("bx"), Some("ax"));
        assert_eq!(fixture.other_team("cx"), None);
    }

    #[test]
    fn test_standings_points_and_ordering() {
        let teams = vec![team("ax", "Albion"), team("bx", "Borough"), team("cx", "City")];
        let fixtures = vec![
            completed("ax", "bx", (2, 0)), // Albion 3pts
            completed("bx", "cx", (1, 1)), // draw
            completed("cx", "ax", (0, 1)), // Albion 6pts
        ];
        let table = compute_standings(&fixtures, &teams);
        assert_eq!(table[0].team_id, "ax");
        assert_eq!(table[0].points, 6);
        assert_eq!(table[0].goal_diff(), 3);
        // Borough and City are level on 1pt; City's -1 GD beats Borough's -2.
        assert_eq!(table[1].team_id, "cx");
        assert_eq!(table[1].points, 1);
        assert_eq!(table[2].team_id, "bx");
    }

    #[test]
    fn test_standings_ignore_live_and_knockout_fixtures() {
        let teams = vec![team("ax", "Albion"), team("bx", "Borough")];
        let mut live = completed("ax", "bx", (3, 0));
        live.status = FixtureStatus::Live;
        let mut knockout = completed("ax", "bx", (2, 0));
        knockout.stage = Stage::Semi;
        let table = compute_standings(&[live, knockout], &teams);
        assert!(table.iter().all(|row| row.played == 0 && row.points == 0));
    }

    #[test]
    fn test_standings_level_on_points_sorted_by_goal_difference() {
        let teams = vec![team("ax", "Albion"), team("bx", "Borough")];
        let fixtures = vec![
            completed("ax", "bx", (3, 0)),
            completed("bx", "ax", (1, 0)),
        ];
        let table = compute_standings(&fixtures, &teams);
        assert_eq!(table[0].team_id, "ax");
        assert_eq!(table[0].points, 3);
        assert_eq!(table[1].points, 3);
        assert!(table[0].goal_diff() > table[1].goal_diff());
    }

    #[test]
    fn test_snapshot_merge_updates() {
        let mut snapshot = Snapshot {
            fixtures: vec![completed("ax", "bx", (0, 0)), completed("bx", "cx", (0, 0))],
            ..Snapshot::default()
        };
        let mut update = completed("ax", "bx", (2, 1));
        update.id = "ax-bx".into();
        snapshot.merge_updates(vec![update]);
        assert_eq!(snapshot.fixtures[0].score, (2, 1));
        assert_eq!(snapshot.fixtures[1].score, (0, 0));
    }
}
