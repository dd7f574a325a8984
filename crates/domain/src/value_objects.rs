//! Value objects shared by the game aggregates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest batting slot a lineup may use (extra hitters included).
pub const MAX_BATTING_SLOT: u8 = 20;

/// Highest jersey number accepted.
pub const MAX_JERSEY_NUMBER: u8 = 99;

/// Maximum length of team names and player identifiers.
pub const MAX_NAME_LEN: usize = 50;

/// A value failed validation at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Which team a fact refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TeamSide {
    Home,
    Away,
}

impl TeamSide {
    /// The side batting in the given half: away bats in the top.
    pub fn batting(is_top_half: bool) -> Self {
        if is_top_half {
            TeamSide::Away
        } else {
            TeamSide::Home
        }
    }

    pub fn opponent(&self) -> Self {
        match self {
            TeamSide::Home => TeamSide::Away,
            TeamSide::Away => TeamSide::Home,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TeamSide::Home => "HOME",
            TeamSide::Away => "AWAY",
        }
    }
}

impl std::fmt::Display for TeamSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TeamSide {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HOME" => Ok(TeamSide::Home),
            "AWAY" => Ok(TeamSide::Away),
            other => Err(ValidationError::new(format!(
                "Team side must be HOME or AWAY, got {other:?}"
            ))),
        }
    }
}

/// Runs scored by each team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Score {
    home_runs: u32,
    away_runs: u32,
}

impl Score {
    pub fn new(home_runs: u32, away_runs: u32) -> Self {
        Self {
            home_runs,
            away_runs,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get_home_runs(&self) -> u32 {
        self.home_runs
    }

    pub fn get_away_runs(&self) -> u32 {
        self.away_runs
    }

    pub fn runs_for(&self, side: TeamSide) -> u32 {
        match side {
            TeamSide::Home => self.home_runs,
            TeamSide::Away => self.away_runs,
        }
    }

    pub fn total(&self) -> u32 {
        self.home_runs + self.away_runs
    }

    /// The leading side, or None when tied.
    pub fn leader(&self) -> Option<TeamSide> {
        match self.home_runs.cmp(&self.away_runs) {
            std::cmp::Ordering::Greater => Some(TeamSide::Home),
            std::cmp::Ordering::Less => Some(TeamSide::Away),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Returns the score with `runs` added for `side`.
    pub fn with_runs(&self, side: TeamSide, runs: u32) -> Self {
        match side {
            TeamSide::Home => Self::new(self.home_runs + runs, self.away_runs),
            TeamSide::Away => Self::new(self.home_runs, self.away_runs + runs),
        }
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.home_runs, self.away_runs)
    }
}

/// Position in the batting order, 1 through [`MAX_BATTING_SLOT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BattingSlot(u8);

impl BattingSlot {
    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if (1..=MAX_BATTING_SLOT).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::new(format!(
                "Batting slot must be between 1 and {MAX_BATTING_SLOT}, got {value}"
            )))
        }
    }

    pub fn first() -> Self {
        Self(1)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// The slot that bats after this one in a lineup of `lineup_len` hitters.
    pub fn next_in(&self, lineup_len: u8) -> Self {
        if lineup_len == 0 || self.0 >= lineup_len {
            Self::first()
        } else {
            Self(self.0 + 1)
        }
    }
}

impl TryFrom<u8> for BattingSlot {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BattingSlot> for u8 {
    fn from(slot: BattingSlot) -> Self {
        slot.0
    }
}

impl std::fmt::Display for BattingSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Jersey number, 0 through [`MAX_JERSEY_NUMBER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct JerseyNumber(u8);

impl JerseyNumber {
    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if value <= MAX_JERSEY_NUMBER {
            Ok(Self(value))
        } else {
            Err(ValidationError::new(format!(
                "Jersey number must be between 0 and {MAX_JERSEY_NUMBER}, got {value}"
            )))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for JerseyNumber {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<JerseyNumber> for u8 {
    fn from(jersey: JerseyNumber) -> Self {
        jersey.0
    }
}

impl std::fmt::Display for JerseyNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a player, unique within a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::new("Player id cannot be empty"));
        }
        if trimmed.len() > MAX_NAME_LEN {
            return Err(ValidationError::new(format!(
                "Player id cannot exceed {MAX_NAME_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PlayerId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> Self {
        id.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Defensive assignment, including the slow-pitch short fielder and the
/// extra player / extra hitter roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldPosition {
    #[serde(rename = "P")]
    Pitcher,
    #[serde(rename = "C")]
    Catcher,
    #[serde(rename = "1B")]
    FirstBase,
    #[serde(rename = "2B")]
    SecondBase,
    #[serde(rename = "3B")]
    ThirdBase,
    #[serde(rename = "SS")]
    Shortstop,
    #[serde(rename = "LF")]
    LeftField,
    #[serde(rename = "CF")]
    CenterField,
    #[serde(rename = "RF")]
    RightField,
    #[serde(rename = "SF")]
    ShortFielder,
    #[serde(rename = "EP")]
    ExtraPlayer,
    #[serde(rename = "EH")]
    ExtraHitter,
}

impl FieldPosition {
    /// True for roles that bat without taking the field.
    pub fn is_bench_hitter(&self) -> bool {
        matches!(self, FieldPosition::ExtraPlayer | FieldPosition::ExtraHitter)
    }
}

/// Lifecycle of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl GameStatus {
    pub fn can_start(&self) -> bool {
        matches!(self, GameStatus::NotStarted)
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, GameStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::NotStarted => "NOT_STARTED",
            GameStatus::InProgress => "IN_PROGRESS",
            GameStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a completed game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEnding {
    Regulation,
    Mercy,
    Forfeit,
    TimeLimit,
}

/// Result of one plate appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AtBatResult {
    Single,
    Double,
    Triple,
    HomeRun,
    Walk,
    Error,
    FieldersChoice,
    Strikeout,
    GroundOut,
    FlyOut,
    SacrificeFly,
    DoublePlay,
}

impl AtBatResult {
    /// Bases awarded to the batter and every runner on a clean hit.
    pub fn hit_bases(&self) -> Option<u8> {
        match self {
            AtBatResult::Single => Some(1),
            AtBatResult::Double => Some(2),
            AtBatResult::Triple => Some(3),
            AtBatResult::HomeRun => Some(4),
            _ => None,
        }
    }

    /// Whether runs scored on this result are credited to the batter.
    pub fn credits_rbi(&self) -> bool {
        !matches!(
            self,
            AtBatResult::Error | AtBatResult::DoublePlay | AtBatResult::FieldersChoice
        )
    }
}

/// A base, with `Home` also standing for the batter's box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Base {
    First,
    Second,
    Third,
    Home,
}

impl Base {
    /// Index into [`BasesState`] for occupied bases.
    fn index(&self) -> Option<usize> {
        match self {
            Base::First => Some(0),
            Base::Second => Some(1),
            Base::Third => Some(2),
            Base::Home => None,
        }
    }

    pub(crate) fn from_index(index: usize) -> Self {
        match index {
            0 => Base::First,
            1 => Base::Second,
            2 => Base::Third,
            _ => Base::Home,
        }
    }
}

/// Runners currently on first, second and third.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BasesState {
    first: Option<PlayerId>,
    second: Option<PlayerId>,
    third: Option<PlayerId>,
}

impl BasesState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn runner_on(&self, base: Base) -> Option<&PlayerId> {
        match base {
            Base::First => self.first.as_ref(),
            Base::Second => self.second.as_ref(),
            Base::Third => self.third.as_ref(),
            Base::Home => None,
        }
    }

    pub fn is_occupied(&self, base: Base) -> bool {
        self.runner_on(base).is_some()
    }

    pub fn runner_count(&self) -> usize {
        [&self.first, &self.second, &self.third]
            .into_iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.runner_count() == 0
    }

    /// The base a runner stands on, if any.
    pub fn base_of(&self, runner: &PlayerId) -> Option<Base> {
        [Base::First, Base::Second, Base::Third]
            .into_iter()
            .find(|base| self.runner_on(*base) == Some(runner))
    }

    pub(crate) fn as_array(&self) -> [Option<PlayerId>; 3] {
        [self.first.clone(), self.second.clone(), self.third.clone()]
    }

    fn slot_mut(&mut self, base: Base) -> Option<&mut Option<PlayerId>> {
        match base.index()? {
            0 => Some(&mut self.first),
            1 => Some(&mut self.second),
            _ => Some(&mut self.third),
        }
    }

    pub(crate) fn place(&mut self, base: Base, runner: PlayerId) {
        if let Some(slot) = self.slot_mut(base) {
            *slot = Some(runner);
        }
    }

    /// Clears `base` if `runner` is on it.
    pub(crate) fn vacate(&mut self, base: Base, runner: &PlayerId) {
        if let Some(slot) = self.slot_mut(base)
            && slot.as_ref() == Some(runner)
        {
            *slot = None;
        }
    }

    /// Removes `runner` from whichever base they occupy.
    pub(crate) fn remove(&mut self, runner: &PlayerId) {
        if let Some(base) = self.base_of(runner) {
            self.vacate(base, runner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batting_slot_bounds() {
        assert!(BattingSlot::new(0).is_err());
        assert!(BattingSlot::new(1).is_ok());
        assert!(BattingSlot::new(20).is_ok());
        assert!(BattingSlot::new(21).is_err());
    }

    #[test]
    fn batting_slot_rejects_invalid_json() {
        assert!(serde_json::from_str::<BattingSlot>("21").is_err());
        assert_eq!(
            serde_json::from_str::<BattingSlot>("4").unwrap(),
            BattingSlot::new(4).unwrap()
        );
    }

    #[test]
    fn batting_slot_cycles() {
        let nine = BattingSlot::new(9).unwrap();
        assert_eq!(nine.next_in(9), BattingSlot::first());
        assert_eq!(BattingSlot::new(3).unwrap().next_in(9).value(), 4);
    }

    #[test]
    fn jersey_number_bounds() {
        assert!(JerseyNumber::new(0).is_ok());
        assert!(JerseyNumber::new(99).is_ok());
        assert!(JerseyNumber::new(100).is_err());
    }

    #[test]
    fn team_side_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&TeamSide::Home).unwrap(), "\"HOME\"");
        assert_eq!("away".parse::<TeamSide>().unwrap(), TeamSide::Away);
        assert!("visitors".parse::<TeamSide>().is_err());
        assert_eq!(TeamSide::batting(true), TeamSide::Away);
    }

    #[test]
    fn score_leader_and_runs() {
        let score = Score::zero().with_runs(TeamSide::Home, 3);
        assert_eq!(score.get_home_runs(), 3);
        assert_eq!(score.leader(), Some(TeamSide::Home));
        assert_eq!(score.with_runs(TeamSide::Away, 3).leader(), None);
        assert_eq!(score.total(), 3);
    }

    #[test]
    fn field_position_codes() {
        assert_eq!(
            serde_json::to_string(&FieldPosition::ShortFielder).unwrap(),
            "\"SF\""
        );
        assert_eq!(
            serde_json::from_str::<FieldPosition>("\"1B\"").unwrap(),
            FieldPosition::FirstBase
        );
    }

    #[test]
    fn player_id_validation() {
        assert!(PlayerId::new("  ").is_err());
        assert!(PlayerId::new("x".repeat(51)).is_err());
        assert_eq!(PlayerId::new(" p1 ").unwrap().as_str(), "p1");
    }

    #[test]
    fn bases_place_and_remove() {
        let runner = PlayerId::new("p1").unwrap();
        let mut bases = BasesState::empty();
        bases.place(Base::Second, runner.clone());
        assert_eq!(bases.base_of(&runner), Some(Base::Second));

        bases.remove(&runner);
        assert!(bases.is_empty());
    }
}
