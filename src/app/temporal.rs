use crate::config::ViewConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealState {
    Idle,
    Playing,
}

/// Year cursor that reveals dated entities in chronological order.
///
/// The reveal is engaged while playing and while paused or scrubbed part way
/// through; only then does it affect visibility. Reaching the target year
/// disengages it.
#[derive(Clone, Debug, PartialEq)]
pub struct TemporalReveal {
    state: RevealState,
    engaged: bool,
    current_year: i32,
    min_year: i32,
    target_year: i32,
    fade_in_years: i32,
    year_floor: i32,
}

/// Visibility of something dated `year` with the cursor at `cursor`: hidden
/// before its year, then fading in linearly over `fade_in_years`. Undated
/// items are always visible.
pub fn visibility(year: Option<i32>, cursor: i32, fade_in_years: i32) -> f32 {
    let Some(year) = year else {
        return 1.0;
    };
    if year > cursor {
        return 0.0;
    }
    let elapsed = i64::from(cursor) - i64::from(year);
    if fade_in_years <= 0 || elapsed >= i64::from(fade_in_years) {
        1.0
    } else {
        elapsed as f32 / fade_in_years as f32
    }
}

fn year_span(years: impl IntoIterator<Item = i32>) -> Option<(i32, i32)> {
    years.into_iter().fold(None, |span, year| match span {
        None => Some((year, year)),
        Some((low, high)) => Some((low.min(year), high.max(year))),
    })
}

impl TemporalReveal {
    pub fn new(years: impl IntoIterator<Item = i32>, view: &ViewConfig) -> Self {
        let mut reveal = Self {
            state: RevealState::Idle,
            engaged: false,
            current_year: view.year_floor,
            min_year: view.year_floor,
            target_year: view.year_floor,
            fade_in_years: view.fade_in_years,
            year_floor: view.year_floor,
        };
        reveal.recalibrate(years);
        reveal.current_year = reveal.min_year;
        reveal
    }

    /// Refreshes the year range after the set of dated entities changed. A
    /// cursor in progress is kept, clamped to the new range.
    pub fn recalibrate(&mut self, years: impl IntoIterator<Item = i32>) {
        let (min_year, target_year) = year_span(years).unwrap_or((self.year_floor, self.year_floor));
        self.min_year = min_year;
        self.target_year = target_year;

        if self.engaged {
            self.current_year = self.current_year.clamp(min_year, target_year);
        } else {
            self.current_year = min_year;
        }
    }

    pub fn play(&mut self) {
        if self.current_year >= self.target_year {
            self.current_year = self.min_year;
        }
        self.state = RevealState::Playing;
        self.engaged = true;
        tracing::debug!(from = self.current_year, to = self.target_year, "temporal reveal playing");
    }

    pub fn pause(&mut self) {
        self.state = RevealState::Idle;
    }

    /// One animation frame. Returns whether the reveal was playing.
    pub fn advance(&mut self) -> bool {
        if self.state != RevealState::Playing {
            return false;
        }

        self.current_year = self.current_year.saturating_add(1).min(self.target_year);
        if self.current_year >= self.target_year {
            self.state = RevealState::Idle;
            self.engaged = false;
            tracing::debug!(year = self.current_year, "temporal reveal complete");
        }
        true
    }

    /// Moves the cursor by hand. The reveal stays engaged and paused.
    pub fn scrub(&mut self, year: i32) {
        self.current_year = year.clamp(self.min_year, self.target_year);
        self.state = RevealState::Idle;
        self.engaged = true;
    }

    pub fn reset(&mut self) {
        self.state = RevealState::Idle;
        self.engaged = false;
        self.current_year = self.min_year;
    }

    pub fn is_playing(&self) -> bool {
        self.state == RevealState::Playing
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn min_year(&self) -> i32 {
        self.min_year
    }

    pub fn target_year(&self) -> i32 {
        self.target_year
    }

    /// Whether an entity dated `year` has been reached by the cursor at all.
    pub fn is_revealed(&self, year: Option<i32>) -> bool {
        !self.engaged || year.is_none_or(|year| year <= self.current_year)
    }

    pub fn node_visibility(&self, year: Option<i32>) -> f32 {
        if !self.engaged {
            return 1.0;
        }
        visibility(year, self.current_year, self.fade_in_years)
    }

    pub fn link_visibility(&self, source_year: Option<i32>, target_year: Option<i32>) -> f32 {
        self.node_visibility(source_year)
            .min(self.node_visibility(target_year))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn reveal(years: &[i32]) -> TemporalReveal {
        TemporalReveal::new(years.iter().copied(), &ViewConfig::default())
    }

    #[test]
    fn cursor_starts_at_earliest_year() {
        let reveal = reveal(&[1517, 1450, 1536]);
        assert_eq!(reveal.current_year(), 1450);
        assert_eq!(reveal.target_year(), 1536);
        assert!(!reveal.is_engaged());
    }

    #[test]
    fn floor_applies_without_dated_entities() {
        let reveal = reveal(&[]);
        assert_eq!(reveal.current_year(), 1000);
        assert_eq!(reveal.target_year(), 1000);
    }

    #[test]
    fn mid_fade_scenario() {
        let (a, b, c) = (Some(1400), Some(1450), None);
        let mut reveal = reveal(&[1400, 1450]);
        reveal.scrub(1405);

        assert!(reveal.is_revealed(a));
        assert!(!reveal.is_revealed(b));
        assert!(reveal.is_revealed(c));
        assert_eq!(reveal.node_visibility(a), 0.5);
        assert_eq!(reveal.node_visibility(b), 0.0);
        assert_eq!(reveal.node_visibility(c), 1.0);
        assert_eq!(reveal.link_visibility(a, b), 0.0);

        reveal.scrub(1410);
        assert_eq!(reveal.node_visibility(a), 1.0);
    }

    #[test]
    fn disengaged_reveal_shows_everything() {
        let reveal = reveal(&[1400, 1450]);
        assert_eq!(reveal.node_visibility(Some(1450)), 1.0);
        assert_eq!(reveal.link_visibility(Some(1400), Some(1450)), 1.0);
    }

    #[test]
    fn play_runs_to_target_and_stops() {
        let mut reveal = reveal(&[1440, 1450]);
        reveal.play();
        let mut frames = 0;
        while reveal.advance() {
            frames += 1;
            assert!(frames <= 10, "reveal did not terminate");
        }
        assert_eq!(frames, 10);
        assert!(!reveal.is_playing());
        assert_eq!(reveal.current_year(), reveal.target_year());
        assert!(!reveal.is_engaged());
    }

    #[test]
    fn pause_keeps_cursor_and_play_resumes() {
        let mut reveal = reveal(&[1400, 1500]);
        reveal.play();
        for _ in 0..7 {
            reveal.advance();
        }
        reveal.pause();
        assert!(!reveal.advance());
        assert_eq!(reveal.current_year(), 1407);
        assert!(reveal.is_engaged());

        reveal.play();
        reveal.advance();
        assert_eq!(reveal.current_year(), 1408);
    }

    #[test]
    fn play_at_end_restarts_from_minimum() {
        let mut reveal = reveal(&[1400, 1420]);
        reveal.scrub(1420);
        reveal.play();
        assert_eq!(reveal.current_year(), 1400);
    }

    #[test]
    fn recalibrate_clamps_cursor_in_progress() {
        let mut reveal = reveal(&[1400, 1500]);
        reveal.scrub(1480);
        reveal.recalibrate([1400, 1450]);
        assert_eq!(reveal.current_year(), 1450);
        assert_eq!(reveal.target_year(), 1450);

        reveal.reset();
        reveal.recalibrate([1300, 1450]);
        assert_eq!(reveal.current_year(), 1300);
    }

    #[test]
    fn extreme_years_do_not_overflow() {
        assert_eq!(visibility(Some(i32::MIN), 1500, 10), 1.0);
        assert_eq!(visibility(Some(i32::MIN), i32::MAX, 10), 1.0);
        assert_eq!(visibility(Some(i32::MAX), i32::MIN, 10), 0.0);

        let mut single = reveal(&[i32::MAX]);
        single.play();
        assert!(single.advance());
        assert_eq!(single.current_year(), i32::MAX);
        assert!(!single.is_engaged());

        let mut pair = reveal(&[i32::MAX - 1, i32::MAX]);
        pair.play();
        pair.advance();
        assert_eq!(pair.current_year(), i32::MAX);
    }

    proptest! {
        #[test]
        fn visibility_is_monotone_and_saturates(year in any::<i32>(), cursor in any::<i32>(), step in 0i32..50) {
            let now = visibility(Some(year), cursor, 10);
            let later = visibility(Some(year), cursor.saturating_add(step), 10);
            prop_assert!(later >= now);
            prop_assert!((0.0..=1.0).contains(&now));
            if i64::from(cursor) - i64::from(year) >= 10 {
                prop_assert_eq!(now, 1.0);
            }
        }
    }
}
