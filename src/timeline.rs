//! Two-handle timeline range control.
//!
//! A dual-handle slider over a pixel track, mapping handle positions
//! linearly to years. The control is pure state: callers feed it
//! track-local pointer coordinates and read the resulting year range. For
//! any input sequence the handles never cross and the reported range stays
//! inside `[min_year, max_year]`.

use crate::models::time::TimeRange;

/// Distance within which a pointer-down grabs a handle instead of the
/// track.
const HANDLE_HIT_RADIUS: f64 = 12.0;
/// Minimum pixel distance kept between the handles.
const MIN_HANDLE_GAP: f64 = 8.0;

/// One of the two draggable endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Start,
    End,
}

/// Pointer interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(Handle),
}

/// Dual-handle slider mapping pixel positions on a track to a year range.
#[derive(Debug, Clone)]
pub struct TimelineControl {
    min_year: i32,
    max_year: i32,
    track_width: f64,
    start_px: f64,
    end_px: f64,
    state: DragState,
}

impl TimelineControl {
    /// Create a control spanning `[min_year, max_year]` over a track of
    /// `track_width` pixels, handles initially at the track ends.
    pub fn new(min_year: i32, max_year: i32, track_width: f64) -> Result<Self, String> {
        if min_year >= max_year {
            return Err(format!(
                "Timeline needs min_year < max_year, got {}..{}",
                min_year, max_year
            ));
        }
        if !track_width.is_finite() || track_width <= MIN_HANDLE_GAP {
            return Err(format!(
                "Track width must exceed {} pixels, got {}",
                MIN_HANDLE_GAP, track_width
            ));
        }
        Ok(Self {
            min_year,
            max_year,
            track_width,
            start_px: 0.0,
            end_px: track_width,
            state: DragState::Idle,
        })
    }

    /// Position the handles to show `range`.
    pub fn with_range(mut self, range: TimeRange) -> Self {
        let start = self.position_of(range.start_year);
        let end = self.position_of(range.end_year);
        self.end_px = end.clamp(MIN_HANDLE_GAP, self.track_width);
        self.start_px = start.clamp(0.0, self.end_px - MIN_HANDLE_GAP);
        self
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Current handle positions as (start, end) pixels.
    pub fn handle_positions(&self) -> (f64, f64) {
        (self.start_px, self.end_px)
    }

    /// Year under a track position. Off-track positions clamp to the track,
    /// and the result clamps to `[min_year, max_year]`; this is the one
    /// clamp every reported year passes through.
    pub fn year_at(&self, x: f64) -> i32 {
        let fraction = x.clamp(0.0, self.track_width) / self.track_width;
        let span = f64::from(self.max_year - self.min_year);
        let year = f64::from(self.min_year) + fraction * span;
        (year.round() as i32).clamp(self.min_year, self.max_year)
    }

    /// Track position of a year.
    pub fn position_of(&self, year: i32) -> f64 {
        let year = year.clamp(self.min_year, self.max_year);
        let fraction = f64::from(year - self.min_year) / f64::from(self.max_year - self.min_year);
        fraction * self.track_width
    }

    /// Year range the handles currently select.
    pub fn range(&self) -> TimeRange {
        TimeRange::clamped(
            self.year_at(self.start_px),
            self.year_at(self.end_px),
            self.min_year,
            self.max_year,
        )
    }

    /// Pointer pressed at `x`. On a handle, start dragging it; on the
    /// track, jump the nearer handle to the press point and drag from
    /// there.
    pub fn pointer_down(&mut self, x: f64) {
        if !x.is_finite() || self.state != DragState::Idle {
            return;
        }
        let handle = match self.hit_handle(x) {
            Some(handle) => handle,
            None => {
                let handle = self.nearest_handle(x);
                self.move_handle(handle, x);
                handle
            }
        };
        self.state = DragState::Dragging(handle);
    }

    /// Pointer moved to `x`. Only meaningful while dragging.
    pub fn pointer_move(&mut self, x: f64) {
        if !x.is_finite() {
            return;
        }
        if let DragState::Dragging(handle) = self.state {
            self.move_handle(handle, x);
        }
    }

    /// Pointer released.
    pub fn pointer_up(&mut self) {
        self.state = DragState::Idle;
    }

    fn hit_handle(&self, x: f64) -> Option<Handle> {
        let to_start = (x - self.start_px).abs();
        let to_end = (x - self.end_px).abs();
        if to_start.min(to_end) > HANDLE_HIT_RADIUS {
            return None;
        }
        Some(if to_start <= to_end {
            Handle::Start
        } else {
            Handle::End
        })
    }

    fn nearest_handle(&self, x: f64) -> Handle {
        if (x - self.start_px).abs() <= (x - self.end_px).abs() {
            Handle::Start
        } else {
            Handle::End
        }
    }

    /// Move a handle to `x`, clamped so the handles keep their minimum gap
    /// and stay on the track.
    fn move_handle(&mut self, handle: Handle, x: f64) {
        match handle {
            Handle::Start => {
                self.start_px = x.clamp(0.0, self.end_px - MIN_HANDLE_GAP);
            }
            Handle::End => {
                self.end_px = x.clamp(self.start_px + MIN_HANDLE_GAP, self.track_width);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control() -> TimelineControl {
        TimelineControl::new(1000, 2000, 1000.0).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_parameters() {
        assert!(TimelineControl::new(2000, 1000, 500.0).is_err());
        assert!(TimelineControl::new(1000, 1000, 500.0).is_err());
        assert!(TimelineControl::new(1000, 2000, 4.0).is_err());
        assert!(TimelineControl::new(1000, 2000, f64::NAN).is_err());
    }

    #[test]
    fn test_year_mapping_is_linear() {
        let control = control();
        assert_eq!(control.year_at(0.0), 1000);
        assert_eq!(control.year_at(500.0), 1500);
        assert_eq!(control.year_at(1000.0), 2000);
        assert_eq!(control.position_of(1500), 500.0);
    }

    #[test]
    fn test_year_at_clamps_once_for_all_callers() {
        let control = control();
        // Off-track positions and the reported year share one bound.
        assert_eq!(control.year_at(-250.0), 1000);
        assert_eq!(control.year_at(99_999.0), 2000);
        assert_eq!(control.position_of(2500), 1000.0);
    }

    #[test]
    fn test_initial_range_spans_everything() {
        assert_eq!(control().range(), TimeRange::new(1000, 2000).unwrap());
    }

    #[test]
    fn test_with_range_round_trips() {
        let control = control().with_range(TimeRange::new(1700, 1800).unwrap());
        assert_eq!(control.range(), TimeRange::new(1700, 1800).unwrap());
    }

    #[test]
    fn test_drag_start_handle() {
        let mut control = control();
        control.pointer_down(0.0);
        assert_eq!(control.state(), DragState::Dragging(Handle::Start));

        control.pointer_move(300.0);
        assert_eq!(control.range().start_year, 1300);

        control.pointer_up();
        assert_eq!(control.state(), DragState::Idle);
    }

    #[test]
    fn test_handles_cannot_cross() {
        let mut control = control();
        control.pointer_down(0.0);
        // Push the start handle far past the end handle.
        control.pointer_move(5000.0);
        let (start_px, end_px) = control.handle_positions();
        assert!(start_px <= end_px - MIN_HANDLE_GAP);

        let range = control.range();
        assert!(range.start_year <= range.end_year);
    }

    #[test]
    fn test_end_handle_cannot_cross_either() {
        let mut control = control();
        control.pointer_down(1000.0);
        assert_eq!(control.state(), DragState::Dragging(Handle::End));
        control.pointer_move(-5000.0);

        let (start_px, end_px) = control.handle_positions();
        assert!(end_px >= start_px + MIN_HANDLE_GAP);
        assert!(end_px <= 1000.0);
    }

    #[test]
    fn test_track_tap_moves_nearest_handle() {
        let mut control = control();
        control.pointer_down(700.0);
        assert_eq!(control.state(), DragState::Dragging(Handle::End));
        assert_eq!(control.range().end_year, 1700);

        control.pointer_up();
        control.pointer_down(100.0);
        assert_eq!(control.state(), DragState::Dragging(Handle::Start));
        assert_eq!(control.range().start_year, 1100);
    }

    #[test]
    fn test_move_without_drag_is_ignored() {
        let mut control = control();
        control.pointer_move(400.0);
        assert_eq!(control.range(), TimeRange::new(1000, 2000).unwrap());
    }

    #[test]
    fn test_second_pointer_down_is_ignored_while_dragging() {
        let mut control = control();
        control.pointer_down(0.0);
        control.pointer_down(1000.0);
        assert_eq!(control.state(), DragState::Dragging(Handle::Start));
    }

    #[test]
    fn test_wild_input_sequence_keeps_invariants() {
        let mut control = control();
        let inputs = [
            120.0,
            -999.0,
            2.5e7,
            f64::NAN,
            880.0,
            0.0,
            1000.0,
            -0.0,
            500.5,
            f64::INFINITY,
            3.0,
        ];
        for (i, &x) in inputs.iter().enumerate() {
            if i % 3 == 0 {
                control.pointer_up();
                control.pointer_down(x);
            } else {
                control.pointer_move(x);
            }
            let (start_px, end_px) = control.handle_positions();
            assert!(start_px >= 0.0 && end_px <= 1000.0);
            assert!(start_px <= end_px - MIN_HANDLE_GAP);
            let range = control.range();
            assert!(range.start_year <= range.end_year);
            assert!(range.start_year >= 1000 && range.end_year <= 2000);
        }
    }
}
