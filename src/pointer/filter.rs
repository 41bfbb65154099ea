/// Exponential smoothing over the raw normalized position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingFilter {
    alpha: f64,
    filtered_x: f64,
    filtered_y: f64,
    first_update: bool,
}

impl SmoothingFilter {
    pub const DEFAULT_ALPHA: f64 = 0.3;

    /// `alpha` is clamped into `(0, 1]`; a non-finite value uses the default.
    pub fn new(alpha: f64) -> Self {
        let alpha = if alpha.is_finite() {
            alpha.clamp(f64::EPSILON, 1.0)
        } else {
            Self::DEFAULT_ALPHA
        };
        Self {
            alpha,
            filtered_x: 0.5,
            filtered_y: 0.5,
            first_update: true,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// The next update takes the raw value as-is.
    pub fn reset(&mut self) {
        self.first_update = true;
    }

    /// A non-finite raw axis is ignored; that axis keeps its last value.
    pub fn update(&mut self, raw_x: f64, raw_y: f64) -> (f64, f64) {
        let bypass = self.first_update;
        self.first_update = false;
        self.filtered_x = self.blend(self.filtered_x, raw_x, bypass);
        self.filtered_y = self.blend(self.filtered_y, raw_y, bypass);
        (self.filtered_x, self.filtered_y)
    }

    fn blend(&self, filtered: f64, raw: f64, bypass: bool) -> f64 {
        if !raw.is_finite() {
            filtered
        } else if bypass {
            raw
        } else {
            self.alpha * raw + (1.0 - self.alpha) * filtered
        }
    }

    pub fn value(&self) -> (f64, f64) {
        (self.filtered_x, self.filtered_y)
    }
}

impl Default for SmoothingFilter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ALPHA)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonTransition {
    Press,
    Release,
}

/// Edge-triggered button state: reports only changes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ButtonDebouncer {
    last_pressed: bool,
}

impl ButtonDebouncer {
    pub fn is_pressed(&self) -> bool {
        self.last_pressed
    }

    /// Transition from the committed state to `pressed`, without committing.
    pub fn transition(&self, pressed: bool) -> Option<ButtonTransition> {
        match (self.last_pressed, pressed) {
            (false, true) => Some(ButtonTransition::Press),
            (true, false) => Some(ButtonTransition::Release),
            _ => None,
        }
    }

    pub fn commit(&mut self, pressed: bool) {
        self.last_pressed = pressed;
    }

    pub fn update(&mut self, pressed: bool) -> Option<ButtonTransition> {
        let transition = self.transition(pressed);
        self.commit(pressed);
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_update_bypasses_smoothing() {
        let mut filter = SmoothingFilter::new(0.3);
        assert_eq!(filter.update(0.9, 0.1), (0.9, 0.1));
    }

    #[test]
    fn constant_input_stays_put() {
        let mut filter = SmoothingFilter::new(0.3);
        for _ in 0..10 {
            assert_eq!(filter.update(0.25, 0.75), (0.25, 0.75));
        }
    }

    #[test]
    fn smoothing_moves_a_fraction_of_the_step() {
        let mut filter = SmoothingFilter::new(0.3);
        filter.update(0.0, 0.0);
        let (x, y) = filter.update(1.0, 0.5);
        assert!((x - 0.3).abs() < 1e-12);
        assert!((y - 0.15).abs() < 1e-12);
    }

    #[test]
    fn reset_rearms_bypass() {
        let mut filter = SmoothingFilter::new(0.3);
        filter.update(0.0, 0.0);
        filter.update(0.1, 0.1);
        filter.reset();
        assert_eq!(filter.update(0.8, 0.6), (0.8, 0.6));
    }

    #[test]
    fn non_finite_sample_does_not_poison_the_filter() {
        let mut filter = SmoothingFilter::new(0.3);
        filter.update(0.5, 0.5);
        assert_eq!(filter.update(f64::NAN, 0.5), (0.5, 0.5));
        assert_eq!(filter.update(0.5, f64::INFINITY), (0.5, 0.5));
        for _ in 0..100 {
            filter.update(0.9, 0.5);
        }
        let (x, y) = filter.value();
        assert!((x - 0.9).abs() < 1e-9, "x = {x}");
        assert_eq!(y, 0.5);
    }

    #[test]
    fn non_finite_first_sample_keeps_centre() {
        let mut filter = SmoothingFilter::new(0.3);
        assert_eq!(filter.update(f64::NAN, f64::NEG_INFINITY), (0.5, 0.5));
        assert!(filter.update(0.2, 0.8).0.is_finite());
    }

    #[test]
    fn alpha_is_sanitized() {
        assert_eq!(SmoothingFilter::new(2.0).alpha(), 1.0);
        assert!(SmoothingFilter::new(-1.0).alpha() > 0.0);
        assert_eq!(SmoothingFilter::new(f64::NAN).alpha(), SmoothingFilter::DEFAULT_ALPHA);
    }

    #[test]
    fn debouncer_reports_edges_only() {
        let mut button = ButtonDebouncer::default();
        let seq = [false, true, true, true, false, false];
        let transitions: Vec<_> = seq.iter().map(|&p| button.update(p)).collect();
        assert_eq!(
            transitions,
            vec![
                None,
                Some(ButtonTransition::Press),
                None,
                None,
                Some(ButtonTransition::Release),
                None,
            ]
        );
    }

    #[test]
    fn uncommitted_transition_repeats() {
        let button = ButtonDebouncer::default();
        assert_eq!(button.transition(true), Some(ButtonTransition::Press));
        assert_eq!(button.transition(true), Some(ButtonTransition::Press));
        assert!(!button.is_pressed());
    }
}
