use serde::Serialize;
use thiserror::Error;

/// Maximum distance between `(stop - start) / step` and the nearest integer for a
/// span to count as aligned with its step.
const ALIGNMENT_TOLERANCE: f64 = 1e-6;

/// Upper bound on `(stop - start) / step`. Beyond it the step count is no longer
/// exactly representable and the alignment check is meaningless.
const MAX_STEPS: f64 = u32::MAX as f64;

#[derive(Debug, Error, PartialEq, Clone, Copy)]
pub enum SweepSpecError {
    #[error("Sweep bounds must be finite (start = {start}, stop = {stop}, step = {step})")]
    NonFinite { start: f64, stop: f64, step: f64 },

    #[error("Sweep step must be positive, got {0}")]
    NonPositiveStep(f64),

    #[error("Sweep stop ({stop}) is below start ({start})")]
    InvertedBounds { start: f64, stop: f64 },

    #[error("Sweep span {start}..={stop} is not a whole number of {step} steps")]
    Misaligned { start: f64, stop: f64, step: f64 },

    #[error("Sweep span {start}..={stop} with step {step} has too many points")]
    TooManyPoints { start: f64, stop: f64, step: f64 },
}

/// A closed, evenly spaced range of sample values.
///
/// Values are computed as `start + i * step` rather than by accumulation, so the
/// final sample lands on `stop` regardless of how many steps precede it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepSpec {
    start: f64,
    stop: f64,
    step: f64,
    count: usize,
}

impl SweepSpec {
    pub fn new(start: f64, stop: f64, step: f64) -> Result<Self, SweepSpecError> {
        if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
            return Err(SweepSpecError::NonFinite { start, stop, step });
        }
        if step <= 0.0 {
            return Err(SweepSpecError::NonPositiveStep(step));
        }
        if stop < start {
            return Err(SweepSpecError::InvertedBounds { start, stop });
        }

        let steps = (stop - start) / step;
        if !steps.is_finite() || steps >= MAX_STEPS {
            return Err(SweepSpecError::TooManyPoints { start, stop, step });
        }
        let rounded = steps.round();
        if (steps - rounded).abs() > ALIGNMENT_TOLERANCE {
            return Err(SweepSpecError::Misaligned { start, stop, step });
        }
        let count = (rounded as usize)
            .checked_add(1)
            .ok_or(SweepSpecError::TooManyPoints { start, stop, step })?;

        Ok(Self {
            start,
            stop,
            step,
            count,
        })
    }

    /// A degenerate sweep over a single value.
    pub fn single(value: f64) -> Result<Self, SweepSpecError> {
        Self::new(value, value, 1.0)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn stop(&self) -> f64 {
        self.stop
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> SweepIter {
        SweepIter {
            start: self.start,
            step: self.step,
            next: 0,
            end: self.count,
        }
    }
}

impl IntoIterator for &SweepSpec {
    type Item = f64;
    type IntoIter = SweepIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct SweepIter {
    start: f64,
    step: f64,
    next: usize,
    end: usize,
}

impl SweepIter {
    #[inline]
    fn value_at(&self, i: usize) -> f64 {
        self.start + i as f64 * self.step
    }
}

impl Iterator for SweepIter {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.next >= self.end {
            return None;
        }
        let value = self.value_at(self.next);
        self.next += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for SweepIter {
    fn next_back(&mut self) -> Option<f64> {
        if self.next >= self.end {
            return None;
        }
        self.end -= 1;
        Some(self.value_at(self.end))
    }
}

impl ExactSizeIterator for SweepIter {}
