//! Step index, navigation history and location string for a wizard

/// Tracks which step of a multi-step flow is displayed.
///
/// The location string (`?step=N`, 1-based) mirrors the current index so a
/// flow can be restored, and the history records every real transition so
/// "back" behaves like a browser back button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepController {
    current: usize,
    step_count: usize,
    history: Vec<usize>,
}

impl StepController {
    /// A controller for `step_count` steps, starting at the first.
    /// A zero count is treated as one step.
    pub fn new(step_count: usize) -> Self {
        Self {
            current: 0,
            step_count: step_count.max(1),
            history: vec![0],
        }
    }

    /// Restore from a location string such as `?step=3`. Missing or
    /// unparsable values start at the first step; out-of-range ones clamp.
    pub fn from_location(location: &str, step_count: usize) -> Self {
        let mut controller = Self::new(step_count);
        let step = location
            .trim_start_matches('?')
            .split('&')
            .find_map(|pair| pair.strip_prefix("step="))
            .and_then(|n| n.trim().parse::<usize>().ok());
        if let Some(step) = step {
            let index = step.saturating_sub(1).min(controller.last_index());
            controller.current = index;
            controller.history = vec![index];
        }
        controller
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    fn last_index(&self) -> usize {
        self.step_count - 1
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_terminal(&self) -> bool {
        self.current == self.last_index()
    }

    pub fn history(&self) -> &[usize] {
        &self.history
    }

    /// `?step=N` with N 1-based
    pub fn location(&self) -> String {
        format!("?step={}", self.current + 1)
    }

    fn go(&mut self, index: usize) -> bool {
        if index == self.current {
            return false;
        }
        self.current = index;
        self.history.push(index);
        true
    }

    /// Move forward one step; no-op on the terminal step
    pub fn advance(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.go(self.current + 1)
    }

    /// Move back one step; no-op on the first step
    pub fn retreat(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.go(self.current - 1)
    }

    /// Go to `index`, clamped into range. Jumping to the current step
    /// changes nothing.
    pub fn jump_to(&mut self, index: usize) -> bool {
        let index = index.min(self.last_index());
        self.go(index)
    }

    /// Undo the most recent transition, restoring the step shown before it
    pub fn navigate_back(&mut self) -> bool {
        if self.history.len() < 2 {
            return false;
        }
        self.history.pop();
        if let Some(&previous) = self.history.last() {
            self.current = previous;
        }
        true
    }
}
