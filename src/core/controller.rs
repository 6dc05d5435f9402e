/// Input button identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    MouseLeft,
    MouseRight,
    MouseMiddle,
    Shift,
}

/// Controller - button states plus pointer motion accumulated since the last reset
pub trait Controller {
    /// Check if button is currently down
    fn is_down(&self, button: Button) -> bool;

    /// Pointer movement in logical pixels since the last reset
    fn pointer_delta(&self) -> (f32, f32);

    /// Wheel movement in lines since the last reset (positive = away from the user)
    fn scroll_delta(&self) -> f32;
}
