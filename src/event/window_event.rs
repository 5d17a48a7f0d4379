/// An event produced by the window or the canvas it draws into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowEvent {
    /// The user asked to close the window.
    Close,
    /// The drawable surface changed to the given physical size, in pixels.
    FramebufferSize(u32, u32),
    /// The cursor moved to the given position, in physical pixels from the top-left corner.
    CursorPos(f64, f64, Modifiers),
    /// A mouse button changed state.
    MouseButton(MouseButton, Action, Modifiers),
    /// Wheel or trackpad scroll, positive `y` meaning away from the user.
    Scroll(f64, f64, Modifiers),
    /// A touch point with its identifier and position.
    Touch(u64, f64, f64, TouchAction, Modifiers),
}

impl WindowEvent {
    /// Whether this event comes from a pointing device.
    pub fn is_pointer_event(&self) -> bool {
        matches!(
            self,
            WindowEvent::CursorPos(..)
                | WindowEvent::MouseButton(..)
                | WindowEvent::Scroll(..)
                | WindowEvent::Touch(..)
        )
    }
}

/// Press or release.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Action {
    Release,
    Press,
}

/// Mouse buttons, numbered like the platform numbers them.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(usize)]
pub enum MouseButton {
    /// Usually the left button.
    Button1 = 0,
    /// Usually the right button.
    Button2,
    /// Usually the middle button.
    Button3,
    Button4,
    Button5,
}

/// Phase of a touch point.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum TouchAction {
    Start,
    End,
    Move,
    Cancel,
}

bitflags! {
    /// Keyboard modifiers held while a pointer event happened.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Modifiers: u32 {
        const Shift   = 0b0001;
        const Control = 0b0010;
        const Alt     = 0b0100;
        const Super   = 0b1000;
    }
}
