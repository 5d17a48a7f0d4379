//! Window and input events.

pub use self::window_event::{Action, Modifiers, MouseButton, TouchAction, WindowEvent};

mod window_event;
