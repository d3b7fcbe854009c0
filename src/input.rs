use crate::backend::WindowId;

pub const INDEV_TYPE_NONE: u32 = 0;
pub const INDEV_TYPE_POINTER: u32 = 1;
pub const INDEV_TYPE_KEYPAD: u32 = 2;
pub const INDEV_TYPE_BUTTON: u32 = 3;
pub const INDEV_TYPE_ENCODER: u32 = 4;

pub const INDEV_STATE_RELEASED: u32 = 0;
pub const INDEV_STATE_PRESSED: u32 = 1;

/// One sample as read from an input device by the display driver.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RawInputSample {
    pub device_type: u32,
    pub x: i32,
    pub y: i32,
    pub key: u32,
    pub state: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DeviceClass {
    Pointer,
    Keypad,
}

impl DeviceClass {
    pub fn from_raw(device_type: u32) -> Option<Self> {
        match device_type {
            INDEV_TYPE_POINTER => Some(Self::Pointer),
            INDEV_TYPE_KEYPAD => Some(Self::Keypad),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InputState {
    Released,
    Pressed,
}

impl InputState {
    pub fn from_raw(state: u32) -> Self {
        match state {
            INDEV_STATE_RELEASED => Self::Released,
            _ => Self::Pressed,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InputEvent {
    Pointer {
        x: i32,
        y: i32,
        raw_x: i32,
        raw_y: i32,
        gesture_state: i32,
    },
    Keypad {
        key_code: u32,
    },
}

/// An input event in the shape that is routed to windows.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InputMessage {
    pub state: InputState,
    pub event: InputEvent,
}

impl InputMessage {
    /// Converts a raw sample. Samples of unknown device types yield `None`.
    pub fn from_raw(sample: &RawInputSample) -> Option<Self> {
        let event = match DeviceClass::from_raw(sample.device_type)? {
            DeviceClass::Pointer => InputEvent::Pointer {
                x: sample.x,
                y: sample.y,
                raw_x: sample.x,
                raw_y: sample.y,
                gesture_state: 0,
            },
            DeviceClass::Keypad => InputEvent::Keypad {
                key_code: sample.key,
            },
        };
        Some(Self {
            state: InputState::from_raw(sample.state),
            event,
        })
    }

    pub fn device_class(&self) -> DeviceClass {
        match self.event {
            InputEvent::Pointer { .. } => DeviceClass::Pointer,
            InputEvent::Keypad { .. } => DeviceClass::Keypad,
        }
    }
}

/// Observes every event delivered to a window.
pub trait InputMonitor {
    fn on_input(&self, window: WindowId, msg: &InputMessage);
}
