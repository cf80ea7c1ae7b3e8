//! Activity Kind Value Object
//!
//! User-input events the idle supervisor can observe.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PointerDown,
    PointerMove,
    KeyDown,
    Scroll,
    TouchStart,
    Click,
    /// Text typed into a form field
    FormInput,
    /// Form field value committed
    FormChange,
    /// Form field focused
    FormFocus,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 9] = [
        ActivityKind::PointerDown,
        ActivityKind::PointerMove,
        ActivityKind::KeyDown,
        ActivityKind::Scroll,
        ActivityKind::TouchStart,
        ActivityKind::Click,
        ActivityKind::FormInput,
        ActivityKind::FormChange,
        ActivityKind::FormFocus,
    ];

    #[inline]
    pub const fn code(&self) -> &'static str {
        use ActivityKind::*;
        match self {
            PointerDown => "pointer_down",
            PointerMove => "pointer_move",
            KeyDown => "key_down",
            Scroll => "scroll",
            TouchStart => "touch_start",
            Click => "click",
            FormInput => "form_input",
            FormChange => "form_change",
            FormFocus => "form_focus",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
