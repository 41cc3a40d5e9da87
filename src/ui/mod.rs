//! egui widgets for the selector window. All state lives in
//! [`SelectorSession`](crate::app::SelectorSession); these functions only
//! draw it and turn input into [`SelectorEvent`](crate::state::SelectorEvent)s.

pub mod panels;
pub mod plot;
