pub mod harmony;
pub mod note;

pub use harmony::{chord_for_bar, next_note, scale_for_bar};
pub use note::{Note, NoteValue};
