pub mod grid;
pub mod history;
pub mod text_entry;
pub mod tools;
