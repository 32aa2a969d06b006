pub mod archive;
pub mod clipboard;
pub mod events;
pub mod favorites;
pub mod listing;
pub mod logging;
pub mod members;
pub mod menu;
pub mod privileges;
pub mod rename;
pub mod spaces;
