pub mod chat_panel;
pub mod controls;
pub mod debug;
pub mod stats_table;
pub mod text_input;
