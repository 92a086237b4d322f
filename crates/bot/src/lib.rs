//! Telegram front end for the sales report catalog.
//!
//! Long-polls the Bot API, keeps a per-user parameter selection, runs
//! reports through [`salesbot_core::runner::ReportRunner`] and sends the
//! resulting spreadsheets back to the chat.

pub mod config;
pub mod dispatcher;
pub mod export;
pub mod keyboard;
pub mod markup;
pub mod retention;
pub mod session;
pub mod telegram;
pub mod voice;
