//! Read/unread state for a single-user feed reader.
//!
//! Stories are ingested elsewhere; this crate answers the unread and archive
//! listings, flips a single story's read flag, and marks batches of stories
//! read in the background through [`jobs::JobQueue`]. [`reader::Reader`] ties
//! these together behind the operations a request layer needs.

pub mod config;
pub mod jobs;
pub mod pagination;
pub mod read_state;
pub mod reader;
pub mod storage;
pub mod util;
