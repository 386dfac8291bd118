//! Static site publishing from notebook documents.

pub mod converter;
pub mod notebook;

pub use converter::{convert_notebook_to_page, NavLink, PageOptions};
