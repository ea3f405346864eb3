#![doc(html_root_url = "https://docs.rs/cambium-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A keyed virtual tree reconciler.
//!
//! Describe the desired tree with [`Node`]s each time it should change, then let [`update`] (or a [`Reconciler`])
//! bring a [`Document`] in line with it, reusing live nodes wherever their [`Key`] matches.
//!
//! The browser DOM is supported through [`web::WebDocument`], and [`memory::MemoryDocument`] renders headlessly.
//!
//! Besides that, this crate contains small clients for the channel protocols pages built on it tend to need:
//! [chunked uploads](`attachments`), [audio streaming](`audio`) and a [synced document store](`sync`).

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod attachments;
pub mod audio;
pub mod channel;
pub mod diff;
mod document;
mod error;
pub mod memory;
mod node;
mod signature;
pub mod sync;
pub mod web;

pub use diff::{reconcile_children, render, update, Reconciler};
pub use document::Document;
pub use error::{ProtocolError, ProtocolResult};
pub use node::{Handler, Kind, Node};
pub use signature::{Key, Signature};
