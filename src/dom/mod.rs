//! A minimal document tree that feeds the mutation hooks, and the patch
//! vocabulary used to drive it from scripts.

pub mod patch;
pub mod tree;

pub use patch::{apply_patch, DomPatch, HandleMap, PatchError, DOCUMENT_HANDLE};
pub use tree::{Attribute, Document, DomError, NodeData};
