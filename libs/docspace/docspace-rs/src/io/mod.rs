//! Members of this module are responsible for talking to the document-space api.

pub mod network;
pub mod remote;
