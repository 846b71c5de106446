//! Messaging subsystem of the Keyward node.
//!
//! Only the part the account session layer touches lives here: the
//! [`KeyRegistry`](registry::KeyRegistry) that holds injected private
//! keys, and the [`MessagingService`](service::MessagingService) that
//! owns it and uses those keys to sign outgoing payloads.

pub mod registry;
pub mod service;
