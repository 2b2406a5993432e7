//! External delivery channels for workflow notifications.

pub mod push;
