pub mod peer_chat;
pub mod wizard;
