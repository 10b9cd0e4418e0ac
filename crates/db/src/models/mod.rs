pub mod artist;
pub mod artist_collaborator;
pub mod artist_invite;
pub mod event;
pub mod event_expense;
pub mod notification;
pub mod user;
pub mod user_settings;
