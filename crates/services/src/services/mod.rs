pub mod artists;
pub mod cache;
pub mod calendar;
pub mod currency;
pub mod events;
pub mod invites;
pub mod leave_artist;
pub mod notification;
pub mod permissions;
pub mod realtime;

#[cfg(test)]
pub(crate) mod test_support;
