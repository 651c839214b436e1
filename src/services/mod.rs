pub mod calendar;
pub mod dedup;
pub mod discord;
pub mod events;
pub mod init;
pub mod preview;
pub mod scheduler;
pub mod startgg;

#[cfg(test)]
pub mod testing;
