pub mod attendance;
pub mod init;
pub mod notify;
pub mod weather;
