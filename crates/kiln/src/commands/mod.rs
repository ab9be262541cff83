pub mod build;
pub mod clean;
pub mod dev;
pub mod init;
pub mod run;
pub mod serve;
