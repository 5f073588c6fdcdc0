pub mod activity;
pub mod credential;
pub mod permission;
pub mod reset_token;
pub mod tool;
pub mod user;
