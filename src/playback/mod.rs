pub mod adapter;
pub mod controller;
pub mod mpv;
