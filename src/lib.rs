pub mod api;
pub mod config;
pub mod form;
pub mod inventory;
pub mod model;
pub mod notify;
pub mod shell;
pub mod view;
