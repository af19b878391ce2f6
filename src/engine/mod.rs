pub mod swap_controller;
pub mod swap_state;
pub mod swap_view_model;
