pub mod stonfi_client;
pub mod swap_service;
