pub mod current;
pub mod hub_error;
pub mod packet;
pub mod sample;
pub mod voltage;
