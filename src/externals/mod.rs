pub mod csv_log;
pub mod sensor_hub;
