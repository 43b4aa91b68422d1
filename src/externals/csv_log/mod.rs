pub mod writer;

pub use writer::{log_file_name, CsvLog};
