pub mod aggregation;
pub mod charts;
pub mod csv_parser;
