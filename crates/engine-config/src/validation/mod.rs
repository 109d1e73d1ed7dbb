pub mod schema_mode;
