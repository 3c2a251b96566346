pub mod data_models;
