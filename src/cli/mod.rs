pub mod cleanup;
pub mod run;
