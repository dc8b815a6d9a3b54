pub mod demos;
pub mod run;
