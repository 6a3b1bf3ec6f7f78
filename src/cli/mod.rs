pub mod app;
mod commands;
mod env;
mod info;
mod output;
mod run;
