pub mod agent;
pub mod pages;
