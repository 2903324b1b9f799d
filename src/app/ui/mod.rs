mod controls;
mod details;
mod hierarchy;
mod panels;
