//! Phonefall - a village builds while falling phones erode its productivity

pub mod city;
pub mod core;
pub mod economy;
pub mod entity;
pub mod phone;
pub mod simulation;
