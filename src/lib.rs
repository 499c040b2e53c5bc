#[allow(non_snake_case)]
pub mod Components;
#[allow(non_snake_case)]
pub mod Kinetics;
#[allow(non_snake_case)]
pub mod Models;
#[allow(non_snake_case)]
pub mod Units;
#[allow(non_snake_case)]
pub mod Utils;
pub mod settings;
