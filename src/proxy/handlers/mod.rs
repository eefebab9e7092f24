// Handlers module - route endpoint handlers

pub mod items;
pub mod pages;
pub mod proxy;
pub mod revalidate;
