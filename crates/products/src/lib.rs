//! Products (catalog) domain module.
//!
//! Plain product records owned by a storefront. This crate only holds the
//! record shapes and their field validation (no IO, no HTTP, no storage).

pub mod product;

pub use product::{NewProduct, Product, ProductDetails, ProductDraft};
