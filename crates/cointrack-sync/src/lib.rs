// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod admin;
pub mod backend;
pub mod controller;
pub mod fetcher;
pub mod store;
pub mod table;

pub use admin::*;
pub use backend::*;
pub use controller::*;
pub use fetcher::*;
pub use store::*;
pub use table::*;
