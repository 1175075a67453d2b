// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod error;
pub mod ids;
pub mod model;
pub mod observe;
pub mod projection;
pub mod timestamp;
pub mod view;

pub use error::*;
pub use ids::*;
pub use model::*;
pub use observe::*;
pub use projection::*;
pub use view::*;
