// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod init_data;

pub use init_data::{InitData, InitDataError, InitDataVerifier, KeyDerivation, WebAppUser};
