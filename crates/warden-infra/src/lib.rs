// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Warden Infra
//!
//! Concrete implementations of the collaborators the stability core is
//! written against: a headless graphics pipeline, the built-in decision
//! backends and the factory-based [`BackendLoader`](warden_core::BackendLoader),
//! and the flat-texture override table.

#![warn(missing_docs)]

pub mod backends;
pub mod graphics;
pub mod textures;

pub use backends::{
    BackendFactory, ConsoleBackend, FactoryLoader, JournalBackend, ThresholdBackend,
    BUILTIN_SCHEME,
};
pub use graphics::{headless_pipeline, HeadlessConfig, HeadlessContext, HeadlessDevice};
pub use textures::{FlatTextureOverrides, TextureSource, DEFAULT_FLAT_TEXTURE, DEFAULT_OVERRIDES};
