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

//! Built-in decision backends and the loader that resolves them by name.
//!
//! Every built-in registers a [`BackendFactory`] with `inventory`, so
//! `builtin:<name>` locators resolve without any central list.

mod console;
mod factory;
mod journal;
mod threshold;

pub use console::ConsoleBackend;
pub use factory::{BackendFactory, ConstructFn, FactoryLoader, BUILTIN_SCHEME};
pub use journal::JournalBackend;
pub use threshold::ThresholdBackend;
