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

//! Texture-replacement contract consulted by host render code.

use crate::renderer::opaque_handle;

opaque_handle!(
    /// An opaque shader-resource handle for a texture.
    TextureHandle
);

/// Resolves a texture name to a replacement resource, if one is registered.
///
/// The stability core never calls this itself; the surrounding renderer does
/// when it binds textures.
pub trait TextureOverrides: Send + Sync {
    /// Returns the replacement for `name`, or `None` to keep the original.
    fn lookup(&self, name: &str) -> Option<TextureHandle>;
}
