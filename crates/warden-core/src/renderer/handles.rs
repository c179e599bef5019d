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

/// Declares a copyable, opaque resource handle. The value `0` is reserved as null.
macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub u64);

        impl $name {
            /// The null handle.
            pub const NULL: Self = Self(0);

            /// Returns `true` if this is the null handle.
            pub fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

pub(crate) use opaque_handle;

opaque_handle!(
    /// An opaque pixel-shader resource owned by the host's graphics context.
    ShaderHandle
);

opaque_handle!(
    /// An opaque vertex buffer.
    VertexBufferHandle
);

opaque_handle!(
    /// An opaque pipeline-statistics query.
    QueryHandle
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handles() {
        assert!(ShaderHandle::NULL.is_null());
        assert!(ShaderHandle::default().is_null());
        assert!(!ShaderHandle(7).is_null());
        assert!(QueryHandle::NULL.is_null());
    }

    #[test]
    fn handle_display() {
        assert_eq!(format!("{}", VertexBufferHandle(3)), "VertexBufferHandle#3");
    }
}
